//! Client-side view state for the resource page.
//!
//! Nothing in here is a security boundary. [ClientGate] only decides which
//! controls get shown, the server checks the upload code on every mutating call.

use crate::resource::{Resource, ResourcesResponse};
use crate::UPLOADS_PATH;

/// Shown while the first list request is in flight
pub const LOADING_MESSAGE: &str = "Loading resources...";
pub const EMPTY_MESSAGE: &str = "No resources available yet.";
pub const LOAD_ERROR_MESSAGE: &str = "Error loading resources. Check if the server is running.";

/// Whether the upload form and delete buttons are visible.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct ClientGate {
    unlocked: bool,
}

impl ClientGate {
    /// Compares the typed code (trimmed) with the one the page was built with.
    /// A mismatch leaves the gate locked. Returns the new state.
    pub fn unlock(&mut self, input: &str, expected: &str) -> bool {
        let input = input.trim();
        if !input.is_empty() && input == expected {
            self.unlocked = true;
        }
        self.unlocked
    }

    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }
}

/// Everything needed to draw one resource card.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ResourceCard {
    pub id: uuid::Uuid,
    pub title: String,
    /// eg "Uploaded: 3/9/2024 (PDF File)"
    pub subtitle: String,
    pub download_url: String,
    pub show_delete: bool,
}

impl ResourceCard {
    /// `base_url` is the server origin without a trailing slash, eg `http://localhost:3000`
    pub fn from_resource(resource: &Resource, base_url: &str, gate: &ClientGate) -> Self {
        Self {
            id: resource.id,
            title: resource.title.clone(),
            subtitle: format!(
                "Uploaded: {} ({} File)",
                resource.upload_date.format("%-m/%-d/%Y"),
                resource.extension_label()
            ),
            download_url: format!(
                "{}{}/{}",
                base_url.trim_end_matches('/'),
                UPLOADS_PATH,
                resource.filename
            ),
            show_delete: gate.is_unlocked(),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ListView {
    Loading,
    Empty,
    Failed,
    Cards(Vec<ResourceCard>),
}

impl ListView {
    pub fn from_response(response: &ResourcesResponse, base_url: &str, gate: &ClientGate) -> Self {
        if !response.success {
            return ListView::Failed;
        }
        if response.resources.is_empty() {
            return ListView::Empty;
        }
        ListView::Cards(
            response
                .resources
                .iter()
                .map(|resource| ResourceCard::from_resource(resource, base_url, gate))
                .collect(),
        )
    }

    /// Status line above the card grid, `None` once there are cards to show.
    pub fn status_message(&self) -> Option<&'static str> {
        match self {
            ListView::Loading => Some(LOADING_MESSAGE),
            ListView::Empty => Some(EMPTY_MESSAGE),
            ListView::Failed => Some(LOAD_ERROR_MESSAGE),
            ListView::Cards(_) => None,
        }
    }
}

pub fn confirm_delete_prompt(title: &str) -> String {
    format!("Are you sure you want to permanently delete the resource: \"{title}\"?")
}
