use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Metadata for one uploaded file
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    /// Unique identifier, assigned by the store
    pub id: Uuid,

    /// Display name supplied by the uploader
    pub title: String,

    /// Generated on-disk name of the blob, not the original upload name
    pub filename: String,

    /// MIME type reported by the upload (e.g., "application/pdf")
    pub mime_type: String,

    /// When this resource was uploaded
    pub upload_date: DateTime<Utc>,
}

impl Resource {
    /// The extension of the stored file, uppercased, as shown on the resource card.
    pub fn extension_label(&self) -> String {
        self.filename
            .rsplit('.')
            .next()
            .unwrap_or_default()
            .to_uppercase()
    }
}

/// Body of `GET /api/resources`
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ResourcesResponse {
    pub success: bool,
    pub resources: Vec<Resource>,
}

impl ResourcesResponse {
    pub fn new(resources: Vec<Resource>) -> Self {
        Self {
            success: true,
            resources,
        }
    }
}

/// Body of `GET /api/resource/{id}`
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ResourceResponse {
    pub success: bool,
    pub resource: Resource,
}

/// Body of every mutating response, and of every error response.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<Resource>,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            resource: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            resource: None,
        }
    }

    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.resource = Some(resource);
        self
    }
}
