//! Shared-secret gate for the mutating endpoints
//!
//! The secret is compared in plaintext, there's no hashing, expiry or rate
//! limiting here.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use portal_shared::{error::PortalError, UPLOAD_CODE_HEADER};
use tracing::{debug, warn};

use crate::{resource::WebError, SharedState};

pub const DENIED_MESSAGE: &str = "Invalid Permission Code.";

#[derive(Clone, Debug, Default)]
pub struct AuthGate {
    secret: Option<String>,
}

impl AuthGate {
    /// An empty secret is the same as no secret, and nothing gets through.
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.filter(|secret| !secret.is_empty()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }

    pub fn check(&self, presented: Option<&str>) -> bool {
        match (self.secret.as_deref(), presented) {
            (Some(secret), Some(presented)) => !presented.is_empty() && presented == secret,
            _ => false,
        }
    }
}

/// Middleware that requires the upload code header
/// Runs before the handler, so a refused upload never has its body read
pub async fn require_upload_code(
    State(state): State<SharedState>,
    request: Request,
    next: Next,
) -> Response {
    let presented = request
        .headers()
        .get(UPLOAD_CODE_HEADER)
        .and_then(|value| value.to_str().ok());

    let allowed = state.read().await.auth.check(presented);
    if !allowed {
        warn!(
            method = %request.method(),
            uri = %request.uri(),
            code_present = presented.is_some(),
            "Refused request with bad upload code"
        );
        return WebError::from(PortalError::Unauthorized(DENIED_MESSAGE.to_string()))
            .into_response();
    }

    debug!("Upload code accepted");
    next.run(request).await
}
