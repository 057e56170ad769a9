pub mod auth;
pub mod blob;
pub mod cli;
pub mod entity;
pub mod logging;
pub mod middleware;
pub mod migration;
pub mod openapi;
pub mod resource;
pub mod storage;
pub mod workflow;
#[cfg(test)]
mod tests;

use axum::{
    body::Body,
    error_handling::HandleErrorLayer,
    extract::DefaultBodyLimit,
    http::{header, Response, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use portal_shared::{error::PortalError, resource::MessageResponse, Urls, UPLOADS_PATH};
use resource::{delete_resource, get_resource, list_resources, upload_resource};
use std::{sync::Arc, time::Duration};
use tokio::sync::RwLock;
use tower::{BoxError, ServiceBuilder};
use tower_http::{services::ServeDir, set_header::SetResponseHeaderLayer};
use tracing::{error, warn};

use crate::{
    auth::{require_upload_code, AuthGate},
    blob::BlobStore,
    cli::PortalConfig,
    logging::logging_layer,
    storage::ResourceStore,
};

pub type SharedState = Arc<RwLock<AppState>>;

pub struct AppState {
    pub store: ResourceStore,
    pub blobs: BlobStore,
    pub auth: AuthGate,
}

impl AppState {
    pub async fn new(config: &PortalConfig) -> Result<Self, PortalError> {
        let store = ResourceStore::connect(&config.db_url).await?;
        let blobs = BlobStore::new(&config.upload_dir).await?;
        let auth = AuthGate::new(config.upload_secret.clone());
        if !auth.is_configured() {
            warn!("No upload secret configured, all uploads and deletes will be refused");
        }
        Ok(Self { store, blobs, auth })
    }
}

pub fn build_app<T>(shared_state: &SharedState, config: &PortalConfig) -> Router<T> {
    let static_service =
        ServeDir::new(&config.static_dir).append_index_html_on_directories(true);
    let uploads_service = ServeDir::new(&config.upload_dir);

    let require_code =
        axum::middleware::from_fn_with_state(shared_state.clone(), require_upload_code);

    // Build our application by composing routes
    let router = Router::new()
        .route(Urls::Resources.as_ref(), get(list_resources))
        .route(
            Urls::Upload.as_ref(),
            post(upload_resource)
                .route_layer(require_code.clone())
                .layer(DefaultBodyLimit::max(config.max_upload_bytes)),
        )
        .route(
            &format!("{}/{{id}}", Urls::Resource.as_ref()),
            get(get_resource).merge(delete(delete_resource).route_layer(require_code)),
        )
        .merge(openapi::api_route())
        .nest_service(UPLOADS_PATH, uploads_service)
        .fallback_service(static_service);

    router
        // Add middleware to all routes
        .layer(
            ServiceBuilder::new()
                .layer(middleware::corslayer())
                .layer(SetResponseHeaderLayer::overriding(
                    header::CACHE_CONTROL,
                    |response: &Response<Body>| {
                        if response.status() == StatusCode::OK {
                            "private, no-transform max-age=0".parse().ok()
                        } else {
                            None
                        }
                    },
                ))
                // Handle errors from middleware
                .layer(HandleErrorLayer::new(handle_error))
                .load_shed()
                .concurrency_limit(1024)
                .timeout(Duration::from_secs(30))
                .layer(logging_layer()),
        )
        .with_state(shared_state.clone())
}

async fn handle_error(error: BoxError) -> impl IntoResponse {
    if error.is::<tower::timeout::error::Elapsed>() {
        return (
            StatusCode::REQUEST_TIMEOUT,
            Json(MessageResponse::failed("request timed out")),
        );
    }

    if error.is::<tower::load_shed::error::Overloaded>() {
        let msg = "service is overloaded, try again later";
        error!("{}", msg);
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(MessageResponse::failed(msg)),
        );
    }

    let msg = format!("Unhandled internal error: {error}");
    error!("{}", msg);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(MessageResponse::failed(msg)),
    )
}
