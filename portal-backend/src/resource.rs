use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use portal_shared::error::PortalError;
use portal_shared::resource::{
    MessageResponse, Resource, ResourceResponse, ResourcesResponse,
};
use portal_shared::{FILE_FIELD, TITLE_FIELD};
use serde::Deserialize;
use tracing::{debug, error};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::storage::NOT_FOUND_MESSAGE;
use crate::workflow::{self, DeleteOutcome, UploadOutcome, UploadedFile};
use crate::SharedState;

pub const UPLOADED_MESSAGE: &str = "File uploaded and resource created successfully!";
pub const DELETED_MESSAGE: &str = "Resource deleted successfully.";
pub const NO_FILE_MESSAGE: &str = "No file selected.";

#[derive(Debug)]
pub struct WebError {
    status: StatusCode,
    message: String,
}

impl WebError {
    pub fn new(status: StatusCode, message: String) -> Self {
        WebError { status, message }
    }

    pub fn not_found(message: String) -> Self {
        WebError {
            status: StatusCode::NOT_FOUND,
            message,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(MessageResponse::failed(self.message))).into_response()
    }
}

impl From<PortalError> for WebError {
    fn from(err: PortalError) -> Self {
        let status = match &err {
            PortalError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            PortalError::BadRequest(_) => StatusCode::BAD_REQUEST,
            PortalError::NotFound(_) => StatusCode::NOT_FOUND,
            PortalError::StorageError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        WebError {
            status,
            message: err.message().to_string(),
        }
    }
}

/// Ids are only ever handed out by the store, so anything that doesn't parse
/// can't name an existing resource.
fn parse_id(id: &str) -> Result<Uuid, WebError> {
    Uuid::parse_str(id).map_err(|_| {
        debug!("Not a resource id: {:?}", id);
        WebError::not_found(NOT_FOUND_MESSAGE.to_string())
    })
}

/// Multipart body of an upload
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code)]
pub struct UploadForm {
    /// The file itself
    #[schema(value_type = String, format = Binary)]
    resource_file: Vec<u8>,
    /// Display title, defaults to the uploaded file's name
    resource_title: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/resources",
    responses(
        (status = 200, description = "All resources, newest first", body = ResourcesResponse),
        (status = 500, description = "Storage failure", body = MessageResponse),
    )
)]
pub async fn list_resources(
    State(state): State<SharedState>,
) -> Result<Json<ResourcesResponse>, WebError> {
    let resources = state.read().await.store.list().await?;
    debug!("Listed {} resources", resources.len());
    Ok(Json(ResourcesResponse::new(
        resources.into_iter().map(Resource::from).collect(),
    )))
}

#[utoipa::path(
    get,
    path = "/api/resource/{id}",
    params(("id" = String, Path, description = "Resource ID")),
    responses(
        (status = 200, description = "The resource", body = ResourceResponse),
        (status = 404, description = "No such resource", body = MessageResponse),
    )
)]
pub async fn get_resource(
    Path(id): Path<String>,
    State(state): State<SharedState>,
) -> Result<Json<ResourceResponse>, WebError> {
    let id = parse_id(&id)?;
    let resource = state.read().await.store.get_by_id(id).await?;
    Ok(Json(ResourceResponse {
        success: true,
        resource: resource.into(),
    }))
}

/// Pulls the file and title out of the form. Unknown fields are skipped.
async fn read_upload(mut multipart: Multipart) -> Result<UploadedFile, WebError> {
    let mut title = None;
    let mut file = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        error!("Failed to read multipart field: {:?}", e);
        WebError::new(
            StatusCode::BAD_REQUEST,
            format!("Failed to read multipart field: {}", e),
        )
    })? {
        let field_name = field.name().unwrap_or("").to_string();
        debug!("Processing field: {}", field_name);

        match field_name.as_str() {
            FILE_FIELD => {
                // browsers send an empty part when nothing was picked
                let original_name = match field.file_name() {
                    Some(name) if !name.is_empty() => name.to_string(),
                    _ => continue,
                };
                let mime_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(|e| {
                    error!("Failed to read file data: {:?}", e);
                    WebError::new(
                        StatusCode::BAD_REQUEST,
                        format!("Failed to read file data: {}", e),
                    )
                })?;
                debug!(
                    "File name: {:?}, content type: {:?}, {} bytes",
                    original_name,
                    mime_type,
                    bytes.len()
                );
                file = Some((field_name, original_name, mime_type, bytes.to_vec()));
            }
            TITLE_FIELD | "title" => {
                let text = field.text().await.map_err(|e| {
                    WebError::new(
                        StatusCode::BAD_REQUEST,
                        format!("Failed to read title: {}", e),
                    )
                })?;
                title = Some(text);
            }
            _ => {
                debug!("Ignoring unknown multipart field: {}", field_name);
            }
        }
    }

    let (field, original_name, mime_type, bytes) =
        file.ok_or_else(|| WebError::new(StatusCode::BAD_REQUEST, NO_FILE_MESSAGE.to_string()))?;

    let title = title
        .map(|title| title.trim().to_string())
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| original_name.clone());

    Ok(UploadedFile {
        field,
        title,
        original_name,
        mime_type,
        bytes,
    })
}

/// Upload a new file, requires the upload code header
#[utoipa::path(
    post,
    path = "/api/upload",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    params(("x-upload-code" = String, Header, description = "Shared upload code")),
    responses(
        (status = 200, description = "Stored", body = MessageResponse),
        (status = 400, description = "No file in the request", body = MessageResponse),
        (status = 401, description = "Bad upload code", body = MessageResponse),
        (status = 500, description = "Storage failure", body = MessageResponse),
    )
)]
pub async fn upload_resource(
    State(state): State<SharedState>,
    multipart: Multipart,
) -> Result<Json<MessageResponse>, WebError> {
    let file = read_upload(multipart).await?;

    let reader = state.read().await;
    match workflow::upload_resource(&reader.store, &reader.blobs, file).await {
        UploadOutcome::Created(model) => {
            Ok(Json(MessageResponse::ok(UPLOADED_MESSAGE).with_resource(model.into())))
        }
        UploadOutcome::PartialFailure {
            blob_written,
            record_written,
            error,
        } => {
            error!(
                blob_written,
                record_written, "Upload failed part way: {:?}", error
            );
            Err(WebError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to save upload: {}", error.message()),
            ))
        }
    }
}

/// Delete a resource and its file, requires the upload code header
#[utoipa::path(
    delete,
    path = "/api/resource/{id}",
    params(
        ("id" = String, Path, description = "Resource ID"),
        ("x-upload-code" = String, Header, description = "Shared upload code"),
    ),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 401, description = "Bad upload code", body = MessageResponse),
        (status = 404, description = "No such resource", body = MessageResponse),
        (status = 500, description = "Storage failure", body = MessageResponse),
    )
)]
pub async fn delete_resource(
    Path(id): Path<String>,
    State(state): State<SharedState>,
) -> Result<Json<MessageResponse>, WebError> {
    let id = parse_id(&id)?;

    let reader = state.read().await;
    match workflow::delete_resource(&reader.store, &reader.blobs, id).await? {
        DeleteOutcome::Deleted { blob_was_present } => {
            debug!(id = %id, blob_was_present, "Deleted resource");
            Ok(Json(MessageResponse::ok(DELETED_MESSAGE)))
        }
        // lost a race with another delete of the same id, nothing left to do
        DeleteOutcome::PartialFailure {
            blob_removed: false,
            error: PortalError::NotFound(_),
            ..
        } => {
            debug!(id = %id, "Resource vanished during delete");
            Err(WebError::not_found(NOT_FOUND_MESSAGE.to_string()))
        }
        DeleteOutcome::PartialFailure {
            blob_removed,
            record_removed,
            error,
        } => {
            error!(
                id = %id,
                blob_removed,
                record_removed, "Delete failed part way: {:?}", error
            );
            Err(WebError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error deleting resource: {}", error.message()),
            ))
        }
    }
}
