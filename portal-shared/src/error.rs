use std::fmt::Display;

use sea_orm::DbErr;

#[derive(Debug)]
pub enum PortalError {
    /// Missing or wrong upload code
    Unauthorized(String),
    /// Malformed request, eg no file in an upload
    BadRequest(String),
    NotFound(String),
    /// Filesystem or database failure
    StorageError(String),
}

impl PortalError {
    pub fn message(&self) -> &str {
        match self {
            PortalError::Unauthorized(msg)
            | PortalError::BadRequest(msg)
            | PortalError::NotFound(msg)
            | PortalError::StorageError(msg) => msg,
        }
    }
}

impl Display for PortalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PortalError::Unauthorized(msg) => write!(f, "Unauthorized: {msg}"),
            PortalError::BadRequest(msg) => write!(f, "Bad request: {msg}"),
            PortalError::NotFound(msg) => write!(f, "Not found: {msg}"),
            PortalError::StorageError(msg) => write!(f, "Storage error: {msg}"),
        }
    }
}

impl std::error::Error for PortalError {}

impl From<std::io::Error> for PortalError {
    fn from(err: std::io::Error) -> Self {
        PortalError::StorageError(err.to_string())
    }
}

impl From<DbErr> for PortalError {
    fn from(err: DbErr) -> Self {
        match err {
            DbErr::RecordNotFound(msg) => PortalError::NotFound(msg),
            other => PortalError::StorageError(other.to_string()),
        }
    }
}
