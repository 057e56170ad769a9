pub mod client;
pub mod error;
pub mod resource;

/// Request header carrying the shared upload secret on mutating calls.
pub const UPLOAD_CODE_HEADER: &str = "x-upload-code";

/// Multipart field holding the uploaded file.
pub const FILE_FIELD: &str = "resourceFile";

/// Multipart field holding the display title.
pub const TITLE_FIELD: &str = "resourceTitle";

/// Public path prefix the stored blobs are served under.
pub const UPLOADS_PATH: &str = "/uploads";

/// Well-known API paths, shared by the server router and the client.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Urls {
    Resources,
    Upload,
    Resource,
}

impl AsRef<str> for Urls {
    fn as_ref(&self) -> &str {
        match self {
            Urls::Resources => "/api/resources",
            Urls::Upload => "/api/upload",
            Urls::Resource => "/api/resource",
        }
    }
}

impl Urls {
    /// Path for a single resource, eg `/api/resource/<id>`
    pub fn resource(id: &uuid::Uuid) -> String {
        format!("{}/{}", Urls::Resource.as_ref(), id)
    }
}
