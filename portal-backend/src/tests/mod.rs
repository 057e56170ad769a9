use crate::auth::DENIED_MESSAGE;
use crate::cli::PortalConfig;
use crate::resource::{DELETED_MESSAGE, NO_FILE_MESSAGE, UPLOADED_MESSAGE};
use crate::storage::NOT_FOUND_MESSAGE;
use crate::{build_app, handle_error, AppState, SharedState};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::*;
use portal_shared::resource::{MessageResponse, ResourceResponse, ResourcesResponse};
use portal_shared::{Urls, FILE_FIELD, TITLE_FIELD, UPLOAD_CODE_HEADER};
use sea_orm::ConnectionTrait;
use std::path::PathBuf;
use std::sync::{Arc, Once};
use tokio::sync::RwLock;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use uuid::Uuid;

static INIT: Once = Once::new();

const SECRET: &str = "class-9b-2024";

struct TestPortal {
    server: TestServer,
    state: SharedState,
    upload_dir: PathBuf,
    // removed on drop
    _dir: tempfile::TempDir,
}

impl TestPortal {
    fn upload_code(secret: &'static str) -> (HeaderName, HeaderValue) {
        (
            HeaderName::from_static(UPLOAD_CODE_HEADER),
            HeaderValue::from_static(secret),
        )
    }

    async fn upload(&self, secret: &'static str, form: MultipartForm) -> TestResponse {
        let (name, value) = Self::upload_code(secret);
        self.server
            .post(Urls::Upload.as_ref())
            .add_header(name, value)
            .multipart(form)
            .await
    }

    async fn delete(&self, secret: &'static str, id: &str) -> TestResponse {
        let (name, value) = Self::upload_code(secret);
        self.server
            .delete(&format!("{}/{}", Urls::Resource.as_ref(), id))
            .add_header(name, value)
            .await
    }

    async fn list(&self) -> ResourcesResponse {
        let res = self.server.get(Urls::Resources.as_ref()).await;
        res.assert_status_ok();
        res.json()
    }

    fn blob_count(&self) -> usize {
        std::fs::read_dir(&self.upload_dir)
            .expect("Failed to read upload dir")
            .count()
    }
}

fn file_form(title: &str, filename: &str, content: &[u8]) -> MultipartForm {
    MultipartForm::new().add_text(TITLE_FIELD, title.to_string()).add_part(
        FILE_FIELD,
        Part::bytes(content.to_vec())
            .file_name(filename.to_string())
            .mime_type("application/pdf"),
    )
}

async fn setup_test_server() -> TestPortal {
    INIT.call_once(|| {
        tracing_subscriber::registry()
            .with(tracing_subscriber::EnvFilter::new(
                "portal_backend=debug,tower_http=debug,debug",
            ))
            .with(tracing_subscriber::fmt::layer())
            .init();
    });
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let upload_dir = dir.path().join("uploads");
    let config = PortalConfig::test(upload_dir.clone(), SECRET);

    let appstate = AppState::new(&config)
        .await
        .expect("Failed to build test state");
    let shared_state = Arc::new(RwLock::new(appstate));
    let app: axum::Router = build_app(&shared_state, &config);

    TestPortal {
        server: TestServer::new(app).expect("Failed to start test server"),
        state: shared_state,
        upload_dir,
        _dir: dir,
    }
}

#[tokio::test]
async fn test_api_list_empty() {
    let portal = setup_test_server().await;

    let body = portal.list().await;
    assert!(body.success);
    assert!(body.resources.is_empty());
}

#[tokio::test]
async fn test_api_upload_list_download_delete() {
    let portal = setup_test_server().await;
    let content = b"%PDF-1.4 this is the notes file";

    let res = portal
        .upload(SECRET, file_form("Notes", "notes.pdf", content))
        .await;
    res.assert_status_ok();
    let body: MessageResponse = res.json();
    assert!(body.success);
    assert_eq!(body.message, UPLOADED_MESSAGE);
    let created = body.resource.expect("upload should return the resource");
    assert_eq!(created.title, "Notes");
    assert_eq!(created.mime_type, "application/pdf");
    assert!(created.filename.starts_with("resourceFile-"));
    assert!(created.filename.ends_with(".pdf"));

    let listed = portal.list().await;
    assert_eq!(listed.resources.len(), 1);
    assert_eq!(listed.resources[0], created);

    let res = portal
        .server
        .get(&Urls::resource(&created.id))
        .await;
    res.assert_status_ok();
    let fetched: ResourceResponse = res.json();
    assert_eq!(fetched.resource, created);

    // the blob is served from the public uploads path
    let res = portal
        .server
        .get(&crate::blob::resolve_url(&created.filename))
        .await;
    res.assert_status_ok();
    assert_eq!(res.as_bytes().as_ref(), content);

    let res = portal.delete(SECRET, &created.id.to_string()).await;
    res.assert_status_ok();
    let body: MessageResponse = res.json();
    assert!(body.success);
    assert_eq!(body.message, DELETED_MESSAGE);

    assert!(portal.list().await.resources.is_empty());
    assert_eq!(portal.blob_count(), 0);
    let res = portal
        .server
        .get(&crate::blob::resolve_url(&created.filename))
        .await;
    res.assert_status(StatusCode::NOT_FOUND);
    let res = portal
        .server
        .get(&Urls::resource(&created.id))
        .await;
    res.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_api_upload_wrong_code() {
    let portal = setup_test_server().await;

    let res = portal
        .upload("not-the-code", file_form("Notes", "notes.pdf", b"data"))
        .await;
    res.assert_status(StatusCode::UNAUTHORIZED);
    let body: MessageResponse = res.json();
    assert!(!body.success);
    assert_eq!(body.message, DENIED_MESSAGE);

    assert!(portal.list().await.resources.is_empty());
    assert_eq!(portal.blob_count(), 0);
}

#[tokio::test]
async fn test_api_upload_missing_code() {
    let portal = setup_test_server().await;

    let res = portal
        .server
        .post(Urls::Upload.as_ref())
        .multipart(file_form("Notes", "notes.pdf", b"data"))
        .await;
    res.assert_status(StatusCode::UNAUTHORIZED);
    assert!(portal.list().await.resources.is_empty());
    assert_eq!(portal.blob_count(), 0);
}

#[tokio::test]
async fn test_api_upload_without_file() {
    let portal = setup_test_server().await;

    let form = MultipartForm::new().add_text(TITLE_FIELD, "Notes");
    let res = portal.upload(SECRET, form).await;
    res.assert_status(StatusCode::BAD_REQUEST);
    let body: MessageResponse = res.json();
    assert!(!body.success);
    assert_eq!(body.message, NO_FILE_MESSAGE);

    assert!(portal.list().await.resources.is_empty());
    assert_eq!(portal.blob_count(), 0);
}

#[tokio::test]
async fn test_api_upload_title_defaults_to_filename() {
    let portal = setup_test_server().await;

    let form = MultipartForm::new().add_part(
        FILE_FIELD,
        Part::bytes(b"hello".to_vec())
            .file_name("hello.txt")
            .mime_type("text/plain"),
    );
    let res = portal.upload(SECRET, form).await;
    res.assert_status_ok();
    let created = res
        .json::<MessageResponse>()
        .resource
        .expect("upload should return the resource");
    assert_eq!(created.title, "hello.txt");
    assert_eq!(created.mime_type, "text/plain");
    assert!(created.filename.ends_with(".txt"));
}

#[tokio::test]
async fn test_api_same_filename_twice() {
    let portal = setup_test_server().await;

    let first = portal
        .upload(SECRET, file_form("First", "same.pdf", b"first"))
        .await
        .json::<MessageResponse>()
        .resource
        .expect("first upload failed");
    let second = portal
        .upload(SECRET, file_form("Second", "same.pdf", b"second"))
        .await
        .json::<MessageResponse>()
        .resource
        .expect("second upload failed");

    assert_ne!(first.filename, second.filename);
    assert_eq!(portal.blob_count(), 2);

    let listed = portal.list().await.resources;
    assert_eq!(listed.len(), 2);
    // newest first
    assert_eq!(listed[0].id, second.id);
    assert_eq!(listed[1].id, first.id);

    let res = portal
        .server
        .get(&crate::blob::resolve_url(&first.filename))
        .await;
    assert_eq!(res.as_bytes().as_ref(), b"first");
}

#[tokio::test]
async fn test_api_delete_not_found() {
    let portal = setup_test_server().await;
    portal
        .upload(SECRET, file_form("Keep", "keep.pdf", b"keep"))
        .await
        .assert_status_ok();

    let res = portal.delete(SECRET, &Uuid::new_v4().to_string()).await;
    res.assert_status(StatusCode::NOT_FOUND);
    let body: MessageResponse = res.json();
    assert!(!body.success);
    assert_eq!(body.message, NOT_FOUND_MESSAGE);

    // not a uuid at all
    let res = portal.delete(SECRET, "507f1f77bcf86cd799439011").await;
    res.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(res.json::<MessageResponse>().message, NOT_FOUND_MESSAGE);

    assert_eq!(portal.list().await.resources.len(), 1);
    assert_eq!(portal.blob_count(), 1);
}

#[tokio::test]
async fn test_api_delete_wrong_code() {
    let portal = setup_test_server().await;
    let created = portal
        .upload(SECRET, file_form("Keep", "keep.pdf", b"keep"))
        .await
        .json::<MessageResponse>()
        .resource
        .expect("upload failed");

    let res = portal.delete("nope", &created.id.to_string()).await;
    res.assert_status(StatusCode::UNAUTHORIZED);

    assert_eq!(portal.list().await.resources.len(), 1);
    assert_eq!(portal.blob_count(), 1);
}

#[tokio::test]
async fn test_api_delete_with_missing_blob() {
    let portal = setup_test_server().await;
    let created = portal
        .upload(SECRET, file_form("Gone", "gone.pdf", b"gone"))
        .await
        .json::<MessageResponse>()
        .resource
        .expect("upload failed");

    std::fs::remove_file(portal.upload_dir.join(&created.filename))
        .expect("Failed to remove blob");

    portal
        .delete(SECRET, &created.id.to_string())
        .await
        .assert_status_ok();
    assert!(portal.list().await.resources.is_empty());
}

#[tokio::test]
async fn test_api_odd_extension_is_downloadable() {
    let portal = setup_test_server().await;

    for original in ["report.%41", "report.p#f", "report.p\\df"] {
        let res = portal
            .upload(SECRET, file_form("Odd", original, b"odd bytes"))
            .await;
        res.assert_status_ok();
        let created = res
            .json::<MessageResponse>()
            .resource
            .expect("upload should return the resource");

        let res = portal
            .server
            .get(&crate::blob::resolve_url(&created.filename))
            .await;
        res.assert_status_ok();
        assert_eq!(res.as_bytes().as_ref(), b"odd bytes");
    }
}

#[tokio::test]
async fn test_api_delete_record_gone_midway() {
    let portal = setup_test_server().await;
    let created = portal
        .upload(SECRET, file_form("Racy", "racy.pdf", b"racy"))
        .await
        .json::<MessageResponse>()
        .resource
        .expect("upload failed");

    // what a concurrent delete leaves behind: no blob, and a record
    // that's gone by the time we try to remove it
    std::fs::remove_file(portal.upload_dir.join(&created.filename))
        .expect("Failed to remove blob");
    portal
        .state
        .read()
        .await
        .store
        .conn()
        .execute_unprepared(
            "CREATE TRIGGER skip_delete BEFORE DELETE ON resource \
             BEGIN SELECT RAISE(IGNORE); END",
        )
        .await
        .expect("Failed to create trigger");

    let res = portal.delete(SECRET, &created.id.to_string()).await;
    res.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(res.json::<MessageResponse>().message, NOT_FOUND_MESSAGE);
}

#[tokio::test]
async fn test_handle_error() {
    let err = tower::timeout::error::Elapsed::new();
    let res = handle_error(Box::new(err)).await.into_response();
    assert_eq!(res.status(), StatusCode::REQUEST_TIMEOUT);

    let err = tower::load_shed::error::Overloaded::new();
    let res = handle_error(Box::new(err)).await.into_response();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);

    let err = std::io::Error::other("something else");
    let res = handle_error(Box::new(err)).await.into_response();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_unconfigured_secret_refuses_everything() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let mut config = PortalConfig::test(dir.path().join("uploads"), SECRET);
    config.upload_secret = None;
    let appstate = AppState::new(&config)
        .await
        .expect("Failed to build test state");
    let app: axum::Router = build_app(&Arc::new(RwLock::new(appstate)), &config);
    let server = TestServer::new(app).expect("Failed to start test server");

    let res = server
        .post(Urls::Upload.as_ref())
        .add_header(
            HeaderName::from_static(UPLOAD_CODE_HEADER),
            HeaderValue::from_static(""),
        )
        .multipart(file_form("Notes", "notes.pdf", b"data"))
        .await;
    res.assert_status(StatusCode::UNAUTHORIZED);
}
