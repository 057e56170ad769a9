//! On-disk storage for uploaded file bytes
//!

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use portal_shared::error::PortalError;
use portal_shared::UPLOADS_PATH;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, warn};

/// How many suffixed names to try when the timestamped name is already taken
const MAX_NAME_ATTEMPTS: u32 = 64;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum BlobRemoval {
    Removed,
    /// There was nothing on disk to remove
    AlreadyAbsent,
}

#[derive(Clone, Debug)]
pub struct BlobStore {
    root: PathBuf,
}

/// `<field>-<millis><ext>`, or `<field>-<millis>-<attempt><ext>` after a collision.
///
/// The extension is only kept when it is plain ASCII alphanumeric, so the
/// stored name is always safe to drop into a URL path as-is.
pub fn generate_filename(field: &str, original_name: &str, millis: i64, attempt: u32) -> String {
    let ext = Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default();
    match attempt {
        0 => format!("{field}-{millis}{ext}"),
        n => format!("{field}-{millis}-{n}{ext}"),
    }
}

/// Public path a stored blob can be downloaded from.
pub fn resolve_url(filename: &str) -> String {
    format!("{UPLOADS_PATH}/{filename}")
}

impl BlobStore {
    /// Creates the root directory if it doesn't exist yet.
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self, PortalError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await.map_err(|err| {
            error!("Failed to create upload dir {}: {:?}", root.display(), err);
            PortalError::StorageError(format!(
                "Failed to create upload dir {}: {err}",
                root.display()
            ))
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a stored filename to its path under the root. Anything that could
    /// escape the root is treated as a name we never handed out.
    pub fn path_for(&self, filename: &str) -> Result<PathBuf, PortalError> {
        if filename.is_empty()
            || filename == "."
            || filename == ".."
            || filename.contains(['/', '\\', '\0'])
        {
            return Err(PortalError::NotFound(format!("Invalid blob name {filename:?}")));
        }
        Ok(self.root.join(filename))
    }

    /// Writes `bytes` under a freshly generated name and returns that name.
    /// Never replaces an existing file.
    pub async fn store(
        &self,
        field: &str,
        bytes: &[u8],
        original_name: &str,
    ) -> Result<String, PortalError> {
        self.store_at(
            field,
            bytes,
            original_name,
            chrono::Utc::now().timestamp_millis(),
        )
        .await
    }

    async fn store_at(
        &self,
        field: &str,
        bytes: &[u8],
        original_name: &str,
        millis: i64,
    ) -> Result<String, PortalError> {
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let filename = generate_filename(field, original_name, millis, attempt);
            let path = self.path_for(&filename)?;

            let mut file = match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                    debug!("Blob name {} taken, trying another", filename);
                    continue;
                }
                Err(err) => {
                    error!("Failed to create blob {}: {:?}", path.display(), err);
                    return Err(err.into());
                }
            };

            let written = async {
                file.write_all(bytes).await?;
                file.sync_all().await
            }
            .await;

            if let Err(err) = written {
                error!("Failed to write blob {}: {:?}", path.display(), err);
                if let Err(cleanup) = tokio::fs::remove_file(&path).await {
                    warn!("Failed to remove partial blob {}: {:?}", path.display(), cleanup);
                }
                return Err(err.into());
            }

            debug!("Stored {} bytes as {}", bytes.len(), filename);
            return Ok(filename);
        }

        Err(PortalError::StorageError(format!(
            "Could not find a free name for {original_name:?} after {MAX_NAME_ATTEMPTS} attempts"
        )))
    }

    pub async fn delete(&self, filename: &str) -> Result<BlobRemoval, PortalError> {
        let path = self.path_for(filename)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Removed blob {}", filename);
                Ok(BlobRemoval::Removed)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("Blob {} already absent", filename);
                Ok(BlobRemoval::AlreadyAbsent)
            }
            Err(err) => {
                error!("Failed to remove blob {}: {:?}", path.display(), err);
                Err(err.into())
            }
        }
    }

    pub async fn exists(&self, filename: &str) -> bool {
        match self.path_for(filename) {
            Ok(path) => tokio::fs::try_exists(path).await.unwrap_or(false),
            Err(_) => false,
        }
    }
}
