//! The two multi-step operations, blob and record in a fixed order.
//!
//! Upload writes the blob before the record, delete removes the blob before
//! the record. Neither is transactional: a failure between the steps is
//! reported as a [UploadOutcome::PartialFailure] / [DeleteOutcome::PartialFailure]
//! so the caller can see exactly what was persisted. The ordering means an
//! interrupted upload can leave an orphan blob, but never a record without one.

use portal_shared::error::PortalError;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::blob::{BlobRemoval, BlobStore};
use crate::entity::resource;
use crate::storage::ResourceStore;

/// A file pulled out of an upload request
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Form field the file came in on, used as the stored name prefix
    pub field: String,
    pub title: String,
    pub original_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug)]
pub enum UploadOutcome {
    Created(resource::Model),
    PartialFailure {
        blob_written: bool,
        record_written: bool,
        error: PortalError,
    },
}

#[derive(Debug)]
pub enum DeleteOutcome {
    Deleted {
        /// false when the blob had already gone missing from disk
        blob_was_present: bool,
    },
    PartialFailure {
        blob_removed: bool,
        record_removed: bool,
        error: PortalError,
    },
}

pub async fn upload_resource(
    store: &ResourceStore,
    blobs: &BlobStore,
    file: UploadedFile,
) -> UploadOutcome {
    let filename = match blobs
        .store(&file.field, &file.bytes, &file.original_name)
        .await
    {
        Ok(filename) => filename,
        Err(err) => {
            error!("Failed to store blob for {:?}: {:?}", file.original_name, err);
            return UploadOutcome::PartialFailure {
                blob_written: false,
                record_written: false,
                error: err,
            };
        }
    };

    match store.create(&file.title, &filename, &file.mime_type).await {
        Ok(model) => {
            debug!("Uploaded {} as resource {}", filename, model.id);
            UploadOutcome::Created(model)
        }
        Err(err) => {
            error!("Stored blob {} but failed to create record: {:?}", filename, err);
            if let Err(cleanup) = blobs.delete(&filename).await {
                warn!("Leaving orphan blob {}: {:?}", filename, cleanup);
            }
            UploadOutcome::PartialFailure {
                blob_written: true,
                record_written: false,
                error: err,
            }
        }
    }
}

/// Errors from looking the record up (eg [PortalError::NotFound]) are returned
/// as-is, nothing has been touched at that point.
pub async fn delete_resource(
    store: &ResourceStore,
    blobs: &BlobStore,
    id: Uuid,
) -> Result<DeleteOutcome, PortalError> {
    let resource = store.get_by_id(id).await?;

    let blob_was_present = match blobs.delete(&resource.filename).await {
        Ok(BlobRemoval::Removed) => true,
        Ok(BlobRemoval::AlreadyAbsent) => {
            warn!(
                "Blob {} for resource {} was already missing, removing the record anyway",
                resource.filename, id
            );
            false
        }
        // an unaddressable name can't have a blob behind it
        Err(PortalError::NotFound(_)) => false,
        Err(err) => {
            return Ok(DeleteOutcome::PartialFailure {
                blob_removed: false,
                record_removed: false,
                error: err,
            })
        }
    };

    match store.delete_by_id(id).await {
        Ok(()) => Ok(DeleteOutcome::Deleted { blob_was_present }),
        Err(err) => {
            error!(
                "Removed blob {} but failed to delete record {}: {:?}",
                resource.filename, id, err
            );
            Ok(DeleteOutcome::PartialFailure {
                blob_removed: blob_was_present,
                record_removed: false,
                error: err,
            })
        }
    }
}
