//! Explicit file removal.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use hybridfs_core::result::AppResult;
use hybridfs_core::traits::{BridgeBackend, DeleteOutcome, ObjectStore};
use hybridfs_core::types::{FolderId, Owner};
use hybridfs_database::store::FileStore;
use hybridfs_entity::file::Location;

use crate::folder::tree::{TreeService, validate_name};

/// What an explicit remove actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoveOutcome {
    /// Bytes and record were both deleted.
    Removed,
    /// The record was deleted; the backend no longer had the bytes.
    PhysicalAlreadyGone,
    /// There was no record; the backend was asked anyway.
    RecordAlreadyGone,
    /// Neither bytes nor record existed.
    NothingToRemove,
}

impl RemoveOutcome {
    /// Human-readable summary for API replies.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Removed => "file removed",
            Self::PhysicalAlreadyGone => {
                "file record removed; the stored bytes were already gone"
            }
            Self::RecordAlreadyGone => "stored bytes removed; no file record existed",
            Self::NothingToRemove => "file was already removed",
        }
    }
}

/// Parameters for an explicit remove.
#[derive(Debug, Clone)]
pub struct RemoveRequest {
    /// Owner of the file.
    pub owner: Owner,
    /// File name.
    pub file_name: String,
    /// Containing folder; `None` is the root.
    pub folder_id: Option<FolderId>,
    /// Backend to try when no record exists.
    pub location_hint: Option<Location>,
}

/// Deletes a file's bytes and then its record.
#[derive(Clone)]
pub struct FileService {
    files: Arc<dyn FileStore>,
    tree: Arc<TreeService>,
    bridge: Arc<dyn BridgeBackend>,
    cloud: Arc<dyn ObjectStore>,
}

impl std::fmt::Debug for FileService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileService").finish()
    }
}

impl FileService {
    /// Creates a new file service.
    pub fn new(
        files: Arc<dyn FileStore>,
        tree: Arc<TreeService>,
        bridge: Arc<dyn BridgeBackend>,
        cloud: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            files,
            tree,
            bridge,
            cloud,
        }
    }

    /// Remove a file.
    ///
    /// A bridge that cannot be reached fails the call before the record is
    /// touched, so the caller can retry. Missing bytes or a missing record
    /// are reported, not treated as errors.
    pub async fn remove(&self, request: RemoveRequest) -> AppResult<RemoveOutcome> {
        let RemoveRequest {
            owner,
            file_name,
            folder_id,
            location_hint,
        } = request;
        let name = validate_name(&file_name)?;

        let record = self
            .files
            .find_by_name_and_folder(&name, folder_id, &owner)
            .await?;

        let physical = match (&record, location_hint) {
            (Some(file), _) if file.location == Location::Cloud => {
                let key = self.cloud.object_key(&file.path_or_url);
                Some(self.cloud.delete_object(&key).await?)
            }
            (Some(_), _) | (None, Some(Location::Local)) => {
                let path = self.tree.file_path(folder_id, &name, &owner).await?;
                Some(self.bridge.delete_by_path(&path).await?)
            }
            // Cloud keys embed an upload timestamp, so without a record
            // there is nothing to address.
            (None, _) => None,
        };

        let rows = if record.is_some() {
            self.files.delete_file(&name, folder_id, &owner).await?
        } else {
            0
        };

        let outcome = match (rows > 0, physical) {
            (true, Some(DeleteOutcome::Deleted)) => RemoveOutcome::Removed,
            (true, _) => RemoveOutcome::PhysicalAlreadyGone,
            (false, Some(DeleteOutcome::Deleted)) => RemoveOutcome::RecordAlreadyGone,
            (false, _) => RemoveOutcome::NothingToRemove,
        };

        if outcome == RemoveOutcome::Removed {
            info!(owner = %owner, file = %name, folder_id = ?folder_id, "File removed");
        } else {
            warn!(
                owner = %owner,
                file = %name,
                folder_id = ?folder_id,
                outcome = ?outcome,
                "File removal found stores out of step"
            );
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use hybridfs_core::error::ErrorKind;

    use super::*;
    use crate::file::upload::UploadRequest;
    use crate::testing::Harness;

    fn upload(name: &str, location: Location) -> UploadRequest {
        UploadRequest {
            owner: Harness::owner(),
            folder_id: None,
            file_name: name.to_string(),
            content_type: Some("text/plain".to_string()),
            location,
            data: Bytes::from_static(b"hello"),
        }
    }

    fn remove(name: &str, hint: Option<Location>) -> RemoveRequest {
        RemoveRequest {
            owner: Harness::owner(),
            file_name: name.to_string(),
            folder_id: None,
            location_hint: hint,
        }
    }

    #[tokio::test]
    async fn test_remove_local_file() {
        let h = Harness::new();
        h.upload.upload(upload("a.txt", Location::Local)).await.unwrap();

        let outcome = h.file.remove(remove("a.txt", None)).await.unwrap();
        assert_eq!(outcome, RemoveOutcome::Removed);
        assert!(!h.bridge.contains("a.txt").await);
        assert_eq!(h.store.file_count().await, 0);
    }

    #[tokio::test]
    async fn test_remove_cloud_file_uses_object_key() {
        let h = Harness::new();
        h.upload.upload(upload("a.txt", Location::Cloud)).await.unwrap();
        assert_eq!(h.cloud.keys().await.len(), 1);

        let outcome = h.file.remove(remove("a.txt", None)).await.unwrap();
        assert_eq!(outcome, RemoveOutcome::Removed);
        assert!(h.cloud.keys().await.is_empty());
    }

    #[tokio::test]
    async fn test_remove_tolerates_missing_bytes_and_missing_record() {
        let h = Harness::new();
        h.upload.upload(upload("a.txt", Location::Local)).await.unwrap();
        h.bridge.delete_by_path("a.txt").await.unwrap();

        let outcome = h.file.remove(remove("a.txt", None)).await.unwrap();
        assert_eq!(outcome, RemoveOutcome::PhysicalAlreadyGone);

        let outcome = h
            .file
            .remove(remove("a.txt", Some(Location::Local)))
            .await
            .unwrap();
        assert_eq!(outcome, RemoveOutcome::NothingToRemove);

        h.bridge.seed("stray.txt", b"x").await;
        let outcome = h
            .file
            .remove(remove("stray.txt", Some(Location::Local)))
            .await
            .unwrap();
        assert_eq!(outcome, RemoveOutcome::RecordAlreadyGone);
    }

    #[tokio::test]
    async fn test_offline_bridge_keeps_record() {
        let h = Harness::new();
        h.upload.upload(upload("a.txt", Location::Local)).await.unwrap();
        h.bridge.set_alive(false);

        let err = h.file.remove(remove("a.txt", None)).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::BackendUnavailable);
        assert_eq!(h.store.file_count().await, 1);
    }
}
