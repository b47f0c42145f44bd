//! Upload flow: validate, check for duplicates, place, write, record.
//!
//! Nothing physical happens until validation and the duplicate check pass,
//! and the record is written only after the bytes have landed. The
//! location stored is the one actually used, not the one requested.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use hybridfs_core::config::StorageConfig;
use hybridfs_core::error::{AppError, ErrorKind};
use hybridfs_core::result::AppResult;
use hybridfs_core::traits::{BridgeBackend, ObjectStore};
use hybridfs_core::types::{FolderId, Owner};
use hybridfs_database::store::FileStore;
use hybridfs_entity::file::{CreateFile, File, Location, extension_of};

use crate::folder::tree::{TreeService, validate_name};
use crate::placement::PlacementResolver;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// One file to upload.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// The uploading owner.
    pub owner: Owner,
    /// Target folder; `None` is the root.
    pub folder_id: Option<FolderId>,
    /// Original file name.
    pub file_name: String,
    /// Declared MIME type.
    pub content_type: Option<String>,
    /// Requested backend.
    pub location: Location,
    /// File content.
    pub data: Bytes,
}

/// Outcome of a successful upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadReceipt {
    /// The created record.
    pub file: File,
    /// Backend the caller asked for.
    pub requested: Location,
}

/// Handles single-request uploads to either backend.
#[derive(Clone)]
pub struct UploadService {
    files: Arc<dyn FileStore>,
    tree: Arc<TreeService>,
    placement: Arc<PlacementResolver>,
    bridge: Arc<dyn BridgeBackend>,
    cloud: Arc<dyn ObjectStore>,
    config: StorageConfig,
}

impl std::fmt::Debug for UploadService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadService").finish()
    }
}

/// `{prefix}/{owner}/{millis}-{name}`.
pub fn cloud_object_key(prefix: &str, owner: &Owner, millis: i64, name: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        format!("{owner}/{millis}-{name}")
    } else {
        format!("{prefix}/{owner}/{millis}-{name}")
    }
}

impl UploadService {
    /// Creates a new upload service.
    pub fn new(
        files: Arc<dyn FileStore>,
        tree: Arc<TreeService>,
        placement: Arc<PlacementResolver>,
        bridge: Arc<dyn BridgeBackend>,
        cloud: Arc<dyn ObjectStore>,
        config: StorageConfig,
    ) -> Self {
        Self {
            files,
            tree,
            placement,
            bridge,
            cloud,
            config,
        }
    }

    /// Upload one file and record it.
    pub async fn upload(&self, request: UploadRequest) -> AppResult<UploadReceipt> {
        let UploadRequest {
            owner,
            folder_id,
            file_name,
            content_type,
            location: requested,
            data,
        } = request;

        let name = validate_name(&file_name)?;
        let size = i64::try_from(data.len())
            .ok()
            .filter(|&len| len as u64 <= self.config.max_upload_size_bytes)
            .ok_or_else(|| {
                AppError::validation(format!(
                    "File exceeds maximum upload size of {} bytes",
                    self.config.max_upload_size_bytes
                ))
            })?;
        if let Some(folder) = folder_id {
            if self.tree.find(folder, &owner).await?.is_none() {
                return Err(AppError::not_found(format!("Folder {folder} not found")));
            }
        }

        if self
            .files
            .find_by_name_and_folder(&name, folder_id, &owner)
            .await?
            .is_some()
        {
            return Err(AppError::conflict(format!(
                "A file named '{name}' already exists in this folder"
            )));
        }

        let content_type = content_type
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
        let placement = self.placement.resolve(requested, &content_type).await;

        let (effective, path_or_url) = match placement.effective {
            Location::Local => {
                let path = self.tree.file_path(folder_id, &name, &owner).await?;
                match self.bridge.put_file(&path, &content_type, data.clone()).await {
                    Ok(stored) => (Location::Local, stored),
                    Err(e) if e.kind == ErrorKind::BackendUnavailable => {
                        warn!(
                            owner = %owner,
                            file = %name,
                            error = %e,
                            "Bridge write failed after probe; placing upload in cloud"
                        );
                        (
                            Location::Cloud,
                            self.write_cloud(&owner, &name, &content_type, data).await?,
                        )
                    }
                    Err(e) => return Err(e),
                }
            }
            Location::Cloud => (
                Location::Cloud,
                self.write_cloud(&owner, &name, &content_type, data).await?,
            ),
        };

        let file = self
            .files
            .create_file(&CreateFile {
                extension: extension_of(&name),
                original_name: name,
                size,
                category: placement.category,
                location: effective,
                path_or_url,
                folder_id,
                owner: owner.clone(),
            })
            .await?;

        info!(
            owner = %owner,
            file_id = %file.id,
            file = %file.original_name,
            size = file.size,
            requested = %requested,
            location = %file.location,
            "File uploaded"
        );
        Ok(UploadReceipt { file, requested })
    }

    async fn write_cloud(
        &self,
        owner: &Owner,
        name: &str,
        content_type: &str,
        data: Bytes,
    ) -> AppResult<String> {
        let cloud = &self.config.cloud;
        let key = cloud_object_key(&cloud.key_prefix, owner, Utc::now().timestamp_millis(), name);
        self.cloud.put_object(&key, content_type, data).await?;
        if cloud.make_public {
            self.cloud.make_public(&key).await?;
            Ok(self.cloud.public_url(&key))
        } else {
            Ok(key)
        }
    }
}
