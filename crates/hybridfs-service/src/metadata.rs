//! Folder listings enriched with bridge availability, and storage totals.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use hybridfs_core::result::AppResult;
use hybridfs_core::traits::{BatchInfoEntry, BridgeBackend};
use hybridfs_core::types::{FolderId, Owner, PageRequest};
use hybridfs_database::store::{FileStore, FolderStore};
use hybridfs_entity::file::{FileListing, Location, StorageStats};
use hybridfs_entity::folder::FolderContent;

use crate::folder::tree::{TreeService, join_path};

/// Read-side queries over the metadata store.
#[derive(Clone)]
pub struct MetadataService {
    files: Arc<dyn FileStore>,
    folders: Arc<dyn FolderStore>,
    tree: Arc<TreeService>,
    bridge: Arc<dyn BridgeBackend>,
}

impl std::fmt::Debug for MetadataService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataService").finish()
    }
}

impl MetadataService {
    /// Creates a new metadata service.
    pub fn new(
        files: Arc<dyn FileStore>,
        folders: Arc<dyn FolderStore>,
        tree: Arc<TreeService>,
        bridge: Arc<dyn BridgeBackend>,
    ) -> Self {
        Self {
            files,
            folders,
            tree,
            bridge,
        }
    }

    /// One page of a folder's direct subfolders and files, newest first.
    ///
    /// Local files are checked against the bridge in one batch call. If that
    /// call fails, local files are listed as unavailable instead of failing
    /// the request.
    pub async fn list_content(
        &self,
        folder_id: Option<FolderId>,
        owner: &Owner,
        page: PageRequest,
    ) -> AppResult<FolderContent> {
        let folders = self.folders.list_children(folder_id, owner, page).await?;
        let files = self.files.list_files(folder_id, owner, page).await?;

        let mut content = FolderContent::empty(page.page, page.page_size);
        content.folders = folders;

        if !files.iter().any(|f| f.location == Location::Local) {
            content.files = files.into_iter().map(FileListing::unreported).collect();
            return Ok(content);
        }

        let base = self.tree.resolve_path(folder_id, owner).await?;
        let path_of = |name: &str| {
            let mut components = base.clone();
            components.push(name.to_string());
            join_path(&components)
        };
        let local_paths: Vec<String> = files
            .iter()
            .filter(|f| f.location == Location::Local)
            .map(|f| path_of(&f.original_name))
            .collect();

        let reported = match self.bridge.batch_info(&local_paths).await {
            Ok(entries) => Some(
                entries
                    .into_iter()
                    .map(|entry| match entry {
                        BatchInfoEntry::Found { name, size } => (name, Some(size)),
                        BatchInfoEntry::Missing { name, .. } => (name, None),
                    })
                    .collect::<HashMap<_, _>>(),
            ),
            Err(e) => {
                warn!(
                    owner = %owner,
                    folder_id = ?folder_id,
                    error = %e,
                    "Bridge batch info failed; listing local files as unavailable"
                );
                None
            }
        };

        content.files = files
            .into_iter()
            .map(|file| {
                if file.location == Location::Cloud {
                    return FileListing::unreported(file);
                }
                let disk_size = reported
                    .as_ref()
                    .and_then(|r| r.get(&path_of(&file.original_name)).copied())
                    .flatten();
                FileListing {
                    file,
                    available: disk_size.is_some(),
                    disk_size,
                }
            })
            .collect();

        debug!(
            owner = %owner,
            folder_id = ?folder_id,
            folders = content.folders.len(),
            files = content.files.len(),
            "Folder content listed"
        );
        Ok(content)
    }

    /// Totals across every file the owner has.
    pub async fn stats(&self, owner: &Owner) -> AppResult<StorageStats> {
        self.files.aggregate_stats(owner).await
    }
}
