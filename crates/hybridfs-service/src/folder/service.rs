//! Explicit folder operations.

use std::sync::Arc;

use tracing::{debug, warn};

use hybridfs_core::result::AppResult;
use hybridfs_core::traits::BridgeBackend;
use hybridfs_core::types::{FolderId, Owner};
use hybridfs_database::store::FolderRemoval;
use hybridfs_entity::folder::{DeleteMode, Folder};

use super::tree::{TreeService, join_path};

/// Folder create/delete for API callers.
///
/// Creating a folder also asks the bridge to mirror it. That request runs
/// detached and its failure is only logged; the database row is the result.
#[derive(Clone)]
pub struct FolderService {
    tree: Arc<TreeService>,
    bridge: Arc<dyn BridgeBackend>,
}

impl std::fmt::Debug for FolderService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FolderService").finish()
    }
}

impl FolderService {
    /// Creates a new folder service.
    pub fn new(tree: Arc<TreeService>, bridge: Arc<dyn BridgeBackend>) -> Self {
        Self { tree, bridge }
    }

    /// Create a folder, then mirror it on the bridge in the background.
    pub async fn create(
        &self,
        name: &str,
        parent_id: Option<FolderId>,
        owner: &Owner,
    ) -> AppResult<Folder> {
        let folder = self.tree.create_folder(name, parent_id, owner).await?;

        if self.bridge.is_configured() {
            let path = join_path(&self.tree.resolve_path(Some(folder.id), owner).await?);
            let bridge = Arc::clone(&self.bridge);
            tokio::spawn(async move {
                match bridge.create_folder(&path).await {
                    Ok(()) => debug!(path = %path, "Bridge folder created"),
                    Err(e) => warn!(path = %path, error = %e, "Bridge folder create failed"),
                }
            });
        }

        Ok(folder)
    }

    /// Delete a folder with the given mode.
    pub async fn delete(
        &self,
        folder_id: FolderId,
        owner: &Owner,
        mode: DeleteMode,
    ) -> AppResult<FolderRemoval> {
        self.tree.delete_folder(folder_id, owner, mode).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Harness;

    async fn wait_for_mkdir(h: &Harness, expected: usize) -> Vec<String> {
        for _ in 0..100 {
            let created = h.bridge.created_folders().await;
            if created.len() >= expected {
                return created;
            }
            tokio::task::yield_now().await;
        }
        h.bridge.created_folders().await
    }

    #[tokio::test]
    async fn test_create_mirrors_full_path_on_bridge() {
        let h = Harness::new();
        let owner = Harness::owner();
        let docs = h.folder.create("docs", None, &owner).await.unwrap();
        h.folder.create("2024", Some(docs.id), &owner).await.unwrap();

        let created = wait_for_mkdir(&h, 2).await;
        assert!(created.contains(&"docs".to_string()));
        assert!(created.contains(&"docs/2024".to_string()));
    }

    #[tokio::test]
    async fn test_create_succeeds_with_bridge_down() {
        let h = Harness::new();
        h.bridge.set_alive(false);
        let folder = h.folder.create("docs", None, &Harness::owner()).await.unwrap();
        assert_eq!(folder.name, "docs");
        assert_eq!(h.store.folder_count().await, 1);
    }

    #[tokio::test]
    async fn test_delete_cascades_by_default() {
        let h = Harness::new();
        let owner = Harness::owner();
        let docs = h.folder.create("docs", None, &owner).await.unwrap();
        h.folder.create("inner", Some(docs.id), &owner).await.unwrap();

        let removal = h
            .folder
            .delete(docs.id, &owner, DeleteMode::default())
            .await
            .unwrap();
        assert_eq!(removal.folders, 2);
        assert_eq!(h.store.folder_count().await, 0);
    }
}
