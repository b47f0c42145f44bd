//! Converges the tree and metadata stores with bridge-side changes.
//!
//! Events arrive at least once and in no particular order. Every handler is
//! idempotent, and a folder that no longer resolves is treated as a sign the
//! change was already applied, not as a failure.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use hybridfs_core::error::{AppError, ErrorKind};
use hybridfs_core::result::AppResult;
use hybridfs_core::types::{FolderId, Owner};
use hybridfs_database::store::{FileStore, FolderRemoval};
use hybridfs_entity::file::{
    CreateFile, File, FileCategory, Location, UpsertOutcome, extension_of,
};
use hybridfs_entity::folder::{DeleteMode, Folder};

use super::locks::KeyedLocks;
use crate::folder::tree::{TreeService, split_path, validate_name};

/// How an event names a folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FolderRef {
    /// A folder ID.
    Id(FolderId),
    /// A `/`-separated path from the root, or a bare folder name.
    Path(String),
}

impl FolderRef {
    /// Build from the optional `folder_id` and `path` fields of an event.
    /// An ID wins; a blank path means the root.
    pub fn from_parts(folder_id: Option<FolderId>, path: Option<String>) -> Option<Self> {
        match (folder_id, path) {
            (Some(id), _) => Some(Self::Id(id)),
            (None, Some(path)) if !path.trim().is_empty() => Some(Self::Path(path)),
            _ => None,
        }
    }
}

/// A file observed on the bridge.
#[derive(Debug, Clone)]
pub struct SyncAddFile {
    /// Owner of the file.
    pub owner: Owner,
    /// File name.
    pub name: String,
    /// Size on disk.
    pub size: u64,
    /// Category, if the event carries one.
    pub category: Option<FileCategory>,
    /// Extension, if the event carries one.
    pub extension: Option<String>,
    /// Containing folder; `None` is the root.
    pub folder: Option<FolderRef>,
}

/// Result of a file removal event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncRemoveOutcome {
    /// A record was deleted.
    Removed,
    /// No record matched.
    AlreadyAbsent,
    /// The folder did not resolve; the event was ignored.
    FolderGone,
}

/// Result of a folder upsert event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "folder", rename_all = "snake_case")]
pub enum FolderSyncOutcome {
    /// No folder by that name existed; one was created.
    Created(Folder),
    /// An existing folder was moved under the new parent.
    Moved(Folder),
    /// The folder was already in place, or the move was refused.
    Unchanged(Folder),
}

impl FolderSyncOutcome {
    /// The folder as it now stands.
    pub fn folder(&self) -> &Folder {
        match self {
            Self::Created(f) | Self::Moved(f) | Self::Unchanged(f) => f,
        }
    }
}

/// Result of a folder removal event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FolderRemoveOutcome {
    /// The folder row was deleted.
    Removed,
    /// No folder by that name exists under the parent.
    AlreadyAbsent,
    /// The parent did not resolve; the event was ignored.
    ParentGone,
}

/// Applies reconciliation events.
#[derive(Clone)]
pub struct ReconciliationEngine {
    files: Arc<dyn FileStore>,
    tree: Arc<TreeService>,
    locks: KeyedLocks,
}

impl std::fmt::Debug for ReconciliationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconciliationEngine")
            .field("active_locks", &self.locks.active())
            .finish()
    }
}

fn file_lock_key(owner: &Owner, name: &str) -> String {
    format!("file:{owner}:{name}")
}

fn folder_lock_key(owner: &Owner, name: &str) -> String {
    format!("folder:{owner}:{name}")
}

/// Guards find-or-create of one `(parent, name)` slot in the tree.
fn child_lock_key(owner: &Owner, parent_id: Option<FolderId>, name: &str) -> String {
    match parent_id {
        Some(id) => format!("child:{owner}:{id}:{name}"),
        None => format!("child:{owner}:root:{name}"),
    }
}

impl ReconciliationEngine {
    /// Creates a new reconciliation engine.
    pub fn new(files: Arc<dyn FileStore>, tree: Arc<TreeService>) -> Self {
        Self {
            files,
            tree,
            locks: KeyedLocks::new(),
        }
    }

    /// Record a file seen on the bridge. Replays converge on one record.
    ///
    /// A folder that does not resolve places the file at the root.
    pub async fn sync_add_file(&self, event: SyncAddFile) -> AppResult<UpsertOutcome> {
        let SyncAddFile {
            owner,
            name,
            size,
            category,
            extension,
            folder,
        } = event;
        let name = validate_name(&name)?;
        let size = i64::try_from(size)
            .map_err(|_| AppError::validation(format!("File size {size} is out of range")))?;

        let _guard = self.locks.acquire(file_lock_key(&owner, &name)).await;

        let folder_id = match self.resolve_file_folder(folder.as_ref(), &owner).await {
            Ok(id) => id,
            Err(e) if e.kind == ErrorKind::ReconciliationGap => {
                warn!(
                    owner = %owner,
                    file = %name,
                    folder = ?folder,
                    "Folder for synced file not found; recording at root"
                );
                None
            }
            Err(e) => return Err(e),
        };

        let extension = extension
            .map(|e| e.trim().trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| extension_of(&name));
        let category = category.unwrap_or_else(|| FileCategory::from_extension(&extension));
        let path_or_url = self.tree.file_path(folder_id, &name, &owner).await?;

        let outcome = self
            .files
            .upsert_file(&CreateFile {
                original_name: name,
                extension,
                size,
                category,
                location: Location::Local,
                path_or_url,
                folder_id,
                owner: owner.clone(),
            })
            .await?;

        let file: &File = outcome.file();
        info!(
            owner = %owner,
            file_id = %file.id,
            file = %file.original_name,
            folder_id = ?file.folder_id,
            created = outcome.was_created(),
            "Synced file add"
        );
        Ok(outcome)
    }

    /// Forget a file removed on the bridge. Never fails for absence.
    pub async fn sync_remove_file(
        &self,
        owner: &Owner,
        name: &str,
        folder: Option<&FolderRef>,
    ) -> AppResult<SyncRemoveOutcome> {
        let name = validate_name(name)?;
        let _guard = self.locks.acquire(file_lock_key(owner, &name)).await;

        let folder_id = match self.resolve_file_folder(folder, owner).await {
            Ok(id) => id,
            Err(e) if e.kind == ErrorKind::ReconciliationGap => {
                debug!(
                    owner = %owner,
                    file = %name,
                    folder = ?folder,
                    "Folder already gone; ignoring file removal"
                );
                return Ok(SyncRemoveOutcome::FolderGone);
            }
            Err(e) => return Err(e),
        };

        let rows = self.files.delete_file(&name, folder_id, owner).await?;
        let outcome = if rows > 0 {
            SyncRemoveOutcome::Removed
        } else {
            SyncRemoveOutcome::AlreadyAbsent
        };
        info!(
            owner = %owner,
            file = %name,
            folder_id = ?folder_id,
            outcome = ?outcome,
            "Synced file removal"
        );
        Ok(outcome)
    }

    /// Create a folder seen on the bridge, or move the existing folder of
    /// that name under `parent`. Missing ancestors are created.
    pub async fn sync_upsert_folder(
        &self,
        owner: &Owner,
        name: &str,
        parent: Option<&str>,
    ) -> AppResult<FolderSyncOutcome> {
        let name = validate_name(name)?;
        let _guard = self.locks.acquire(folder_lock_key(owner, &name)).await;

        let parent_id = match self.resolve_parent(parent, owner).await {
            Ok(id) => id,
            Err(e) if e.kind == ErrorKind::ReconciliationGap => {
                let components = parent.map(split_path).unwrap_or_default();
                self.ensure_ancestry(&components, owner).await?
            }
            Err(e) => return Err(e),
        };

        let _slot = self
            .locks
            .acquire(child_lock_key(owner, parent_id, &name))
            .await;
        if let Some(existing) = self.tree.find_child(parent_id, &name, owner).await? {
            return Ok(FolderSyncOutcome::Unchanged(existing));
        }

        let same_name = self.tree.find_by_name(&name, owner).await?;
        let Some(existing) = same_name.into_iter().next() else {
            let created = self.tree.create_folder(&name, parent_id, owner).await?;
            return Ok(FolderSyncOutcome::Created(created));
        };

        match self.tree.reparent(existing.id, parent_id, owner).await {
            Ok(moved) => Ok(FolderSyncOutcome::Moved(moved)),
            Err(e) if e.kind == ErrorKind::Validation => {
                warn!(
                    owner = %owner,
                    folder_id = %existing.id,
                    parent_id = ?parent_id,
                    error = %e,
                    "Refusing folder move that would create a cycle"
                );
                Ok(FolderSyncOutcome::Unchanged(existing))
            }
            Err(e) => Err(e),
        }
    }

    /// Forget a folder removed on the bridge, with everything under it.
    ///
    /// Removal events for the descendants usually follow. Their parent no
    /// longer resolves by then, so they are answered as already applied.
    pub async fn sync_remove_folder(
        &self,
        owner: &Owner,
        name: &str,
        parent: Option<&str>,
    ) -> AppResult<FolderRemoveOutcome> {
        let name = validate_name(name)?;
        let _guard = self.locks.acquire(folder_lock_key(owner, &name)).await;

        let parent_id = match self.resolve_parent(parent, owner).await {
            Ok(id) => id,
            Err(e) if e.kind == ErrorKind::ReconciliationGap => {
                debug!(
                    owner = %owner,
                    folder = %name,
                    parent = ?parent,
                    "Parent already gone; ignoring folder removal"
                );
                return Ok(FolderRemoveOutcome::ParentGone);
            }
            Err(e) => return Err(e),
        };

        let Some(folder) = self.tree.find_child(parent_id, &name, owner).await? else {
            return Ok(FolderRemoveOutcome::AlreadyAbsent);
        };

        let removal: FolderRemoval = match self
            .tree
            .delete_folder(folder.id, owner, DeleteMode::Cascade)
            .await
        {
            Ok(removal) => removal,
            // Removed concurrently by another path since the lookup.
            Err(e) if e.kind == ErrorKind::NotFound => {
                return Ok(FolderRemoveOutcome::AlreadyAbsent);
            }
            Err(e) => return Err(e),
        };

        info!(
            owner = %owner,
            folder_id = %folder.id,
            folder = %name,
            folders = removal.folders,
            files = removal.files,
            "Synced folder removal"
        );
        Ok(FolderRemoveOutcome::Removed)
    }

    /// Walk `components` from the root, creating missing folders.
    ///
    /// Each `(parent, name)` step runs under its own lock, so concurrent
    /// events sharing an ancestor agree on a single folder for it. Only one
    /// step lock is held at a time.
    async fn ensure_ancestry(
        &self,
        components: &[String],
        owner: &Owner,
    ) -> AppResult<Option<FolderId>> {
        let mut current: Option<FolderId> = None;
        for component in components {
            let _step = self
                .locks
                .acquire(child_lock_key(owner, current, component))
                .await;
            current = Some(match self.tree.find_child(current, component, owner).await? {
                Some(existing) => existing.id,
                None => {
                    let created = self.tree.create_folder(component, current, owner).await?;
                    debug!(
                        owner = %owner,
                        folder_id = %created.id,
                        folder = %component,
                        "Created missing ancestor"
                    );
                    created.id
                }
            });
        }
        Ok(current)
    }

    /// Folder for a file event. Misses surface as `ReconciliationGap`.
    async fn resolve_file_folder(
        &self,
        folder: Option<&FolderRef>,
        owner: &Owner,
    ) -> AppResult<Option<FolderId>> {
        match folder {
            None => Ok(None),
            Some(FolderRef::Id(id)) => match self.tree.find(*id, owner).await? {
                Some(found) => Ok(Some(found.id)),
                None => Err(AppError::reconciliation_gap(format!("Folder {id} not found"))),
            },
            Some(FolderRef::Path(path)) => self.resolve_parent(Some(path.as_str()), owner).await,
        }
    }

    /// Parent given as a path or a bare name.
    ///
    /// A path is walked from the root. If that fails and the input is a
    /// single name, the oldest folder with that name anywhere is used.
    async fn resolve_parent(
        &self,
        parent: Option<&str>,
        owner: &Owner,
    ) -> AppResult<Option<FolderId>> {
        let components = parent.map(split_path).unwrap_or_default();
        if components.is_empty() {
            return Ok(None);
        }

        match self.tree.resolve_by_components(&components, owner).await {
            Ok(id) => Ok(id),
            Err(e) if e.kind == ErrorKind::NotFound => {
                if let [single] = components.as_slice() {
                    let matches = self.tree.find_by_name(single, owner).await?;
                    if let Some(found) = matches.into_iter().next() {
                        return Ok(Some(found.id));
                    }
                }
                Err(AppError::reconciliation_gap(format!(
                    "Folder path '{}' does not resolve",
                    components.join("/")
                )))
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::file::DownloadRoute;
    use crate::file::upload::UploadRequest;
    use crate::testing::Harness;

    fn add(name: &str, size: u64, folder: Option<FolderRef>) -> SyncAddFile {
        SyncAddFile {
            owner: Harness::owner(),
            name: name.to_string(),
            size,
            category: None,
            extension: None,
            folder,
        }
    }

    #[tokio::test]
    async fn test_sync_add_is_idempotent() {
        let h = Harness::new();
        let owner = Harness::owner();
        let docs = h.tree.create_folder("docs", None, &owner).await.unwrap();

        let first = h
            .sync
            .sync_add_file(add("x.txt", 10, Some(FolderRef::Id(docs.id))))
            .await
            .unwrap();
        assert!(first.was_created());
        let second = h
            .sync
            .sync_add_file(add("x.txt", 10, Some(FolderRef::Path("docs".into()))))
            .await
            .unwrap();
        assert!(!second.was_created());

        assert_eq!(h.store.file_count().await, 1);
        let file = second.file();
        assert_eq!(file.size, 10);
        assert_eq!(file.folder_id, Some(docs.id));
        assert_eq!(file.category, FileCategory::Text);
        assert_eq!(file.location, Location::Local);
        assert_eq!(file.path_or_url, "docs/x.txt");
    }

    #[tokio::test]
    async fn test_sync_add_refreshes_size() {
        let h = Harness::new();
        h.sync.sync_add_file(add("x.bin", 10, None)).await.unwrap();
        let outcome = h.sync.sync_add_file(add("x.bin", 99, None)).await.unwrap();
        assert_eq!(outcome.file().size, 99);
        assert_eq!(h.store.file_count().await, 1);
    }

    #[tokio::test]
    async fn test_sync_add_unresolved_folder_goes_to_root() {
        let h = Harness::new();
        let outcome = h
            .sync
            .sync_add_file(add("x.txt", 1, Some(FolderRef::Path("a/b".into()))))
            .await
            .unwrap();
        assert_eq!(outcome.file().folder_id, None);
    }

    #[tokio::test]
    async fn test_remove_after_folder_cascade_is_tolerated() {
        let h = Harness::new();
        let owner = Harness::owner();
        let docs = h.tree.create_folder("docs", None, &owner).await.unwrap();
        h.sync
            .sync_add_file(add("x.txt", 1, Some(FolderRef::Id(docs.id))))
            .await
            .unwrap();
        let removed = h.sync.sync_remove_folder(&owner, "docs", None).await.unwrap();
        assert_eq!(removed, FolderRemoveOutcome::Removed);
        assert_eq!(h.store.file_count().await, 0);

        let outcome = h
            .sync
            .sync_remove_file(&owner, "x.txt", Some(&FolderRef::Id(docs.id)))
            .await
            .unwrap();
        assert_eq!(outcome, SyncRemoveOutcome::FolderGone);

        let outcome = h
            .sync
            .sync_remove_file(&owner, "x.txt", Some(&FolderRef::Path("docs".into())))
            .await
            .unwrap();
        assert_eq!(outcome, SyncRemoveOutcome::FolderGone);
    }

    #[tokio::test]
    async fn test_remove_file_twice() {
        let h = Harness::new();
        let owner = Harness::owner();
        h.sync.sync_add_file(add("x.txt", 1, None)).await.unwrap();

        let first = h.sync.sync_remove_file(&owner, "x.txt", None).await.unwrap();
        let second = h.sync.sync_remove_file(&owner, "x.txt", None).await.unwrap();
        assert_eq!(first, SyncRemoveOutcome::Removed);
        assert_eq!(second, SyncRemoveOutcome::AlreadyAbsent);
    }

    #[tokio::test]
    async fn test_upsert_folder_creates_missing_ancestry() {
        let h = Harness::new();
        let owner = Harness::owner();
        let outcome = h
            .sync
            .sync_upsert_folder(&owner, "c", Some("a/b"))
            .await
            .unwrap();
        let FolderSyncOutcome::Created(c) = outcome else {
            panic!("expected creation, got {outcome:?}");
        };
        assert_eq!(
            h.tree.resolve_path(Some(c.id), &owner).await.unwrap(),
            vec!["a", "b", "c"]
        );

        let again = h
            .sync
            .sync_upsert_folder(&owner, "c", Some("a/b"))
            .await
            .unwrap();
        assert!(matches!(again, FolderSyncOutcome::Unchanged(_)));
        assert_eq!(h.store.folder_count().await, 3);
    }

    #[tokio::test]
    async fn test_upsert_folder_moves_existing() {
        let h = Harness::new();
        let owner = Harness::owner();
        let photos = h.tree.create_folder("photos", None, &owner).await.unwrap();
        h.tree.create_folder("archive", None, &owner).await.unwrap();

        let outcome = h
            .sync
            .sync_upsert_folder(&owner, "photos", Some("archive"))
            .await
            .unwrap();
        let FolderSyncOutcome::Moved(moved) = outcome else {
            panic!("expected move, got {outcome:?}");
        };
        assert_eq!(moved.id, photos.id);
        assert_eq!(
            h.tree.resolve_path(Some(photos.id), &owner).await.unwrap(),
            vec!["archive", "photos"]
        );
    }

    #[tokio::test]
    async fn test_upsert_folder_refuses_cycle() {
        let h = Harness::new();
        let owner = Harness::owner();
        let a = h.tree.create_folder("a", None, &owner).await.unwrap();
        h.tree.create_folder("b", Some(a.id), &owner).await.unwrap();

        let outcome = h
            .sync
            .sync_upsert_folder(&owner, "a", Some("a/b"))
            .await
            .unwrap();
        let FolderSyncOutcome::Unchanged(unchanged) = outcome else {
            panic!("expected refusal, got {outcome:?}");
        };
        assert_eq!(unchanged.id, a.id);
        assert!(unchanged.is_root());
    }

    #[tokio::test]
    async fn test_recursive_delete_parent_first_converges() {
        let h = Harness::new();
        let owner = Harness::owner();
        h.sync.sync_upsert_folder(&owner, "b", Some("a")).await.unwrap();
        h.sync
            .sync_add_file(add("f.txt", 1, Some(FolderRef::Path("a/b".into()))))
            .await
            .unwrap();
        assert_eq!(h.store.folder_count().await, 2);

        // The watcher reports the top of the removed tree first.
        let a = h.sync.sync_remove_folder(&owner, "a", None).await.unwrap();
        let f = h
            .sync
            .sync_remove_file(&owner, "f.txt", Some(&FolderRef::Path("a/b".into())))
            .await
            .unwrap();
        let b = h.sync.sync_remove_folder(&owner, "b", Some("a")).await.unwrap();
        let again = h.sync.sync_remove_folder(&owner, "a", None).await.unwrap();

        assert_eq!(a, FolderRemoveOutcome::Removed);
        assert_eq!(f, SyncRemoveOutcome::FolderGone);
        assert_eq!(b, FolderRemoveOutcome::ParentGone);
        assert_eq!(again, FolderRemoveOutcome::AlreadyAbsent);
        assert_eq!(h.store.folder_count().await, 0);
        assert_eq!(h.store.file_count().await, 0);

        let stats = h.metadata.stats(&owner).await.unwrap();
        assert_eq!(stats.file_count, 0);
        assert_eq!(stats.total_size, 0);
    }

    #[tokio::test]
    async fn test_sync_add_keeps_cloud_record_addressable() {
        let h = Harness::new();
        let owner = Harness::owner();
        let uploaded = h
            .upload
            .upload(UploadRequest {
                owner: owner.clone(),
                folder_id: None,
                file_name: "x.txt".to_string(),
                content_type: Some("text/plain".to_string()),
                location: Location::Cloud,
                data: Bytes::from_static(b"hello"),
            })
            .await
            .unwrap();
        let cloud_url = uploaded.file.path_or_url.clone();

        let outcome = h.sync.sync_add_file(add("x.txt", 7, None)).await.unwrap();
        assert!(!outcome.was_created());
        assert_eq!(outcome.file().location, Location::Cloud);
        assert_eq!(outcome.file().path_or_url, cloud_url);
        assert_eq!(outcome.file().size, 7);

        let route = h.download.route(&owner, "x.txt", None).await.unwrap();
        let DownloadRoute::Redirect(url) = route else {
            panic!("expected signed redirect, got {route:?}");
        };
        assert!(url.contains("uploads/alice/"), "{url}");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_siblings_share_created_ancestor() {
        let h = Harness::new();
        let owner = Harness::owner();
        let mut handles = Vec::new();
        for i in 0..8 {
            let sync = h.sync.clone();
            let owner = owner.clone();
            handles.push(tokio::spawn(async move {
                sync.sync_upsert_folder(&owner, &format!("c{i}"), Some("a/shared"))
                    .await
            }));
        }
        let mut leaves = Vec::new();
        for handle in handles {
            leaves.push(handle.await.unwrap().unwrap().folder().clone());
        }

        assert_eq!(h.tree.find_by_name("a", &owner).await.unwrap().len(), 1);
        assert_eq!(h.tree.find_by_name("shared", &owner).await.unwrap().len(), 1);
        assert_eq!(h.store.folder_count().await, 10);
        for (i, leaf) in leaves.iter().enumerate() {
            assert_eq!(
                h.tree.resolve_path(Some(leaf.id), &owner).await.unwrap(),
                vec!["a".to_string(), "shared".to_string(), format!("c{i}")]
            );
        }
    }

    #[tokio::test]
    async fn test_parent_by_bare_name_falls_back_to_search() {
        let h = Harness::new();
        let owner = Harness::owner();
        let a = h.tree.create_folder("a", None, &owner).await.unwrap();
        let nested = h.tree.create_folder("nested", Some(a.id), &owner).await.unwrap();

        let outcome = h
            .sync
            .sync_upsert_folder(&owner, "leaf", Some("nested"))
            .await
            .unwrap();
        assert_eq!(outcome.folder().parent_id, Some(nested.id));
    }

    #[tokio::test]
    async fn test_concurrent_adds_for_one_key_converge() {
        let h = Harness::new();
        let mut handles = Vec::new();
        for size in 1..=8u64 {
            let sync = h.sync.clone();
            handles.push(tokio::spawn(async move {
                sync.sync_add_file(add("same.txt", size, None)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(h.store.file_count().await, 1);
    }
}
