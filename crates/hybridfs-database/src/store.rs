//! Store traits for the folder forest and file metadata.
//!
//! Two implementations exist: the PostgreSQL repositories in
//! [`crate::repositories`] and [`crate::memory::MemoryStore`] for tests and
//! single-process development. Every method takes the owner explicitly and
//! never returns another owner's rows.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use hybridfs_core::result::AppResult;
use hybridfs_core::types::{FolderId, Owner, PageRequest};
use hybridfs_entity::file::{CreateFile, File, StorageStats, UpsertOutcome};
use hybridfs_entity::folder::{CreateFolder, Folder};

/// Rows removed by a folder deletion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderRemoval {
    /// Folder rows deleted.
    pub folders: u64,
    /// File rows deleted alongside them.
    pub files: u64,
}

/// Persistence for the per-owner folder forest.
#[async_trait]
pub trait FolderStore: Send + Sync + 'static {
    /// Fetch one folder.
    async fn find_folder(&self, id: FolderId, owner: &Owner) -> AppResult<Option<Folder>>;

    /// Oldest child of `parent_id` (or root when `None`) named `name`.
    ///
    /// Sibling names may repeat; the earliest-created one wins so lookups
    /// are deterministic.
    async fn find_child(
        &self,
        parent_id: Option<FolderId>,
        name: &str,
        owner: &Owner,
    ) -> AppResult<Option<Folder>>;

    /// Every folder with this name anywhere in the owner's forest, oldest first.
    async fn find_by_name(&self, name: &str, owner: &Owner) -> AppResult<Vec<Folder>>;

    /// Insert a folder row. Parent existence is the caller's concern.
    async fn insert_folder(&self, data: &CreateFolder) -> AppResult<Folder>;

    /// Re-point a folder at a new parent. `None` when the folder is gone.
    async fn set_parent(
        &self,
        id: FolderId,
        parent_id: Option<FolderId>,
        owner: &Owner,
    ) -> AppResult<Option<Folder>>;

    /// IDs of the direct children of `parent_id`.
    async fn child_ids(&self, parent_id: FolderId, owner: &Owner) -> AppResult<Vec<FolderId>>;

    /// One page of direct children, newest first.
    async fn list_children(
        &self,
        parent_id: Option<FolderId>,
        owner: &Owner,
        page: PageRequest,
    ) -> AppResult<Vec<Folder>>;

    /// Delete the given folder rows atomically. With `include_files`, file
    /// rows whose folder is among `ids` go in the same unit.
    async fn delete_folders(
        &self,
        ids: &[FolderId],
        owner: &Owner,
        include_files: bool,
    ) -> AppResult<FolderRemoval>;
}

/// Persistence for file records keyed by `(original_name, folder_id, owner)`.
#[async_trait]
pub trait FileStore: Send + Sync + 'static {
    /// Look a file up by its natural key.
    async fn find_by_name_and_folder(
        &self,
        name: &str,
        folder_id: Option<FolderId>,
        owner: &Owner,
    ) -> AppResult<Option<File>>;

    /// Insert a new record. Fails with `Conflict` if the natural key is taken.
    async fn create_file(&self, data: &CreateFile) -> AppResult<File>;

    /// Insert, or refresh size, path and timestamp of the existing record.
    async fn upsert_file(&self, data: &CreateFile) -> AppResult<UpsertOutcome>;

    /// Delete by natural key. Zero affected rows is not an error.
    async fn delete_file(
        &self,
        name: &str,
        folder_id: Option<FolderId>,
        owner: &Owner,
    ) -> AppResult<u64>;

    /// One page of files directly in a folder (or root), newest first.
    async fn list_files(
        &self,
        folder_id: Option<FolderId>,
        owner: &Owner,
        page: PageRequest,
    ) -> AppResult<Vec<File>>;

    /// Totals across every file the owner has.
    async fn aggregate_stats(&self, owner: &Owner) -> AppResult<StorageStats>;
}

/// Advisory-lock key for a file natural key.
pub(crate) fn natural_key(name: &str, folder_id: Option<FolderId>, owner: &Owner) -> String {
    match folder_id {
        Some(folder) => format!("file:{owner}:{folder}:{name}"),
        None => format!("file:{owner}:root:{name}"),
    }
}
