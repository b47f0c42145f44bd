//! In-memory folder and file store for tests and single-process runs.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use hybridfs_core::error::AppError;
use hybridfs_core::result::AppResult;
use hybridfs_core::types::{FileId, FolderId, Owner, PageRequest};
use hybridfs_entity::file::{CategoryStats, CreateFile, File, StorageStats, UpsertOutcome};
use hybridfs_entity::folder::{CreateFolder, Folder};

use crate::store::{FileStore, FolderRemoval, FolderStore};

/// Rows kept in insertion order; listings walk them newest first.
#[derive(Debug, Default)]
struct Tables {
    folders: Vec<Folder>,
    files: Vec<File>,
}

/// [`FolderStore`] + [`FileStore`] held behind one Tokio mutex, so every
/// operation is atomic with respect to every other.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully-formed folder row as-is, without any tree checks.
    /// Fixtures use it to build shapes the services would refuse to create.
    pub async fn put_folder(&self, folder: Folder) {
        self.tables.lock().await.folders.push(folder);
    }

    /// Number of file rows across all owners.
    pub async fn file_count(&self) -> usize {
        self.tables.lock().await.files.len()
    }

    /// Number of folder rows across all owners.
    pub async fn folder_count(&self) -> usize {
        self.tables.lock().await.folders.len()
    }
}

fn page_slice<T: Clone>(rows: impl DoubleEndedIterator<Item = T>, page: PageRequest) -> Vec<T> {
    rows.rev()
        .skip(page.offset() as usize)
        .take(page.limit() as usize)
        .collect()
}

fn key_matches(file: &File, name: &str, folder_id: Option<FolderId>, owner: &Owner) -> bool {
    &file.owner == owner && file.folder_id == folder_id && file.original_name == name
}

fn new_file(data: &CreateFile) -> File {
    let now = Utc::now();
    File {
        id: FileId::new(),
        original_name: data.original_name.clone(),
        extension: data.extension.clone(),
        size: data.size,
        category: data.category,
        location: data.location,
        path_or_url: data.path_or_url.clone(),
        folder_id: data.folder_id,
        owner: data.owner.clone(),
        created_at: now,
        updated_at: now,
    }
}

#[async_trait]
impl FolderStore for MemoryStore {
    async fn find_folder(&self, id: FolderId, owner: &Owner) -> AppResult<Option<Folder>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .folders
            .iter()
            .find(|f| f.id == id && &f.owner == owner)
            .cloned())
    }

    async fn find_child(
        &self,
        parent_id: Option<FolderId>,
        name: &str,
        owner: &Owner,
    ) -> AppResult<Option<Folder>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .folders
            .iter()
            .find(|f| &f.owner == owner && f.parent_id == parent_id && f.name == name)
            .cloned())
    }

    async fn find_by_name(&self, name: &str, owner: &Owner) -> AppResult<Vec<Folder>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .folders
            .iter()
            .filter(|f| &f.owner == owner && f.name == name)
            .cloned()
            .collect())
    }

    async fn insert_folder(&self, data: &CreateFolder) -> AppResult<Folder> {
        let now = Utc::now();
        let folder = Folder {
            id: FolderId::new(),
            name: data.name.clone(),
            parent_id: data.parent_id,
            owner: data.owner.clone(),
            created_at: now,
            updated_at: now,
        };
        self.tables.lock().await.folders.push(folder.clone());
        Ok(folder)
    }

    async fn set_parent(
        &self,
        id: FolderId,
        parent_id: Option<FolderId>,
        owner: &Owner,
    ) -> AppResult<Option<Folder>> {
        let mut tables = self.tables.lock().await;
        Ok(tables
            .folders
            .iter_mut()
            .find(|f| f.id == id && &f.owner == owner)
            .map(|f| {
                f.parent_id = parent_id;
                f.updated_at = Utc::now();
                f.clone()
            }))
    }

    async fn child_ids(&self, parent_id: FolderId, owner: &Owner) -> AppResult<Vec<FolderId>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .folders
            .iter()
            .filter(|f| &f.owner == owner && f.parent_id == Some(parent_id))
            .map(|f| f.id)
            .collect())
    }

    async fn list_children(
        &self,
        parent_id: Option<FolderId>,
        owner: &Owner,
        page: PageRequest,
    ) -> AppResult<Vec<Folder>> {
        let tables = self.tables.lock().await;
        let rows = tables
            .folders
            .iter()
            .filter(|f| &f.owner == owner && f.parent_id == parent_id)
            .cloned()
            .collect::<Vec<_>>();
        Ok(page_slice(rows.into_iter(), page))
    }

    async fn delete_folders(
        &self,
        ids: &[FolderId],
        owner: &Owner,
        include_files: bool,
    ) -> AppResult<FolderRemoval> {
        let doomed: HashSet<FolderId> = ids.iter().copied().collect();
        let mut tables = self.tables.lock().await;

        let before = tables.files.len();
        if include_files {
            tables.files.retain(|f| {
                !(&f.owner == owner && f.folder_id.is_some_and(|id| doomed.contains(&id)))
            });
        }
        let files = (before - tables.files.len()) as u64;

        let before = tables.folders.len();
        tables
            .folders
            .retain(|f| !(&f.owner == owner && doomed.contains(&f.id)));
        let folders = (before - tables.folders.len()) as u64;

        Ok(FolderRemoval { folders, files })
    }
}

#[async_trait]
impl FileStore for MemoryStore {
    async fn find_by_name_and_folder(
        &self,
        name: &str,
        folder_id: Option<FolderId>,
        owner: &Owner,
    ) -> AppResult<Option<File>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .files
            .iter()
            .find(|f| key_matches(f, name, folder_id, owner))
            .cloned())
    }

    async fn create_file(&self, data: &CreateFile) -> AppResult<File> {
        let mut tables = self.tables.lock().await;
        if tables
            .files
            .iter()
            .any(|f| key_matches(f, &data.original_name, data.folder_id, &data.owner))
        {
            return Err(AppError::conflict(format!(
                "A file named '{}' already exists in this folder",
                data.original_name
            )));
        }
        let file = new_file(data);
        tables.files.push(file.clone());
        Ok(file)
    }

    async fn upsert_file(&self, data: &CreateFile) -> AppResult<UpsertOutcome> {
        let mut tables = self.tables.lock().await;
        if let Some(existing) = tables
            .files
            .iter_mut()
            .find(|f| key_matches(f, &data.original_name, data.folder_id, &data.owner))
        {
            existing.size = data.size;
            if existing.location == data.location {
                existing.path_or_url = data.path_or_url.clone();
            }
            existing.updated_at = Utc::now();
            return Ok(UpsertOutcome::AlreadyExisted(existing.clone()));
        }
        let file = new_file(data);
        tables.files.push(file.clone());
        Ok(UpsertOutcome::Created(file))
    }

    async fn delete_file(
        &self,
        name: &str,
        folder_id: Option<FolderId>,
        owner: &Owner,
    ) -> AppResult<u64> {
        let mut tables = self.tables.lock().await;
        let before = tables.files.len();
        tables
            .files
            .retain(|f| !key_matches(f, name, folder_id, owner));
        Ok((before - tables.files.len()) as u64)
    }

    async fn list_files(
        &self,
        folder_id: Option<FolderId>,
        owner: &Owner,
        page: PageRequest,
    ) -> AppResult<Vec<File>> {
        let tables = self.tables.lock().await;
        let rows = tables
            .files
            .iter()
            .filter(|f| &f.owner == owner && f.folder_id == folder_id)
            .cloned()
            .collect::<Vec<_>>();
        Ok(page_slice(rows.into_iter(), page))
    }

    async fn aggregate_stats(&self, owner: &Owner) -> AppResult<StorageStats> {
        let tables = self.tables.lock().await;
        Ok(StorageStats::from_rows(
            tables.files.iter().filter(|f| &f.owner == owner).map(|f| {
                (
                    f.category,
                    CategoryStats {
                        count: 1,
                        size: f.size.max(0) as u64,
                    },
                )
            }),
        ))
    }
}
