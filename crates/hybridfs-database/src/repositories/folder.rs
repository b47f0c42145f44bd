//! Folder repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use hybridfs_core::error::{AppError, ErrorKind};
use hybridfs_core::result::AppResult;
use hybridfs_core::types::{FolderId, Owner, PageRequest};
use hybridfs_entity::folder::{CreateFolder, Folder};

use crate::store::{FolderRemoval, FolderStore};

/// PostgreSQL-backed [`FolderStore`].
#[derive(Debug, Clone)]
pub struct FolderRepository {
    pool: PgPool,
}

impl FolderRepository {
    /// Create a new folder repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FolderStore for FolderRepository {
    async fn find_folder(&self, id: FolderId, owner: &Owner) -> AppResult<Option<Folder>> {
        sqlx::query_as::<_, Folder>("SELECT * FROM folders WHERE id = $1 AND owner = $2")
            .bind(id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find folder", e))
    }

    async fn find_child(
        &self,
        parent_id: Option<FolderId>,
        name: &str,
        owner: &Owner,
    ) -> AppResult<Option<Folder>> {
        sqlx::query_as::<_, Folder>(
            "SELECT * FROM folders \
             WHERE owner = $1 AND parent_id IS NOT DISTINCT FROM $2 AND name = $3 \
             ORDER BY created_at ASC, id ASC LIMIT 1",
        )
        .bind(owner)
        .bind(parent_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find child folder", e))
    }

    async fn find_by_name(&self, name: &str, owner: &Owner) -> AppResult<Vec<Folder>> {
        sqlx::query_as::<_, Folder>(
            "SELECT * FROM folders WHERE owner = $1 AND name = $2 ORDER BY created_at ASC, id ASC",
        )
        .bind(owner)
        .bind(name)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find folders by name", e)
        })
    }

    async fn insert_folder(&self, data: &CreateFolder) -> AppResult<Folder> {
        sqlx::query_as::<_, Folder>(
            "INSERT INTO folders (id, name, parent_id, owner) VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(FolderId::new())
        .bind(&data.name)
        .bind(data.parent_id)
        .bind(&data.owner)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create folder", e))
    }

    async fn set_parent(
        &self,
        id: FolderId,
        parent_id: Option<FolderId>,
        owner: &Owner,
    ) -> AppResult<Option<Folder>> {
        sqlx::query_as::<_, Folder>(
            "UPDATE folders SET parent_id = $3, updated_at = NOW() \
             WHERE id = $1 AND owner = $2 RETURNING *",
        )
        .bind(id)
        .bind(owner)
        .bind(parent_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to move folder", e))
    }

    async fn child_ids(&self, parent_id: FolderId, owner: &Owner) -> AppResult<Vec<FolderId>> {
        sqlx::query_scalar::<_, FolderId>(
            "SELECT id FROM folders WHERE owner = $1 AND parent_id = $2",
        )
        .bind(owner)
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list child ids", e))
    }

    async fn list_children(
        &self,
        parent_id: Option<FolderId>,
        owner: &Owner,
        page: PageRequest,
    ) -> AppResult<Vec<Folder>> {
        sqlx::query_as::<_, Folder>(
            "SELECT * FROM folders \
             WHERE owner = $1 AND parent_id IS NOT DISTINCT FROM $2 \
             ORDER BY created_at DESC, id DESC LIMIT $3 OFFSET $4",
        )
        .bind(owner)
        .bind(parent_id)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list folders", e))
    }

    async fn delete_folders(
        &self,
        ids: &[FolderId],
        owner: &Owner,
        include_files: bool,
    ) -> AppResult<FolderRemoval> {
        if ids.is_empty() {
            return Ok(FolderRemoval::default());
        }
        let ids: Vec<Uuid> = ids.iter().map(|id| id.into_uuid()).collect();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        let files = if include_files {
            sqlx::query("DELETE FROM files WHERE owner = $1 AND folder_id = ANY($2)")
                .bind(owner)
                .bind(&ids)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to delete folder files", e)
                })?
                .rows_affected()
        } else {
            0
        };

        let folders = sqlx::query("DELETE FROM folders WHERE owner = $1 AND id = ANY($2)")
            .bind(owner)
            .bind(&ids)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete folders", e))?
            .rows_affected();

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit folder deletion", e)
        })?;

        Ok(FolderRemoval { folders, files })
    }
}
