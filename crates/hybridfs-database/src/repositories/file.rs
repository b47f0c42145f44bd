//! File repository implementation.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;

use hybridfs_core::error::{AppError, ErrorKind};
use hybridfs_core::result::AppResult;
use hybridfs_core::types::{FileId, FolderId, Owner, PageRequest};
use hybridfs_entity::file::{
    CategoryStats, CreateFile, File, FileCategory, StorageStats, UpsertOutcome,
};

use crate::store::{FileStore, natural_key};

/// PostgreSQL-backed [`FileStore`].
///
/// The natural key has no unique index, so writes that depend on it take a
/// transaction-scoped advisory lock on the key before checking.
#[derive(Debug, Clone)]
pub struct FileRepository {
    pool: PgPool,
}

impl FileRepository {
    /// Create a new file repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn begin_locked(&self, data: &CreateFile) -> AppResult<Transaction<'static, Postgres>> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        let key = natural_key(&data.original_name, data.folder_id, &data.owner);
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(&key)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to lock file key", e)
            })?;

        Ok(tx)
    }

    async fn find_locked(
        tx: &mut Transaction<'static, Postgres>,
        data: &CreateFile,
    ) -> AppResult<Option<File>> {
        sqlx::query_as::<_, File>(
            "SELECT * FROM files \
             WHERE owner = $1 AND folder_id IS NOT DISTINCT FROM $2 AND original_name = $3 \
             ORDER BY created_at ASC LIMIT 1",
        )
        .bind(&data.owner)
        .bind(data.folder_id)
        .bind(&data.original_name)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find file", e))
    }

    async fn insert(
        tx: &mut Transaction<'static, Postgres>,
        data: &CreateFile,
    ) -> AppResult<File> {
        sqlx::query_as::<_, File>(
            "INSERT INTO files \
             (id, original_name, extension, size, category, location, path_or_url, folder_id, owner) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING *",
        )
        .bind(FileId::new())
        .bind(&data.original_name)
        .bind(&data.extension)
        .bind(data.size)
        .bind(data.category)
        .bind(data.location)
        .bind(&data.path_or_url)
        .bind(data.folder_id)
        .bind(&data.owner)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create file", e))
    }

    async fn commit(tx: Transaction<'static, Postgres>) -> AppResult<()> {
        tx.commit()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to commit", e))
    }
}

#[async_trait]
impl FileStore for FileRepository {
    async fn find_by_name_and_folder(
        &self,
        name: &str,
        folder_id: Option<FolderId>,
        owner: &Owner,
    ) -> AppResult<Option<File>> {
        sqlx::query_as::<_, File>(
            "SELECT * FROM files \
             WHERE owner = $1 AND folder_id IS NOT DISTINCT FROM $2 AND original_name = $3 \
             ORDER BY created_at ASC LIMIT 1",
        )
        .bind(owner)
        .bind(folder_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find file", e))
    }

    async fn create_file(&self, data: &CreateFile) -> AppResult<File> {
        let mut tx = self.begin_locked(data).await?;

        if Self::find_locked(&mut tx, data).await?.is_some() {
            return Err(AppError::conflict(format!(
                "A file named '{}' already exists in this folder",
                data.original_name
            )));
        }

        let file = Self::insert(&mut tx, data).await?;
        Self::commit(tx).await?;
        Ok(file)
    }

    async fn upsert_file(&self, data: &CreateFile) -> AppResult<UpsertOutcome> {
        let mut tx = self.begin_locked(data).await?;

        let outcome = match Self::find_locked(&mut tx, data).await? {
            Some(existing) => {
                // A path from another backend would point the record at the
                // wrong object, so only same-location paths are refreshed.
                let updated = sqlx::query_as::<_, File>(
                    "UPDATE files SET size = $2, \
                     path_or_url = CASE WHEN location = $4 THEN $3 ELSE path_or_url END, \
                     updated_at = NOW() \
                     WHERE id = $1 RETURNING *",
                )
                .bind(existing.id)
                .bind(data.size)
                .bind(&data.path_or_url)
                .bind(data.location)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to refresh file", e)
                })?;
                UpsertOutcome::AlreadyExisted(updated)
            }
            None => UpsertOutcome::Created(Self::insert(&mut tx, data).await?),
        };

        Self::commit(tx).await?;
        debug!(
            file = %data.original_name,
            created = outcome.was_created(),
            "File upserted"
        );
        Ok(outcome)
    }

    async fn delete_file(
        &self,
        name: &str,
        folder_id: Option<FolderId>,
        owner: &Owner,
    ) -> AppResult<u64> {
        sqlx::query(
            "DELETE FROM files \
             WHERE owner = $1 AND folder_id IS NOT DISTINCT FROM $2 AND original_name = $3",
        )
        .bind(owner)
        .bind(folder_id)
        .bind(name)
        .execute(&self.pool)
        .await
        .map(|r| r.rows_affected())
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete file", e))
    }

    async fn list_files(
        &self,
        folder_id: Option<FolderId>,
        owner: &Owner,
        page: PageRequest,
    ) -> AppResult<Vec<File>> {
        sqlx::query_as::<_, File>(
            "SELECT * FROM files \
             WHERE owner = $1 AND folder_id IS NOT DISTINCT FROM $2 \
             ORDER BY created_at DESC, id DESC LIMIT $3 OFFSET $4",
        )
        .bind(owner)
        .bind(folder_id)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list files", e))
    }

    async fn aggregate_stats(&self, owner: &Owner) -> AppResult<StorageStats> {
        let rows = sqlx::query_as::<_, (FileCategory, i64, i64)>(
            "SELECT category, COUNT(*)::BIGINT, COALESCE(SUM(size), 0)::BIGINT \
             FROM files WHERE owner = $1 GROUP BY category",
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to aggregate stats", e))?;

        Ok(StorageStats::from_rows(rows.into_iter().map(
            |(category, count, size)| {
                (
                    category,
                    CategoryStats {
                        count: count.max(0) as u64,
                        size: size.max(0) as u64,
                    },
                )
            },
        )))
    }
}
