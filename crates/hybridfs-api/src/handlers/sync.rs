//! Reconciliation endpoints called by the bridge's filesystem watcher.
//!
//! Tolerance cases (already removed, parent gone) answer `200` with
//! `success: true`; only a sync-add that created a record answers `201`.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde_json::{Value, json};

use hybridfs_service::sync::{FolderRef, SyncAddFile};

use crate::dto::request::{
    self, SyncAddRequest, SyncFolderRequest, SyncRemoveRequest, validated,
};
use crate::error::ApiError;
use crate::state::AppState;

/// POST /sync-add
pub async fn sync_add(
    State(state): State<AppState>,
    Json(req): Json<SyncAddRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let req = validated(req)?;
    let outcome = state
        .sync_engine
        .sync_add_file(SyncAddFile {
            owner: request::owner(&req.owner)?,
            name: req.file_name,
            size: req.size,
            category: req.category,
            extension: req.extension,
            folder: FolderRef::from_parts(req.folder_id, req.folder_path),
        })
        .await?;

    let file = outcome.file();
    let (status, message) = if outcome.was_created() {
        (
            StatusCode::CREATED,
            format!("file {} registered successfully", file.original_name),
        )
    } else {
        (StatusCode::OK, "file already registered".to_string())
    };
    Ok((
        status,
        Json(json!({ "success": true, "message": message, "data": file })),
    ))
}

/// POST /sync-remove
pub async fn sync_remove(
    State(state): State<AppState>,
    Json(req): Json<SyncRemoveRequest>,
) -> Result<Json<Value>, ApiError> {
    let req = validated(req)?;
    let owner = request::owner(&req.owner)?;
    let folder = FolderRef::from_parts(req.folder_id, req.folder_path);
    let outcome = state
        .sync_engine
        .sync_remove_file(&owner, &req.file_name, folder.as_ref())
        .await?;

    Ok(Json(json!({ "success": true, "outcome": outcome })))
}

/// POST /sync-folder
pub async fn sync_folder(
    State(state): State<AppState>,
    Json(req): Json<SyncFolderRequest>,
) -> Result<Json<Value>, ApiError> {
    let req = validated(req)?;
    let owner = request::owner(&req.owner)?;
    let outcome = state
        .sync_engine
        .sync_upsert_folder(&owner, &req.name, req.parent.as_deref())
        .await?;

    Ok(Json(json!({ "success": true, "data": outcome })))
}

/// POST /sync-remove-folder
pub async fn sync_remove_folder(
    State(state): State<AppState>,
    Json(req): Json<SyncFolderRequest>,
) -> Result<Json<Value>, ApiError> {
    let req = validated(req)?;
    let owner = request::owner(&req.owner)?;
    let outcome = state
        .sync_engine
        .sync_remove_folder(&owner, &req.name, req.parent.as_deref())
        .await?;

    Ok(Json(json!({ "success": true, "outcome": outcome })))
}
