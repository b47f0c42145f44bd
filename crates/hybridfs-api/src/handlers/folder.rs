//! Folder create/delete, content listing and stats handlers.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use serde_json::{Value, json};

use crate::dto::request::{
    self, ContentQuery, CreateFolderRequest, DeleteFolderRequest, OwnerQuery, validated,
};
use crate::error::ApiError;
use crate::extractors::PaginationParams;
use crate::state::AppState;

/// POST /folder/create
pub async fn create_folder(
    State(state): State<AppState>,
    Json(req): Json<CreateFolderRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let req = validated(req)?;
    let owner = request::owner(&req.owner)?;
    let folder = state
        .folder_service
        .create(&req.name, req.parent_id, &owner)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": folder })),
    ))
}

/// DELETE /folder
pub async fn delete_folder(
    State(state): State<AppState>,
    Json(req): Json<DeleteFolderRequest>,
) -> Result<Json<Value>, ApiError> {
    let req = validated(req)?;
    let owner = request::owner(&req.owner)?;
    let removal = state
        .folder_service
        .delete(req.folder_id, &owner, req.mode)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": { "folders": removal.folders, "files": removal.files },
    })))
}

/// GET /content
pub async fn list_content(
    State(state): State<AppState>,
    Query(query): Query<ContentQuery>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Value>, ApiError> {
    let query = validated(query)?;
    let owner = request::owner(&query.owner)?;
    let content = state
        .metadata_service
        .list_content(query.folder_id, &owner, params.into_page_request())
        .await?;

    Ok(Json(json!({ "success": true, "data": content })))
}

/// GET /stats
pub async fn storage_stats(
    State(state): State<AppState>,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<Value>, ApiError> {
    let query = validated(query)?;
    let owner = request::owner(&query.owner)?;
    let stats = state.metadata_service.stats(&owner).await?;
    Ok(Json(json!({ "success": true, "data": stats })))
}
