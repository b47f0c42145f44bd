//! Upload, remove and download handlers.

use axum::Json;
use axum::body::Body;
use axum::extract::{Multipart, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use serde_json::{Value, json};

use hybridfs_core::error::AppError;
use hybridfs_core::types::FolderId;
use hybridfs_entity::file::Location;
use hybridfs_service::file::{DownloadRoute, RemoveRequest, UploadRequest};

use crate::dto::request::{self, DownloadQuery, RemoveFileRequest, validated};
use crate::error::ApiError;
use crate::state::AppState;

/// POST /upload (multipart: `owner`, `folder_id`, `location`, `file`)
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let mut owner: Option<String> = None;
    let mut folder_id: Option<FolderId> = None;
    let mut location = Location::Local;
    let mut file_name: Option<String> = None;
    let mut content_type: Option<String> = None;
    let mut data: Option<Bytes> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Multipart error: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                file_name = field.file_name().map(String::from);
                content_type = field.content_type().map(String::from);
                data = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| AppError::validation(format!("Read error: {e}")))?,
                );
            }
            "owner" | "uid_user" | "folder_id" | "location" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::validation(format!("Read error: {e}")))?;
                let text = text.trim();
                match name.as_str() {
                    "folder_id" if !text.is_empty() => {
                        folder_id = Some(
                            text.parse()
                                .map_err(|_| AppError::validation("Invalid folder_id"))?,
                        );
                    }
                    "location" if !text.is_empty() => location = text.parse()?,
                    "owner" | "uid_user" => owner = Some(text.to_string()),
                    _ => {}
                }
            }
            _ => {}
        }
    }

    let owner = request::owner(&owner.ok_or_else(|| AppError::validation("owner is required"))?)?;
    let file_name = file_name.ok_or_else(|| AppError::validation("file is required"))?;
    let data = data.ok_or_else(|| AppError::validation("file data is required"))?;

    let receipt = state
        .upload_service
        .upload(UploadRequest {
            owner,
            folder_id,
            file_name,
            content_type,
            location,
            data,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "location": receipt.file.location,
            "requested": receipt.requested,
            "path": receipt.file.path_or_url,
            "data": receipt.file,
        })),
    ))
}

/// DELETE /remove
pub async fn remove_file(
    State(state): State<AppState>,
    Json(req): Json<RemoveFileRequest>,
) -> Result<Json<Value>, ApiError> {
    let req = validated(req)?;
    let outcome = state
        .file_service
        .remove(RemoveRequest {
            owner: request::owner(&req.owner)?,
            file_name: req.file_name,
            folder_id: req.folder_id,
            location_hint: req.location,
        })
        .await?;

    Ok(Json(json!({
        "success": true,
        "outcome": outcome,
        "message": outcome.message(),
    })))
}

/// GET /download
pub async fn download_file(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, ApiError> {
    let query = validated(query)?;
    let owner = request::owner(&query.owner)?;
    let route = state
        .download_router
        .route(&owner, &query.file_name, query.folder_id)
        .await?;

    match route {
        DownloadRoute::Redirect(url) => {
            Ok((StatusCode::FOUND, [(header::LOCATION, url)]).into_response())
        }
        DownloadRoute::Proxy { file, download } => {
            let content_type = download
                .content_type
                .unwrap_or_else(|| "application/octet-stream".to_string());
            let mut builder = Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, content_type)
                .header(
                    header::CONTENT_DISPOSITION,
                    format!(
                        "attachment; filename=\"{}\"",
                        file.original_name.replace('"', "")
                    ),
                );
            if let Some(length) = download.content_length {
                builder = builder.header(header::CONTENT_LENGTH, length);
            }
            let response = builder
                .body(Body::from_stream(download.stream))
                .map_err(|e| AppError::internal(format!("Response build failed: {e}")))?;
            Ok(response)
        }
    }
}
