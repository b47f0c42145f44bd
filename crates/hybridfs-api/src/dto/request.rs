//! Request DTOs with validation.
//!
//! `owner` is accepted under its legacy name `uid_user` as well, and file
//! names under `fileName`, so existing bridge agents keep working.

use serde::{Deserialize, Serialize};
use validator::Validate;

use hybridfs_core::error::AppError;
use hybridfs_core::result::AppResult;
use hybridfs_core::types::{FolderId, Owner};
use hybridfs_entity::file::{FileCategory, Location};
use hybridfs_entity::folder::DeleteMode;

/// Run the derived validator and turn failures into a `Validation` error.
pub fn validated<T: Validate>(request: T) -> AppResult<T> {
    request
        .validate()
        .map_err(|e| AppError::validation(format!("Invalid request: {e}")))?;
    Ok(request)
}

/// Parse the owner field.
pub fn owner(raw: &str) -> AppResult<Owner> {
    Owner::parse(raw)
}

/// `?owner=` query.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OwnerQuery {
    /// Owner identifier.
    #[serde(alias = "uid_user")]
    #[validate(length(min = 1, max = 128))]
    pub owner: String,
}

/// DELETE /remove body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RemoveFileRequest {
    #[serde(alias = "uid_user")]
    #[validate(length(min = 1, max = 128))]
    pub owner: String,
    #[serde(alias = "fileName")]
    #[validate(length(min = 1, max = 255))]
    pub file_name: String,
    #[serde(default)]
    pub folder_id: Option<FolderId>,
    /// Backend to try when no record exists.
    #[serde(default)]
    pub location: Option<Location>,
}

/// GET /download query.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DownloadQuery {
    #[serde(alias = "uid_user")]
    #[validate(length(min = 1, max = 128))]
    pub owner: String,
    #[serde(alias = "fileName")]
    #[validate(length(min = 1, max = 255))]
    pub file_name: String,
    #[serde(default)]
    pub folder_id: Option<FolderId>,
}

/// GET /content query, minus pagination.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ContentQuery {
    #[serde(alias = "uid_user")]
    #[validate(length(min = 1, max = 128))]
    pub owner: String,
    #[serde(default)]
    pub folder_id: Option<FolderId>,
}

/// POST /folder/create body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateFolderRequest {
    #[serde(alias = "uid_user")]
    #[validate(length(min = 1, max = 128))]
    pub owner: String,
    #[serde(alias = "folderName")]
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<FolderId>,
}

/// DELETE /folder body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DeleteFolderRequest {
    #[serde(alias = "uid_user")]
    #[validate(length(min = 1, max = 128))]
    pub owner: String,
    pub folder_id: FolderId,
    #[serde(default)]
    pub mode: DeleteMode,
}

/// POST /sync-add body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SyncAddRequest {
    #[serde(alias = "uid_user")]
    #[validate(length(min = 1, max = 128))]
    pub owner: String,
    #[serde(alias = "fileName")]
    #[validate(length(min = 1, max = 255))]
    pub file_name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub category: Option<FileCategory>,
    #[serde(default)]
    pub extension: Option<String>,
    #[serde(default)]
    pub folder_id: Option<FolderId>,
    /// Folder path relative to the bridge root.
    #[serde(default, alias = "filePath")]
    pub folder_path: Option<String>,
}

/// POST /sync-remove body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SyncRemoveRequest {
    #[serde(alias = "uid_user")]
    #[validate(length(min = 1, max = 128))]
    pub owner: String,
    #[serde(alias = "fileName")]
    #[validate(length(min = 1, max = 255))]
    pub file_name: String,
    #[serde(default)]
    pub folder_id: Option<FolderId>,
    #[serde(default, alias = "filePath")]
    pub folder_path: Option<String>,
}

/// POST /sync-folder and /sync-remove-folder body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SyncFolderRequest {
    #[serde(alias = "uid_user")]
    #[validate(length(min = 1, max = 128))]
    pub owner: String,
    #[serde(alias = "folderName")]
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    /// Parent path from the bridge root, or a bare parent name.
    #[serde(default, alias = "parentPath", alias = "parent_path")]
    pub parent: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_field_names() {
        let req: SyncAddRequest = serde_json::from_value(serde_json::json!({
            "uid_user": "alice",
            "fileName": "a.txt",
            "filePath": "docs/2024",
            "size": 10
        }))
        .unwrap();
        assert_eq!(req.owner, "alice");
        assert_eq!(req.file_name, "a.txt");
        assert_eq!(req.folder_path.as_deref(), Some("docs/2024"));
    }

    #[test]
    fn test_blank_owner_fails_validation() {
        let req = OwnerQuery {
            owner: String::new(),
        };
        assert!(validated(req).is_err());
    }

    #[test]
    fn test_delete_mode_defaults_to_cascade() {
        let req: DeleteFolderRequest = serde_json::from_value(serde_json::json!({
            "owner": "alice",
            "folder_id": "0190d7a4-6f1e-7cc0-9b1a-2f0c3d4e5f60"
        }))
        .unwrap();
        assert_eq!(req.mode, DeleteMode::Cascade);
    }
}
