//! Folder entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use hybridfs_core::types::{FolderId, Owner};

/// A node in an owner's folder forest.
///
/// The full path is never stored; it is rebuilt by walking `parent_id`
/// links. Sibling names are not required to be unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Folder {
    /// Unique folder identifier.
    pub id: FolderId,
    /// Folder name (one path component).
    pub name: String,
    /// Parent folder ID (null for root folders).
    pub parent_id: Option<FolderId>,
    /// The folder owner.
    pub owner: Owner,
    /// When the folder was created.
    pub created_at: DateTime<Utc>,
    /// When the folder was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Folder {
    /// Check if this is a root folder (no parent).
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Data required to create a new folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFolder {
    /// Folder name.
    pub name: String,
    /// Parent folder (None for root).
    pub parent_id: Option<FolderId>,
    /// The folder owner.
    pub owner: Owner,
}

/// What to do with the subtree when a folder row is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeleteMode {
    /// Remove every descendant folder and the files they contain.
    #[default]
    Cascade,
    /// Remove only the row; descendants stay until their own removal arrives.
    Orphan,
}
