//! One page of a folder's direct children.

use serde::{Deserialize, Serialize};

use crate::file::FileListing;
use crate::folder::Folder;

/// Files and sub-folders directly inside a folder (or the owner's root),
/// newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderContent {
    /// Sub-folders on this page.
    pub folders: Vec<Folder>,
    /// Files on this page, with bridge availability.
    pub files: Vec<FileListing>,
    /// Current page number (1-based).
    pub page: u64,
    /// Items per page, applied to folders and files independently.
    pub page_size: u64,
}

impl FolderContent {
    /// An empty page.
    pub fn empty(page: u64, page_size: u64) -> Self {
        Self {
            folders: Vec::new(),
            files: Vec::new(),
            page,
            page_size,
        }
    }
}
