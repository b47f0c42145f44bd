//! Folder domain entities.

pub mod content;
pub mod model;

pub use content::FolderContent;
pub use model::{CreateFolder, DeleteMode, Folder};
