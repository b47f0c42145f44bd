//! PostgreSQL implementations of the folder and file stores.

pub mod file;
pub mod folder;

pub use file::FileRepository;
pub use folder::FolderRepository;
