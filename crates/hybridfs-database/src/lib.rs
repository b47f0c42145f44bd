//! # hybridfs-database
//!
//! PostgreSQL connection management, the [`FolderStore`] and [`FileStore`]
//! traits, their sqlx repositories and an in-memory implementation.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use memory::MemoryStore;
pub use store::{FileStore, FolderRemoval, FolderStore};
