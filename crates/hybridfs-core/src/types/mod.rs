//! Core type definitions used across the HybridFS workspace.

pub mod id;
pub mod owner;
pub mod pagination;

pub use id::*;
pub use owner::Owner;
pub use pagination::PageRequest;
