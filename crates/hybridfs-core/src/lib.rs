//! # hybridfs-core
//!
//! Core crate for HybridFS. Contains configuration schemas, typed
//! identifiers, the owner type, pagination, the physical backend
//! capability traits and the unified error system.
//!
//! This crate has **no** internal dependencies on other HybridFS crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
