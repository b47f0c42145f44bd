//! Convenience result type alias for HybridFS.

use crate::error::AppError;

/// A specialized `Result` type for HybridFS operations.
pub type AppResult<T> = Result<T, AppError>;
