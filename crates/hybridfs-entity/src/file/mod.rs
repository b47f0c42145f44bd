//! File domain entities.

pub mod listing;
pub mod model;
pub mod stats;

pub use listing::FileListing;
pub use model::{CreateFile, File, FileCategory, Location, UpsertOutcome, extension_of};
pub use stats::{CategoryStats, StorageStats};
