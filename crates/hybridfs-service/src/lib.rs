//! # hybridfs-service
//!
//! Use cases over the tree and metadata stores and the two physical
//! backends. Services take their collaborators as `Arc` trait objects at
//! construction, so the same code runs against PostgreSQL and the real
//! backends in production and against in-memory doubles in tests.

pub mod file;
pub mod folder;
pub mod metadata;
pub mod placement;
pub mod sync;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use file::{DownloadRouter, FileService, UploadService};
pub use folder::{FolderService, TreeService};
pub use metadata::MetadataService;
pub use placement::{Placement, PlacementResolver};
pub use sync::ReconciliationEngine;
