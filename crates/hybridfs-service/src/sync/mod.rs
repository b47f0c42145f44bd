//! Reconciliation of bridge-side changes.

pub mod engine;
pub mod locks;

pub use engine::{
    FolderRef, FolderRemoveOutcome, FolderSyncOutcome, ReconciliationEngine, SyncAddFile,
    SyncRemoveOutcome,
};
pub use locks::KeyedLocks;
