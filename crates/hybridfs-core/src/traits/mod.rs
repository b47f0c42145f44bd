//! Core traits defined in `hybridfs-core` and implemented by other crates.

pub mod backend;

pub use backend::{
    BatchInfoEntry, BridgeBackend, BridgeDownload, BridgeFileInfo, ByteStream, DeleteOutcome,
    Liveness, ObjectStore,
};
