//! Capability traits for the two physical backends.
//!
//! The bridge is an operator-run host exposing its local disk over a
//! temporary HTTP tunnel; the object store is an S3-compatible bucket.
//! Both are defined here in `hybridfs-core` and implemented in
//! `hybridfs-storage`. Bridge addresses are `/`-joined relative paths
//! derived from the folder tree.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::result::AppResult;

/// A byte stream type used for proxying file contents.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Result of a liveness probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Liveness {
    /// The bridge answered within the probe timeout.
    Alive,
    /// The bridge is missing, unreachable or too slow.
    Dead,
}

impl Liveness {
    /// Whether the probe succeeded.
    pub fn is_alive(self) -> bool {
        matches!(self, Self::Alive)
    }
}

/// Outcome of a physical delete. Deleting something already gone is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOutcome {
    /// The object existed and was removed.
    Deleted,
    /// Nothing was stored at that address.
    NotFound,
}

/// Size information the bridge reports for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeFileInfo {
    /// Size in bytes on the bridge disk, when the bridge reports one.
    #[serde(default)]
    pub size: Option<u64>,
}

/// One element of a batch info reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchInfoEntry {
    /// The bridge found the file.
    Found {
        /// Requested name.
        name: String,
        /// Size in bytes.
        size: u64,
    },
    /// The bridge could not stat the file.
    Missing {
        /// Requested name.
        name: String,
        /// Bridge-side error text.
        error: String,
    },
}

impl BatchInfoEntry {
    /// The name this entry answers for.
    pub fn name(&self) -> &str {
        match self {
            Self::Found { name, .. } | Self::Missing { name, .. } => name,
        }
    }
}

/// A byte stream opened on the bridge, with the headers worth forwarding.
pub struct BridgeDownload {
    /// `Content-Type` reported by the bridge.
    pub content_type: Option<String>,
    /// `Content-Length` reported by the bridge.
    pub content_length: Option<u64>,
    /// The body.
    pub stream: ByteStream,
}

impl std::fmt::Debug for BridgeDownload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeDownload")
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .finish()
    }
}

/// Pull-based HTTP access to the bridge host.
///
/// Every call carries a timeout; a hung bridge surfaces as
/// [`ErrorKind::BackendUnavailable`](crate::error::ErrorKind::BackendUnavailable).
#[async_trait]
pub trait BridgeBackend: Send + Sync + std::fmt::Debug + 'static {
    /// Whether a bridge URL is configured at all.
    fn is_configured(&self) -> bool;

    /// Bounded liveness probe. Never fails; timeouts read as [`Liveness::Dead`].
    async fn probe(&self) -> Liveness;

    /// Upload bytes to `path` and return the physical path the bridge chose.
    async fn put_file(&self, path: &str, content_type: &str, data: Bytes) -> AppResult<String>;

    /// Delete whatever lives at `path`.
    async fn delete_by_path(&self, path: &str) -> AppResult<DeleteOutcome>;

    /// Stat a single file; `None` when the bridge does not have it.
    async fn get_info(&self, path: &str) -> AppResult<Option<BridgeFileInfo>>;

    /// Stat many files in one round trip.
    async fn batch_info(&self, paths: &[String]) -> AppResult<Vec<BatchInfoEntry>>;

    /// Create a directory (and missing parents) on the bridge disk.
    async fn create_folder(&self, path: &str) -> AppResult<()>;

    /// Public tunnel URL serving the file directly.
    fn download_url(&self, path: &str) -> AppResult<String>;

    /// Open the file for proxy streaming.
    async fn open_download(&self, path: &str) -> AppResult<BridgeDownload>;
}

/// Push-based access to the cloud bucket.
#[async_trait]
pub trait ObjectStore: Send + Sync + std::fmt::Debug + 'static {
    /// Upload an object.
    async fn put_object(&self, key: &str, content_type: &str, data: Bytes) -> AppResult<()>;

    /// Grant anonymous read on the object.
    async fn make_public(&self, key: &str) -> AppResult<()>;

    /// The stable public URL of an object (only readable after [`make_public`](Self::make_public)).
    fn public_url(&self, key: &str) -> String;

    /// Recover the object key from a stored path-or-URL value.
    fn object_key(&self, path_or_url: &str) -> String;

    /// A time-limited signed GET URL.
    async fn signed_read_url(&self, key: &str, expires_in: Duration) -> AppResult<String>;

    /// Delete an object.
    async fn delete_object(&self, key: &str) -> AppResult<DeleteOutcome>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_entry_untagged() {
        let raw = r#"[{"name":"a.txt","size":3},{"name":"b.txt","error":"ENOENT"}]"#;
        let entries: Vec<BatchInfoEntry> = serde_json::from_str(raw).expect("parse");
        assert_eq!(
            entries[0],
            BatchInfoEntry::Found {
                name: "a.txt".into(),
                size: 3
            }
        );
        assert!(matches!(&entries[1], BatchInfoEntry::Missing { error, .. } if error == "ENOENT"));
        assert_eq!(entries[1].name(), "b.txt");
    }
}
