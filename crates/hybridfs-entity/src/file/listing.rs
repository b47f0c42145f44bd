//! File rows as shown in a folder listing.

use serde::{Deserialize, Serialize};

use super::model::{File, Location};

/// A file record joined with what its backend currently reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileListing {
    /// The stored record.
    #[serde(flatten)]
    pub file: File,
    /// Whether the bytes can be fetched right now. Cloud files are always
    /// available; local files only when the bridge reported them.
    pub available: bool,
    /// Size the bridge reported for the bytes on disk.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_size: Option<u64>,
}

impl FileListing {
    /// Listing entry for a record with no bridge report.
    pub fn unreported(file: File) -> Self {
        let available = file.location == Location::Cloud;
        Self {
            file,
            available,
            disk_size: None,
        }
    }
}
