//! Aggregate storage statistics per owner.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::model::FileCategory;

/// Count and byte total for one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryStats {
    /// Number of files.
    pub count: u64,
    /// Sum of sizes in bytes.
    pub size: u64,
}

/// Owner-wide totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageStats {
    /// Sum of all file sizes in bytes.
    pub total_size: u64,
    /// Number of file records.
    pub file_count: u64,
    /// Breakdown keyed by category name. Every category is present.
    pub by_category: BTreeMap<String, CategoryStats>,
}

impl StorageStats {
    /// Build totals from per-category rows, filling absent categories with zero.
    pub fn from_rows(rows: impl IntoIterator<Item = (FileCategory, CategoryStats)>) -> Self {
        let mut by_category: BTreeMap<String, CategoryStats> = FileCategory::ALL
            .iter()
            .map(|c| (c.as_str().to_string(), CategoryStats::default()))
            .collect();

        let mut stats = Self::default();
        for (category, row) in rows {
            stats.total_size += row.size;
            stats.file_count += row.count;
            let entry = by_category.entry(category.as_str().to_string()).or_default();
            entry.count += row.count;
            entry.size += row.size;
        }
        stats.by_category = by_category;
        stats
    }
}
