//! File entity model.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use hybridfs_core::error::AppError;
use hybridfs_core::types::{FileId, FolderId, Owner};

/// Extension recorded for names without one.
const FALLBACK_EXTENSION: &str = "bin";

/// Coarse content classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "file_category", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    /// `image/*`.
    Image,
    /// `video/*`.
    Video,
    /// PDF, word-processor and office formats.
    Document,
    /// `text/*`.
    Text,
    /// Anything else.
    Binary,
}

impl FileCategory {
    /// All categories, in display order.
    pub const ALL: [FileCategory; 5] = [
        Self::Image,
        Self::Video,
        Self::Document,
        Self::Text,
        Self::Binary,
    ];

    /// Classify purely from a declared MIME type.
    pub fn from_content_type(content_type: &str) -> Self {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if mime.starts_with("image/") {
            Self::Image
        } else if mime.starts_with("video/") {
            Self::Video
        } else if is_document_mime(&mime) {
            Self::Document
        } else if mime.starts_with("text/") {
            Self::Text
        } else {
            Self::Binary
        }
    }

    /// Best-effort classification from an extension, for bridge-side files
    /// that arrive without a content type.
    pub fn from_extension(extension: &str) -> Self {
        match extension.to_ascii_lowercase().as_str() {
            "png" | "jpg" | "jpeg" | "gif" | "webp" | "bmp" | "svg" | "heic" => Self::Image,
            "mp4" | "mkv" | "mov" | "avi" | "webm" | "m4v" => Self::Video,
            "pdf" | "doc" | "docx" | "odt" | "rtf" | "xls" | "xlsx" | "ods" | "ppt" | "pptx"
            | "odp" => Self::Document,
            "txt" | "md" | "csv" | "log" | "json" | "xml" | "html" | "css" => Self::Text,
            _ => Self::Binary,
        }
    }

    /// Return the category as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Document => "document",
            Self::Text => "text",
            Self::Binary => "binary",
        }
    }
}

fn is_document_mime(mime: &str) -> bool {
    mime == "application/pdf"
        || mime == "application/msword"
        || mime == "application/rtf"
        || mime.starts_with("application/vnd.openxmlformats-officedocument.")
        || mime.starts_with("application/vnd.ms-")
        || mime.starts_with("application/vnd.oasis.opendocument.")
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileCategory {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            "document" => Ok(Self::Document),
            "text" => Ok(Self::Text),
            "binary" => Ok(Self::Binary),
            other => Err(AppError::validation(format!("unknown category '{other}'"))),
        }
    }
}

/// Which physical backend holds a file's bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "file_location", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Location {
    /// The operator's bridge host.
    Local,
    /// The cloud object store.
    Cloud,
}

impl Location {
    /// Return the location as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Cloud => "cloud",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Location {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "cloud" => Ok(Self::Cloud),
            other => Err(AppError::validation(format!(
                "location must be 'local' or 'cloud', got '{other}'"
            ))),
        }
    }
}

/// A file record. Its bytes live on the backend named by `location`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct File {
    /// Unique file identifier.
    pub id: FileId,
    /// Name as uploaded or observed on the bridge (including extension).
    pub original_name: String,
    /// Lowercase extension without the dot.
    pub extension: String,
    /// Size in bytes.
    pub size: i64,
    /// Content classification.
    pub category: FileCategory,
    /// Backend holding the bytes.
    pub location: Location,
    /// Bridge physical path or cloud URL/key.
    pub path_or_url: String,
    /// Containing folder; `None` means the owner's root.
    pub folder_id: Option<FolderId>,
    /// The file owner.
    pub owner: Owner,
    /// When the file was created.
    pub created_at: DateTime<Utc>,
    /// When the file was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Data required to create (or upsert) a file record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFile {
    /// File name.
    pub original_name: String,
    /// Lowercase extension.
    pub extension: String,
    /// Size in bytes.
    pub size: i64,
    /// Content classification.
    pub category: FileCategory,
    /// Backend holding the bytes.
    pub location: Location,
    /// Bridge physical path or cloud URL/key.
    pub path_or_url: String,
    /// Containing folder; `None` means root.
    pub folder_id: Option<FolderId>,
    /// The file owner.
    pub owner: Owner,
}

/// Result of an idempotent upsert by natural key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "file", rename_all = "snake_case")]
pub enum UpsertOutcome {
    /// No record had this natural key; one was inserted.
    Created(File),
    /// A record existed and was refreshed in place.
    AlreadyExisted(File),
}

impl UpsertOutcome {
    /// The stored record after the upsert.
    pub fn file(&self) -> &File {
        match self {
            Self::Created(f) | Self::AlreadyExisted(f) => f,
        }
    }

    /// Whether a new row was inserted.
    pub fn was_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Lowercase extension of `name`, or `bin` when it has none.
pub fn extension_of(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => ext.to_ascii_lowercase(),
        _ => FALLBACK_EXTENSION.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_content_types() {
        assert_eq!(FileCategory::from_content_type("image/png"), FileCategory::Image);
        assert_eq!(FileCategory::from_content_type("video/mp4"), FileCategory::Video);
        assert_eq!(
            FileCategory::from_content_type("application/pdf"),
            FileCategory::Document
        );
        assert_eq!(
            FileCategory::from_content_type(
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            ),
            FileCategory::Document
        );
        assert_eq!(
            FileCategory::from_content_type("text/plain; charset=utf-8"),
            FileCategory::Text
        );
        assert_eq!(
            FileCategory::from_content_type("application/zip"),
            FileCategory::Binary
        );
        assert_eq!(FileCategory::from_content_type(""), FileCategory::Binary);
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("report.PDF"), "pdf");
        assert_eq!(extension_of("archive.tar.gz"), "gz");
        assert_eq!(extension_of("README"), "bin");
        assert_eq!(extension_of(".bashrc"), "bin");
        assert_eq!(extension_of("trailing."), "bin");
    }

    #[test]
    fn test_location_parse() {
        assert_eq!("LOCAL".parse::<Location>().expect("valid"), Location::Local);
        assert!("disk".parse::<Location>().is_err());
    }
}
