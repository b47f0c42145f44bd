//! Opaque owner identity.
//!
//! Every folder and file belongs to exactly one owner. The value comes from
//! an external identity provider and is never interpreted here; it is
//! threaded explicitly through every store and reconciliation call.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Maximum accepted length of an owner identifier.
const MAX_OWNER_LEN: usize = 128;

/// An opaque, non-empty owner identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type), sqlx(transparent))]
pub struct Owner(String);

impl Owner {
    /// Validate and wrap an owner identifier.
    pub fn parse(raw: impl Into<String>) -> Result<Self, AppError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AppError::validation("owner is required"));
        }
        if trimmed.len() > MAX_OWNER_LEN {
            return Err(AppError::validation(format!(
                "owner exceeds {MAX_OWNER_LEN} characters"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Borrow the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Owner {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Owner> for String {
    fn from(owner: Owner) -> String {
        owner.0
    }
}

impl AsRef<str> for Owner {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims() {
        let owner = Owner::parse("  uid-42 ").expect("valid");
        assert_eq!(owner.as_str(), "uid-42");
    }

    #[test]
    fn test_parse_rejects_blank() {
        assert!(Owner::parse("   ").is_err());
        assert!(Owner::parse("x".repeat(MAX_OWNER_LEN + 1)).is_err());
    }

    #[test]
    fn test_deserialize_validates() {
        assert!(serde_json::from_str::<Owner>("\"\"").is_err());
        let owner: Owner = serde_json::from_str("\"abc\"").expect("valid");
        assert_eq!(owner.to_string(), "abc");
    }
}
