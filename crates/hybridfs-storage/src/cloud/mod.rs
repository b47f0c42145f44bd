//! Cloud object storage.

pub mod public;
#[cfg(feature = "s3")]
pub mod s3;

pub use public::PublicUrlLayout;
#[cfg(feature = "s3")]
pub use s3::{MAX_PRESIGN_TTL, S3ObjectStore};
