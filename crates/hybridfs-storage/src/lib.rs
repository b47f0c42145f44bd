//! # hybridfs-storage
//!
//! Concrete physical backends: the reqwest-based bridge client and the
//! aws-sdk-s3 object store. Both implement the capability traits from
//! `hybridfs_core::traits`.

#[cfg(feature = "bridge")]
pub mod bridge;
pub mod cloud;

#[cfg(feature = "bridge")]
pub use bridge::HttpBridgeClient;
pub use cloud::PublicUrlLayout;
#[cfg(feature = "s3")]
pub use cloud::S3ObjectStore;
