//! File services: upload, explicit removal, download routing.

pub mod download;
pub mod service;
pub mod upload;

pub use download::{DownloadRoute, DownloadRouter};
pub use service::{FileService, RemoveOutcome, RemoveRequest};
pub use upload::{UploadReceipt, UploadRequest, UploadService};
