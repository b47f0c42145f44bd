//! S3-compatible object store (AWS, MinIO, GCS interoperability endpoint).

use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use bytes::Bytes;
use tracing::{debug, info};

use hybridfs_core::config::CloudConfig;
use hybridfs_core::error::{AppError, ErrorKind};
use hybridfs_core::result::AppResult;
use hybridfs_core::traits::{DeleteOutcome, ObjectStore};

use super::public::PublicUrlLayout;

/// S3 refuses presigned URLs valid for longer than a week.
pub const MAX_PRESIGN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// [`ObjectStore`] backed by `aws-sdk-s3`.
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
    layout: PublicUrlLayout,
}

impl S3ObjectStore {
    /// Build the SDK client from configuration.
    ///
    /// Static credentials are used when `access_key` is set; otherwise the
    /// ambient AWS credential chain applies. A custom endpoint switches to
    /// path-style addressing.
    pub async fn connect(config: &CloudConfig) -> AppResult<Self> {
        let bucket = config.bucket.trim();
        if bucket.is_empty() {
            return Err(AppError::configuration("storage.cloud.bucket is required"));
        }

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));
        if !config.access_key.is_empty() {
            loader = loader.credentials_provider(Credentials::new(
                config.access_key.clone(),
                config.secret_key.clone(),
                None,
                None,
                "hybridfs-config",
            ));
        }
        let custom_endpoint = !config.endpoint.trim().is_empty();
        if custom_endpoint {
            loader = loader.endpoint_url(config.endpoint.trim());
        }
        let shared = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(custom_endpoint)
            .build();

        info!(
            bucket,
            region = %config.region,
            endpoint = %config.endpoint,
            "S3 object store configured"
        );

        Ok(Self {
            client: Client::from_conf(s3_config),
            bucket: bucket.to_string(),
            layout: PublicUrlLayout::from_config(config),
        })
    }
}

fn sdk_error(what: &str, key: &str, e: impl std::error::Error + Send + Sync + 'static) -> AppError {
    AppError::with_source(ErrorKind::Storage, format!("S3 {what} failed for '{key}'"), e)
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_object(&self, key: &str, content_type: &str, data: Bytes) -> AppResult<()> {
        let size = data.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| sdk_error("put", key, e))?;
        debug!(key, size, "Object uploaded");
        Ok(())
    }

    async fn make_public(&self, key: &str) -> AppResult<()> {
        self.client
            .put_object_acl()
            .bucket(&self.bucket)
            .key(key)
            .acl(ObjectCannedAcl::PublicRead)
            .send()
            .await
            .map_err(|e| sdk_error("acl", key, e))?;
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        self.layout.public_url(key)
    }

    fn object_key(&self, path_or_url: &str) -> String {
        self.layout.object_key(path_or_url)
    }

    async fn signed_read_url(&self, key: &str, expires_in: Duration) -> AppResult<String> {
        let presign = PresigningConfig::expires_in(expires_in.min(MAX_PRESIGN_TTL))
            .map_err(|e| sdk_error("presign config", key, e))?;
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presign)
            .await
            .map_err(|e| sdk_error("presign", key, e))?;
        Ok(request.uri().to_string())
    }

    async fn delete_object(&self, key: &str) -> AppResult<DeleteOutcome> {
        // DeleteObject succeeds on absent keys, so existence is checked first.
        let head = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;
        if let Err(e) = head {
            if e.as_service_error().is_some_and(|s| s.is_not_found()) {
                return Ok(DeleteOutcome::NotFound);
            }
            return Err(sdk_error("head", key, e));
        }

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| sdk_error("delete", key, e))?;
        Ok(DeleteOutcome::Deleted)
    }
}
