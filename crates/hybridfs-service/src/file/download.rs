//! Download routing: signed redirect, bridge redirect, or proxied stream.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use hybridfs_core::config::StorageConfig;
use hybridfs_core::error::AppError;
use hybridfs_core::result::AppResult;
use hybridfs_core::traits::{BridgeBackend, BridgeDownload, ObjectStore};
use hybridfs_core::types::{FolderId, Owner};
use hybridfs_database::store::FileStore;
use hybridfs_entity::file::{File, Location};

use crate::folder::tree::{TreeService, validate_name};

/// How a download should be served.
#[derive(Debug)]
pub enum DownloadRoute {
    /// Send the client elsewhere.
    Redirect(String),
    /// Stream the bridge's bytes through this server.
    Proxy {
        /// File record being served.
        file: File,
        /// Open bridge response.
        download: BridgeDownload,
    },
}

/// Decides how each download is served.
///
/// Cloud files get a time-limited signed URL. Local files below the proxy
/// threshold are streamed through; larger ones, or ones whose size the
/// bridge cannot report, are redirected to the bridge.
#[derive(Clone)]
pub struct DownloadRouter {
    files: Arc<dyn FileStore>,
    tree: Arc<TreeService>,
    bridge: Arc<dyn BridgeBackend>,
    cloud: Arc<dyn ObjectStore>,
    proxy_threshold: u64,
    signed_ttl: Duration,
}

impl std::fmt::Debug for DownloadRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadRouter")
            .field("proxy_threshold", &self.proxy_threshold)
            .field("signed_ttl", &self.signed_ttl)
            .finish()
    }
}

impl DownloadRouter {
    /// Creates a new download router.
    pub fn new(
        files: Arc<dyn FileStore>,
        tree: Arc<TreeService>,
        bridge: Arc<dyn BridgeBackend>,
        cloud: Arc<dyn ObjectStore>,
        config: &StorageConfig,
    ) -> Self {
        Self {
            files,
            tree,
            bridge,
            cloud,
            proxy_threshold: config.download.proxy_threshold_bytes,
            signed_ttl: Duration::from_secs(config.cloud.signed_url_ttl_secs),
        }
    }

    /// Route a download of `file_name` in `folder_id`.
    pub async fn route(
        &self,
        owner: &Owner,
        file_name: &str,
        folder_id: Option<FolderId>,
    ) -> AppResult<DownloadRoute> {
        let name = validate_name(file_name)?;
        let file = self
            .files
            .find_by_name_and_folder(&name, folder_id, owner)
            .await?
            .ok_or_else(|| AppError::not_found(format!("File '{name}' not found")))?;

        match file.location {
            Location::Cloud => {
                let key = self.cloud.object_key(&file.path_or_url);
                let url = self.cloud.signed_read_url(&key, self.signed_ttl).await?;
                debug!(owner = %owner, file_id = %file.id, "Redirecting to signed cloud URL");
                Ok(DownloadRoute::Redirect(url))
            }
            Location::Local => self.route_local(owner, file).await,
        }
    }

    async fn route_local(&self, owner: &Owner, file: File) -> AppResult<DownloadRoute> {
        let path = self
            .tree
            .file_path(file.folder_id, &file.original_name, owner)
            .await?;

        let info = match self.bridge.get_info(&path).await {
            Ok(Some(info)) => info,
            Ok(None) => {
                return Err(AppError::not_found(format!(
                    "File '{}' is missing from local storage",
                    file.original_name
                )));
            }
            Err(e) => {
                warn!(path = %path, error = %e, "Bridge info lookup failed");
                return Err(AppError::not_found(format!(
                    "File '{}' is not reachable right now",
                    file.original_name
                )));
            }
        };

        match info.size {
            Some(size) if size < self.proxy_threshold => {
                match self.bridge.open_download(&path).await {
                    Ok(download) => {
                        debug!(path = %path, size, "Proxying bridge download");
                        Ok(DownloadRoute::Proxy { file, download })
                    }
                    Err(e) => {
                        warn!(path = %path, error = %e, "Bridge download failed");
                        Err(AppError::not_found(format!(
                            "File '{}' is not reachable right now",
                            file.original_name
                        )))
                    }
                }
            }
            size => {
                debug!(path = %path, size = ?size, "Redirecting to bridge download");
                Ok(DownloadRoute::Redirect(self.bridge.download_url(&path)?))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use hybridfs_core::error::ErrorKind;

    use super::*;
    use crate::file::upload::UploadRequest;
    use crate::testing::{FAKE_BRIDGE_URL, FAKE_CLOUD_URL, Harness};

    const MIB: u64 = 1024 * 1024;

    async fn upload(h: &Harness, name: &str, location: Location) {
        h.upload
            .upload(UploadRequest {
                owner: Harness::owner(),
                folder_id: None,
                file_name: name.to_string(),
                content_type: Some("application/pdf".to_string()),
                location,
                data: Bytes::from_static(b"%PDF-1.7"),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_cloud_file_redirects_to_signed_url() {
        let h = Harness::new();
        upload(&h, "report.pdf", Location::Cloud).await;

        let route = h
            .download
            .route(&Harness::owner(), "report.pdf", None)
            .await
            .unwrap();
        match route {
            DownloadRoute::Redirect(url) => {
                assert!(url.starts_with(FAKE_CLOUD_URL));
                assert!(url.ends_with("X-Amz-Expires=604800"));
            }
            other => panic!("expected redirect, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_small_local_file_is_proxied() {
        let h = Harness::new();
        upload(&h, "report.pdf", Location::Local).await;
        h.bridge.report_size("report.pdf", Some(50 * MIB - 1)).await;

        let route = h
            .download
            .route(&Harness::owner(), "report.pdf", None)
            .await
            .unwrap();
        assert!(matches!(route, DownloadRoute::Proxy { .. }));
    }

    #[tokio::test]
    async fn test_threshold_and_unknown_size_redirect() {
        let h = Harness::new();
        upload(&h, "report.pdf", Location::Local).await;

        for size in [Some(50 * MIB), Some(50 * MIB + 1), None] {
            h.bridge.report_size("report.pdf", size).await;
            let route = h
                .download
                .route(&Harness::owner(), "report.pdf", None)
                .await
                .unwrap();
            match route {
                DownloadRoute::Redirect(url) => {
                    assert_eq!(
                        url,
                        format!("{FAKE_BRIDGE_URL}/api/bridge/download/report.pdf")
                    );
                }
                other => panic!("expected redirect for {size:?}, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_unreachable_or_missing_local_file_is_not_found() {
        let h = Harness::new();
        upload(&h, "report.pdf", Location::Local).await;

        h.bridge.set_alive(false);
        let err = h
            .download
            .route(&Harness::owner(), "report.pdf", None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);

        h.bridge.set_alive(true);
        h.bridge.delete_by_path("report.pdf").await.unwrap();
        let err = h
            .download
            .route(&Harness::owner(), "report.pdf", None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_unknown_record_is_not_found() {
        let h = Harness::new();
        let err = h
            .download
            .route(&Harness::owner(), "nope.pdf", None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }
}
