//! HTTP client for the operator-run bridge host.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};
use url::Url;

use hybridfs_core::config::BridgeConfig;
use hybridfs_core::error::{AppError, ErrorKind};
use hybridfs_core::result::AppResult;
use hybridfs_core::traits::{
    BatchInfoEntry, BridgeBackend, BridgeDownload, BridgeFileInfo, DeleteOutcome, Liveness,
};

/// Tunnels (localtunnel, ngrok, cloudflared) serve an HTML interstitial to
/// anything that does not look like a browser or carry these headers.
const TUNNEL_BYPASS_HEADERS: [(&str, &str); 2] = [
    ("bypass-tunnel-reminder", "true"),
    ("cf-skip-browser-warning", "true"),
];
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) hybridfs-bridge-client";

/// Legacy configurations point at the upload endpoint itself.
const UPLOAD_SUFFIX: &str = "/upload-bridge";

#[derive(Debug, Deserialize)]
struct UploadReply {
    #[serde(default)]
    path: Option<String>,
}

/// [`BridgeBackend`] over reqwest.
#[derive(Debug, Clone)]
pub struct HttpBridgeClient {
    http: Client,
    base_url: Option<Url>,
    probe_timeout: Duration,
    transfer_timeout: Duration,
}

impl HttpBridgeClient {
    /// Build a client from configuration. An empty `base_url` yields a
    /// client whose probe always reports [`Liveness::Dead`].
    pub fn new(config: &BridgeConfig) -> AppResult<Self> {
        let base_url = if config.is_configured() {
            let trimmed = config.base_url.trim().trim_end_matches('/');
            let trimmed = trimmed.strip_suffix(UPLOAD_SUFFIX).unwrap_or(trimmed);
            let url = Url::parse(trimmed).map_err(|e| {
                AppError::with_source(
                    ErrorKind::Configuration,
                    format!("Invalid bridge base_url '{trimmed}'"),
                    e,
                )
            })?;
            if url.cannot_be_a_base() {
                return Err(AppError::configuration(format!(
                    "Bridge base_url '{trimmed}' cannot carry a path"
                )));
            }
            Some(url)
        } else {
            None
        };

        let mut headers = HeaderMap::new();
        if config.tunnel_bypass_headers {
            for (name, value) in TUNNEL_BYPASS_HEADERS {
                headers.insert(name, HeaderValue::from_static(value));
            }
            headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        }

        let http = Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_millis(config.probe_timeout_ms.max(1)))
            .build()
            .map_err(|e| {
                AppError::with_source(ErrorKind::Configuration, "Failed to build bridge client", e)
            })?;

        if let Some(url) = &base_url {
            info!(base_url = %url, "Bridge client configured");
        } else {
            warn!("No bridge base_url configured; local placement will always fall back to cloud");
        }

        Ok(Self {
            http,
            base_url,
            probe_timeout: Duration::from_millis(config.probe_timeout_ms),
            transfer_timeout: Duration::from_secs(config.transfer_timeout_secs),
        })
    }

    /// `{base}/{fixed...}/{path components...}`, each component percent-encoded.
    fn endpoint(&self, fixed: &[&str], path: Option<&str>) -> AppResult<Url> {
        let mut url = self
            .base_url
            .clone()
            .ok_or_else(|| AppError::backend_unavailable("Bridge is not configured"))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| AppError::configuration("Bridge base_url cannot carry a path"))?;
            segments.pop_if_empty();
            segments.extend(fixed);
            if let Some(path) = path {
                segments.extend(path.split('/').filter(|c| !c.is_empty()));
            }
        }
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> AppResult<Response> {
        request.send().await.map_err(|e| {
            AppError::with_source(
                ErrorKind::BackendUnavailable,
                format!("Bridge {what} request failed"),
                e,
            )
        })
    }

    async fn reject(response: Response, what: &str) -> AppError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        AppError::backend_unavailable(format!("Bridge {what} returned {status}: {body}"))
    }

    async fn decode<T: serde::de::DeserializeOwned>(response: Response, what: &str) -> AppResult<T> {
        response.json::<T>().await.map_err(|e| {
            AppError::with_source(
                ErrorKind::BackendUnavailable,
                format!("Bridge {what} reply was not valid JSON"),
                e,
            )
        })
    }
}

#[async_trait]
impl BridgeBackend for HttpBridgeClient {
    fn is_configured(&self) -> bool {
        self.base_url.is_some()
    }

    async fn probe(&self) -> Liveness {
        let url = match self.endpoint(&["ping"], None) {
            Ok(url) => url,
            Err(_) => return Liveness::Dead,
        };
        match self.http.get(url).timeout(self.probe_timeout).send().await {
            Ok(response) if response.status().is_success() => Liveness::Alive,
            Ok(response) => {
                debug!(status = %response.status(), "Bridge probe answered with failure");
                Liveness::Dead
            }
            Err(e) => {
                debug!(error = %e, "Bridge probe failed");
                Liveness::Dead
            }
        }
    }

    async fn put_file(&self, path: &str, content_type: &str, data: Bytes) -> AppResult<String> {
        let url = self.endpoint(&["upload-bridge"], None)?;
        let file_name = path.rsplit('/').next().unwrap_or(path).to_string();
        let size = data.len();

        let part = Part::bytes(data.to_vec())
            .file_name(file_name)
            .mime_str(content_type)
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Validation,
                    format!("Invalid content type '{content_type}'"),
                    e,
                )
            })?;
        let form = Form::new().text("path", path.to_string()).part("file", part);

        let request = self
            .http
            .post(url)
            .timeout(self.transfer_timeout)
            .multipart(form);
        let response = self.send(request, "upload").await?;
        if !response.status().is_success() {
            return Err(Self::reject(response, "upload").await);
        }

        let reply: UploadReply = Self::decode(response, "upload").await?;
        let stored = reply.path.unwrap_or_else(|| path.to_string());
        debug!(path = %stored, size, "Bridge stored file");
        Ok(stored)
    }

    async fn delete_by_path(&self, path: &str) -> AppResult<DeleteOutcome> {
        let url = self.endpoint(&["sync-delete"], None)?;
        let request = self
            .http
            .delete(url)
            .timeout(self.transfer_timeout)
            .json(&json!({ "path": path }));
        let response = self.send(request, "delete").await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(DeleteOutcome::NotFound),
            s if s.is_success() => Ok(DeleteOutcome::Deleted),
            _ => Err(Self::reject(response, "delete").await),
        }
    }

    async fn get_info(&self, path: &str) -> AppResult<Option<BridgeFileInfo>> {
        let url = self.endpoint(&["api", "bridge", "info"], Some(path))?;
        let request = self.http.get(url).timeout(self.transfer_timeout);
        let response = self.send(request, "info").await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => Ok(Some(Self::decode(response, "info").await?)),
            _ => Err(Self::reject(response, "info").await),
        }
    }

    async fn batch_info(&self, paths: &[String]) -> AppResult<Vec<BatchInfoEntry>> {
        if paths.is_empty() {
            return Ok(Vec::new());
        }
        let url = self.endpoint(&["api", "bridge", "batch-info"], None)?;
        let request = self
            .http
            .post(url)
            .timeout(self.transfer_timeout)
            .json(&json!({ "files": paths }));
        let response = self.send(request, "batch-info").await?;
        if !response.status().is_success() {
            return Err(Self::reject(response, "batch-info").await);
        }
        Self::decode(response, "batch-info").await
    }

    async fn create_folder(&self, path: &str) -> AppResult<()> {
        let url = self.endpoint(&["api", "bridge", "folder"], None)?;
        let request = self
            .http
            .post(url)
            .timeout(self.transfer_timeout)
            .json(&json!({ "path": path }));
        let response = self.send(request, "mkdir").await?;
        if !response.status().is_success() {
            return Err(Self::reject(response, "mkdir").await);
        }
        Ok(())
    }

    fn download_url(&self, path: &str) -> AppResult<String> {
        self.endpoint(&["api", "bridge", "download"], Some(path))
            .map(String::from)
    }

    async fn open_download(&self, path: &str) -> AppResult<BridgeDownload> {
        let url = self.endpoint(&["api", "bridge", "download"], Some(path))?;
        // No overall timeout: the body is streamed to the caller.
        let response = self.send(self.http.get(url), "download").await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(AppError::not_found(format!(
                "'{path}' is not on the bridge"
            ))),
            s if s.is_success() => {
                let content_type = response
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                let content_length = response.content_length();
                let stream = response.bytes_stream().map_err(std::io::Error::other);
                Ok(BridgeDownload {
                    content_type,
                    content_length,
                    stream: Box::pin(stream),
                })
            }
            _ => Err(Self::reject(response, "download").await),
        }
    }
}
