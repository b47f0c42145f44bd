//! Physical backend configuration: bridge, cloud object store, download routing.

use serde::{Deserialize, Serialize};

/// Top-level storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Maximum upload size in bytes (default 5 GB).
    #[serde(default = "default_max_upload")]
    pub max_upload_size_bytes: u64,
    /// Maximum number of ancestors walked when reconstructing a folder path.
    #[serde(default = "default_max_tree_depth")]
    pub max_tree_depth: usize,
    /// Bridge host configuration.
    #[serde(default)]
    pub bridge: BridgeConfig,
    /// Cloud object store configuration.
    #[serde(default)]
    pub cloud: CloudConfig,
    /// Download routing configuration.
    #[serde(default)]
    pub download: DownloadConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            max_upload_size_bytes: default_max_upload(),
            max_tree_depth: default_max_tree_depth(),
            bridge: BridgeConfig::default(),
            cloud: CloudConfig::default(),
            download: DownloadConfig::default(),
        }
    }
}

/// Operator-run bridge host reachable through a public tunnel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Tunnel base URL (e.g. `https://abc.trycloudflare.com`). Empty disables the bridge.
    #[serde(default)]
    pub base_url: String,
    /// Liveness probe timeout in milliseconds.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_ms: u64,
    /// Timeout for uploads, deletes and info calls, in seconds.
    #[serde(default = "default_transfer_timeout")]
    pub transfer_timeout_secs: u64,
    /// Send the headers that suppress tunnel interstitial pages.
    #[serde(default = "default_true")]
    pub tunnel_bypass_headers: bool,
}

impl BridgeConfig {
    /// Whether a bridge URL has been configured at all.
    pub fn is_configured(&self) -> bool {
        !self.base_url.trim().is_empty()
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            probe_timeout_ms: default_probe_timeout(),
            transfer_timeout_secs: default_transfer_timeout(),
            tunnel_bypass_headers: true,
        }
    }
}

/// S3-compatible cloud object store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudConfig {
    /// Endpoint URL for non-AWS services (GCS interop, MinIO). Empty uses AWS.
    #[serde(default)]
    pub endpoint: String,
    /// Region.
    #[serde(default = "default_region")]
    pub region: String,
    /// Bucket name.
    #[serde(default)]
    pub bucket: String,
    /// Access key ID. Empty falls back to the ambient credential chain.
    #[serde(default)]
    pub access_key: String,
    /// Secret access key.
    #[serde(default)]
    pub secret_key: String,
    /// Prefix for every object key; keys are `{prefix}/{owner}/{stamp}-{name}`.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Lifetime of signed read URLs in seconds (S3 caps presigning at 7 days).
    #[serde(default = "default_signed_url_ttl")]
    pub signed_url_ttl_secs: u64,
    /// Mark uploaded objects public-read and record their public URL.
    #[serde(default = "default_true")]
    pub make_public: bool,
    /// Base used to build public URLs; defaults to the endpoint.
    #[serde(default)]
    pub public_base_url: String,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            region: default_region(),
            bucket: String::new(),
            access_key: String::new(),
            secret_key: String::new(),
            key_prefix: default_key_prefix(),
            signed_url_ttl_secs: default_signed_url_ttl(),
            make_public: true,
            public_base_url: String::new(),
        }
    }
}

/// Size-aware download routing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Local files strictly below this size are proxied through the service.
    #[serde(default = "default_proxy_threshold")]
    pub proxy_threshold_bytes: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            proxy_threshold_bytes: default_proxy_threshold(),
        }
    }
}

fn default_max_upload() -> u64 {
    5_368_709_120 // 5 GB
}

fn default_max_tree_depth() -> usize {
    64
}

fn default_probe_timeout() -> u64 {
    2_000
}

fn default_transfer_timeout() -> u64 {
    120
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_key_prefix() -> String {
    "uploads".to_string()
}

fn default_signed_url_ttl() -> u64 {
    604_800 // 7 days
}

fn default_proxy_threshold() -> u64 {
    52_428_800 // 50 MiB
}

fn default_true() -> bool {
    true
}
