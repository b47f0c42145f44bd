//! Mapping between object keys and their public URLs.

use hybridfs_core::config::CloudConfig;

/// Where publicly readable objects are served from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicUrlLayout {
    base: String,
}

impl PublicUrlLayout {
    /// Derive the public base from configuration.
    ///
    /// Precedence: explicit `public_base_url`, then path-style under a custom
    /// endpoint, then virtual-hosted AWS style.
    pub fn from_config(config: &CloudConfig) -> Self {
        let explicit = config.public_base_url.trim().trim_end_matches('/');
        let endpoint = config.endpoint.trim().trim_end_matches('/');
        let bucket = config.bucket.trim();

        let base = if !explicit.is_empty() {
            explicit.to_string()
        } else if !endpoint.is_empty() {
            format!("{endpoint}/{bucket}")
        } else {
            format!("https://{bucket}.s3.{}.amazonaws.com", config.region)
        };
        Self { base }
    }

    /// Public URL for `key`.
    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base, key.trim_start_matches('/'))
    }

    /// Object key from a stored value, which is either a public URL under
    /// this layout or already a bare key.
    pub fn object_key(&self, path_or_url: &str) -> String {
        let stripped = path_or_url
            .strip_prefix(self.base.as_str())
            .and_then(|rest| rest.strip_prefix('/'));
        match stripped {
            Some(key) => key.to_string(),
            None => path_or_url.trim_start_matches('/').to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(endpoint: &str, public: &str) -> CloudConfig {
        CloudConfig {
            endpoint: endpoint.to_string(),
            bucket: "media".to_string(),
            public_base_url: public.to_string(),
            ..CloudConfig::default()
        }
    }

    #[test]
    fn test_gcs_interop_layout() {
        let layout = PublicUrlLayout::from_config(&config("https://storage.googleapis.com", ""));
        let url = layout.public_url("uploads/alice/1700000000000-a.png");
        assert_eq!(
            url,
            "https://storage.googleapis.com/media/uploads/alice/1700000000000-a.png"
        );
        assert_eq!(layout.object_key(&url), "uploads/alice/1700000000000-a.png");
    }

    #[test]
    fn test_aws_layout_and_bare_keys() {
        let layout = PublicUrlLayout::from_config(&config("", ""));
        assert_eq!(
            layout.public_url("k"),
            "https://media.s3.us-east-1.amazonaws.com/k"
        );
        assert_eq!(layout.object_key("uploads/bob/1-x.bin"), "uploads/bob/1-x.bin");
    }

    #[test]
    fn test_explicit_public_base_wins() {
        let layout =
            PublicUrlLayout::from_config(&config("http://minio:9000", "https://cdn.example.com/"));
        assert_eq!(layout.public_url("/k"), "https://cdn.example.com/k");
    }
}
