//! Local-versus-cloud placement for new uploads.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use hybridfs_core::traits::BridgeBackend;
use hybridfs_entity::file::{FileCategory, Location};

/// Where a new file will actually be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    /// Backend the caller asked for.
    pub requested: Location,
    /// Backend that will be used.
    pub effective: Location,
    /// Category derived from the declared content type.
    pub category: FileCategory,
}

impl Placement {
    /// Whether the request was downgraded from local to cloud.
    pub fn downgraded(&self) -> bool {
        self.requested != self.effective
    }
}

/// Chooses the backend for an upload, probing the bridge when local is asked for.
#[derive(Clone)]
pub struct PlacementResolver {
    bridge: Arc<dyn BridgeBackend>,
}

impl std::fmt::Debug for PlacementResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlacementResolver").finish()
    }
}

impl PlacementResolver {
    /// Creates a new placement resolver.
    pub fn new(bridge: Arc<dyn BridgeBackend>) -> Self {
        Self { bridge }
    }

    /// Resolve the effective location. A dead or unconfigured bridge
    /// silently downgrades `local` to `cloud`; `cloud` never probes.
    pub async fn resolve(&self, requested: Location, content_type: &str) -> Placement {
        let category = FileCategory::from_content_type(content_type);

        let effective = match requested {
            Location::Cloud => Location::Cloud,
            Location::Local => {
                if self.bridge.probe().await.is_alive() {
                    Location::Local
                } else {
                    warn!("Bridge unreachable; placing upload in cloud");
                    Location::Cloud
                }
            }
        };

        debug!(
            requested = %requested,
            effective = %effective,
            category = %category,
            "Placement resolved"
        );
        Placement {
            requested,
            effective,
            category,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBridge;

    #[tokio::test]
    async fn test_local_with_live_bridge_stays_local() {
        let resolver = PlacementResolver::new(Arc::new(FakeBridge::new()));
        let placement = resolver.resolve(Location::Local, "image/png").await;
        assert_eq!(placement.effective, Location::Local);
        assert_eq!(placement.category, FileCategory::Image);
        assert!(!placement.downgraded());
    }

    #[tokio::test]
    async fn test_dead_bridge_downgrades_to_cloud() {
        let bridge = FakeBridge::new();
        bridge.set_alive(false);
        let resolver = PlacementResolver::new(Arc::new(bridge));

        let placement = resolver.resolve(Location::Local, "application/pdf").await;
        assert_eq!(placement.effective, Location::Cloud);
        assert_eq!(placement.category, FileCategory::Document);
        assert!(placement.downgraded());
    }

    #[tokio::test]
    async fn test_cloud_is_never_downgraded() {
        let bridge = FakeBridge::new();
        bridge.set_alive(false);
        let resolver = PlacementResolver::new(Arc::new(bridge));
        let placement = resolver.resolve(Location::Cloud, "text/plain").await;
        assert_eq!(placement.effective, Location::Cloud);
        assert_eq!(placement.category, FileCategory::Text);
    }
}
