//! Both bridges wired to in-process endpoints.

use std::sync::Arc;
use std::time::Duration;

use crate::store::MemoryStore;
use crate::transport::ConnectionConfig;
use crate::transport::testing::{RecordingNotifier, TestServer};

use super::{Bridges, GunBridge, HostBridge};

pub(super) fn fast_config() -> ConnectionConfig {
    ConnectionConfig::new()
        .with_reconnect_delay(Duration::from_millis(20))
        .with_open_timeout(Duration::from_secs(2))
}

pub(super) struct Fixture {
    pub(super) bridges: Bridges,
    pub(super) store: Arc<MemoryStore>,
    pub(super) notifier: Arc<RecordingNotifier>,
    pub(super) host_server: TestServer,
    pub(super) gun_server: TestServer,
}

impl Fixture {
    /// Builds the bridges without connecting.
    pub(super) async fn new() -> Self {
        Self::with_gun_config(fast_config()).await
    }

    /// Builds the bridges with a custom gun connection config.
    pub(super) async fn with_gun_config(gun_config: ConnectionConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::default());

        let bridges = Bridges::builder()
            .store(store.clone())
            .notifier(notifier.clone())
            .host_config(fast_config())
            .gun_config(gun_config)
            .build()
            .expect("build");

        Self {
            bridges,
            store,
            notifier,
            host_server: TestServer::start().await,
            gun_server: TestServer::start().await,
        }
    }

    /// Builds the bridges and connects both.
    pub(super) async fn connected() -> Self {
        let fixture = Self::new().await;
        fixture
            .host()
            .connect(&fixture.host_server.url())
            .await
            .expect("host connect");
        fixture
            .gun()
            .connect(&fixture.gun_server.url())
            .await
            .expect("gun connect");
        fixture.host_server.wait_for_peer().await;
        fixture.gun_server.wait_for_peer().await;
        fixture
    }

    pub(super) fn host(&self) -> HostBridge {
        self.bridges.host()
    }

    pub(super) fn gun(&self) -> GunBridge {
        self.bridges.gun()
    }

    pub(super) fn shutdown(&self) {
        self.host().disconnect();
        self.gun().disconnect();
    }
}
