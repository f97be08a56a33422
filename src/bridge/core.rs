//! Shared bridge context.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::notify::Notifier;
use crate::protocol::{GunProtocol, HostProtocol, Protocol};
use crate::store::StateStore;
use crate::transport::{Connection, ConnectionConfig, ConnectionState};

use super::builder::BridgesBuilder;
use super::gun::GunBridge;
use super::host::HostBridge;

// ============================================================================
// Bridges
// ============================================================================

/// Owner of both endpoint bridges and their collaborators.
///
/// Create one per process and hand clones to whoever needs a bridge.
/// Cloning is cheap and every clone shares the same two connections.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use lasertag_bridge::{Bridges, MemoryStore};
/// use lasertag_bridge::transport::{gun_url, host_url};
///
/// # async fn example() -> lasertag_bridge::Result<()> {
/// let bridges = Bridges::builder()
///     .store(Arc::new(MemoryStore::new()))
///     .build()?;
///
/// bridges.host().connect(&host_url("192.168.4.2")).await?;
/// bridges.gun().connect(&gun_url("192.168.4.1")).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Bridges {
    pub(super) hub: Arc<Hub>,
}

impl Bridges {
    /// Creates a builder.
    #[inline]
    #[must_use]
    pub fn builder() -> BridgesBuilder {
        BridgesBuilder::new()
    }

    /// Creates bridges with default connection settings.
    #[must_use]
    pub fn new(store: Arc<dyn StateStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self::with_configs(
            store,
            notifier,
            ConnectionConfig::default(),
            ConnectionConfig::default(),
        )
    }

    pub(super) fn with_configs(
        store: Arc<dyn StateStore>,
        notifier: Arc<dyn Notifier>,
        host_config: ConnectionConfig,
        gun_config: ConnectionConfig,
    ) -> Self {
        Self {
            hub: Arc::new(Hub {
                host: Link::new(host_config),
                gun: Link::new(gun_config),
                store,
                notifier,
            }),
        }
    }

    /// Returns the host bridge.
    #[inline]
    #[must_use]
    pub fn host(&self) -> HostBridge {
        HostBridge::new(Arc::clone(&self.hub))
    }

    /// Returns the gun bridge.
    #[inline]
    #[must_use]
    pub fn gun(&self) -> GunBridge {
        GunBridge::new(Arc::clone(&self.hub))
    }
}

impl fmt::Debug for Bridges {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridges")
            .field("host", &self.hub.host.state())
            .field("gun", &self.hub.gun.state())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Hub
// ============================================================================

/// State shared by both bridges and the translation rules.
pub(crate) struct Hub {
    pub(crate) host: Link<HostProtocol>,
    pub(crate) gun: Link<GunProtocol>,
    pub(crate) store: Arc<dyn StateStore>,
    pub(crate) notifier: Arc<dyn Notifier>,
}

impl Hub {
    /// Connects `link` to `url`, reporting the outcome to the store.
    ///
    /// The outcome is not reported if the connection was replaced or torn
    /// down while dialing; the store then reflects the newer connection.
    pub(crate) async fn connect_link<P: Protocol>(
        &self,
        link: &Link<P>,
        url: &str,
        register: impl FnOnce(&Connection<P>),
    ) -> Result<()> {
        let Some(connection) = link.prepare(url, register)? else {
            return Ok(());
        };

        let result = connection.connect().await;
        if !link.is_current(&connection) {
            debug!(endpoint = %P::ENDPOINT, url, "Connection superseded while dialing, status not reported");
            return result;
        }

        self.store.set_connection_status(P::ENDPOINT, result.is_ok());
        result
    }

    /// Tears down `link`, reporting to the store if a connection existed.
    pub(crate) fn disconnect_link<P: Protocol>(&self, link: &Link<P>) {
        if link.disconnect() {
            self.store.set_connection_status(P::ENDPOINT, false);
        }
    }
}

// ============================================================================
// Link
// ============================================================================

/// Slot holding the single connection for one endpoint.
pub(crate) struct Link<P: Protocol> {
    config: ConnectionConfig,
    connection: Mutex<Option<Connection<P>>>,
}

impl<P: Protocol> Link<P> {
    fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            connection: Mutex::new(None),
        }
    }

    /// Returns the connection to dial for `url`, or `None` if one is live.
    ///
    /// A connection for another URL that is not live is replaced, and
    /// `register` runs on the new one before it is published.
    fn prepare(
        &self,
        url: &str,
        register: impl FnOnce(&Connection<P>),
    ) -> Result<Option<Connection<P>>> {
        let mut slot = self.connection.lock();

        if let Some(existing) = slot.as_ref() {
            if existing.is_connected() {
                if existing.url() == url {
                    debug!(endpoint = %P::ENDPOINT, "Already connected");
                } else {
                    warn!(
                        endpoint = %P::ENDPOINT,
                        current = existing.url(),
                        requested = url,
                        "Already connected to another URL, ignoring"
                    );
                }
                return Ok(None);
            }

            if existing.url() == url {
                return Ok(Some(existing.clone()));
            }

            existing.disconnect();
        }

        let connection = Connection::new(url, self.config)?;
        register(&connection);
        *slot = Some(connection.clone());

        info!(endpoint = %P::ENDPOINT, url, "Bridge connection created");
        Ok(Some(connection))
    }

    /// Sends on the current connection.
    pub(crate) fn send(&self, message: &P::Message) -> Result<()> {
        let connection = self.current().ok_or_else(|| Error::not_connected(P::ENDPOINT))?;
        connection.send(message)
    }

    /// Disconnects and drops the current connection.
    ///
    /// Returns `true` if there was one.
    fn disconnect(&self) -> bool {
        let Some(connection) = self.connection.lock().take() else {
            return false;
        };
        connection.disconnect();
        true
    }

    /// Returns `true` if `connection` still occupies the slot.
    fn is_current(&self, connection: &Connection<P>) -> bool {
        self.connection
            .lock()
            .as_ref()
            .is_some_and(|current| current.same_connection(connection))
    }

    /// Returns a handle to the current connection.
    pub(crate) fn current(&self) -> Option<Connection<P>> {
        self.connection.lock().clone()
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.current().is_some_and(|c| c.is_connected())
    }

    pub(crate) fn state(&self) -> ConnectionState {
        self.current()
            .map_or(ConnectionState::Disconnected, |c| c.state())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use serde_json::{Map, Value, json};

    use crate::error::Error;
    use crate::identifiers::Endpoint;
    use crate::protocol::{GunMessage, PlayerData};
    use crate::transport::ConnectionState;
    use std::time::Duration;

    use crate::transport::testing::{closed_port_url, stalled_url};

    use super::super::fixture::{Fixture, fast_config};

    #[tokio::test]
    async fn test_connect_reports_status() {
        let fixture = Fixture::connected().await;

        assert!(fixture.store.is_connected(Endpoint::Host));
        assert!(fixture.store.is_connected(Endpoint::Gun));
        assert!(fixture.host().is_connected());
        assert_eq!(fixture.gun().state(), ConnectionState::Connected);

        fixture.shutdown();
    }

    #[tokio::test]
    async fn test_connect_failure_reports_false_and_surfaces_error() {
        let fixture = Fixture::new().await;
        let url = closed_port_url().await;

        let err = fixture.gun().connect(&url).await.unwrap_err();
        assert!(err.is_connection_error());
        assert!(!fixture.store.is_connected(Endpoint::Gun));
        assert_eq!(fixture.gun().state(), ConnectionState::Disconnected);

        // A different URL replaces the failed connection
        fixture
            .gun()
            .connect(&fixture.gun_server.url())
            .await
            .expect("gun connect");
        assert!(fixture.store.is_connected(Endpoint::Gun));

        fixture.shutdown();
    }

    #[tokio::test]
    async fn test_superseded_connect_does_not_overwrite_status() {
        let fixture =
            Fixture::with_gun_config(fast_config().with_open_timeout(Duration::from_millis(300)))
                .await;
        let gun = fixture.gun();
        let stalled = stalled_url().await;
        let live = fixture.gun_server.url();

        let (first, second) = tokio::join!(gun.connect(&stalled), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            gun.connect(&live).await
        });

        assert!(matches!(first, Err(Error::ConnectionTimeout { timeout_ms: 300 })));
        second.expect("replacement connect");
        assert!(fixture.store.is_connected(Endpoint::Gun));
        assert!(gun.is_connected());

        fixture.shutdown();
    }

    #[tokio::test]
    async fn test_gun_status_before_connect() {
        let fixture = Fixture::new().await;
        let gun = fixture.gun();

        assert_eq!(gun.endpoint(), Endpoint::Gun);
        assert_eq!(gun.state(), ConnectionState::Disconnected);
        assert!(!gun.is_connected());
        assert_eq!(gun.reconnect_attempt(), 0);
    }

    #[tokio::test]
    async fn test_failed_reconnect_then_manual_connect_reports_false() {
        let fixture = Fixture::connected().await;
        let host = fixture.host();

        fixture.host_server.set_reject(true);
        fixture.host_server.close_peer();
        crate::transport::testing::eventually(|| {
            host.state() == ConnectionState::Disconnected
        })
        .await;
        assert_eq!(host.reconnect_attempt(), 5);

        let err = host.connect(&fixture.host_server.url()).await.unwrap_err();
        assert!(err.is_connection_error());
        assert!(!fixture.store.is_connected(Endpoint::Host));

        fixture.shutdown();
    }

    #[tokio::test]
    async fn test_second_connect_is_noop() {
        let fixture = Fixture::connected().await;

        fixture
            .host()
            .connect(&fixture.host_server.url())
            .await
            .expect("same url");
        fixture
            .host()
            .connect(&closed_port_url().await)
            .await
            .expect("other url ignored while connected");

        assert_eq!(fixture.host_server.accepted(), 1);
        assert!(fixture.host().is_connected());

        fixture.shutdown();
    }

    #[tokio::test]
    async fn test_disconnect_reports_false() {
        let fixture = Fixture::connected().await;

        fixture.host().disconnect();

        assert!(!fixture.store.is_connected(Endpoint::Host));
        assert!(fixture.store.is_connected(Endpoint::Gun));
        assert_eq!(fixture.host().state(), ConnectionState::Disconnected);
        assert!(matches!(
            fixture.host().send_message(200, 0, "", None::<()>),
            Err(Error::NotConnected { endpoint: Endpoint::Host })
        ));

        fixture.shutdown();
    }

    #[tokio::test]
    async fn test_send_before_connect_fails() {
        let fixture = Fixture::new().await;

        let err = fixture
            .gun()
            .send_message(&GunMessage::start_battle(crate::protocol::BattleConfig {
                damage: 1,
                heal: 1,
                health: 1,
            }))
            .unwrap_err();
        assert!(matches!(err, Error::NotConnected { endpoint: Endpoint::Gun }));
    }

    #[tokio::test]
    async fn test_host_send_message() {
        let mut fixture = Fixture::connected().await;

        fixture
            .host()
            .send_message(7, 1, "ready", Some(json!({ "Slot": 3 })))
            .expect("send");
        fixture
            .host()
            .send_message(8, 0, "", None::<()>)
            .expect("send");

        let first: Value = serde_json::from_str(&fixture.host_server.next_received().await).unwrap();
        assert_eq!(
            first,
            json!({ "ActionCode": 7, "MessageType": 1, "Message": "ready", "Data": { "Slot": 3 } })
        );
        let second: Value = serde_json::from_str(&fixture.host_server.next_received().await).unwrap();
        assert_eq!(
            second,
            json!({ "ActionCode": 8, "MessageType": 0, "Message": "", "Data": null })
        );

        fixture.shutdown();
    }

    #[tokio::test]
    async fn test_join_game_sends_and_records_player() {
        let mut fixture = Fixture::connected().await;

        fixture
            .host()
            .join_game(PlayerData::new("Ana", "AA:01", "AA:02"))
            .expect("join");

        let sent: Value = serde_json::from_str(&fixture.host_server.next_received().await).unwrap();
        assert_eq!(
            sent,
            json!({
                "ActionCode": 0,
                "MessageType": 0,
                "Message": "",
                "Data": { "Name": "Ana", "MacGun": "AA:01", "MacVest": "AA:02" }
            })
        );

        let state = fixture.store.snapshot();
        assert_eq!(state.name, "Ana");
        assert_eq!(state.gun_mac, "AA:01");
        assert_eq!(state.vest_mac, "AA:02");

        fixture.shutdown();
    }

    #[tokio::test]
    async fn test_gun_send_unknown_message() {
        let mut fixture = Fixture::connected().await;

        let mut fields = Map::new();
        fields.insert("level".into(), json!(3));
        fixture
            .gun()
            .send_message(&GunMessage::Unknown {
                key: "set_volume".into(),
                fields,
            })
            .expect("send");

        let sent: Value = serde_json::from_str(&fixture.gun_server.next_received().await).unwrap();
        assert_eq!(sent, json!({ "key": "set_volume", "level": 3 }));

        fixture.shutdown();
    }
}
