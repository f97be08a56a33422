//! Host coordination server bridge.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::identifiers::Endpoint;
use crate::protocol::{HostEnvelope, PlayerData, action_code};
use crate::store::PlayerInfo;
use crate::transport::ConnectionState;

use super::core::Hub;
use super::rules::register_host_rules;

// ============================================================================
// HostBridge
// ============================================================================

/// Bridge to the host coordination server.
///
/// Obtained from [`Bridges::host`](super::Bridges::host). All handles share
/// the one host connection.
#[derive(Clone)]
pub struct HostBridge {
    hub: Arc<Hub>,
}

impl fmt::Debug for HostBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostBridge")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl HostBridge {
    pub(super) fn new(hub: Arc<Hub>) -> Self {
        Self { hub }
    }

    /// Connects to the host server at `url`.
    ///
    /// A no-op if the host socket is already open. On the first connect the
    /// host rule table is registered. The outcome is reported to the state
    /// store as the host connection status.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidUrl`](crate::Error::InvalidUrl) if `url` is not a WebSocket URL
    /// - [`Error::Connection`](crate::Error::Connection) if the socket fails to open
    /// - [`Error::ConnectionTimeout`](crate::Error::ConnectionTimeout) if the handshake times out
    pub async fn connect(&self, url: &str) -> Result<()> {
        let hub = Arc::downgrade(&self.hub);
        self.hub
            .connect_link(&self.hub.host, url, |connection| {
                register_host_rules(connection, &hub);
            })
            .await
    }

    /// Sends a prepared envelope.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`](crate::Error::NotConnected) unless the
    /// host socket is open.
    pub fn send(&self, envelope: &HostEnvelope) -> Result<()> {
        self.hub.host.send(envelope)
    }

    /// Builds and sends an envelope from its fields.
    ///
    /// `data` of `None` is sent as `null`.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`](crate::Error::NotConnected) unless the host socket is open
    /// - [`Error::Json`](crate::Error::Json) if `data` cannot be serialized
    pub fn send_message<T: Serialize>(
        &self,
        action_code: i64,
        message_type: i64,
        message: impl Into<String>,
        data: Option<T>,
    ) -> Result<()> {
        let mut envelope = HostEnvelope::new(action_code, message_type).with_message(message);
        if let Some(data) = data {
            envelope = envelope.with_data(data)?;
        }
        self.send(&envelope)
    }

    /// Announces the player to the host and records them in the store.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`](crate::Error::NotConnected) unless the
    /// host socket is open. The store is left untouched on error.
    pub fn join_game(&self, player: PlayerData) -> Result<()> {
        let envelope = HostEnvelope::new(action_code::JOIN_GAME, 0).with_data(&player)?;
        self.send(&envelope)?;

        info!(name = %player.name, "Joined game");
        self.hub.store.set_player_info(PlayerInfo {
            name: Some(player.name),
            gun_mac: player.mac_gun,
            vest_mac: player.mac_vest,
        });
        Ok(())
    }

    /// Closes the host socket and cancels any pending reconnect.
    pub fn disconnect(&self) {
        self.hub.disconnect_link(&self.hub.host);
    }

    /// Returns `true` if the host socket is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.hub.host.is_connected()
    }

    /// Returns the host connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.hub.host.state()
    }

    /// Returns the host reconnect attempt counter.
    #[must_use]
    pub fn reconnect_attempt(&self) -> u32 {
        self.hub
            .host
            .current()
            .map_or(0, |connection| connection.reconnect_attempt())
    }

    /// Returns the endpoint this bridge talks to.
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::Host
    }
}
