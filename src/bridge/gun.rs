//! Gun peripheral bridge.

use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::identifiers::Endpoint;
use crate::protocol::GunMessage;
use crate::transport::ConnectionState;

use super::core::Hub;
use super::rules::register_gun_rules;

// ============================================================================
// GunBridge
// ============================================================================

/// Bridge to the gun peripheral.
///
/// Obtained from [`Bridges::gun`](super::Bridges::gun). Hex passthrough
/// frames from the gun are relayed to the host automatically.
#[derive(Clone)]
pub struct GunBridge {
    hub: Arc<Hub>,
}

impl fmt::Debug for GunBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GunBridge")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl GunBridge {
    pub(super) fn new(hub: Arc<Hub>) -> Self {
        Self { hub }
    }

    /// Connects to the gun at `url`.
    ///
    /// Same contract as [`HostBridge::connect`](super::HostBridge::connect).
    pub async fn connect(&self, url: &str) -> Result<()> {
        let hub = Arc::downgrade(&self.hub);
        self.hub
            .connect_link(&self.hub.gun, url, |connection| {
                register_gun_rules(connection, &hub);
            })
            .await
    }

    /// Sends a message of any kind, including unrecognized ones.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`](crate::Error::NotConnected) unless the
    /// gun socket is open.
    pub fn send_message(&self, message: &GunMessage) -> Result<()> {
        self.hub.gun.send(message)
    }

    /// Closes the gun socket and cancels any pending reconnect.
    pub fn disconnect(&self) {
        self.hub.disconnect_link(&self.hub.gun);
    }

    /// Returns `true` if the gun socket is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.hub.gun.is_connected()
    }

    /// Returns the gun connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.hub.gun.state()
    }

    /// Returns the gun reconnect attempt counter.
    #[must_use]
    pub fn reconnect_attempt(&self) -> u32 {
        self.hub
            .gun
            .current()
            .map_or(0, |connection| connection.reconnect_attempt())
    }

    /// Returns the endpoint this bridge talks to.
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::Gun
    }
}
