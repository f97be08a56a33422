//! Application state collaborator.
//!
//! The bridge writes into the controller's state store through exactly four
//! operations on [`StateStore`]. [`MemoryStore`] is a ready-made
//! implementation holding the player and upgrade state in memory.

// ============================================================================
// Imports
// ============================================================================

use parking_lot::RwLock;
use serde_json::Value;

use crate::identifiers::Endpoint;

// ============================================================================
// PlayerInfo
// ============================================================================

/// Player identity update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerInfo {
    /// Display name, or `None` to keep the current one.
    pub name: Option<String>,
    /// MAC address of the gun.
    pub gun_mac: String,
    /// MAC address of the vest.
    pub vest_mac: String,
}

// ============================================================================
// StateStore
// ============================================================================

/// Write interface into the application state.
///
/// Calls are synchronous, fire-and-forget, and must not fail.
pub trait StateStore: Send + Sync {
    /// Records whether `endpoint` currently has a live socket.
    fn set_connection_status(&self, endpoint: Endpoint, connected: bool);

    /// Records the player's identity.
    fn set_player_info(&self, info: PlayerInfo);

    /// Records the player's remaining credit.
    fn set_credit(&self, credit: i64);

    /// Records the player's upgrades.
    fn set_upgrades(&self, upgrades: Vec<Value>);
}

// ============================================================================
// MemoryStore
// ============================================================================

/// Snapshot of the state held by [`MemoryStore`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerState {
    /// Display name.
    pub name: String,
    /// MAC address of the gun.
    pub gun_mac: String,
    /// MAC address of the vest.
    pub vest_mac: String,
    /// Host socket is live.
    pub host_connected: bool,
    /// Gun socket is live.
    pub gun_connected: bool,
    /// Remaining credit.
    pub credit: i64,
    /// Purchased upgrades.
    pub upgrades: Vec<Value>,
}

/// In-memory [`StateStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<PlayerState>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> PlayerState {
        self.state.read().clone()
    }

    /// Returns the recorded connection status of `endpoint`.
    #[must_use]
    pub fn is_connected(&self, endpoint: Endpoint) -> bool {
        let state = self.state.read();
        match endpoint {
            Endpoint::Host => state.host_connected,
            Endpoint::Gun => state.gun_connected,
        }
    }
}

impl StateStore for MemoryStore {
    fn set_connection_status(&self, endpoint: Endpoint, connected: bool) {
        let mut state = self.state.write();
        match endpoint {
            Endpoint::Host => state.host_connected = connected,
            Endpoint::Gun => state.gun_connected = connected,
        }
    }

    fn set_player_info(&self, info: PlayerInfo) {
        let mut state = self.state.write();
        if let Some(name) = info.name {
            state.name = name;
        }
        state.gun_mac = info.gun_mac;
        state.vest_mac = info.vest_mac;
    }

    fn set_credit(&self, credit: i64) {
        self.state.write().credit = credit;
    }

    fn set_upgrades(&self, upgrades: Vec<Value>) {
        self.state.write().upgrades = upgrades;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_connection_status_per_endpoint() {
        let store = MemoryStore::new();
        store.set_connection_status(Endpoint::Gun, true);

        assert!(store.is_connected(Endpoint::Gun));
        assert!(!store.is_connected(Endpoint::Host));
    }

    #[test]
    fn test_player_info_without_name_keeps_name() {
        let store = MemoryStore::new();
        store.set_player_info(PlayerInfo {
            name: Some("Ana".into()),
            gun_mac: "g1".into(),
            vest_mac: "v1".into(),
        });
        store.set_player_info(PlayerInfo {
            name: None,
            gun_mac: "g2".into(),
            vest_mac: "v2".into(),
        });

        let state = store.snapshot();
        assert_eq!(state.name, "Ana");
        assert_eq!(state.gun_mac, "g2");
        assert_eq!(state.vest_mac, "v2");
    }

    #[test]
    fn test_credit_and_upgrades() {
        let store = MemoryStore::new();
        store.set_credit(15);
        store.set_upgrades(vec![json!("armor")]);

        let state = store.snapshot();
        assert_eq!(state.credit, 15);
        assert_eq!(state.upgrades, vec![json!("armor")]);
    }
}
