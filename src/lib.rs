//! Laser tag controller bridge.
//!
//! This library connects a handheld controller to two peers over persistent
//! WebSocket connections and relays state between them:
//!
//! - **Host**: the game coordination server, speaking numeric `ActionCode`
//!   envelopes
//! - **Gun**: the wearable peripheral, speaking `key`-tagged JSON objects or
//!   raw hex strings
//!
//! # Architecture
//!
//! Key design principles:
//!
//! - At most one live socket per endpoint, owned by a [`Bridges`] context
//! - Bounded reconnection (5 attempts, 3 seconds apart), cancelled by
//!   `disconnect()`
//! - Inbound frames dispatched per key, in arrival order, exactly once per
//!   listener
//! - Malformed frames are logged and dropped; they never stop the socket
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use lasertag_bridge::{Bridges, MemoryStore, PlayerData, Result};
//! use lasertag_bridge::transport::{gun_url, host_url};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let store = Arc::new(MemoryStore::new());
//!     let bridges = Bridges::builder().store(store.clone()).build()?;
//!
//!     bridges.host().connect(&host_url("192.168.4.2")).await?;
//!     bridges.gun().connect(&gun_url("192.168.4.1")).await?;
//!
//!     bridges
//!         .host()
//!         .join_game(PlayerData::new("Ana", "AA:BB:CC:00:00:01", "AA:BB:CC:00:00:02"))?;
//!
//!     println!("{:?}", store.snapshot());
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`bridge`] | [`Bridges`], [`HostBridge`], [`GunBridge`] and the translation rules |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | [`Endpoint`] and [`ListenerId`] |
//! | [`notify`] | [`Notifier`] collaborator |
//! | [`protocol`] | Host and gun wire formats |
//! | [`store`] | [`StateStore`] collaborator |
//! | [`transport`] | WebSocket connection and reconnection |

// ============================================================================
// Modules
// ============================================================================

/// Endpoint bridges and translation rules.
///
/// Use [`Bridges::builder()`] to create the bridge context.
pub mod bridge;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Endpoint and listener identifiers.
pub mod identifiers;

/// User notification collaborator.
pub mod notify;

/// Wire formats for both endpoints.
pub mod protocol;

/// Application state collaborator.
pub mod store;

/// WebSocket transport layer.
///
/// Connection state machine, reconnection policy and listener dispatch.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Bridge types
pub use bridge::{Bridges, BridgesBuilder, GunBridge, HostBridge};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{Endpoint, ListenerId};

// Collaborators
pub use notify::{Notifier, Severity, TracingNotifier};
pub use store::{MemoryStore, PlayerInfo, PlayerState, StateStore};

// Protocol types
pub use protocol::{BattleConfig, GunMessage, HostEnvelope, PlayerData, UpgradeState};

// Transport types
pub use transport::{Connection, ConnectionConfig, ConnectionState};
