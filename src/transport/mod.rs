//! WebSocket transport layer.
//!
//! This module keeps one persistent client socket per endpoint and turns
//! inbound frames into keyed listener calls.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐        WebSocket         ┌──────────────────┐
//! │ Connection<Host> │◄────────────────────────►│ Host server      │
//! │                  │    ws://IP:8080/LaserTag │ (game logic)     │
//! └──────────────────┘                          └──────────────────┘
//! ┌──────────────────┐        WebSocket         ┌──────────────────┐
//! │ Connection<Gun>  │◄────────────────────────►│ Gun peripheral   │
//! │                  │    ws://IP:8081/LaserTag │ (firmware)       │
//! └──────────────────┘                          └──────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `Connection::new` - Validate the URL, register listeners
//! 2. `Connection::connect` - Dial and start the event loop
//! 3. Socket lost - Up to 5 reconnect attempts, 3 seconds apart
//! 4. `Connection::disconnect` - Close and cancel pending reconnects
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `config` | Reconnect policy and endpoint URLs |
//! | `connection` | Socket state machine and event loop |
//! | `listeners` | Per-key listener registry |

// ============================================================================
// Submodules
// ============================================================================

/// Reconnect policy and endpoint URLs.
pub mod config;

/// Socket state machine and event loop.
pub mod connection;

/// Per-key listener registry.
pub mod listeners;

#[cfg(test)]
pub(crate) mod testing;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::{
    ConnectionConfig, DEFAULT_OPEN_TIMEOUT, DEFAULT_RECONNECT_DELAY, GUN_PORT, HOST_PORT,
    MAX_RECONNECT_ATTEMPTS, SOCKET_PATH, gun_url, host_url, validate_url,
};
pub use connection::{Connection, ConnectionState, PassthroughHandler};
pub use listeners::{Listener, ListenerRegistry};
