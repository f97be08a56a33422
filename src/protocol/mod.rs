//! Wire protocols for the two endpoints.
//!
//! # Protocol Overview
//!
//! | Endpoint | Frame | Dispatch key |
//! |----------|-------|--------------|
//! | Host | `{ActionCode, MessageType, Message, Data}` | `ActionCode` (integer) |
//! | Gun | `{key, ...}` or a raw hex string | `key` (string) |
//!
//! Both are JSON over a persistent WebSocket. Gun hex strings bypass JSON
//! decoding entirely and are relayed to the host (see [`codec`]).
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `codec` | Sniffing rule, [`Frame`], [`Protocol`] implementations |
//! | `gun` | Gun message variants |
//! | `host` | Host envelope and action codes |

// ============================================================================
// Submodules
// ============================================================================

/// Frame classification and per-endpoint codecs.
pub mod codec;

/// Gun message types.
pub mod gun;

/// Host envelope types.
pub mod host;

// ============================================================================
// Re-exports
// ============================================================================

pub use codec::{Frame, GunProtocol, HostProtocol, Protocol, is_hex_payload};
pub use gun::{BattleConfig, GunMessage};
pub use host::{HostEnvelope, PlayerData, UpgradeState, action_code};
