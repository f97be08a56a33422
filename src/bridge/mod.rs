//! Endpoint bridges and the translation table between them.
//!
//! # Architecture
//!
//! ```text
//!              ┌──────────── Bridges ────────────┐
//!   UI ───────►│ HostBridge            GunBridge │◄─────── UI
//!              │     │   22, 23 ──────────►  │    │
//!              │     │  ◄────────── hex (102) │    │
//!              └─────┼─────────────────────────┼────┘
//!                    ▼                         ▼
//!            Connection<Host>          Connection<Gun>
//!                    │                         │
//!              StateStore / Notifier (both directions)
//! ```
//!
//! There is exactly one connection per endpoint for the lifetime of a
//! [`Bridges`] value. `connect` creates it on first use and is a no-op
//! while it is open; `disconnect` tears it down.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `builder` | [`BridgesBuilder`] |
//! | `core` | [`Bridges`] context |
//! | `host` | [`HostBridge`] |
//! | `gun` | [`GunBridge`] |
//! | `rules` | Translation rules |

// ============================================================================
// Submodules
// ============================================================================

/// Bridges builder.
pub mod builder;

/// Shared bridge context.
pub mod core;

/// Gun peripheral bridge.
pub mod gun;

/// Host server bridge.
pub mod host;

/// Translation rules.
mod rules;

#[cfg(test)]
mod fixture;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::BridgesBuilder;
pub use core::Bridges;
pub use gun::GunBridge;
pub use host::HostBridge;
