//! Error types for the laser tag bridge.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use lasertag_bridge::{Bridges, Result};
//!
//! async fn example(bridges: &Bridges) -> Result<()> {
//!     bridges.host().connect("ws://192.168.4.1:8080/LaserTag").await?;
//!     bridges.host().send_message(0, 0, "", None::<()>)?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants | Surfaced to |
//! |----------|----------|-------------|
//! | Configuration | [`Error::Config`], [`Error::InvalidUrl`] | caller |
//! | Connection | [`Error::Connection`], [`Error::ConnectionTimeout`], [`Error::ConnectionClosed`] | caller of `connect` |
//! | Send | [`Error::NotConnected`] | caller of `send` |
//! | Frame | [`Error::Decode`], [`Error::Validation`] | logged only |
//! | External | [`Error::Json`] | caller |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;

use crate::identifiers::Endpoint;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when the bridge builder is missing a collaborator.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Endpoint URL could not be parsed or uses an unsupported scheme.
    #[error("Invalid endpoint URL {url}: {message}")]
    InvalidUrl {
        /// The rejected URL.
        url: String,
        /// Why it was rejected.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Socket failed to open or was rejected during the handshake.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Open handshake did not complete in time.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// Socket closed before the operation could complete.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Send attempted without a live socket.
    ///
    /// Returned synchronously; nothing is queued.
    #[error("{endpoint} endpoint is not connected")]
    NotConnected {
        /// Endpoint the send was addressed to.
        endpoint: Endpoint,
    },

    // ========================================================================
    // Frame Errors
    // ========================================================================
    /// Inbound frame could not be decoded.
    ///
    /// The frame is dropped and dispatch continues with the next one.
    #[error("Malformed {endpoint} frame: {message}")]
    Decode {
        /// Endpoint the frame arrived on.
        endpoint: Endpoint,
        /// Description of the decode failure.
        message: String,
    },

    /// Decoded frame lacks the fields a translation rule requires.
    #[error("Validation failed for {rule}: {message}")]
    Validation {
        /// Rule that rejected the frame.
        rule: String,
        /// Description of the missing or ill-typed field.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid URL error.
    #[inline]
    pub fn invalid_url(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates a not connected error.
    #[inline]
    pub fn not_connected(endpoint: Endpoint) -> Self {
        Self::NotConnected { endpoint }
    }

    /// Creates a decode error.
    #[inline]
    pub fn decode(endpoint: Endpoint, message: impl Into<String>) -> Self {
        Self::Decode {
            endpoint,
            message: message.into(),
        }
    }

    /// Creates a validation error.
    #[inline]
    pub fn validation(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            rule: rule.into(),
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
        )
    }

    /// Returns `true` if this error concerns a single inbound frame.
    ///
    /// Frame errors are logged and contained, never surfaced to the UI.
    #[inline]
    #[must_use]
    pub fn is_frame_error(&self) -> bool {
        matches!(self, Self::Decode { .. } | Self::Validation { .. })
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed on retry.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
                | Self::NotConnected { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
