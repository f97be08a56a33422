//! Connection tuning and endpoint addresses.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use lasertag_bridge::transport::ConnectionConfig;
//!
//! let config = ConnectionConfig::new()
//!     .with_reconnect_delay(Duration::from_secs(1))
//!     .with_max_reconnect_attempts(10);
//!
//! assert_eq!(config.max_reconnect_attempts, 10);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Fixed spacing between reconnect attempts.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(3000);

/// Reconnect attempts after a socket closes before giving up.
pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Upper bound on one open handshake.
pub const DEFAULT_OPEN_TIMEOUT: Duration = Duration::from_secs(10);

/// Port the host coordination server listens on.
pub const HOST_PORT: u16 = 8080;

/// Port the gun peripheral listens on.
pub const GUN_PORT: u16 = 8081;

/// Path both endpoints serve the socket on.
pub const SOCKET_PATH: &str = "/LaserTag";

// ============================================================================
// ConnectionConfig
// ============================================================================

/// Reconnection and handshake settings for one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Delay before each reconnect attempt.
    pub reconnect_delay: Duration,

    /// Attempts before settling in `Disconnected`.
    pub max_reconnect_attempts: u32,

    /// Maximum time to wait for the open handshake.
    pub open_timeout: Duration,
}

impl ConnectionConfig {
    /// Creates a config with the default policy (3s spacing, 5 attempts).
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            max_reconnect_attempts: MAX_RECONNECT_ATTEMPTS,
            open_timeout: DEFAULT_OPEN_TIMEOUT,
        }
    }

    /// Sets the delay before each reconnect attempt.
    #[inline]
    #[must_use]
    pub const fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Sets the number of reconnect attempts (0 disables reconnection).
    #[inline]
    #[must_use]
    pub const fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    /// Sets the open handshake timeout.
    #[inline]
    #[must_use]
    pub const fn with_open_timeout(mut self, timeout: Duration) -> Self {
        self.open_timeout = timeout;
        self
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// URL Helpers
// ============================================================================

/// Validates a WebSocket endpoint URL.
///
/// # Errors
///
/// Returns [`Error::InvalidUrl`] if `url` does not parse or its scheme is
/// not `ws` or `wss`.
pub fn validate_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|e| Error::invalid_url(url, e.to_string()))?;

    match parsed.scheme() {
        "ws" | "wss" => {}
        other => {
            return Err(Error::invalid_url(
                url,
                format!("unsupported scheme `{other}`, expected ws or wss"),
            ));
        }
    }

    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(Error::invalid_url(url, "missing host"));
    }

    Ok(parsed)
}

/// Returns the host server socket URL for an IP address or hostname.
///
/// Format: `ws://{host}:8080/LaserTag`
#[inline]
#[must_use]
pub fn host_url(host: &str) -> String {
    format!("ws://{host}:{HOST_PORT}{SOCKET_PATH}")
}

/// Returns the gun socket URL for an IP address or hostname.
///
/// Format: `ws://{host}:8081/LaserTag`
#[inline]
#[must_use]
pub fn gun_url(host: &str) -> String {
    format!("ws://{host}:{GUN_PORT}{SOCKET_PATH}")
}

// ============================================================================
// Tests
// ============================================================================
