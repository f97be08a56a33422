//! User-notification collaborator.
//!
//! The bridge surfaces selected inbound messages to the user through a
//! single [`Notifier::notify`] call. Rendering is left to the UI layer.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use tracing::info;

// ============================================================================
// Severity
// ============================================================================

/// How a notification should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Severity {
    /// Neutral information.
    #[default]
    Info,
    /// Something went well.
    Success,
    /// Something went wrong.
    Error,
}

impl Severity {
    /// Maps a host `MessageType` to a severity.
    ///
    /// `1` is success, `2` is error, anything else is info.
    #[inline]
    #[must_use]
    pub const fn from_message_type(message_type: i64) -> Self {
        match message_type {
            1 => Self::Success,
            2 => Self::Error,
            _ => Self::Info,
        }
    }

    /// Returns the lowercase name.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Notifier
// ============================================================================

/// Receives user-facing notifications.
///
/// Calls are fire-and-forget and happen on the connection's event loop, so
/// implementations must not block.
pub trait Notifier: Send + Sync {
    /// Shows one notification.
    fn notify(&self, severity: Severity, title: &str, body: &str);
}

/// Notifier that writes notifications to the `tracing` log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, severity: Severity, title: &str, body: &str) {
        info!(%severity, title, body, "Notification");
    }
}

// ============================================================================
// Tests
// ============================================================================
