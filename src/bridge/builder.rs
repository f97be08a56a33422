//! Builder pattern for bridge configuration.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use lasertag_bridge::{Bridges, MemoryStore, TracingNotifier};
//! use lasertag_bridge::transport::ConnectionConfig;
//!
//! # fn example() -> lasertag_bridge::Result<()> {
//! let bridges = Bridges::builder()
//!     .store(Arc::new(MemoryStore::new()))
//!     .notifier(Arc::new(TracingNotifier))
//!     .gun_config(ConnectionConfig::new().with_reconnect_delay(Duration::from_secs(1)))
//!     .build()?;
//! # let _ = bridges;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::notify::{Notifier, TracingNotifier};
use crate::store::StateStore;
use crate::transport::ConnectionConfig;

use super::core::Bridges;

// ============================================================================
// BridgesBuilder
// ============================================================================

/// Builder for configuring a [`Bridges`] instance.
///
/// Use [`Bridges::builder()`] to create a new builder.
#[derive(Default, Clone)]
pub struct BridgesBuilder {
    /// Application state the bridges write into.
    store: Option<Arc<dyn StateStore>>,
    /// User notification surface.
    notifier: Option<Arc<dyn Notifier>>,
    /// Host connection settings.
    host_config: ConnectionConfig,
    /// Gun connection settings.
    gun_config: ConnectionConfig,
}

impl fmt::Debug for BridgesBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgesBuilder")
            .field("store", &self.store.is_some())
            .field("notifier", &self.notifier.is_some())
            .field("host_config", &self.host_config)
            .field("gun_config", &self.gun_config)
            .finish()
    }
}

// ============================================================================
// BridgesBuilder Implementation
// ============================================================================

impl BridgesBuilder {
    /// Creates a new builder with default connection settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the state store. Required.
    #[inline]
    #[must_use]
    pub fn store(mut self, store: Arc<dyn StateStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the notifier. Defaults to [`TracingNotifier`].
    #[inline]
    #[must_use]
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Sets the host connection settings.
    #[inline]
    #[must_use]
    pub fn host_config(mut self, config: ConnectionConfig) -> Self {
        self.host_config = config;
        self
    }

    /// Sets the gun connection settings.
    #[inline]
    #[must_use]
    pub fn gun_config(mut self, config: ConnectionConfig) -> Self {
        self.gun_config = config;
        self
    }

    /// Builds the bridges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if no store was set.
    pub fn build(self) -> Result<Bridges> {
        let store = self.store.ok_or_else(|| {
            Error::config(
                "State store is required. Use .store() to set it.\n\
                 Example: Bridges::builder().store(Arc::new(MemoryStore::new()))",
            )
        })?;
        let notifier = self
            .notifier
            .unwrap_or_else(|| Arc::new(TracingNotifier));

        Ok(Bridges::with_configs(
            store,
            notifier,
            self.host_config,
            self.gun_config,
        ))
    }
}

// ============================================================================
// Tests
// ============================================================================
