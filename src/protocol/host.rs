//! Host coordination server envelope.
//!
//! Every frame exchanged with the host is one JSON object:
//!
//! ```json
//! {
//!   "ActionCode": 22,
//!   "MessageType": 0,
//!   "Message": "",
//!   "Data": [ ... ]
//! }
//! ```
//!
//! `ActionCode` is the dispatch key. `MessageType` is a secondary
//! classification (notification severity) that the bridge passes through.

// ============================================================================
// Imports
// ============================================================================

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

// ============================================================================
// Action Codes
// ============================================================================

/// Known host action codes.
pub mod action_code {
    /// Player joins the game (`Data` = [`PlayerData`](super::PlayerData)).
    pub const JOIN_GAME: i64 = 0;

    /// Credit and upgrade state for this player.
    pub const UPGRADES: i64 = 21;

    /// Roster of registering players, forwarded to the gun.
    pub const PLAYERS_REGISTERING: i64 = 22;

    /// Battle configuration, forwarded to the gun.
    pub const START_BATTLE: i64 = 23;

    /// Raw hex payload relayed from the gun.
    pub const GUN_PASSTHROUGH: i64 = 102;

    /// Free-text game notification.
    pub const NOTIFICATION: i64 = 200;
}

// ============================================================================
// HostEnvelope
// ============================================================================

/// A frame on the host socket, in either direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HostEnvelope {
    /// Dispatch key.
    pub action_code: i64,

    /// Secondary classification (0 = info, 1 = success, 2 = error).
    #[serde(default, deserialize_with = "null_as_default")]
    pub message_type: i64,

    /// Human-readable text, often empty.
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,

    /// Action-specific payload.
    #[serde(default)]
    pub data: Value,
}

impl HostEnvelope {
    /// Creates an envelope with an empty message and `null` data.
    #[inline]
    #[must_use]
    pub fn new(action_code: i64, message_type: i64) -> Self {
        Self {
            action_code,
            message_type,
            message: String::new(),
            data: Value::Null,
        }
    }

    /// Sets the message text.
    #[inline]
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Sets the payload from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if `data` cannot be represented as JSON.
    pub fn with_data<T: Serialize>(mut self, data: T) -> Result<Self> {
        self.data = serde_json::to_value(data)?;
        Ok(self)
    }

    /// Creates the passthrough envelope carrying a raw gun payload.
    #[must_use]
    pub fn gun_passthrough(raw: impl Into<String>) -> Self {
        Self {
            data: Value::String(raw.into()),
            ..Self::new(action_code::GUN_PASSTHROUGH, 0)
        }
    }

    /// Decodes the payload into a typed value for a translation rule.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] naming `rule` if `Data` is missing or
    /// does not have the expected shape.
    pub fn data_as<T: DeserializeOwned>(&self, rule: &str) -> Result<T> {
        if self.data.is_null() {
            return Err(Error::validation(rule, "Data is missing"));
        }
        T::deserialize(&self.data).map_err(|e| Error::validation(rule, e.to_string()))
    }
}

// ============================================================================
// Payloads
// ============================================================================

/// Player identity sent with [`action_code::JOIN_GAME`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlayerData {
    /// Display name.
    pub name: String,
    /// MAC address of the player's gun.
    pub mac_gun: String,
    /// MAC address of the player's vest.
    pub mac_vest: String,
}

impl PlayerData {
    /// Creates player data.
    #[inline]
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        mac_gun: impl Into<String>,
        mac_vest: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            mac_gun: mac_gun.into(),
            mac_vest: mac_vest.into(),
        }
    }
}

/// Payload of [`action_code::UPGRADES`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpgradeState {
    /// Remaining credit.
    pub credit: i64,
    /// Purchased upgrades, passed to the store untouched.
    pub upgrades: Vec<Value>,
}

// ============================================================================
// Helpers
// ============================================================================

/// Treats an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ============================================================================
// Tests
// ============================================================================
