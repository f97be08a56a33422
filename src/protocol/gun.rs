//! Gun peripheral messages.
//!
//! Structured gun frames are JSON objects tagged by a string `key`:
//!
//! ```json
//! { "key": "start_battle", "for_gun": { "damage": 10, "heal": 5, "health": 100 } }
//! ```
//!
//! Known keys decode into typed variants and are validated at decode time.
//! Any other key decodes into [`GunMessage::Unknown`] with its fields kept,
//! so newer firmware does not break older controllers.

// ============================================================================
// Imports
// ============================================================================

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::identifiers::Endpoint;

// ============================================================================
// Keys
// ============================================================================

/// Known gun message keys.
pub mod keys {
    /// Roster pushed from the host.
    pub const PLAYERS_REGISTERING: &str = "players_registering";

    /// Battle configuration pushed from the host.
    pub const START_BATTLE: &str = "start_battle";

    /// MAC addresses reported by the gun.
    pub const SUBMIT_MAC: &str = "submit_mac";
}

// ============================================================================
// Payloads
// ============================================================================

/// Per-gun battle parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleConfig {
    /// Damage dealt per hit.
    pub damage: i64,
    /// Health restored per heal.
    pub heal: i64,
    /// Starting health.
    pub health: i64,
}

// ============================================================================
// GunMessage
// ============================================================================

/// A structured frame on the gun socket.
///
/// Serializes to the wire object, `key` included, for every variant.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "key", rename_all = "snake_case")]
pub enum GunMessage {
    /// Players joining the upcoming battle.
    PlayersRegistering {
        /// Roster entries exactly as the host sent them.
        data: Vec<Value>,
    },

    /// Battle is starting with the given parameters.
    StartBattle {
        /// Parameters for this gun.
        for_gun: BattleConfig,
    },

    /// Gun reports its own and its paired vest's MAC address.
    SubmitMac {
        /// MAC address of the gun.
        gun_mac: String,
        /// MAC address of the paired vest.
        vest_mac: String,
        /// Whether the vest is currently paired.
        #[serde(default, alias = "is_vest_conected")]
        is_vest_connected: bool,
    },

    /// Any key this crate does not know.
    #[serde(skip_deserializing)]
    Unknown {
        /// The unrecognized key.
        #[serde(rename = "unknown_key")]
        key: String,
        /// Remaining fields of the object.
        fields: Map<String, Value>,
    },
}

impl GunMessage {
    /// Creates a `players_registering` message.
    #[inline]
    #[must_use]
    pub fn players_registering(data: Vec<Value>) -> Self {
        Self::PlayersRegistering { data }
    }

    /// Creates a `start_battle` message.
    #[inline]
    #[must_use]
    pub fn start_battle(for_gun: BattleConfig) -> Self {
        Self::StartBattle { for_gun }
    }

    /// Returns the dispatch key.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::PlayersRegistering { .. } => keys::PLAYERS_REGISTERING,
            Self::StartBattle { .. } => keys::START_BATTLE,
            Self::SubmitMac { .. } => keys::SUBMIT_MAC,
            Self::Unknown { key, .. } => key,
        }
    }

    /// Decodes a parsed JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the value is not an object with a string
    /// `key`, or if a known key is missing required fields.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut fields) = value else {
            return Err(Error::decode(Endpoint::Gun, "frame is not a JSON object"));
        };

        let key = match fields.get("key") {
            Some(Value::String(key)) => key.clone(),
            Some(_) => return Err(Error::decode(Endpoint::Gun, "`key` is not a string")),
            None => return Err(Error::decode(Endpoint::Gun, "missing `key`")),
        };

        match key.as_str() {
            keys::PLAYERS_REGISTERING | keys::START_BATTLE | keys::SUBMIT_MAC => {
                serde_json::from_value(Value::Object(fields))
                    .map_err(|e| Error::decode(Endpoint::Gun, format!("{key}: {e}")))
            }
            _ => {
                fields.remove("key");
                Ok(Self::Unknown { key, fields })
            }
        }
    }

    /// Encodes the message as a JSON value, `key` included.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if serialization fails.
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Borrowed view of the known variants, serialized with the derived tag.
#[derive(Serialize)]
#[serde(tag = "key", rename_all = "snake_case")]
enum KnownRef<'a> {
    PlayersRegistering {
        data: &'a [Value],
    },
    StartBattle {
        for_gun: &'a BattleConfig,
    },
    SubmitMac {
        gun_mac: &'a str,
        vest_mac: &'a str,
        is_vest_connected: bool,
    },
}

impl Serialize for GunMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let known = match self {
            Self::PlayersRegistering { data } => KnownRef::PlayersRegistering { data },
            Self::StartBattle { for_gun } => KnownRef::StartBattle { for_gun },
            Self::SubmitMac {
                gun_mac,
                vest_mac,
                is_vest_connected,
            } => KnownRef::SubmitMac {
                gun_mac,
                vest_mac,
                is_vest_connected: *is_vest_connected,
            },
            Self::Unknown { key, fields } => {
                let mut map = serializer.serialize_map(Some(fields.len() + 1))?;
                map.serialize_entry("key", key)?;
                for (name, value) in fields.iter().filter(|(name, _)| *name != "key") {
                    map.serialize_entry(name, value)?;
                }
                return map.end();
            }
        };
        known.serialize(serializer)
    }
}

// ============================================================================
// Tests
// ============================================================================
