//! Frame classification and the per-endpoint codecs.
//!
//! # Gun sniffing rule
//!
//! A gun payload made only of hexadecimal digits (`0-9A-Fa-f`, at least one)
//! is an opaque passthrough: it is never JSON-decoded and never reaches gun
//! listeners. Everything else must be a JSON object with a string `key`.
//!
//! The test runs first, so a payload such as `1234` or `ffff` is always a
//! passthrough even though it could also be read as JSON. Keep this order.

// ============================================================================
// Imports
// ============================================================================

use std::fmt::Debug;
use std::hash::Hash;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::Endpoint;

use super::gun::GunMessage;
use super::host::HostEnvelope;

// ============================================================================
// Sniffing
// ============================================================================

/// Returns `true` if `raw` is a nonempty run of hexadecimal digits.
#[inline]
#[must_use]
pub fn is_hex_payload(raw: &str) -> bool {
    !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_hexdigit())
}

// ============================================================================
// Frame
// ============================================================================

/// A classified inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame<M> {
    /// Structured message, dispatched to listeners by key.
    Message(M),
    /// Opaque payload relayed verbatim.
    Passthrough(String),
}

// ============================================================================
// Protocol
// ============================================================================

/// Wire protocol spoken on one endpoint.
///
/// Implementations are stateless; the connection calls them per frame.
pub trait Protocol: Send + Sync + 'static {
    /// Endpoint this protocol belongs to.
    const ENDPOINT: Endpoint;

    /// Dispatch key type.
    type Key: Eq + Hash + Clone + Debug + Send + Sync + 'static;

    /// Decoded message type, used for both directions.
    type Message: Debug + Send + Sync + 'static;

    /// Classifies and decodes one raw text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] for malformed frames.
    fn decode(raw: &str) -> Result<Frame<Self::Message>>;

    /// Encodes a message for the wire.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if serialization fails.
    fn encode(message: &Self::Message) -> Result<String>;

    /// Returns the dispatch key of a decoded message.
    fn key(message: &Self::Message) -> Self::Key;
}

// ============================================================================
// HostProtocol
// ============================================================================

/// Numeric-action-code envelope spoken by the host server.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostProtocol;

impl Protocol for HostProtocol {
    const ENDPOINT: Endpoint = Endpoint::Host;

    type Key = i64;
    type Message = HostEnvelope;

    fn decode(raw: &str) -> Result<Frame<HostEnvelope>> {
        serde_json::from_str(raw)
            .map(Frame::Message)
            .map_err(|e| Error::decode(Endpoint::Host, e.to_string()))
    }

    fn encode(message: &HostEnvelope) -> Result<String> {
        Ok(serde_json::to_string(message)?)
    }

    #[inline]
    fn key(message: &HostEnvelope) -> i64 {
        message.action_code
    }
}

// ============================================================================
// GunProtocol
// ============================================================================

/// String-keyed envelope plus hex passthrough spoken by the gun.
#[derive(Debug, Clone, Copy, Default)]
pub struct GunProtocol;

impl Protocol for GunProtocol {
    const ENDPOINT: Endpoint = Endpoint::Gun;

    type Key = String;
    type Message = GunMessage;

    fn decode(raw: &str) -> Result<Frame<GunMessage>> {
        if is_hex_payload(raw) {
            return Ok(Frame::Passthrough(raw.to_owned()));
        }

        let value: Value =
            serde_json::from_str(raw).map_err(|e| Error::decode(Endpoint::Gun, e.to_string()))?;

        GunMessage::from_value(value).map(Frame::Message)
    }

    fn encode(message: &GunMessage) -> Result<String> {
        Ok(serde_json::to_string(message)?)
    }

    #[inline]
    fn key(message: &GunMessage) -> String {
        message.key().to_owned()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;
    use serde_json::json;

    use crate::protocol::gun::BattleConfig;
    use crate::protocol::host::action_code;

    #[test]
    fn test_is_hex_payload() {
        assert!(is_hex_payload("0123456789abcdefABCDEF"));
        assert!(is_hex_payload("ffff"));
        assert!(is_hex_payload("1234"));
        assert!(!is_hex_payload(""));
        assert!(!is_hex_payload("0x12"));
        assert!(!is_hex_payload("12 34"));
        assert!(!is_hex_payload(r#"{"key":"a"}"#));
    }

    #[test]
    fn test_numeric_json_is_passthrough() {
        let frame = GunProtocol::decode("1234").unwrap();
        assert_eq!(frame, Frame::Passthrough("1234".into()));
    }

    #[test]
    fn test_gun_decode_message() {
        let frame = GunProtocol::decode(
            r#"{"key":"start_battle","for_gun":{"damage":1,"heal":2,"health":3}}"#,
        )
        .unwrap();
        let Frame::Message(msg) = frame else {
            panic!("expected message frame");
        };
        assert_eq!(GunProtocol::key(&msg), "start_battle");
    }

    #[test]
    fn test_gun_decode_invalid_json() {
        let err = GunProtocol::decode("{not json").unwrap_err();
        assert!(matches!(err, Error::Decode { endpoint: Endpoint::Gun, .. }));
    }

    #[test]
    fn test_gun_decode_json_without_key() {
        assert!(GunProtocol::decode(r#"{"data":[]}"#).is_err());
        assert!(GunProtocol::decode(r#""just a string""#).is_err());
    }

    #[test]
    fn test_host_decode_invalid_json() {
        let err = HostProtocol::decode("<html>").unwrap_err();
        assert!(matches!(err, Error::Decode { endpoint: Endpoint::Host, .. }));
    }

    #[test]
    fn test_host_roster_round_trip_matches_gun_payload() {
        let roster = json!([{
            "player_id": "p1",
            "gun_mac_address": "AA:01",
            "vest_mac_address": "BB:01",
            "team_id": "blue"
        }]);
        let envelope = HostEnvelope::new(action_code::PLAYERS_REGISTERING, 0)
            .with_data(roster.clone())
            .unwrap();

        let wire = HostProtocol::encode(&envelope).unwrap();
        let Frame::Message(decoded) = HostProtocol::decode(&wire).unwrap() else {
            panic!("host frames are never passthrough");
        };
        assert_eq!(decoded.data, roster);
        assert_eq!(HostProtocol::key(&decoded), action_code::PLAYERS_REGISTERING);

        let players: Vec<Value> = decoded.data_as("players_registering").unwrap();
        let forwarded = GunProtocol::encode(&GunMessage::players_registering(players)).unwrap();
        let forwarded: Value = serde_json::from_str(&forwarded).unwrap();
        assert_eq!(forwarded["data"], roster);
    }

    #[test]
    fn test_gun_encode_start_battle() {
        let wire = GunProtocol::encode(&GunMessage::start_battle(BattleConfig {
            damage: 10,
            heal: 5,
            health: 100,
        }))
        .unwrap();
        let value: Value = serde_json::from_str(&wire).unwrap();
        assert_eq!(
            value,
            json!({ "key": "start_battle", "for_gun": { "damage": 10, "heal": 5, "health": 100 } })
        );
    }

    proptest! {
        #[test]
        fn prop_hex_strings_are_passthrough(raw in "[0-9A-Fa-f]{1,64}") {
            prop_assert_eq!(GunProtocol::decode(&raw).unwrap(), Frame::Passthrough(raw.clone()));
        }

        #[test]
        fn prop_keyed_objects_are_never_passthrough(key in "[a-z_]{1,16}") {
            let raw = json!({ "key": key }).to_string();
            prop_assert!(!is_hex_payload(&raw));
            prop_assert!(!matches!(GunProtocol::decode(&raw), Ok(Frame::Passthrough(_))));
        }
    }
}
