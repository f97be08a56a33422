//! Translation rules between the two endpoints.
//!
//! Every rule runs synchronously inside the dispatch of the frame that
//! triggered it. Relays to the sibling endpoint only enqueue a frame, so a
//! rule never waits on the other socket. A rule that fails is logged and
//! contained to its frame.
//!
//! # Host Rules
//!
//! | ActionCode | Effect |
//! |------------|--------|
//! | 21 | Store credit and upgrades, notify `Message` |
//! | 22 | Relay `Data` to the gun as `players_registering` |
//! | 23 | Relay `Data` to the gun as `start_battle` |
//! | 200 | Notify `Message` with severity from `MessageType` |
//!
//! # Gun Rules
//!
//! | Key | Effect |
//! |-----|--------|
//! | `submit_mac` | Store MAC addresses, notify |
//! | `players_registering` | Notify player count |
//! | `start_battle` | Notify battle parameters |
//! | hex passthrough | Relay to the host as ActionCode 102 |

// ============================================================================
// Imports
// ============================================================================

use std::sync::Weak;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::Result;
use crate::notify::Severity;
use crate::protocol::gun::keys;
use crate::protocol::{
    BattleConfig, GunMessage, GunProtocol, HostEnvelope, HostProtocol, UpgradeState, action_code,
};
use crate::store::PlayerInfo;
use crate::transport::Connection;

use super::core::Hub;

// ============================================================================
// Notification Titles
// ============================================================================

const GAME_NOTIFICATION: &str = "Game Notification!";
const UPGRADES_UPDATED: &str = "Upgrades Updated";
const MAC_SUBMITTED: &str = "MAC Addresses Submitted";
const PLAYERS_REGISTERING: &str = "Players Registering";
const BATTLE_STARTING: &str = "Battle Starting!";

// ============================================================================
// Registration
// ============================================================================

/// Registers the host rule table on a fresh host connection.
pub(crate) fn register_host_rules(connection: &Connection<HostProtocol>, hub: &Weak<Hub>) {
    connection.add_listener(action_code::UPGRADES, rule(hub, "upgrades", on_upgrades));
    connection.add_listener(
        action_code::PLAYERS_REGISTERING,
        rule(hub, "players_registering", on_host_players_registering),
    );
    connection.add_listener(
        action_code::START_BATTLE,
        rule(hub, "start_battle", on_host_start_battle),
    );
    connection.add_listener(
        action_code::NOTIFICATION,
        rule(hub, "notification", on_notification),
    );
}

/// Registers the gun rule table and passthrough relay on a fresh gun connection.
pub(crate) fn register_gun_rules(connection: &Connection<GunProtocol>, hub: &Weak<Hub>) {
    connection.add_listener(keys::SUBMIT_MAC, rule(hub, keys::SUBMIT_MAC, on_submit_mac));
    connection.add_listener(
        keys::PLAYERS_REGISTERING,
        rule(hub, keys::PLAYERS_REGISTERING, on_gun_players_registering),
    );
    connection.add_listener(
        keys::START_BATTLE,
        rule(hub, keys::START_BATTLE, on_gun_start_battle),
    );

    let hub = Weak::clone(hub);
    connection.set_passthrough_handler(move |raw| {
        let Some(hub) = hub.upgrade() else {
            return;
        };
        match hub.host.send(&HostEnvelope::gun_passthrough(raw)) {
            Ok(()) => debug!(len = raw.len(), "Gun passthrough relayed to host"),
            Err(e) => warn!(rule = "passthrough", error = %e, "Relay failed"),
        }
    });
}

/// Wraps a rule handler into a listener.
fn rule<M, H>(
    hub: &Weak<Hub>,
    name: &'static str,
    handler: H,
) -> impl Fn(&M) + Send + Sync + 'static + use<M, H>
where
    M: 'static,
    H: Fn(&Hub, &M) -> Result<()> + Send + Sync + 'static,
{
    let hub = Weak::clone(hub);
    move |message: &M| {
        let Some(hub) = hub.upgrade() else {
            return;
        };
        match handler(&*hub, message) {
            Ok(()) => {}
            Err(e) if e.is_frame_error() => warn!(rule = name, error = %e, "Rule skipped"),
            Err(e) => warn!(rule = name, error = %e, "Relay failed"),
        }
    }
}

// ============================================================================
// Host Rules
// ============================================================================

fn on_upgrades(hub: &Hub, envelope: &HostEnvelope) -> Result<()> {
    let state: UpgradeState = envelope.data_as("upgrades")?;

    hub.store.set_credit(state.credit);
    hub.store.set_upgrades(state.upgrades);

    if !envelope.message.is_empty() {
        hub.notifier
            .notify(Severity::Info, UPGRADES_UPDATED, &envelope.message);
    }
    Ok(())
}

fn on_host_players_registering(hub: &Hub, envelope: &HostEnvelope) -> Result<()> {
    let players: Vec<Value> = envelope.data_as("players_registering")?;
    hub.gun.send(&GunMessage::players_registering(players))
}

fn on_host_start_battle(hub: &Hub, envelope: &HostEnvelope) -> Result<()> {
    let config: BattleConfig = envelope.data_as("start_battle")?;
    hub.gun.send(&GunMessage::start_battle(config))
}

fn on_notification(hub: &Hub, envelope: &HostEnvelope) -> Result<()> {
    if envelope.message.is_empty() {
        return Ok(());
    }

    let severity = Severity::from_message_type(envelope.message_type);
    hub.notifier
        .notify(severity, GAME_NOTIFICATION, &envelope.message);
    Ok(())
}

// ============================================================================
// Gun Rules
// ============================================================================

fn on_submit_mac(hub: &Hub, message: &GunMessage) -> Result<()> {
    let GunMessage::SubmitMac {
        gun_mac, vest_mac, ..
    } = message
    else {
        return Ok(());
    };

    hub.store.set_player_info(PlayerInfo {
        name: None,
        gun_mac: gun_mac.clone(),
        vest_mac: vest_mac.clone(),
    });
    hub.notifier.notify(
        Severity::Info,
        MAC_SUBMITTED,
        &format!("Gun: {gun_mac}, Vest: {vest_mac}"),
    );
    Ok(())
}

fn on_gun_players_registering(hub: &Hub, message: &GunMessage) -> Result<()> {
    if let GunMessage::PlayersRegistering { data } = message {
        hub.notifier.notify(
            Severity::Info,
            PLAYERS_REGISTERING,
            &format!("{} players joined", data.len()),
        );
    }
    Ok(())
}

fn on_gun_start_battle(hub: &Hub, message: &GunMessage) -> Result<()> {
    if let GunMessage::StartBattle { for_gun } = message {
        hub.notifier.notify(
            Severity::Success,
            BATTLE_STARTING,
            &format!("Damage: {}, Health: {}", for_gun.damage, for_gun.health),
        );
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
