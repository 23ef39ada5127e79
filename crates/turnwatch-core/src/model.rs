//! Durable registry entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use turnwatch_proto::{CallerId, ChannelRef, GameId};

/// A followed game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    pub url: String,
    pub channel: ChannelRef,
    pub friendly_name: String,
    /// Empty until a player has been seen.
    #[serde(default)]
    pub last_player_up: String,
}

impl Game {
    /// Name used when a game is followed without one.
    pub fn default_name(id: GameId) -> String {
        format!("game {id}")
    }
}

/// A chat user registered under a game-site handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRef {
    pub caller_id: CallerId,
    pub display_name: String,
}

/// Everything one guild owns.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Tenant {
    #[serde(default)]
    pub games: BTreeMap<GameId, Game>,

    #[serde(default = "first_game_id")]
    pub next_game_id: GameId,

    /// Keyed by game-site handle.
    #[serde(default)]
    pub players: BTreeMap<String, PlayerRef>,

    /// `None` means never muted (or unmuted).
    #[serde(default)]
    pub mute_start: Option<DateTime<Utc>>,
}

fn first_game_id() -> GameId {
    GameId::new(0)
}

/// The full persisted registry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RegistryDocument {
    #[serde(default)]
    pub tenants: BTreeMap<String, Tenant>,
}

impl RegistryDocument {
    /// Every (guild, game) pair in the document.
    pub fn game_keys(&self) -> Vec<(String, GameId)> {
        self.tenants
            .iter()
            .flat_map(|(name, tenant)| tenant.games.keys().map(move |id| (name.clone(), *id)))
            .collect()
    }
}
