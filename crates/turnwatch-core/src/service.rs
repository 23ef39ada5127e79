//! Operations exposed to the command layer.
//!
//! [`TurnWatch`] ties the [`Registry`] to the [`WatcherSupervisor`] so that
//! following a game always starts its watcher and unfollowing always stops it.
//! Rendering replies is left to the caller.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use turnwatch_proto::{CallerId, ChannelRef, GameId};

use crate::model::{Game, PlayerRef};
use crate::notify::{deliver, player_up_message};
use crate::registry::Registry;
use crate::supervisor::WatcherSupervisor;
use crate::watcher::WatcherContext;

/// Id the counter is rebased to after a reset.
pub const RESET_BASE_ID: GameId = GameId::new(1);

/// Errors surfaced to the user by a command.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CommandError {
    /// The text is not an integer, or no game has that id.
    #[error("invalid game id: {0:?}")]
    InvalidGameId(String),
}

/// Command-layer facade over the registry and the watcher supervisor.
#[derive(Debug)]
pub struct TurnWatch {
    supervisor: WatcherSupervisor,
}

impl TurnWatch {
    pub fn new(supervisor: WatcherSupervisor) -> Self {
        Self { supervisor }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        self.supervisor.registry()
    }

    pub fn supervisor(&self) -> &WatcherSupervisor {
        &self.supervisor
    }

    fn context(&self) -> &WatcherContext {
        self.supervisor.context()
    }

    /// Starts watchers for every game already in the registry.
    pub fn restore(&self) -> usize {
        self.supervisor.restore_all()
    }

    /// Stops every watcher and waits for them to exit.
    pub async fn shutdown(&self) {
        self.supervisor.shutdown().await;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // GAMES
    // ─────────────────────────────────────────────────────────────────────────

    /// Adds a game and starts watching it.
    pub fn follow(
        &self,
        tenant: &str,
        url: &str,
        channel: ChannelRef,
        friendly_name: Option<&str>,
    ) -> Game {
        let game = self.registry().add_game(tenant, url, channel, friendly_name);
        info!(guild = %tenant, game_id = %game.id, url = %url, "Following game");
        self.supervisor.spawn_watcher(tenant, game.id);
        game
    }

    /// Stops watching a game and removes it.
    ///
    /// `game_id` must parse as an integer naming an existing game; otherwise
    /// nothing changes.
    pub fn unfollow(&self, tenant: &str, game_id: &str) -> Result<Game, CommandError> {
        let invalid = || CommandError::InvalidGameId(game_id.trim().to_string());
        let id = GameId::parse(game_id).ok_or_else(invalid)?;
        if self.registry().game(tenant, id).is_none() {
            return Err(invalid());
        }

        self.supervisor.stop_watcher(tenant, id);
        let game = self.registry().remove_game(tenant, id).ok_or_else(invalid)?;
        info!(guild = %tenant, game_id = %id, "Unfollowed game");
        Ok(game)
    }

    /// Unfollows every game one at a time, then rebases the id counter.
    /// Returns the games that were removed, in id order.
    pub fn reset(&self, tenant: &str) -> Vec<Game> {
        let removed: Vec<Game> = self
            .registry()
            .games(tenant)
            .into_iter()
            .filter_map(|game| self.unfollow(tenant, &game.id.to_string()).ok())
            .collect();
        let next = self.registry().rebase_game_ids(tenant, RESET_BASE_ID);
        info!(guild = %tenant, removed = removed.len(), next_game_id = %next, "Reset guild");
        removed
    }

    /// All followed games, ordered by id.
    pub fn list_games(&self, tenant: &str) -> Vec<Game> {
        self.registry().games(tenant)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // PLAYERS
    // ─────────────────────────────────────────────────────────────────────────

    /// Maps `handle` to the caller. Returns handles the caller held before.
    pub fn register_player(
        &self,
        tenant: &str,
        handle: &str,
        caller: CallerId,
        display_name: &str,
    ) -> Vec<String> {
        let displaced = self
            .registry()
            .add_player(tenant, handle.trim(), caller, display_name);
        info!(guild = %tenant, handle = %handle.trim(), "Registered player");
        displaced
    }

    /// Removes every handle held by the caller. Returns the removed handles.
    pub fn unregister_player(&self, tenant: &str, caller: &CallerId) -> Vec<String> {
        self.registry().remove_players_by_caller(tenant, caller)
    }

    pub fn list_players(&self, tenant: &str) -> Vec<(String, PlayerRef)> {
        self.registry().players(tenant)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // NOTIFICATIONS
    // ─────────────────────────────────────────────────────────────────────────

    /// Opens the mute window starting now.
    pub fn mute(&self, tenant: &str) {
        self.registry().set_mute_start(tenant, Some(Utc::now()));
        info!(guild = %tenant, "Notifications muted");
    }

    /// Closes the mute window. Suppressed notifications are not replayed.
    pub fn unmute(&self, tenant: &str) {
        self.registry().set_mute_start(tenant, None);
        info!(guild = %tenant, "Notifications unmuted");
    }

    /// Re-sends "X is up" for every game with a known player, ignoring mute.
    /// Returns the number of notifications delivered.
    pub async fn poke(&self, tenant: &str) -> usize {
        let mut delivered = 0;
        for game in self.registry().games(tenant) {
            if game.last_player_up.is_empty() {
                continue;
            }
            let mention = self
                .registry()
                .player(tenant, &game.last_player_up)
                .map(|player| player.caller_id);
            let text = player_up_message(&game, &game.last_player_up, mention.as_ref());
            if deliver(self.context().notifier.as_ref(), &game.channel, &text).await {
                delivered += 1;
            }
        }
        delivered
    }
}
