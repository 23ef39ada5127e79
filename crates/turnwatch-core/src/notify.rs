//! Notification text and mute gating.

use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{debug, warn};
use turnwatch_proto::{CallerId, ChannelRef, Notifier};

use crate::model::Game;

/// Whether a guild muted at `mute_start` is still muted at `now`.
///
/// The window is inclusive: exactly `window` after the mute it still applies.
pub fn is_muted(mute_start: Option<DateTime<Utc>>, now: DateTime<Utc>, window: Duration) -> bool {
    let Some(start) = mute_start else {
        return false;
    };
    match chrono::Duration::from_std(window) {
        Ok(window) => now.signed_duration_since(start) <= window,
        // A window too large to represent never expires
        Err(_) => true,
    }
}

/// "Alice is up in game 0: Chess", with a mention of the registered caller.
pub fn player_up_message(game: &Game, player: &str, mention: Option<&CallerId>) -> String {
    let mut text = format!("{} is up in game {}: {}", player, game.id, game.friendly_name);
    if let Some(caller) = mention {
        text.push_str(&format!(" <@{caller}>"));
    }
    text
}

pub fn game_over_message(game: &Game) -> String {
    format!(
        "Game {} appears to be over: {} ({}). Removing it from the game list.",
        game.id, game.friendly_name, game.url
    )
}

/// Sends `text`, logging instead of failing when the channel is unavailable.
///
/// Returns whether the message was delivered.
pub async fn deliver(notifier: &dyn Notifier, channel: &ChannelRef, text: &str) -> bool {
    match notifier.send(channel, text).await {
        Ok(()) => {
            debug!(channel = %channel, "Notification delivered");
            true
        }
        Err(e) => {
            warn!(channel = %channel, error = %e, "Notification could not be delivered");
            false
        }
    }
}
