//! Per-game polling state machine.
//!
//! A watcher owns nothing durable: it looks its game up in the [`Registry`]
//! at the top of every cycle and terminates as soon as the entry is gone.
//! Each cycle opens a fresh oracle session, reads the page up to
//! `reread_attempts` times, closes the session, and then acts on the last
//! read:
//!
//! ```text
//!  Polling ──change──▶ Notifying ──▶ Polling
//!     │
//!     ├── game removed / ladder exhausted ──▶ Terminated
//!     └── cancelled (any phase) ────────────▶ Terminated
//! ```
//!
//! Load failures and inconclusive reads share one reload-failure counter;
//! after `reload_attempts` consecutive failed cycles the game is removed and a
//! single "appears to be over" notice is sent.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::Utc;
use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use turnwatch_proto::{GameId, Notifier, TurnOracle, WhoIsUp};

use crate::config::WatcherSettings;
use crate::model::Game;
use crate::notify::{deliver, game_over_message, is_muted, player_up_message};
use crate::registry::Registry;

/// Shared collaborators every watcher needs.
#[derive(Clone)]
pub struct WatcherContext {
    pub registry: Arc<Registry>,
    pub oracle: Arc<dyn TurnOracle>,
    pub notifier: Arc<dyn Notifier>,
    pub settings: WatcherSettings,
}

impl std::fmt::Debug for WatcherContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherContext")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Where a watcher is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherPhase {
    Polling,
    Notifying,
    Terminated,
}

/// Why a watcher stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// The game left the registry (unfollow, reset, or concurrent removal).
    GameRemoved,
    /// The reload-failure ladder was exhausted and the game was removed.
    GameOver,
    /// The supervisor stopped the watcher.
    Cancelled,
}

/// Result of one poll cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The page was read and the active player is unchanged (or blank).
    Unchanged,
    /// A new active player was recorded; `notified` is false when muted or
    /// when delivery failed.
    Changed { player: String, notified: bool },
    /// Load failed or the read was inconclusive; `failures` is the running count.
    Failed { failures: u32 },
    GameOver,
    GameRemoved,
    Cancelled,
}

impl CycleOutcome {
    /// The termination this outcome implies, if any.
    pub fn termination(&self) -> Option<TerminationReason> {
        match self {
            Self::GameOver => Some(TerminationReason::GameOver),
            Self::GameRemoved => Some(TerminationReason::GameRemoved),
            Self::Cancelled => Some(TerminationReason::Cancelled),
            Self::Unchanged | Self::Changed { .. } | Self::Failed { .. } => None,
        }
    }
}

/// What a single session produced.
enum PageRead {
    Player(String),
    Inconclusive,
    LoadFailed,
    Cancelled,
}

/// Polls one game until it is removed, declared over, or cancelled.
pub struct Watcher {
    guild: String,
    game_id: GameId,
    ctx: WatcherContext,
    cancel: CancellationToken,
    phase: WatcherPhase,
    reload_failures: u32,
}

impl Watcher {
    pub fn new(
        guild: impl Into<String>,
        game_id: GameId,
        ctx: WatcherContext,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            guild: guild.into(),
            game_id,
            ctx,
            cancel,
            phase: WatcherPhase::Polling,
            reload_failures: 0,
        }
    }

    pub fn phase(&self) -> WatcherPhase {
        self.phase
    }

    /// Consecutive failed cycles since the last successful read.
    pub fn reload_failures(&self) -> u32 {
        self.reload_failures
    }

    /// Runs cycles every `refresh_interval` until the watcher terminates.
    pub async fn run(mut self) -> TerminationReason {
        info!(guild = %self.guild, game_id = %self.game_id, "Now monitoring game");

        let reason = loop {
            let outcome = self.run_cycle().await;
            if let Some(reason) = outcome.termination() {
                break reason;
            }

            tokio::select! {
                () = self.cancel.cancelled() => break TerminationReason::Cancelled,
                () = tokio::time::sleep(self.ctx.settings.refresh_interval) => {}
            }
        };

        self.phase = WatcherPhase::Terminated;
        info!(
            guild = %self.guild,
            game_id = %self.game_id,
            reason = ?reason,
            "Stopped monitoring game"
        );
        reason
    }

    /// Executes a single poll cycle.
    ///
    /// Panics raised by collaborators are caught here and counted as a failed
    /// load, so one misbehaving page never takes the watcher down.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        if self.phase == WatcherPhase::Terminated {
            return CycleOutcome::Cancelled;
        }
        let result = AssertUnwindSafe(self.cycle()).catch_unwind().await;
        match result {
            Ok(outcome) => outcome,
            Err(_) => {
                error!(
                    guild = %self.guild,
                    game_id = %self.game_id,
                    "Watcher cycle panicked; counting it as a failed load"
                );
                self.phase = WatcherPhase::Polling;
                match self.ctx.registry.game(&self.guild, self.game_id) {
                    Some(game) => self.record_failure(&game).await,
                    None => CycleOutcome::GameRemoved,
                }
            }
        }
    }

    async fn cycle(&mut self) -> CycleOutcome {
        if self.cancel.is_cancelled() {
            return CycleOutcome::Cancelled;
        }
        let Some(game) = self.ctx.registry.game(&self.guild, self.game_id) else {
            return CycleOutcome::GameRemoved;
        };

        let muted = is_muted(
            self.ctx.registry.mute_start(&self.guild),
            Utc::now(),
            self.ctx.settings.mute_window,
        );

        let (read, closed) = self.read_page(&game.url).await;
        let outcome = match read {
            PageRead::Cancelled => return CycleOutcome::Cancelled,
            PageRead::Player(player) => self.on_player(&game, player, muted).await,
            PageRead::Inconclusive | PageRead::LoadFailed => self.record_failure(&game).await,
        };

        if !closed && matches!(outcome, CycleOutcome::Unchanged | CycleOutcome::Changed { .. }) {
            return self.record_failure(&game).await;
        }
        outcome
    }

    /// Opens a session, runs the reread ladder, and always closes the session.
    ///
    /// Returns the final read and whether the session closed cleanly.
    async fn read_page(&self, url: &str) -> (PageRead, bool) {
        let mut session = match self.ctx.oracle.open(url).await {
            Ok(session) => session,
            Err(e) => {
                info!(
                    guild = %self.guild,
                    game_id = %self.game_id,
                    error = %e,
                    "Loading page failed"
                );
                return (PageRead::LoadFailed, true);
            }
        };

        let attempts = self.ctx.settings.reread_attempts.max(1);
        let mut read = PageRead::Inconclusive;
        for attempt in 1..=attempts {
            if attempt > 1 {
                tokio::select! {
                    () = self.cancel.cancelled() => {
                        read = PageRead::Cancelled;
                        break;
                    }
                    () = tokio::time::sleep(self.ctx.settings.reread_pause) => {}
                }
            }

            // A panicking read must not skip the close below
            let Ok(who) = AssertUnwindSafe(session.check_who_is_up())
                .catch_unwind()
                .await
            else {
                error!(
                    guild = %self.guild,
                    game_id = %self.game_id,
                    attempt = attempt,
                    "Reading page panicked, giving up on this session"
                );
                read = PageRead::Inconclusive;
                break;
            };

            match who {
                WhoIsUp::Found(player) => {
                    read = PageRead::Player(player);
                    break;
                }
                other => {
                    debug!(
                        guild = %self.guild,
                        game_id = %self.game_id,
                        attempt = attempt,
                        max_attempts = attempts,
                        read = ?other,
                        "Player up not found, checking page again"
                    );
                }
            }
        }

        let closed = match session.close().await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    guild = %self.guild,
                    game_id = %self.game_id,
                    error = %e,
                    "Closing oracle session failed"
                );
                false
            }
        };
        (read, closed)
    }

    async fn on_player(&mut self, game: &Game, player: String, muted: bool) -> CycleOutcome {
        if player.trim().is_empty() || player == game.last_player_up {
            debug!(
                guild = %self.guild,
                game_id = %self.game_id,
                player = %player,
                failed_cycles = self.reload_failures,
                "Player up found, no change"
            );
            self.reload_failures = 0;
            return CycleOutcome::Unchanged;
        }

        self.phase = WatcherPhase::Notifying;
        if !self
            .ctx
            .registry
            .update_last_player_up(&self.guild, self.game_id, &player)
        {
            self.phase = WatcherPhase::Polling;
            return CycleOutcome::GameRemoved;
        }
        self.reload_failures = 0;

        let notified = if muted {
            info!(
                guild = %self.guild,
                game_id = %self.game_id,
                player = %player,
                "New player up while muted, notification suppressed"
            );
            false
        } else {
            let mention = self
                .ctx
                .registry
                .player(&self.guild, &player)
                .map(|registered| registered.caller_id);
            let text = player_up_message(game, &player, mention.as_ref());
            info!(guild = %self.guild, game_id = %self.game_id, "{}", text);
            deliver(self.ctx.notifier.as_ref(), &game.channel, &text).await
        };

        self.phase = WatcherPhase::Polling;
        CycleOutcome::Changed { player, notified }
    }

    async fn record_failure(&mut self, game: &Game) -> CycleOutcome {
        self.reload_failures += 1;
        let limit = self.ctx.settings.reload_attempts;
        if self.reload_failures < limit {
            info!(
                guild = %self.guild,
                game_id = %self.game_id,
                reload_counter = self.reload_failures,
                max_reloads = limit,
                "Player up not found, ignoring for now"
            );
            return CycleOutcome::Failed {
                failures: self.reload_failures,
            };
        }

        let Some(removed) = self.ctx.registry.remove_game(&self.guild, game.id) else {
            return CycleOutcome::GameRemoved;
        };
        let text = game_over_message(&removed);
        info!(guild = %self.guild, game_id = %self.game_id, "{}", text);
        deliver(self.ctx.notifier.as_ref(), &removed.channel, &text).await;
        CycleOutcome::GameOver
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingNotifier, ScriptedLoad, ScriptedOracle};
    use async_trait::async_trait;
    use std::time::Duration;
    use turnwatch_proto::{CallerId, ChannelRef, OracleError, OracleSession};

    const URL: &str = "http://x/g1";

    fn settings(reread_attempts: u32, reload_attempts: u32) -> WatcherSettings {
        WatcherSettings {
            refresh_interval: Duration::from_millis(5),
            reread_attempts,
            reread_pause: Duration::from_millis(1),
            reload_attempts,
            mute_window: Duration::from_secs(3600),
        }
    }

    struct Fixture {
        registry: Arc<Registry>,
        oracle: ScriptedOracle,
        notifier: RecordingNotifier,
        game: Game,
    }

    impl Fixture {
        fn new() -> Self {
            let registry = Arc::new(Registry::in_memory());
            let game = registry.add_game("Table", URL, ChannelRef::new("general"), Some("Chess"));
            Self {
                registry,
                oracle: ScriptedOracle::new(),
                notifier: RecordingNotifier::new(),
                game,
            }
        }

        fn watcher(&self, settings: WatcherSettings) -> Watcher {
            let ctx = WatcherContext {
                registry: Arc::clone(&self.registry),
                oracle: Arc::new(self.oracle.clone()),
                notifier: Arc::new(self.notifier.clone()),
                settings,
            };
            Watcher::new("Table", self.game.id, ctx, CancellationToken::new())
        }
    }

    #[tokio::test]
    async fn reread_ladder_finds_player_on_third_read() {
        let fx = Fixture::new();
        fx.oracle.push(
            URL,
            ScriptedLoad::page(vec![
                WhoIsUp::NotFound,
                WhoIsUp::NotFound,
                WhoIsUp::Found("Alice".into()),
            ]),
        );
        let mut watcher = fx.watcher(settings(3, 5));

        let outcome = watcher.run_cycle().await;

        assert_eq!(
            outcome,
            CycleOutcome::Changed {
                player: "Alice".into(),
                notified: true
            }
        );
        assert_eq!(fx.notifier.texts(), vec!["Alice is up in game 0: Chess"]);
        assert_eq!(fx.registry.game("Table", fx.game.id).unwrap().last_player_up, "Alice");
        assert_eq!(fx.oracle.read_count(), 3);
        assert_eq!(fx.oracle.close_count(), 1);
        assert_eq!(watcher.phase(), WatcherPhase::Polling);
    }

    #[tokio::test]
    async fn reread_ladder_is_bounded() {
        let fx = Fixture::new();
        fx.oracle.push(
            URL,
            ScriptedLoad::page(vec![
                WhoIsUp::NotFound,
                WhoIsUp::Ambiguous,
                WhoIsUp::Found("too late".into()),
            ]),
        );
        let mut watcher = fx.watcher(settings(2, 5));

        assert_eq!(watcher.run_cycle().await, CycleOutcome::Failed { failures: 1 });
        assert_eq!(fx.oracle.read_count(), 2);
        assert_eq!(fx.oracle.close_count(), 1);
        assert!(fx.notifier.texts().is_empty());
    }

    #[tokio::test]
    async fn same_player_is_not_renotified_and_resets_counter() {
        let fx = Fixture::new();
        fx.registry.update_last_player_up("Table", fx.game.id, "Alice");
        fx.oracle.push(URL, ScriptedLoad::Fail);
        fx.oracle.push(URL, ScriptedLoad::page(vec![WhoIsUp::Found("Alice".into())]));
        let mut watcher = fx.watcher(settings(1, 5));

        assert_eq!(watcher.run_cycle().await, CycleOutcome::Failed { failures: 1 });
        assert_eq!(watcher.reload_failures(), 1);
        assert_eq!(watcher.run_cycle().await, CycleOutcome::Unchanged);
        assert_eq!(watcher.reload_failures(), 0);
        assert!(fx.notifier.texts().is_empty());
    }

    #[tokio::test]
    async fn blank_player_is_a_no_op() {
        let fx = Fixture::new();
        fx.oracle.push(URL, ScriptedLoad::page(vec![WhoIsUp::Found("   ".into())]));
        let mut watcher = fx.watcher(settings(1, 5));

        assert_eq!(watcher.run_cycle().await, CycleOutcome::Unchanged);
        assert!(fx.registry.game("Table", fx.game.id).unwrap().last_player_up.is_empty());
        assert!(fx.notifier.texts().is_empty());
    }

    #[tokio::test]
    async fn registered_player_is_mentioned() {
        let fx = Fixture::new();
        fx.registry
            .add_player("Table", "Alice", CallerId::new("1001"), "alice#1");
        fx.oracle.push(URL, ScriptedLoad::page(vec![WhoIsUp::Found("Alice".into())]));
        let mut watcher = fx.watcher(settings(1, 5));

        watcher.run_cycle().await;
        assert_eq!(
            fx.notifier.texts(),
            vec!["Alice is up in game 0: Chess <@1001>"]
        );
    }

    #[tokio::test]
    async fn ladder_exhaustion_removes_game_once() {
        let fx = Fixture::new();
        let mut watcher = fx.watcher(settings(1, 5));

        for expected in 1..5 {
            assert_eq!(
                watcher.run_cycle().await,
                CycleOutcome::Failed { failures: expected }
            );
        }
        assert_eq!(watcher.run_cycle().await, CycleOutcome::GameOver);

        assert!(fx.registry.game("Table", fx.game.id).is_none());
        let texts = fx.notifier.texts();
        assert_eq!(texts.len(), 1);
        assert!(texts[0].to_lowercase().contains("game 0 appears to be over"));
        assert_eq!(fx.oracle.open_count(), 5);

        // Nothing left to poll
        assert_eq!(watcher.run_cycle().await, CycleOutcome::GameRemoved);
        assert_eq!(fx.oracle.open_count(), 5);
    }

    #[tokio::test]
    async fn muted_change_updates_state_without_notifying() {
        let fx = Fixture::new();
        fx.registry.set_mute_start("Table", Some(Utc::now()));
        fx.oracle.push(URL, ScriptedLoad::page(vec![WhoIsUp::Found("Bob".into())]));
        let mut watcher = fx.watcher(settings(1, 5));

        assert_eq!(
            watcher.run_cycle().await,
            CycleOutcome::Changed {
                player: "Bob".into(),
                notified: false
            }
        );
        assert_eq!(fx.registry.game("Table", fx.game.id).unwrap().last_player_up, "Bob");
        assert!(fx.notifier.texts().is_empty());

        // Unmuting does not replay the suppressed notification
        fx.registry.set_mute_start("Table", None);
        fx.oracle.push(URL, ScriptedLoad::page(vec![WhoIsUp::Found("Bob".into())]));
        assert_eq!(watcher.run_cycle().await, CycleOutcome::Unchanged);
        assert!(fx.notifier.texts().is_empty());
    }

    #[tokio::test]
    async fn expired_mute_does_not_suppress() {
        let fx = Fixture::new();
        fx.registry
            .set_mute_start("Table", Some(Utc::now() - chrono::Duration::hours(2)));
        fx.oracle.push(URL, ScriptedLoad::page(vec![WhoIsUp::Found("Bob".into())]));
        let mut watcher = fx.watcher(settings(1, 5));

        watcher.run_cycle().await;
        assert_eq!(fx.notifier.texts(), vec!["Bob is up in game 0: Chess"]);
    }

    #[tokio::test]
    async fn unavailable_channel_does_not_affect_state() {
        let fx = Fixture::new();
        fx.notifier.fail_channel("general");
        fx.oracle.push(URL, ScriptedLoad::page(vec![WhoIsUp::Found("Bob".into())]));
        let mut watcher = fx.watcher(settings(1, 5));

        assert_eq!(
            watcher.run_cycle().await,
            CycleOutcome::Changed {
                player: "Bob".into(),
                notified: false
            }
        );
        assert_eq!(watcher.reload_failures(), 0);
        assert_eq!(fx.registry.game("Table", fx.game.id).unwrap().last_player_up, "Bob");
    }

    #[tokio::test]
    async fn close_failure_counts_as_failed_cycle() {
        let fx = Fixture::new();
        fx.oracle.push(
            URL,
            ScriptedLoad::page_failing_close(vec![WhoIsUp::Found("Alice".into())]),
        );
        let mut watcher = fx.watcher(settings(1, 5));

        assert_eq!(watcher.run_cycle().await, CycleOutcome::Failed { failures: 1 });
        // The read itself still counted
        assert_eq!(fx.registry.game("Table", fx.game.id).unwrap().last_player_up, "Alice");
    }

    #[tokio::test]
    async fn panicking_oracle_counts_as_failed_cycle() {
        let fx = Fixture::new();
        fx.oracle.push(URL, ScriptedLoad::Panic);
        let mut watcher = fx.watcher(settings(1, 5));

        assert_eq!(watcher.run_cycle().await, CycleOutcome::Failed { failures: 1 });
        assert_eq!(watcher.phase(), WatcherPhase::Polling);
    }

    #[tokio::test]
    async fn panicking_read_still_closes_session() {
        let fx = Fixture::new();
        fx.oracle.push(URL, ScriptedLoad::PanicOnRead);
        let mut watcher = fx.watcher(settings(3, 5));

        assert_eq!(watcher.run_cycle().await, CycleOutcome::Failed { failures: 1 });
        assert_eq!(fx.oracle.open_count(), 1);
        assert_eq!(fx.oracle.close_count(), 1);
        assert_eq!(fx.oracle.read_count(), 1);
        assert!(fx.registry.game("Table", fx.game.id).is_some());
    }

    /// Oracle whose read removes the game before reporting a player.
    struct RemovingOracle {
        registry: Arc<Registry>,
        game_id: GameId,
    }

    struct RemovingSession {
        registry: Arc<Registry>,
        game_id: GameId,
    }

    #[async_trait]
    impl TurnOracle for RemovingOracle {
        async fn open(&self, _url: &str) -> Result<Box<dyn OracleSession>, OracleError> {
            Ok(Box::new(RemovingSession {
                registry: Arc::clone(&self.registry),
                game_id: self.game_id,
            }))
        }
    }

    #[async_trait]
    impl OracleSession for RemovingSession {
        async fn check_who_is_up(&mut self) -> WhoIsUp {
            self.registry.remove_game("Table", self.game_id);
            WhoIsUp::Found("Alice".into())
        }

        async fn close(self: Box<Self>) -> Result<(), OracleError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn game_removed_mid_cycle_is_not_announced() {
        let fx = Fixture::new();
        let ctx = WatcherContext {
            registry: Arc::clone(&fx.registry),
            oracle: Arc::new(RemovingOracle {
                registry: Arc::clone(&fx.registry),
                game_id: fx.game.id,
            }),
            notifier: Arc::new(fx.notifier.clone()),
            settings: settings(1, 5),
        };
        let mut watcher = Watcher::new("Table", fx.game.id, ctx, CancellationToken::new());

        assert_eq!(watcher.run_cycle().await, CycleOutcome::GameRemoved);
        assert_eq!(watcher.phase(), WatcherPhase::Polling);
        assert!(fx.registry.game("Table", fx.game.id).is_none());
        assert!(fx.notifier.texts().is_empty());
    }

    #[tokio::test]
    async fn game_over_notice_is_sent_while_muted() {
        let fx = Fixture::new();
        fx.registry.set_mute_start("Table", Some(Utc::now()));
        let mut watcher = fx.watcher(settings(1, 1));

        assert_eq!(watcher.run_cycle().await, CycleOutcome::GameOver);
        assert!(fx.registry.game("Table", fx.game.id).is_none());
        let texts = fx.notifier.texts();
        assert_eq!(texts.len(), 1);
        assert!(texts[0].starts_with("Game 0 appears to be over"));
    }

    #[tokio::test]
    async fn removed_game_terminates_without_polling() {
        let fx = Fixture::new();
        fx.registry.remove_game("Table", fx.game.id);
        let mut watcher = fx.watcher(settings(1, 5));

        assert_eq!(watcher.run_cycle().await, CycleOutcome::GameRemoved);
        assert_eq!(fx.oracle.open_count(), 0);
    }

    #[tokio::test]
    async fn cancelled_watcher_exits_run_loop() {
        let fx = Fixture::new();
        fx.oracle
            .set_fallback(ScriptedLoad::page(vec![WhoIsUp::Found("Alice".into())]));
        let cancel = CancellationToken::new();
        let ctx = WatcherContext {
            registry: Arc::clone(&fx.registry),
            oracle: Arc::new(fx.oracle.clone()),
            notifier: Arc::new(fx.notifier.clone()),
            settings: WatcherSettings {
                refresh_interval: Duration::from_secs(3600),
                ..settings(1, 5)
            },
        };
        let watcher = Watcher::new("Table", fx.game.id, ctx, cancel.clone());
        let task = tokio::spawn(watcher.run());

        fx.notifier.wait_for(1, Duration::from_secs(5)).await;
        cancel.cancel();
        let reason = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("watcher should stop within the sleep")
            .unwrap();
        assert_eq!(reason, TerminationReason::Cancelled);
        assert_eq!(fx.oracle.open_count(), fx.oracle.close_count());
    }

    #[tokio::test]
    async fn cancel_during_reread_pause_closes_session() {
        let fx = Fixture::new();
        fx.oracle.push(URL, ScriptedLoad::page(vec![WhoIsUp::NotFound]));
        let cancel = CancellationToken::new();
        let ctx = WatcherContext {
            registry: Arc::clone(&fx.registry),
            oracle: Arc::new(fx.oracle.clone()),
            notifier: Arc::new(fx.notifier.clone()),
            settings: WatcherSettings {
                reread_pause: Duration::from_secs(3600),
                ..settings(3, 5)
            },
        };
        let mut watcher = Watcher::new("Table", fx.game.id, ctx, cancel.clone());

        let cancel_soon = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel.cancel();
        };
        let (outcome, ()) = tokio::join!(watcher.run_cycle(), cancel_soon);

        assert_eq!(outcome, CycleOutcome::Cancelled);
        assert_eq!(fx.oracle.open_count(), 1);
        assert_eq!(fx.oracle.close_count(), 1);
    }
}
