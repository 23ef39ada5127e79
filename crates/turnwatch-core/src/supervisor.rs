//! Owns the set of live watchers, one per followed game.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use turnwatch_proto::GameId;

use crate::registry::Registry;
use crate::watcher::{TerminationReason, Watcher, WatcherContext};

type WatcherKey = (String, GameId);

/// Errors from the watcher supervisor.
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("no tokio runtime available for watcher tasks")]
    NoRuntime,
}

struct WatcherHandle {
    cancel: CancellationToken,
    task: JoinHandle<TerminationReason>,
}

/// Starts, stops, and restores watcher tasks.
pub struct WatcherSupervisor {
    ctx: WatcherContext,
    runtime: Handle,
    watchers: Mutex<HashMap<WatcherKey, WatcherHandle>>,
}

impl WatcherSupervisor {
    /// Creates a supervisor that spawns onto the current tokio runtime.
    pub fn new(ctx: WatcherContext) -> Result<Self, SupervisorError> {
        let runtime = Handle::try_current().map_err(|_| SupervisorError::NoRuntime)?;
        Ok(Self {
            ctx,
            runtime,
            watchers: Mutex::new(HashMap::new()),
        })
    }

    fn watchers(&self) -> MutexGuard<'_, HashMap<WatcherKey, WatcherHandle>> {
        self.watchers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Locks the handle map after dropping watchers that exited on their own.
    fn live_watchers(&self) -> MutexGuard<'_, HashMap<WatcherKey, WatcherHandle>> {
        let mut watchers = self.watchers();
        watchers.retain(|_, handle| !handle.task.is_finished());
        watchers
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.ctx.registry
    }

    pub fn context(&self) -> &WatcherContext {
        &self.ctx
    }

    /// Starts a watcher for the game. Returns `false` if one is already running.
    pub fn spawn_watcher(&self, guild: &str, game_id: GameId) -> bool {
        let key = (guild.to_string(), game_id);
        let mut watchers = self.live_watchers();
        if watchers.contains_key(&key) {
            debug!(guild = %guild, game_id = %game_id, "Watcher already running");
            return false;
        }

        let cancel = CancellationToken::new();
        let watcher = Watcher::new(guild, game_id, self.ctx.clone(), cancel.clone());
        let task = self.runtime.spawn(watcher.run());
        watchers.insert(key, WatcherHandle { cancel, task });
        true
    }

    /// Signals the game's watcher to stop. Returns whether one was running.
    ///
    /// The watcher observes the signal at its next suspension point and closes
    /// any open oracle session before exiting.
    pub fn stop_watcher(&self, guild: &str, game_id: GameId) -> bool {
        let handle = self.watchers().remove(&(guild.to_string(), game_id));
        match handle {
            Some(handle) => {
                handle.cancel.cancel();
                debug!(guild = %guild, game_id = %game_id, "Watcher stop requested");
                !handle.task.is_finished()
            }
            None => false,
        }
    }

    /// Starts a watcher for every game in the registry. Returns how many were started.
    pub fn restore_all(&self) -> usize {
        let started = self
            .ctx
            .registry
            .game_keys()
            .into_iter()
            .filter(|(guild, game_id)| self.spawn_watcher(guild, *game_id))
            .count();
        info!(watchers = started, "Restored watchers from registry");
        started
    }

    /// Whether a watcher for the game is still running.
    pub fn is_running(&self, guild: &str, game_id: GameId) -> bool {
        self.watchers()
            .get(&(guild.to_string(), game_id))
            .is_some_and(|handle| !handle.task.is_finished())
    }

    /// Number of watchers still running.
    pub fn running_count(&self) -> usize {
        self.live_watchers().len()
    }

    /// Cancels every watcher and waits for all of them to exit.
    pub async fn shutdown(&self) {
        let handles: Vec<(WatcherKey, WatcherHandle)> = self.watchers().drain().collect();
        for (_, handle) in &handles {
            handle.cancel.cancel();
        }
        for ((guild, game_id), handle) in handles {
            match handle.task.await {
                Ok(reason) => {
                    debug!(guild = %guild, game_id = %game_id, reason = ?reason, "Watcher exited");
                }
                Err(e) => {
                    warn!(guild = %guild, game_id = %game_id, error = %e, "Watcher task failed");
                }
            }
        }
        info!("All watchers stopped");
    }
}

impl std::fmt::Debug for WatcherSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherSupervisor")
            .field("running", &self.running_count())
            .finish_non_exhaustive()
    }
}
