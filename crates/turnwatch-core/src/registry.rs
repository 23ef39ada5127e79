//! The registry: single owned store of every guild's games and players.
//!
//! Each guild sits behind its own mutex, so mutations in different guilds do
//! not serialize with each other. Every mutation is flushed to the
//! [`StateStore`] before it returns. Flushes are serialized, and each one
//! snapshots the registry after taking the flush lock, so a completed flush
//! always contains every mutation acknowledged before it started.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use turnwatch_proto::{CallerId, ChannelRef, GameId};

use crate::model::{Game, PlayerRef, RegistryDocument, Tenant};
use crate::state::{PersistError, StateStore};

type TenantCell = Arc<Mutex<Tenant>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Synchronized store of all tenant state.
#[derive(Debug, Default)]
pub struct Registry {
    tenants: RwLock<HashMap<String, TenantCell>>,
    store: Option<StateStore>,
    flush_lock: Mutex<()>,
}

impl Registry {
    /// Creates an empty registry that is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Creates a registry backed by `store`, restoring whatever it holds.
    ///
    /// A missing, empty, or corrupt document yields an empty registry.
    pub fn open(store: StateStore) -> Self {
        let document = store.load_or_default();
        let registry = Self {
            store: Some(store),
            ..Self::default()
        };
        registry.restore(document);
        registry
    }

    /// Returns the backing store, if any.
    pub fn store(&self) -> Option<&StateStore> {
        self.store.as_ref()
    }

    fn existing(&self, name: &str) -> Option<TenantCell> {
        self.tenants
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    fn cell(&self, name: &str) -> TenantCell {
        if let Some(cell) = self.existing(name) {
            return cell;
        }
        let mut tenants = self.tenants.write().unwrap_or_else(PoisonError::into_inner);
        tenants
            .entry(name.to_string())
            .or_insert_with(|| {
                info!(guild = %name, "Adding new guild to registry");
                Arc::new(Mutex::new(Tenant::default()))
            })
            .clone()
    }

    /// Runs `f` against the guild's state (creating it if needed), then flushes.
    fn mutate<R>(&self, name: &str, f: impl FnOnce(&mut Tenant) -> R) -> R {
        let cell = self.cell(name);
        let result = {
            let mut tenant = lock(&cell);
            f(&mut tenant)
        };
        self.persist();
        result
    }

    /// Runs `f` against the guild's state without creating it.
    fn read<R>(&self, name: &str, f: impl FnOnce(&Tenant) -> R) -> Option<R> {
        let cell = self.existing(name)?;
        let tenant = lock(&cell);
        Some(f(&tenant))
    }

    /// Returns a copy of the guild's state, creating an empty guild on first access.
    pub fn get_or_create_tenant(&self, name: &str) -> Tenant {
        let cell = self.cell(name);
        let tenant = lock(&cell);
        tenant.clone()
    }

    /// Names of all known guilds.
    pub fn tenant_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .tenants
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    // ─────────────────────────────────────────────────────────────────────────
    // GAMES
    // ─────────────────────────────────────────────────────────────────────────

    /// Allocates the next id and inserts a game with no known player.
    pub fn add_game(
        &self,
        name: &str,
        url: &str,
        channel: ChannelRef,
        friendly_name: Option<&str>,
    ) -> Game {
        self.mutate(name, |tenant| {
            let id = tenant.next_game_id;
            tenant.next_game_id = id.next();
            let game = Game {
                id,
                url: url.to_string(),
                channel,
                friendly_name: friendly_name
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .map_or_else(|| Game::default_name(id), str::to_string),
                last_player_up: String::new(),
            };
            tenant.games.insert(id, game.clone());
            debug!(guild = %name, game_id = %id, url = %url, "Game added");
            game
        })
    }

    /// Removes a game. Returns the removed entry, or `None` if it was not present.
    pub fn remove_game(&self, name: &str, id: GameId) -> Option<Game> {
        self.existing(name)?;
        let removed = self.mutate(name, |tenant| tenant.games.remove(&id));
        if let Some(game) = &removed {
            info!(guild = %name, game_id = %id, friendly_name = %game.friendly_name, "Game was deleted");
        }
        removed
    }

    /// Looks up a single game.
    pub fn game(&self, name: &str, id: GameId) -> Option<Game> {
        self.read(name, |tenant| tenant.games.get(&id).cloned())
            .flatten()
    }

    /// All games of a guild, ordered by id.
    pub fn games(&self, name: &str) -> Vec<Game> {
        self.read(name, |tenant| tenant.games.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Records the active player. No-op (returns `false`) if the game is gone.
    pub fn update_last_player_up(&self, name: &str, id: GameId, player: &str) -> bool {
        if self.existing(name).is_none() {
            return false;
        }
        self.mutate(name, |tenant| match tenant.games.get_mut(&id) {
            Some(game) => {
                game.last_player_up = player.to_string();
                true
            }
            None => false,
        })
    }

    /// Moves the id counter to `base`, or past the highest remaining id if
    /// that is larger. Returns the new counter.
    pub fn rebase_game_ids(&self, name: &str, base: GameId) -> GameId {
        self.mutate(name, |tenant| {
            let floor = tenant
                .games
                .keys()
                .next_back()
                .map_or(base, |highest| highest.next());
            tenant.next_game_id = base.max(floor);
            tenant.next_game_id
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // PLAYERS
    // ─────────────────────────────────────────────────────────────────────────

    /// Maps `handle` to `caller`. A caller holds one handle at a time, so any
    /// other handles mapped to the same caller are dropped and returned.
    pub fn add_player(
        &self,
        name: &str,
        handle: &str,
        caller: CallerId,
        display_name: &str,
    ) -> Vec<String> {
        self.mutate(name, |tenant| {
            let displaced: Vec<String> = tenant
                .players
                .iter()
                .filter(|(h, p)| p.caller_id == caller && h.as_str() != handle)
                .map(|(h, _)| h.clone())
                .collect();
            for h in &displaced {
                tenant.players.remove(h);
            }
            tenant.players.insert(
                handle.to_string(),
                PlayerRef {
                    caller_id: caller,
                    display_name: display_name.to_string(),
                },
            );
            displaced
        })
    }

    /// Removes every handle mapped to `caller`. Returns the removed handles.
    pub fn remove_players_by_caller(&self, name: &str, caller: &CallerId) -> Vec<String> {
        if self.existing(name).is_none() {
            return Vec::new();
        }
        self.mutate(name, |tenant| {
            let removed: Vec<String> = tenant
                .players
                .iter()
                .filter(|(_, p)| &p.caller_id == caller)
                .map(|(h, _)| h.clone())
                .collect();
            for h in &removed {
                tenant.players.remove(h);
            }
            removed
        })
    }

    /// Looks up the registration for a handle.
    pub fn player(&self, name: &str, handle: &str) -> Option<PlayerRef> {
        self.read(name, |tenant| tenant.players.get(handle).cloned())
            .flatten()
    }

    /// All registrations of a guild, ordered by handle.
    pub fn players(&self, name: &str) -> Vec<(String, PlayerRef)> {
        self.read(name, |tenant| {
            tenant
                .players
                .iter()
                .map(|(h, p)| (h.clone(), p.clone()))
                .collect()
        })
        .unwrap_or_default()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // MUTE
    // ─────────────────────────────────────────────────────────────────────────

    /// Sets (`Some`) or clears (`None`) the mute start.
    pub fn set_mute_start(&self, name: &str, start: Option<DateTime<Utc>>) {
        self.mutate(name, |tenant| tenant.mute_start = start);
    }

    pub fn mute_start(&self, name: &str) -> Option<DateTime<Utc>> {
        self.read(name, |tenant| tenant.mute_start).flatten()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // SNAPSHOT / PERSISTENCE
    // ─────────────────────────────────────────────────────────────────────────

    /// A consistent copy of every guild.
    pub fn snapshot(&self) -> RegistryDocument {
        let cells: Vec<(String, TenantCell)> = self
            .tenants
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, cell)| (name.clone(), cell.clone()))
            .collect();
        let mut document = RegistryDocument::default();
        for (name, cell) in cells {
            document.tenants.insert(name, lock(&cell).clone());
        }
        document
    }

    /// Replaces all state with `document`.
    pub fn restore(&self, document: RegistryDocument) {
        let restored: HashMap<String, TenantCell> = document
            .tenants
            .into_iter()
            .map(|(name, tenant)| (name, Arc::new(Mutex::new(tenant))))
            .collect();
        info!(guilds = restored.len(), "Registry restored");
        *self.tenants.write().unwrap_or_else(PoisonError::into_inner) = restored;
    }

    /// Every (guild, game) pair currently registered.
    pub fn game_keys(&self) -> Vec<(String, GameId)> {
        self.snapshot().game_keys()
    }

    /// Writes the whole registry to the backing store.
    pub fn flush(&self) -> Result<(), PersistError> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let _guard = lock(&self.flush_lock);
        store.save(&self.snapshot())
    }

    fn persist(&self) {
        if let Err(e) = self.flush() {
            warn!(error = %e, "Failed to persist registry; change is held in memory only");
        }
    }
}
