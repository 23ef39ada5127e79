//! # turnwatch-core
//!
//! Core engine for Turnwatch: follows turn-based games across many guilds and
//! announces whose turn it is.
//!
//! This crate provides:
//! - The registry of guilds, games, and registered players
//! - Durable JSON persistence of the registry
//! - The per-game watcher state machine and its supervisor
//! - Notification texts and mute handling
//! - The command-layer facade used by front ends
//! - Configuration loading

mod config;
mod model;
mod notify;
mod registry;
mod service;
mod state;
mod supervisor;
pub mod testing;
mod watcher;

pub use config::{ConfigError, NotifierConfig, OracleConfig, TurnwatchConfig, WatcherSettings};
pub use model::{Game, PlayerRef, RegistryDocument, Tenant};
pub use notify::{deliver, game_over_message, is_muted, player_up_message};
pub use registry::Registry;
pub use service::{CommandError, RESET_BASE_ID, TurnWatch};
pub use state::{PersistError, StateStore};
pub use supervisor::{SupervisorError, WatcherSupervisor};
pub use watcher::{CycleOutcome, TerminationReason, Watcher, WatcherContext, WatcherPhase};
