//! # turnwatch-proto
//!
//! Shared types, error definitions, and traits for the Turnwatch engine.
//!
//! This crate provides the foundational abstractions used across all Turnwatch
//! crates, including:
//! - Identifier newtypes for games, channels, and callers
//! - The `TurnOracle` / `OracleSession` pair that reports who is up in a game
//! - The `Notifier` boundary that delivers outbound chat messages
//! - Collaborator error types

mod error;
mod ids;
mod notifier;
mod oracle;

pub use error::{NotifyError, OracleError};
pub use ids::{CallerId, ChannelRef, GameId};
pub use notifier::Notifier;
pub use oracle::{OracleSession, TurnOracle, WhoIsUp};
