//! The turn oracle: something that can load a game page and say who is up.

use async_trait::async_trait;

use crate::OracleError;

/// Result of a single "who is up?" read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WhoIsUp {
    /// The page names an active player.
    Found(String),
    /// The page loaded but no active player marker was present.
    NotFound,
    /// The read failed or the page was in a state that could not be interpreted.
    Ambiguous,
}

impl WhoIsUp {
    /// Returns the player name when one was found.
    pub fn player(&self) -> Option<&str> {
        match self {
            Self::Found(name) => Some(name),
            Self::NotFound | Self::Ambiguous => None,
        }
    }
}

/// Opens sessions against game pages.
///
/// Implementations must be shareable across watcher tasks; each watcher opens
/// a fresh session per poll cycle and never reuses it.
#[async_trait]
pub trait TurnOracle: Send + Sync {
    /// Loads the page at `url`.
    async fn open(&self, url: &str) -> Result<Box<dyn OracleSession>, OracleError>;
}

/// A loaded game page owned by exactly one watcher cycle.
#[async_trait]
pub trait OracleSession: Send {
    /// Reads the currently active player. Read failures are reported as
    /// [`WhoIsUp::Ambiguous`] so the caller can retry within the same session.
    async fn check_who_is_up(&mut self) -> WhoIsUp;

    /// Releases the session.
    async fn close(self: Box<Self>) -> Result<(), OracleError>;
}
