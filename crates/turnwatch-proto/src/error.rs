//! Error types reported by the engine's external collaborators.

/// Failures raised by a [`TurnOracle`](crate::TurnOracle) or its sessions.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    /// The game page could not be loaded at all.
    #[error("failed to load {url}: {reason}")]
    Load { url: String, reason: String },

    /// An already-open session misbehaved (read or close failure).
    #[error("oracle session error: {0}")]
    Session(String),
}

/// Failures raised by a [`Notifier`](crate::Notifier).
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The destination channel no longer exists or cannot be reached.
    #[error("channel {channel} unavailable: {reason}")]
    Unavailable { channel: String, reason: String },

    /// The destination accepted the connection but refused the message.
    #[error("message rejected by {channel} after {attempts} attempts: {reason}")]
    Rejected {
        channel: String,
        attempts: u32,
        reason: String,
    },
}
