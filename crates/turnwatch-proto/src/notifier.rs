//! Outbound message boundary.

use async_trait::async_trait;

use crate::{ChannelRef, NotifyError};

/// Delivers a text message to a chat channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, channel: &ChannelRef, text: &str) -> Result<(), NotifyError>;
}
