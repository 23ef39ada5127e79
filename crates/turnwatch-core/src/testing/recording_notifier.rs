//! Notifier that records every message instead of delivering it.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use turnwatch_proto::{ChannelRef, Notifier, NotifyError};

/// A message captured by [`RecordingNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub channel: ChannelRef,
    pub text: String,
}

#[derive(Debug, Default)]
struct Inbox {
    sent: Vec<SentMessage>,
    unavailable: HashSet<String>,
}

/// Records deliveries. Clones share the same inbox.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    inbox: Arc<Mutex<Inbox>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn inbox(&self) -> MutexGuard<'_, Inbox> {
        self.inbox.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes every send to `channel` fail as unavailable.
    pub fn fail_channel(&self, channel: &str) {
        self.inbox().unavailable.insert(channel.to_string());
    }

    /// Every delivered message, in order.
    pub fn messages(&self) -> Vec<SentMessage> {
        self.inbox().sent.clone()
    }

    /// Text of every delivered message, in order.
    pub fn texts(&self) -> Vec<String> {
        self.inbox().sent.iter().map(|m| m.text.clone()).collect()
    }

    pub fn count(&self) -> usize {
        self.inbox().sent.len()
    }

    /// Waits until at least `count` messages were delivered or `timeout` passes.
    /// Returns whether the count was reached.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.count() >= count {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, channel: &ChannelRef, text: &str) -> Result<(), NotifyError> {
        let mut inbox = self.inbox();
        if inbox.unavailable.contains(channel.as_str()) {
            return Err(NotifyError::Unavailable {
                channel: channel.to_string(),
                reason: "channel marked unavailable".to_string(),
            });
        }
        inbox.sent.push(SentMessage {
            channel: channel.clone(),
            text: text.to_string(),
        });
        Ok(())
    }
}
