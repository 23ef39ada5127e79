//! Channel notifier for the binary.
//!
//! Channel references that are `http(s)` URLs are treated as chat webhooks and
//! receive a JSON `{"content": ...}` POST. Any other reference is printed to
//! stdout, prefixed with the channel name.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tracing::warn;
use turnwatch_core::NotifierConfig;
use turnwatch_proto::{ChannelRef, Notifier, NotifyError};

/// Maximum number of delivery attempts per message.
pub const MAX_SEND_RETRIES: u32 = 3;

/// Base delay for exponential backoff (1s, 2s, 4s...).
pub const BASE_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Outcome of a single failed delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptError {
    /// The channel does not exist any more; retrying cannot help.
    Gone(String),
    /// Anything else; worth another try.
    Transient(String),
}

/// Delivers with retry and exponential backoff.
///
/// Retries up to [`MAX_SEND_RETRIES`] times with delays of 1s, 2s between
/// attempts. A [`AttemptError::Gone`] stops immediately as `Unavailable`.
/// `sleep_fn` is injectable so tests run without real delays.
pub async fn retry_with_backoff<F, Fut, S, SFut>(
    channel: &ChannelRef,
    mut send_fn: F,
    mut sleep_fn: S,
) -> Result<(), NotifyError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<(), AttemptError>>,
    S: FnMut(Duration) -> SFut,
    SFut: Future<Output = ()>,
{
    let mut last_error = String::new();

    for attempt in 1..=MAX_SEND_RETRIES {
        match send_fn(attempt).await {
            Ok(()) => return Ok(()),
            Err(AttemptError::Gone(reason)) => {
                return Err(NotifyError::Unavailable {
                    channel: channel.to_string(),
                    reason,
                });
            }
            Err(AttemptError::Transient(reason)) => {
                warn!(
                    channel = %channel,
                    attempt = attempt,
                    max_retries = MAX_SEND_RETRIES,
                    error = %reason,
                    "Channel send failed, {}",
                    if attempt < MAX_SEND_RETRIES {
                        "retrying with backoff"
                    } else {
                        "all retries exhausted"
                    }
                );
                last_error = reason;
                if attempt < MAX_SEND_RETRIES {
                    let delay = BASE_RETRY_DELAY * 2u32.pow(attempt - 1);
                    sleep_fn(delay).await;
                }
            }
        }
    }

    Err(NotifyError::Rejected {
        channel: channel.to_string(),
        attempts: MAX_SEND_RETRIES,
        reason: last_error,
    })
}

#[derive(Debug, Serialize)]
struct WebhookMessage<'a> {
    content: &'a str,
}

/// Sends to webhooks or the console depending on the channel reference.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    client: reqwest::Client,
}

impl ChannelNotifier {
    pub fn new(config: &NotifierConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client })
    }

    async fn post(&self, url: &str, text: &str) -> Result<(), AttemptError> {
        let response = self
            .client
            .post(url)
            .json(&WebhookMessage { content: text })
            .send()
            .await
            .map_err(|e| AttemptError::Transient(e.to_string()))?;
        classify_status(response.status())
    }
}

/// Maps a webhook response status to an attempt result.
pub fn classify_status(status: StatusCode) -> Result<(), AttemptError> {
    if status.is_success() {
        Ok(())
    } else if matches!(
        status,
        StatusCode::NOT_FOUND | StatusCode::GONE | StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED
    ) {
        Err(AttemptError::Gone(format!("HTTP {status}")))
    } else {
        Err(AttemptError::Transient(format!("HTTP {status}")))
    }
}

fn is_webhook(channel: &ChannelRef) -> bool {
    let target = channel.as_str();
    target.starts_with("http://") || target.starts_with("https://")
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn send(&self, channel: &ChannelRef, text: &str) -> Result<(), NotifyError> {
        if !is_webhook(channel) {
            println!("[{channel}] {text}");
            return Ok(());
        }
        retry_with_backoff(
            channel,
            |_attempt| self.post(channel.as_str(), text),
            tokio::time::sleep,
        )
        .await
    }
}
