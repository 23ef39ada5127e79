//! Turn oracle that fetches a game page over HTTP and finds the active player
//! with a configurable regex.
//!
//! The first read of a session uses the body fetched by `open`. Later reads
//! fetch the page again, since a page that had not finished updating may show
//! the player on a second look.

use async_trait::async_trait;
use regex::Regex;
use std::time::Duration;
use tracing::debug;
use turnwatch_core::OracleConfig;
use turnwatch_proto::{OracleError, OracleSession, TurnOracle, WhoIsUp};

/// Errors building the oracle from configuration.
#[derive(Debug, thiserror::Error)]
pub enum OracleSetupError {
    #[error("invalid active player pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Classifies a page body.
///
/// Every match of `pattern` names a candidate. The `name` capture is used when
/// present, otherwise the first group, otherwise the whole match. No candidate
/// is `NotFound`; more than one distinct candidate is `Ambiguous`.
pub fn read_active_player(pattern: &Regex, body: &str) -> WhoIsUp {
    let mut found: Option<String> = None;
    for captures in pattern.captures_iter(body) {
        let Some(m) = captures
            .name("name")
            .or_else(|| captures.get(1))
            .or_else(|| captures.get(0))
        else {
            continue;
        };
        let name = m.as_str().trim();
        if name.is_empty() {
            continue;
        }
        match &found {
            Some(existing) if existing != name => return WhoIsUp::Ambiguous,
            Some(_) => {}
            None => found = Some(name.to_string()),
        }
    }
    found.map_or(WhoIsUp::NotFound, WhoIsUp::Found)
}

/// Fetches game pages with `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpOracle {
    client: reqwest::Client,
    pattern: Regex,
}

impl HttpOracle {
    pub fn new(config: &OracleConfig) -> Result<Self, OracleSetupError> {
        let pattern = Regex::new(&config.active_player_pattern)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client, pattern })
    }

    async fn fetch(&self, url: &str) -> Result<String, OracleError> {
        let load_error = |reason: String| OracleError::Load {
            url: url.to_string(),
            reason,
        };
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| load_error(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(load_error(format!("HTTP {status}")));
        }
        response.text().await.map_err(|e| load_error(e.to_string()))
    }
}

#[async_trait]
impl TurnOracle for HttpOracle {
    async fn open(&self, url: &str) -> Result<Box<dyn OracleSession>, OracleError> {
        let body = self.fetch(url).await?;
        debug!(url = %url, bytes = body.len(), "Fetched game page");
        Ok(Box::new(HttpSession {
            oracle: self.clone(),
            url: url.to_string(),
            body: Some(body),
        }))
    }
}

struct HttpSession {
    oracle: HttpOracle,
    url: String,
    body: Option<String>,
}

#[async_trait]
impl OracleSession for HttpSession {
    async fn check_who_is_up(&mut self) -> WhoIsUp {
        let body = match self.body.take() {
            Some(body) => body,
            None => match self.oracle.fetch(&self.url).await {
                Ok(body) => body,
                Err(e) => {
                    debug!(url = %self.url, error = %e, "Refetching game page failed");
                    return WhoIsUp::Ambiguous;
                }
            },
        };
        read_active_player(&self.oracle.pattern, &body)
    }

    async fn close(self: Box<Self>) -> Result<(), OracleError> {
        Ok(())
    }
}
