//! Scripted turn oracle for tests.
//!
//! Each `open` pops the next [`ScriptedLoad`] queued for that URL. When a
//! URL's queue is empty the fallback is used, and without a fallback the load
//! fails. Clones share the same script and counters.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use turnwatch_proto::{OracleError, OracleSession, TurnOracle, WhoIsUp};

/// What one `open` call does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedLoad {
    /// `open` returns a load error.
    Fail,
    /// `open` panics.
    Panic,
    /// `open` succeeds; every read panics.
    PanicOnRead,
    /// `open` succeeds; reads are served in order, then `Ambiguous` forever.
    Page { reads: Vec<WhoIsUp>, close_fails: bool },
}

impl ScriptedLoad {
    pub fn page(reads: Vec<WhoIsUp>) -> Self {
        Self::Page {
            reads,
            close_fails: false,
        }
    }

    pub fn page_failing_close(reads: Vec<WhoIsUp>) -> Self {
        Self::Page {
            reads,
            close_fails: true,
        }
    }
}

#[derive(Debug, Default)]
struct Script {
    loads: HashMap<String, VecDeque<ScriptedLoad>>,
    fallback: Option<ScriptedLoad>,
    opened: Vec<String>,
    reads: usize,
    closes: usize,
}

/// A [`TurnOracle`] driven by queued [`ScriptedLoad`]s.
#[derive(Debug, Clone, Default)]
pub struct ScriptedOracle {
    script: Arc<Mutex<Script>>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues a load for `url`.
    pub fn push(&self, url: &str, load: ScriptedLoad) {
        self.script()
            .loads
            .entry(url.to_string())
            .or_default()
            .push_back(load);
    }

    /// Load used whenever a URL has nothing queued.
    pub fn set_fallback(&self, load: ScriptedLoad) {
        self.script().fallback = Some(load);
    }

    /// Number of `open` calls so far.
    pub fn open_count(&self) -> usize {
        self.script().opened.len()
    }

    /// Number of `open` calls for one URL.
    pub fn open_count_for(&self, url: &str) -> usize {
        self.script().opened.iter().filter(|u| *u == url).count()
    }

    /// Number of sessions closed so far.
    pub fn close_count(&self) -> usize {
        self.script().closes
    }

    /// Number of `check_who_is_up` calls so far.
    pub fn read_count(&self) -> usize {
        self.script().reads
    }
}

#[async_trait]
impl TurnOracle for ScriptedOracle {
    async fn open(&self, url: &str) -> Result<Box<dyn OracleSession>, OracleError> {
        let load = {
            let mut script = self.script();
            script.opened.push(url.to_string());
            let queued = script.loads.get_mut(url).and_then(VecDeque::pop_front);
            queued.or_else(|| script.fallback.clone())
        };

        match load {
            None | Some(ScriptedLoad::Fail) => Err(OracleError::Load {
                url: url.to_string(),
                reason: "scripted load failure".to_string(),
            }),
            Some(ScriptedLoad::Panic) => panic!("scripted oracle panic for {url}"),
            Some(ScriptedLoad::PanicOnRead) => Ok(Box::new(ScriptedSession {
                reads: VecDeque::new(),
                close_fails: false,
                panic_on_read: true,
                script: Arc::clone(&self.script),
            })),
            Some(ScriptedLoad::Page { reads, close_fails }) => Ok(Box::new(ScriptedSession {
                reads: reads.into(),
                close_fails,
                panic_on_read: false,
                script: Arc::clone(&self.script),
            })),
        }
    }
}

struct ScriptedSession {
    reads: VecDeque<WhoIsUp>,
    close_fails: bool,
    panic_on_read: bool,
    script: Arc<Mutex<Script>>,
}

#[async_trait]
impl OracleSession for ScriptedSession {
    async fn check_who_is_up(&mut self) -> WhoIsUp {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .reads += 1;
        if self.panic_on_read {
            panic!("scripted read panic");
        }
        self.reads.pop_front().unwrap_or(WhoIsUp::Ambiguous)
    }

    async fn close(self: Box<Self>) -> Result<(), OracleError> {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .closes += 1;
        if self.close_fails {
            return Err(OracleError::Session("scripted close failure".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn serves_queued_loads_then_fallback() {
        let oracle = ScriptedOracle::new();
        oracle.push("a", ScriptedLoad::page(vec![WhoIsUp::Found("Alice".into())]));
        oracle.set_fallback(ScriptedLoad::Fail);

        let mut session = oracle.open("a").await.unwrap();
        assert_eq!(session.check_who_is_up().await, WhoIsUp::Found("Alice".into()));
        assert_eq!(session.check_who_is_up().await, WhoIsUp::Ambiguous);
        session.close().await.unwrap();

        assert!(oracle.open("a").await.is_err());
        assert_eq!(oracle.open_count_for("a"), 2);
        assert_eq!(oracle.read_count(), 2);
        assert_eq!(oracle.close_count(), 1);
    }

    #[tokio::test]
    async fn unscripted_url_fails_to_load() {
        let oracle = ScriptedOracle::new();
        assert!(matches!(
            oracle.open("nowhere").await,
            Err(OracleError::Load { .. })
        ));
    }
}
