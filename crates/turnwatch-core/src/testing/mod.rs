//! Testing utilities for deterministic watcher tests.

pub mod recording_notifier;
pub mod scripted_oracle;

pub use recording_notifier::{RecordingNotifier, SentMessage};
pub use scripted_oracle::{ScriptedLoad, ScriptedOracle};
