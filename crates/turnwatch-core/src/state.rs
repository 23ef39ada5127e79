//! Durable storage for the registry document.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::model::RegistryDocument;

/// Errors from reading or writing the registry document.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Reads and writes the registry document at a fixed path.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// Create a new StateStore that reads/writes to the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the document. Returns `None` if the file doesn't exist or is blank.
    pub fn load(&self) -> Result<Option<RegistryDocument>, PersistError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(None);
        }
        let document: RegistryDocument = serde_json::from_str(&contents)?;
        Ok(Some(document))
    }

    /// Save the document using atomic write (temp file + rename).
    pub fn save(&self, document: &RegistryDocument) -> Result<(), PersistError> {
        let json = serde_json::to_string_pretty(document)?;
        let tmp_path = self.path.with_extension("json.tmp");

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&tmp_path, &json)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    /// Load the document, treating anything unreadable as an empty registry.
    pub fn load_or_default(&self) -> RegistryDocument {
        match self.load() {
            Ok(Some(document)) => document,
            Ok(None) => RegistryDocument::default(),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Registry file unreadable, starting empty"
                );
                RegistryDocument::default()
            }
        }
    }

    /// Return the path to the document.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
