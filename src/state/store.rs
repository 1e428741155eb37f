//! Crawl state persistence
//!
//! The crawler only talks to a [`StateStore`]; production uses the JSON file
//! store and tests inject the in-memory one.

use crate::index::{corrupt_path, write_atomic};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::{CrawlState, STATE_VERSION};

/// State persistence errors
#[derive(Debug, Error)]
pub enum StateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unsupported state version {0}")]
    UnsupportedVersion(u32),
}

/// Loads and saves [`CrawlState`]
pub trait StateStore: Send + Sync {
    /// Returns the stored state, or `None` when there is nothing to resume
    fn load(&self) -> Result<Option<CrawlState>, StateError>;

    fn save(&self, state: &CrawlState) -> Result<(), StateError>;

    /// Forgets any stored state
    fn clear(&self) -> Result<(), StateError>;
}

fn decode(bytes: &[u8]) -> Result<CrawlState, StateError> {
    let state: CrawlState = serde_json::from_slice(bytes)?;
    if state.version != STATE_VERSION {
        return Err(StateError::UnsupportedVersion(state.version));
    }
    Ok(state)
}

/// JSON file store with temp-then-rename writes
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for FileStateStore {
    /// A file that cannot be decoded is renamed to `<path>.corrupt` and
    /// treated as absent.
    fn load(&self) -> Result<Option<CrawlState>, StateError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No crawl state at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        match decode(&bytes) {
            Ok(state) => {
                info!(
                    "Loaded crawl state from {} ({} queued, {} seen)",
                    self.path.display(),
                    state.queue.len(),
                    state.seen.len()
                );
                Ok(Some(state))
            }
            Err(e) => {
                let aside = corrupt_path(&self.path);
                warn!(
                    "Crawl state at {} is unreadable ({}), moving it to {}",
                    self.path.display(),
                    e,
                    aside.display()
                );
                fs::rename(&self.path, &aside)?;
                Ok(None)
            }
        }
    }

    fn save(&self, state: &CrawlState) -> Result<(), StateError> {
        let bytes = serde_json::to_vec_pretty(state)?;
        write_atomic(&self.path, &bytes)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StateError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory store holding the serialized JSON
///
/// Clones share the same slot, so a test can keep one handle and give
/// another to the crawler.
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    slot: Arc<Mutex<Option<String>>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw JSON of the last save
    pub fn contents(&self) -> Option<String> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> Result<Option<CrawlState>, StateError> {
        match self.contents() {
            Some(json) => Ok(Some(decode(json.as_bytes())?)),
            None => Ok(None),
        }
    }

    fn save(&self, state: &CrawlState) -> Result<(), StateError> {
        let json = serde_json::to_string(state)?;
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(json);
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), StateError> {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = None;
        }
        Ok(())
    }
}
