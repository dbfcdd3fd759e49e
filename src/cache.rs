use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::model::JournalRecord;
use crate::store::write_atomic;

/// Both listings as last collected, before reconciliation or enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedCollections {
    pub saved_at: DateTime<Utc>,
    #[serde(default)]
    pub vak: Vec<JournalRecord>,
    #[serde(default)]
    pub rsci: Vec<JournalRecord>,
}

impl CachedCollections {
    pub fn new(vak: Vec<JournalRecord>, rsci: Vec<JournalRecord>) -> Self {
        CachedCollections {
            saved_at: Utc::now(),
            vak,
            rsci,
        }
    }

    /// Only a cache holding both listings may stand in for a fresh collection.
    pub fn is_usable(&self) -> bool {
        !self.vak.is_empty() && !self.rsci.is_empty()
    }
}

/// Persisted collection state. Stores replace the whole value.
pub trait CollectionCache: Send + Sync {
    fn load(&self) -> Result<Option<CachedCollections>, StoreError>;
    fn store(&self, value: &CachedCollections) -> Result<(), StoreError>;

    /// A usable cached value, treating read errors as a miss.
    fn load_usable(&self) -> Option<CachedCollections> {
        match self.load() {
            Ok(Some(cached)) if cached.is_usable() => Some(cached),
            Ok(Some(_)) => {
                debug!("cache present but incomplete");
                None
            }
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "cache unreadable, collecting afresh");
                None
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct JsonFileCache {
    path: PathBuf,
}

impl JsonFileCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileCache { path: path.into() }
    }
}

impl CollectionCache for JsonFileCache {
    fn load(&self) -> Result<Option<CachedCollections>, StoreError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };
        let cached = serde_json::from_slice(&bytes).map_err(|e| StoreError::json(&self.path, e))?;
        Ok(Some(cached))
    }

    fn store(&self, value: &CachedCollections) -> Result<(), StoreError> {
        write_atomic(&self.path, |out| {
            serde_json::to_writer(&mut *out, value).map_err(|e| StoreError::json(&self.path, e))?;
            out.write_all(b"\n").map_err(|e| StoreError::io(&self.path, e))
        })
    }
}

#[cfg(any(test, feature = "testing"))]
#[derive(Debug, Default)]
pub struct MemoryCache {
    slot: std::sync::Mutex<Option<CachedCollections>>,
}

#[cfg(any(test, feature = "testing"))]
impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(value: CachedCollections) -> Self {
        MemoryCache {
            slot: std::sync::Mutex::new(Some(value)),
        }
    }

    pub fn snapshot(&self) -> Option<CachedCollections> {
        self.slot.lock().ok().and_then(|s| s.clone())
    }
}

#[cfg(any(test, feature = "testing"))]
impl CollectionCache for MemoryCache {
    fn load(&self) -> Result<Option<CachedCollections>, StoreError> {
        Ok(self.snapshot())
    }

    fn store(&self, value: &CachedCollections) -> Result<(), StoreError> {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(value.clone());
        }
        Ok(())
    }
}
