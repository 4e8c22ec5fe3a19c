//! In-memory engine for tests and benchmarks.
//!
//! Stores are registered under virtual paths and can be scripted to fail in
//! the ways a real engine does: corruption on open, corruption part-way
//! through a scan, unrelated failures, slow opens, and repairs that do or do
//! not recover the data.

use crate::store::{EngineError, EngineErrorKind, StoreEngine, StoreHandle};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Scripted condition of a memory store
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Health {
    #[default]
    Healthy,
    /// Open reports corruption; repair succeeds only if `repairable`
    Corrupted { repairable: bool },
    /// Open succeeds but the scan reports corruption after this many entries.
    /// Repair keeps the readable prefix.
    CorruptAfter(usize),
    /// Open fails with a non-corruption error; repair is a no-op
    Failing(String),
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pub records: BTreeMap<Vec<u8>, Vec<u8>>,
    pub health: Health,
    pub latency: Duration,
}

impl MemoryStore {
    pub fn with_records<K, V>(records: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<Vec<u8>>,
        V: Into<Vec<u8>>,
    {
        Self {
            records: records
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            ..Default::default()
        }
    }

    pub fn health(mut self, health: Health) -> Self {
        self.health = health;
        self
    }

    /// Delay applied to every open and repair
    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

/// Engine over a shared map of path -> store. Clones share the map, so a
/// test can keep a clone and change stores while a worker owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryEngine {
    stores: Arc<Mutex<HashMap<PathBuf, MemoryStore>>>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl Into<PathBuf>, store: MemoryStore) {
        self.lock().insert(path.into(), store);
    }

    pub fn get(&self, path: impl AsRef<Path>) -> Option<MemoryStore> {
        self.lock().get(path.as_ref()).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, MemoryStore>> {
        self.stores.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lookup(&self, path: &Path) -> Result<MemoryStore, EngineError> {
        self.get(path).ok_or_else(|| {
            EngineError::new(
                EngineErrorKind::NotFound,
                format!("{}: does not exist", path.display()),
            )
        })
    }
}

pub struct MemoryHandle {
    records: Vec<(Vec<u8>, Vec<u8>)>,
    corrupt_after: Option<usize>,
}

impl StoreEngine for MemoryEngine {
    type Handle = MemoryHandle;

    fn open(&self, path: &Path) -> Result<MemoryHandle, EngineError> {
        let store = self.lookup(path)?;
        if !store.latency.is_zero() {
            thread::sleep(store.latency);
        }

        let corrupt_after = match store.health {
            Health::Healthy => None,
            Health::CorruptAfter(n) => Some(n),
            Health::Corrupted { .. } => {
                return Err(EngineError::new(
                    EngineErrorKind::Corruption,
                    format!("Corruption: checksum mismatch in {}/000005.ldb", path.display()),
                ));
            }
            Health::Failing(message) => {
                return Err(EngineError::new(EngineErrorKind::Other, message));
            }
        };

        Ok(MemoryHandle {
            records: store.records.into_iter().collect(),
            corrupt_after,
        })
    }

    fn repair(&self, path: &Path) -> Result<(), EngineError> {
        let store = self.lookup(path)?;
        if !store.latency.is_zero() {
            thread::sleep(store.latency);
        }

        let mut stores = self.lock();
        let Some(entry) = stores.get_mut(path) else {
            return Err(EngineError::new(EngineErrorKind::NotFound, "store vanished during repair"));
        };

        match store.health {
            Health::Corrupted { repairable: false } => Err(EngineError::new(
                EngineErrorKind::Other,
                "no recoverable tables found",
            )),
            Health::Corrupted { repairable: true } => {
                entry.health = Health::Healthy;
                Ok(())
            }
            Health::CorruptAfter(n) => {
                entry.records = store.records.into_iter().take(n).collect();
                entry.health = Health::Healthy;
                Ok(())
            }
            Health::Healthy | Health::Failing(_) => Ok(()),
        }
    }
}

impl StoreHandle for MemoryHandle {
    fn for_each_entry(&mut self, visit: &mut dyn FnMut(&[u8], &[u8])) -> Result<(), EngineError> {
        for (i, (key, value)) in self.records.iter().enumerate() {
            if self.corrupt_after == Some(i) {
                return Err(EngineError::new(
                    EngineErrorKind::Corruption,
                    format!("Corruption: bad block after entry {}", i),
                ));
            }
            visit(key, value);
        }
        Ok(())
    }
}
