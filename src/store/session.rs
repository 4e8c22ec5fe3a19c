use crate::index::{Record, RecordIndex};
use crate::store::{OpenError, RepairError, StoreEngine, StoreHandle};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Owns the single connection to a store.
///
/// Opening always closes the previous handle first, so at most one handle
/// exists per session. Every engine failure is classified here and never
/// escapes as a raw engine error.
pub struct StoreSession<E: StoreEngine> {
    engine: E,
    handle: Option<E::Handle>,
    path: Option<PathBuf>,
}

impl<E: StoreEngine> StoreSession<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            handle: None,
            path: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Path of the currently open store
    pub fn current_path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Open the store at `path` and load every record.
    ///
    /// On failure the session is left closed.
    pub fn open(&mut self, path: &Path) -> Result<RecordIndex, OpenError> {
        self.close();

        let start = Instant::now();
        info!("opening database {}", path.display());

        let mut handle = self
            .engine
            .open(path)
            .map_err(|e| OpenError::classify(path.to_path_buf(), e))?;

        let mut records = Vec::new();
        let scan = handle.for_each_entry(&mut |key, value| records.push(Record::new(key, value)));
        if let Err(e) = scan {
            warn!("enumeration of {} failed after {} records: {}", path.display(), records.len(), e);
            return Err(OpenError::classify(path.to_path_buf(), e));
        }

        info!(
            "loaded {} records from {} in {:.1}ms",
            records.len(),
            path.display(),
            start.elapsed().as_secs_f64() * 1000.0
        );

        self.handle = Some(handle);
        self.path = Some(path.to_path_buf());
        Ok(RecordIndex::from_records(records))
    }

    /// Run the engine's repair on `path`. The session is closed first and
    /// stays closed afterwards.
    pub fn repair(&mut self, path: &Path) -> Result<(), RepairError> {
        self.close();

        info!("repairing database {}", path.display());
        self.engine.repair(path).map_err(|e| {
            warn!("repair of {} failed: {}", path.display(), e);
            RepairError {
                path: path.to_path_buf(),
                message: e.message,
            }
        })
    }

    /// Release the handle if one is open
    pub fn close(&mut self) {
        let path = self.path.take();
        if self.handle.take().is_some() {
            debug!("closed database {}", path.unwrap_or_default().display());
        }
    }
}

impl<E: StoreEngine> Drop for StoreSession<E> {
    fn drop(&mut self) {
        self.close();
    }
}
