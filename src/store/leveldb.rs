//! LevelDB binding built on the pure-Rust `rusty-leveldb` crate.
//!
//! Repair first makes the directory openable again: when CURRENT is missing
//! or names an unusable manifest, it is pointed at each `MANIFEST-*` file in
//! turn, newest first. Then every entry the engine can read is written into a
//! fresh database next to the original, the original is kept as a backup, and
//! the fresh copy takes its place.

use crate::store::{EngineError, EngineErrorKind, StoreEngine, StoreHandle};
use log::{debug, info, warn};
use rusty_leveldb::{LdbIterator, Options, Status, StatusCode, DB};
use std::any::Any;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// File every LevelDB directory carries once it has been created
const CURRENT_FILE: &str = "CURRENT";
const MANIFEST_PREFIX: &str = "MANIFEST-";

/// What a directory holds, as far as can be told without opening it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    Complete,
    MissingCurrent,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LevelDbEngine;

impl LevelDbEngine {
    pub fn new() -> Self {
        Self
    }
}

pub struct LevelDbHandle {
    db: DB,
}

impl From<Status> for EngineError {
    fn from(status: Status) -> Self {
        let kind = match status.code {
            StatusCode::Corruption => EngineErrorKind::Corruption,
            StatusCode::NotFound => EngineErrorKind::NotFound,
            StatusCode::IOError => EngineErrorKind::Io,
            _ => EngineErrorKind::Other,
        };
        let message = if status.err.is_empty() {
            format!("{:?}", status.code)
        } else {
            status.err
        };
        EngineError::new(kind, message)
    }
}

impl StoreEngine for LevelDbEngine {
    type Handle = LevelDbHandle;

    fn open(&self, path: &Path) -> Result<LevelDbHandle, EngineError> {
        if inspect_dir(path)? == Layout::MissingCurrent {
            return Err(EngineError::new(
                EngineErrorKind::Corruption,
                "Corruption: CURRENT file is missing",
            ));
        }

        let db = guard("open", || DB::open(path, read_options()))??;
        debug!("leveldb handle opened for {}", path.display());
        Ok(LevelDbHandle { db })
    }

    fn repair(&self, path: &Path) -> Result<(), EngineError> {
        inspect_dir(path)?;
        guard("repair", || salvage(path))?
    }
}

impl StoreHandle for LevelDbHandle {
    fn for_each_entry(&mut self, visit: &mut dyn FnMut(&[u8], &[u8])) -> Result<(), EngineError> {
        let db = &mut self.db;
        guard("scan", move || {
            let mut iter = db.new_iter()?;
            let (mut key, mut value) = (Vec::new(), Vec::new());
            while iter.advance() {
                if iter.current(&mut key, &mut value) {
                    visit(&key, &value);
                }
            }
            Ok::<(), Status>(())
        })??;
        Ok(())
    }
}

fn read_options() -> Options {
    Options {
        create_if_missing: false,
        paranoid_checks: true,
        ..Options::default()
    }
}

/// Reject paths that cannot be a LevelDB directory before the engine sees them
fn inspect_dir(path: &Path) -> Result<Layout, EngineError> {
    if !path.exists() {
        return Err(EngineError::new(
            EngineErrorKind::NotFound,
            format!("{} does not exist", path.display()),
        ));
    }
    if !path.is_dir() {
        return Err(EngineError::new(EngineErrorKind::InvalidPath, "not a directory"));
    }
    if path.join(CURRENT_FILE).is_file() {
        return Ok(Layout::Complete);
    }

    // Table or log files without CURRENT means a damaged database, not a stray folder
    let has_db_files = fs::read_dir(path)?
        .filter_map(|e| e.ok())
        .any(|e| {
            let name = e.file_name();
            let name = name.to_string_lossy();
            name.ends_with(".ldb") || name.ends_with(".sst") || name.ends_with(".log") || name.starts_with(MANIFEST_PREFIX)
        });

    if has_db_files {
        Ok(Layout::MissingCurrent)
    } else {
        Err(EngineError::new(
            EngineErrorKind::InvalidPath,
            "no CURRENT file, not a LevelDB database",
        ))
    }
}

/// Copy all readable entries of `path` into a fresh database and swap it in
fn salvage(path: &Path) -> Result<(), EngineError> {
    let staging = sibling(path, "ldbview-repair");
    if staging.exists() {
        fs::remove_dir_all(&staging)?;
    }

    let copied = {
        let mut source = open_for_salvage(path)?;
        let mut target = DB::open(
            &staging,
            Options {
                create_if_missing: true,
                ..Options::default()
            },
        )?;

        let mut iter = source.new_iter()?;
        let (mut key, mut value) = (Vec::new(), Vec::new());
        let mut copied = 0usize;
        while iter.advance() {
            if iter.current(&mut key, &mut value) {
                target.put(&key, &value)?;
                copied += 1;
            }
        }
        target.flush()?;
        copied
    };

    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let backup = sibling(path, &format!("ldbview-backup-{}", stamp));

    fs::rename(path, &backup)?;
    if let Err(e) = fs::rename(&staging, path) {
        warn!("could not move repaired copy into place, restoring original: {}", e);
        fs::rename(&backup, path)?;
        return Err(e.into());
    }

    info!(
        "salvaged {} entries into {} (original kept at {})",
        copied,
        path.display(),
        backup.display()
    );
    Ok(())
}

/// Open `path`, pointing CURRENT at older manifests when the recorded one is
/// missing or unreadable. CURRENT is put back as it was if nothing works.
fn open_for_salvage(path: &Path) -> Result<DB, EngineError> {
    let current = path.join(CURRENT_FILE);
    let recorded = fs::read_to_string(&current)
        .ok()
        .map(|s| s.trim().to_string());

    let mut last_error = None;
    if recorded.is_some() {
        match DB::open(path, read_options()) {
            Ok(db) => return Ok(db),
            Err(status) => {
                warn!("{} does not open as recorded: {}", path.display(), status.err);
                last_error = Some(EngineError::from(status));
            }
        }
    }

    for manifest in manifests(path)? {
        if recorded.as_deref() == Some(manifest.as_str()) {
            continue;
        }
        set_current(path, &manifest)?;
        match DB::open(path, read_options()) {
            Ok(db) => {
                info!("recovered {} from {}", path.display(), manifest);
                return Ok(db);
            }
            Err(status) => {
                debug!("{} is not usable: {}", manifest, status.err);
                last_error = Some(EngineError::from(status));
            }
        }
    }

    match &recorded {
        Some(name) => set_current(path, name)?,
        None if current.exists() => fs::remove_file(&current)?,
        None => {}
    }

    Err(last_error.unwrap_or_else(|| {
        EngineError::new(
            EngineErrorKind::Corruption,
            "Corruption: no MANIFEST file to recover from",
        )
    }))
}

/// `MANIFEST-*` file names in `path`, highest number first
fn manifests(path: &Path) -> Result<Vec<String>, EngineError> {
    let mut found: Vec<(u64, String)> = fs::read_dir(path)?
        .filter_map(|e| e.ok())
        .filter_map(|e| {
            let name = e.file_name().to_string_lossy().into_owned();
            let number = name.strip_prefix(MANIFEST_PREFIX)?.parse().ok()?;
            Some((number, name))
        })
        .collect();
    found.sort_unstable_by(|a, b| b.0.cmp(&a.0));
    Ok(found.into_iter().map(|(_, name)| name).collect())
}

/// Point CURRENT at `manifest`, replacing it atomically
fn set_current(path: &Path, manifest: &str) -> Result<(), EngineError> {
    let staging = path.join("CURRENT.ldbview-tmp");
    fs::write(&staging, format!("{}\n", manifest))?;
    fs::rename(&staging, path.join(CURRENT_FILE))?;
    Ok(())
}

/// `<parent>/<name>.<suffix>`
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "db".to_string());
    path.with_file_name(format!("{}.{}", name, suffix))
}

/// Run engine code, turning a panic into an error so the worker thread survives
fn guard<T>(what: &str, f: impl FnOnce() -> T) -> Result<T, EngineError> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        let message = panic_message(payload.as_ref());
        warn!("leveldb {} panicked: {}", what, message);
        EngineError::new(EngineErrorKind::Other, format!("engine failure during {}: {}", what, message))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
