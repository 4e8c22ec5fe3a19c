//! Integration tests against real LevelDB directories written with rusty-leveldb.

use ldbview::query::{filter, SearchConfig};
use ldbview::session::{Phase, SessionController};
use ldbview::store::{LevelDbEngine, OpenError, StoreSession};
use rusty_leveldb::{Options, DB};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// Write `entries` into a fresh database at `dir/name`
fn create_db<K: AsRef<[u8]>, V: AsRef<[u8]>>(dir: &TempDir, name: &str, entries: &[(K, V)]) -> PathBuf {
    let path = dir.path().join(name);
    let mut db = DB::open(
        &path,
        Options {
            create_if_missing: true,
            ..Options::default()
        },
    )
    .expect("Failed to create database");

    for (key, value) in entries {
        db.put(key.as_ref(), value.as_ref()).expect("Failed to write entry");
    }
    db.flush().expect("Failed to flush database");
    drop(db);

    path
}

/// Write enough entries through a tiny write buffer that they land in table files
fn create_tabled_db(dir: &TempDir, name: &str, count: usize) -> PathBuf {
    let path = dir.path().join(name);
    let mut db = DB::open(
        &path,
        Options {
            create_if_missing: true,
            write_buffer_size: 4096,
            ..Options::default()
        },
    )
    .expect("Failed to create database");

    for i in 0..count {
        let key = format!("key{:06}", i);
        let value = format!("value-{:06}-{}", i, "x".repeat(40));
        db.put(key.as_bytes(), value.as_bytes()).expect("Failed to write entry");
    }
    db.flush().expect("Failed to flush database");
    drop(db);

    path
}

fn files_with_suffix(path: &Path, suffix: &str) -> Vec<PathBuf> {
    fs::read_dir(path)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.to_string_lossy().ends_with(suffix))
        .collect()
}

fn scenario_db(dir: &TempDir) -> PathBuf {
    create_db(
        dir,
        "scenario",
        &[(b"a".to_vec(), b"1".to_vec()), (b"b".to_vec(), vec![0xFF, 0xFE])],
    )
}

// ============================================================================
// Store session
// ============================================================================

#[test]
fn test_open_loads_records_in_key_order() {
    let dir = TempDir::new().unwrap();
    let path = create_db(&dir, "db", &[("zeta", "3"), ("alpha", "1"), ("mid", "2")]);

    let mut session = StoreSession::new(LevelDbEngine::new());
    let index = session.open(&path).unwrap();

    let keys: Vec<_> = index.iter().map(|r| r.key_display().into_owned()).collect();
    assert_eq!(keys, ["alpha", "mid", "zeta"]);
    assert!(session.is_open());
}

#[test]
fn test_binary_values_are_classified() {
    let dir = TempDir::new().unwrap();
    let path = scenario_db(&dir);

    let mut session = StoreSession::new(LevelDbEngine::new());
    let index = session.open(&path).unwrap();

    assert_eq!(index.len(), 2);
    assert_eq!(index[0].value_display(), "1");
    assert_eq!(index[1].value_display(), "[Binary: 2 bytes]");
    assert_eq!(index[1].value_hex(), "FF FE");

    assert_eq!(filter(&index, "1").len(), 1);
    assert_eq!(filter(&index, "ff fe").get(0).unwrap().key_display(), "b");
}

#[test]
fn test_missing_database_is_not_found() {
    let dir = TempDir::new().unwrap();
    let mut session = StoreSession::new(LevelDbEngine::new());

    let err = session.open(&dir.path().join("absent")).unwrap_err();
    assert!(matches!(err, OpenError::NotFound { .. }));
    // Opening must never create a database
    assert!(!dir.path().join("absent").exists());
}

#[test]
fn test_plain_directory_is_invalid_path() {
    let dir = TempDir::new().unwrap();
    let mut session = StoreSession::new(LevelDbEngine::new());

    let err = session.open(dir.path()).unwrap_err();
    assert!(matches!(err, OpenError::InvalidPath { .. }));
    assert!(!err.is_corruption());
}

#[test]
fn test_missing_current_file_is_corruption() {
    let dir = TempDir::new().unwrap();
    let path = scenario_db(&dir);
    fs::remove_file(path.join("CURRENT")).unwrap();

    let mut session = StoreSession::new(LevelDbEngine::new());
    let err = session.open(&path).unwrap_err();
    assert!(err.is_corruption());
    assert!(!session.is_open());
}

#[test]
fn test_repair_keeps_records_and_backup() {
    let dir = TempDir::new().unwrap();
    let path = scenario_db(&dir);

    let mut session = StoreSession::new(LevelDbEngine::new());
    session.repair(&path).unwrap();
    assert!(!session.is_open());

    let index = session.open(&path).unwrap();
    assert_eq!(index.len(), 2);
    assert_eq!(index[1].value_bytes(), &[0xFF, 0xFE]);

    let backups = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with("scenario.ldbview-backup-"))
        .count();
    assert_eq!(backups, 1);
    assert!(!dir.path().join("scenario.ldbview-repair").exists());
}

#[test]
fn test_repair_restores_missing_current() {
    let dir = TempDir::new().unwrap();
    let path = scenario_db(&dir);
    fs::remove_file(path.join("CURRENT")).unwrap();

    let mut session = StoreSession::new(LevelDbEngine::new());
    assert!(session.open(&path).unwrap_err().is_corruption());

    session.repair(&path).unwrap();
    let index = session.open(&path).unwrap();
    assert_eq!(index.len(), 2);
    assert_eq!(index[0].key_display(), "a");
    assert_eq!(index[1].value_bytes(), &[0xFF, 0xFE]);
}

#[test]
fn test_repair_recovers_table_files() {
    let dir = TempDir::new().unwrap();
    let path = create_tabled_db(&dir, "tabled", 500);
    assert!(!files_with_suffix(&path, ".ldb").is_empty());
    fs::remove_file(path.join("CURRENT")).unwrap();

    let mut session = StoreSession::new(LevelDbEngine::new());
    session.repair(&path).unwrap();

    let index = session.open(&path).unwrap();
    assert_eq!(index.len(), 500);
    assert_eq!(index[499].key_display(), "key000499");
}

#[test]
fn test_repair_falls_back_past_unreadable_manifest() {
    let dir = TempDir::new().unwrap();
    let path = scenario_db(&dir);
    fs::write(path.join("CURRENT"), "MANIFEST-999999\n").unwrap();

    let mut session = StoreSession::new(LevelDbEngine::new());
    assert!(session.open(&path).is_err());

    session.repair(&path).unwrap();
    assert_eq!(session.open(&path).unwrap().len(), 2);
}

#[test]
fn test_damaged_table_never_invents_records() {
    let dir = TempDir::new().unwrap();
    let path = create_tabled_db(&dir, "damaged", 500);
    let tables = files_with_suffix(&path, ".ldb");
    assert!(!tables.is_empty());

    for table in &tables {
        let mut bytes = fs::read(table).unwrap();
        let start = bytes.len() / 4;
        for b in bytes.iter_mut().skip(start).take(16) {
            *b ^= 0xFF;
        }
        fs::write(table, bytes).unwrap();
    }

    // A checksum failure either fails the open or ends the scan early
    let mut session = StoreSession::new(LevelDbEngine::new());
    match session.open(&path) {
        Ok(index) => {
            assert!(index.len() <= 500);
            assert!(session.is_open());
        }
        Err(_) => assert!(!session.is_open()),
    }
}

// ============================================================================
// Session controller
// ============================================================================

fn controller() -> SessionController {
    let config = SearchConfig {
        debounce: Duration::from_millis(20),
        ..Default::default()
    };
    SessionController::new(LevelDbEngine::new(), config).unwrap()
}

#[test]
fn test_controller_open_filter_close() {
    let dir = TempDir::new().unwrap();
    let path = scenario_db(&dir);
    let mut controller = controller();

    controller.open(&path);
    assert!(controller.wait_idle(Duration::from_secs(10)));
    assert!(controller.state().is_open());
    assert_eq!(controller.state().total_count(), 2);

    controller.set_query("ff fe");
    assert!(controller.wait_idle(Duration::from_secs(10)));
    assert_eq!(controller.state().filtered_view().len(), 1);

    controller.close();
    assert_eq!(controller.state().phase(), Phase::Closed);
    assert!(controller.state().filtered_view().is_empty());
}

#[test]
fn test_controller_opens_directory_of_picked_file() {
    let dir = TempDir::new().unwrap();
    let path = scenario_db(&dir);
    let mut controller = controller();

    controller.open_via_file_hint(path.join("CURRENT"));
    assert!(controller.wait_idle(Duration::from_secs(10)));
    assert_eq!(controller.state().last_path(), Some(path.as_path()));
    assert!(controller.state().is_open());
}

#[test]
fn test_controller_reports_corruption() {
    let dir = TempDir::new().unwrap();
    let path = scenario_db(&dir);
    fs::remove_file(path.join("CURRENT")).unwrap();
    let mut controller = controller();

    controller.open(&path);
    assert!(controller.wait_idle(Duration::from_secs(10)));
    let state = controller.state();
    assert_eq!(state.phase(), Phase::CorruptedPendingRepair);
    assert!(state.corruption_detected());
    assert!(state.status_text().contains(&path.display().to_string()));
}


#[test]
fn test_controller_repairs_and_reopens() {
    let dir = TempDir::new().unwrap();
    let path = scenario_db(&dir);
    fs::remove_file(path.join("CURRENT")).unwrap();
    let mut controller = controller();

    controller.open(&path);
    assert!(controller.wait_idle(Duration::from_secs(10)));
    assert_eq!(controller.state().phase(), Phase::CorruptedPendingRepair);

    assert!(controller.repair());
    assert!(controller.wait_idle(Duration::from_secs(10)));
    let state = controller.state();
    assert_eq!(state.phase(), Phase::Open);
    assert!(state.is_open());
    assert_eq!(state.total_count(), 2);
    assert!(!state.corruption_detected());
    assert!(state.status_text().starts_with("Database repaired and reopened"));
}
