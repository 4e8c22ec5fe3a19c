//! # ldbview - LevelDB Viewer
//!
//! ldbview opens a LevelDB directory read-only, loads every key-value pair
//! into memory, and lets you filter them interactively as you type. Corrupted
//! databases are detected on open and can be repaired in place.
//!
//! ## Architecture
//!
//! The crate is organized into these main modules:
//!
//! - [`store`] - Engine bindings, the store session and error classification
//! - [`index`] - Immutable in-memory snapshot of the loaded records
//! - [`query`] - Case-insensitive filtering, debouncing and background search
//! - [`session`] - The viewer state machine (open, close, repair, search)
//! - [`tui`] - Interactive terminal UI
//! - [`output`] - Plain and JSON output for the non-interactive commands
//! - [`utils`] - Byte classification, hex rendering, configuration
//!
//! ## Quick Start
//!
//! ```ignore
//! use ldbview::query::SearchConfig;
//! use ldbview::session::SessionController;
//! use ldbview::store::LevelDbEngine;
//! use std::time::Duration;
//!
//! let mut session = SessionController::new(LevelDbEngine::new(), SearchConfig::default())?;
//! session.open("/path/to/leveldb");
//! session.set_query("user:");
//! session.wait_idle(Duration::from_secs(10));
//!
//! for record in session.state().filtered_view().iter() {
//!     println!("{} = {}", record.key_display(), record.value_display());
//! }
//! ```
//!
//! ## Performance
//!
//! Records are decoded once, their display and hex forms are memoized, and
//! large indexes are filtered in parallel with rayon. Filter results are kept
//! in an LRU cache until the index is replaced.

pub mod index;
pub mod output;
pub mod query;
pub mod session;
pub mod store;
#[cfg(feature = "interactive")]
pub mod tui;
pub mod utils;
