//! Access to the on-disk key-value store.
//!
//! The engine itself is reached through the [`StoreEngine`] / [`StoreHandle`]
//! traits so the session logic does not depend on a particular binding:
//!
//! - [`leveldb`] - LevelDB directories via `rusty-leveldb`
//! - [`memory`] - In-memory stores with scriptable faults (tests, benchmarks)
//! - [`session`] - One open connection plus error classification
//!
//! Closing a store is dropping its handle.

mod error;
pub mod leveldb;
pub mod memory;
pub mod session;

pub use error::{EngineError, EngineErrorKind, OpenError, RepairError};
pub use leveldb::LevelDbEngine;
pub use memory::{Health, MemoryEngine, MemoryStore};
pub use session::StoreSession;

use std::path::Path;

/// Opens and repairs stores of one engine type
pub trait StoreEngine {
    type Handle: StoreHandle;

    /// Open an existing store; must never create one
    fn open(&self, path: &Path) -> Result<Self::Handle, EngineError>;

    /// Run the engine's offline repair on a closed store
    fn repair(&self, path: &Path) -> Result<(), EngineError>;
}

/// An open store
pub trait StoreHandle {
    /// Visit every entry in ascending key order, first to last
    fn for_each_entry(&mut self, visit: &mut dyn FnMut(&[u8], &[u8])) -> Result<(), EngineError>;
}
