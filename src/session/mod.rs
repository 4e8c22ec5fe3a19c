//! Viewer session: the state machine behind the user interface.
//!
//! - [`controller`] - Commands, phases and observable state
//! - [`worker`] - Background thread owning the store connection

pub mod controller;
pub mod worker;

pub use controller::{resolve_store_path, Phase, SessionController, SessionState};
pub use worker::{Outcome, StoreWorker};
