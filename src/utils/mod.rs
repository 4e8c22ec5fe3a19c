//! Utility functions shared by the store, search and presentation layers.
//!
//! ## Modules
//!
//! - [`app_data`] - Application data directory and config file (XDG-compliant)
//! - [`bytes`] - Text-or-binary classification and hex rendering
//! - [`progress`] - CLI loading spinner
//!
//! ## Key Functions
//!
//! ```no_run
//! use ldbview::utils::{classify, to_hex};
//!
//! assert_eq!(classify(b"hello"), "hello");
//! assert_eq!(classify(&[0xFF, 0xFE]), "[Binary: 2 bytes]");
//! assert_eq!(to_hex(&[0xFF, 0xFE]), "FF FE");
//! ```

pub mod app_data;
pub mod bytes;
pub mod progress;

pub use app_data::*;
pub use bytes::*;
