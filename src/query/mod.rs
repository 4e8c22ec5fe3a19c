//! Search over the loaded records.
//!
//! - [`filter`] - Case-folded substring filtering of a [`RecordIndex`](crate::index::RecordIndex)
//! - [`debouncer`] - Epoch-tagged quiet period for keystroke-driven queries
//! - [`search`] - Background execution and publication of filter results

pub mod debouncer;
pub mod filter;
pub mod search;

pub use debouncer::{QueryDebouncer, Ticket};
pub use filter::{filter, filter_with_threshold, FilteredView, Matcher};
pub use search::{Published, SearchConfig, SearchEngine};
