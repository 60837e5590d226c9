//! Pipeline entry points for snapshot operations.
//!
//! - `run_fetch`: Fetch listings, extract fields and write snapshots
//! - `run_merge`: Fold snapshots into combined tables

pub mod fetch;
pub mod merge;

pub use fetch::run_fetch;
pub use merge::{MergeOutcome, merge, merge_forum, run_merge, sort_and_dedupe};
