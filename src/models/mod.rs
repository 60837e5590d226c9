// src/models/mod.rs

//! Domain models for the snapshot application.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod field;
mod listing;
mod submission;

// Re-export all public types
pub use config::{
    Config, FetchConfig, LoggingConfig, MergeConfig, PathsConfig, RedditConfig, RetryConfig,
};
pub use field::{Field, FieldValue};
pub use listing::{ListingRequest, SortMode, TimeWindow, is_valid_forum_name};
pub use submission::{RawSubmission, SubmissionRecord, SubmissionTable, timestamp_from_epoch};

#[cfg(test)]
pub(crate) use submission::fixtures;
