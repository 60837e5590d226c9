//! Storage abstractions for snapshot persistence.
//!
//! ## Directory Structure
//!
//! ```text
//! data/
//! ├── 20240309_washingtondc_new_data.json     # one file per fetch run
//! ├── 20240309_washingtondc_new_data_1.json   # same day, same listing
//! ├── 20240309_nova_top_all_data.json
//! └── combined/
//!     ├── combined_new_submissions_washingtondc.json
//!     └── combined_top_all_submissions_nova.json
//! ```

pub mod local;
pub mod naming;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::SubmissionTable;

// Re-export for convenience
pub use local::LocalStorage;
pub use naming::{combined_file_name, next_available_name, snapshot_file_name, snapshot_pattern};

/// Metadata about a storage write operation.
#[derive(Debug, Clone)]
pub struct WriteMetadata {
    /// File name written
    pub name: String,
    /// Full location, for display
    pub location: String,
    /// Number of rows written
    pub rows: usize,
    /// Timestamp of the write
    pub timestamp: DateTime<Utc>,
}

/// Trait for snapshot storage backends.
#[async_trait]
pub trait SnapshotStorage: Send + Sync {
    /// Write a fetch-run table under a fresh, never-reused name.
    async fn write_snapshot(&self, table: &SubmissionTable) -> Result<WriteMetadata>;

    /// Names of the snapshots of one forum and sort tag, newest name first.
    async fn list_snapshots(&self, forum: &str, sort_tag: &str) -> Result<Vec<String>>;

    /// Read a snapshot by name.
    async fn read_snapshot(&self, name: &str) -> Result<SubmissionTable>;

    /// Delete a snapshot by name.
    async fn remove_snapshot(&self, name: &str) -> Result<()>;

    /// Load the combined table, if one exists.
    async fn load_combined(&self, forum: &str, sort_tag: &str)
    -> Result<Option<SubmissionTable>>;

    /// Replace the combined table of the table's forum and sort tag.
    async fn write_combined(&self, table: &SubmissionTable) -> Result<WriteMetadata>;
}
