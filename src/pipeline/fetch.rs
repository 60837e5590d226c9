// src/pipeline/fetch.rs

//! Snapshot fetching pipeline.

use std::time::Instant;

use chrono::Local;

use crate::error::Result;
use crate::models::FetchConfig;
use crate::services::{FieldExtractor, SubmissionSource, fetch_listing};
use crate::storage::{SnapshotStorage, WriteMetadata};
use crate::utils::log;

/// Fetch, extract and store one snapshot per configured forum.
///
/// Forums are processed one after another. The first failure stops the run;
/// snapshots written for earlier forums are kept.
pub async fn run_fetch<S: SubmissionSource + ?Sized>(
    fetch: &FetchConfig,
    source: &S,
    extractor: &FieldExtractor,
    storage: &dyn SnapshotStorage,
) -> Result<Vec<WriteMetadata>> {
    let start = Instant::now();
    log::header(&format!(
        "Fetch started at {}",
        Local::now().format("%H:%M:%S")
    ));

    let mut written = Vec::with_capacity(fetch.forums.len());
    for (i, forum) in fetch.forums.iter().enumerate() {
        log::step(i + 1, fetch.forums.len(), &format!("r/{forum}"));

        let batch = fetch_listing(
            source,
            forum,
            &fetch.sort,
            fetch.time_window.as_deref(),
            fetch.limit,
        )
        .await?;
        let table = extractor.extract(&batch).await?;
        let meta = storage.write_snapshot(&table).await?;

        log::success(&format!("Saved {}", meta.location));
        log::time_check(start.elapsed());
        written.push(meta);
    }

    log::header(&format!(
        "Fetch ended at {}",
        Local::now().format("%H:%M:%S")
    ));
    Ok(written)
}
