// src/pipeline/merge.rs

//! Snapshot merging pipeline.
//!
//! Folds the snapshots of one forum and sort tag into its combined table,
//! keeping a single row per submission id.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::time::Instant;

use crate::error::Result;
use crate::models::{SubmissionRecord, SubmissionTable};
use crate::storage::{SnapshotStorage, WriteMetadata};
use crate::utils::log;

/// Result of merging one forum.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub forum: String,
    /// Rows in the combined table
    pub rows: usize,
    /// Snapshot files folded in
    pub merged_files: Vec<String>,
    /// `None` when the combined table was already up to date
    pub written: Option<WriteMetadata>,
    /// Snapshot files deleted afterwards
    pub deleted: usize,
}

impl MergeOutcome {
    pub fn unchanged(&self) -> bool {
        self.written.is_none()
    }
}

/// Newest `created_at` first, then the oldest observation of it, then id.
fn recency_order(a: &SubmissionRecord, b: &SubmissionRecord) -> Ordering {
    b.recency_key()
        .cmp(&a.recency_key())
        .then_with(|| a.id.cmp(&b.id))
}

/// Stable-sort rows by recency and keep the first row of every id.
pub fn sort_and_dedupe(mut rows: Vec<SubmissionRecord>) -> Vec<SubmissionRecord> {
    rows.sort_by(recency_order);
    let mut seen = HashSet::with_capacity(rows.len());
    rows.retain(|row| seen.insert(row.id.clone()));
    rows
}

/// Merge snapshots into an existing combined table.
///
/// Rows of `existing` come first, then the snapshots in the given order.
/// Returns `None` when there is nothing to merge.
pub fn merge(
    existing: Option<SubmissionTable>,
    snapshots: Vec<SubmissionTable>,
) -> Option<SubmissionTable> {
    let mut tables = existing.into_iter().chain(snapshots).peekable();
    let first = tables.peek()?;
    let forum = first.forum.clone();
    let sort = first.sort.clone();

    let mut header_retrieved = first.retrieved_at;
    let mut rows = Vec::new();
    for table in tables {
        header_retrieved = header_retrieved.max(table.retrieved_at);
        rows.extend(table.rows);
    }

    let rows = sort_and_dedupe(rows);
    let retrieved_at = rows
        .iter()
        .map(|r| r.retrieved_at)
        .max()
        .unwrap_or(header_retrieved);

    Some(SubmissionTable::new(forum, sort, retrieved_at, rows))
}

/// Merge every snapshot of one forum into its combined table.
///
/// Returns `None` when there is neither a combined table nor a snapshot.
/// Snapshot files are only deleted after the combined table is on disk.
pub async fn merge_forum(
    storage: &dyn SnapshotStorage,
    forum: &str,
    sort_tag: &str,
    delete_merged: bool,
) -> Result<Option<MergeOutcome>> {
    let names = storage.list_snapshots(forum, sort_tag).await?;
    let existing = storage.load_combined(forum, sort_tag).await?;

    if names.is_empty() && existing.is_none() {
        log::info(&format!(
            "No {sort_tag} snapshots or combined table for r/{forum}; nothing to merge."
        ));
        return Ok(None);
    }

    let existing_digest = existing.as_ref().map(SubmissionTable::digest).transpose()?;
    let existing_rows = existing.as_ref().map_or(0, SubmissionTable::len);

    let mut snapshots = Vec::with_capacity(names.len());
    for name in &names {
        let snapshot = storage.read_snapshot(name).await?;
        log::sub_item(&format!("{} ({} rows)", name, snapshot.len()));
        snapshots.push(snapshot);
    }

    let Some(combined) = merge(existing, snapshots) else {
        return Ok(None);
    };

    let written = if existing_digest.as_deref() == Some(combined.digest()?.as_str()) {
        log::info(&format!(
            "Combined table for r/{forum} is unchanged ({} rows).",
            combined.len()
        ));
        None
    } else {
        let meta = storage.write_combined(&combined).await?;
        log::success(&format!(
            "Combined {} rows ({} before) into {}",
            combined.len(),
            existing_rows,
            meta.location
        ));
        Some(meta)
    };

    let mut deleted = 0;
    if delete_merged {
        for name in &names {
            match storage.remove_snapshot(name).await {
                Ok(()) => deleted += 1,
                Err(e) => log::warn(&format!("Could not delete {name}: {e}")),
            }
        }
        log::info(&format!("Deleted {deleted} of {} merged files.", names.len()));
    }

    Ok(Some(MergeOutcome {
        forum: forum.to_string(),
        rows: combined.len(),
        merged_files: names,
        written,
        deleted,
    }))
}

/// Merge snapshots for each forum in turn.
pub async fn run_merge(
    storage: &dyn SnapshotStorage,
    forums: &[String],
    sort_tag: &str,
    delete_merged: bool,
) -> Result<Vec<MergeOutcome>> {
    let start = Instant::now();
    log::header(&format!("Merging {sort_tag} snapshots"));

    let mut outcomes = Vec::with_capacity(forums.len());
    for (i, forum) in forums.iter().enumerate() {
        log::step(i + 1, forums.len(), &format!("r/{forum}"));
        if let Some(outcome) = merge_forum(storage, forum, sort_tag, delete_merged).await? {
            outcomes.push(outcome);
        }
        log::time_check(start.elapsed());
    }

    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    use super::*;
    use crate::models::fixtures::{record, table};
    use crate::storage::LocalStorage;

    fn ids(table: &SubmissionTable) -> Vec<&str> {
        table.rows.iter().map(|r| r.id.as_str()).collect()
    }

    fn storage(tmp: &TempDir) -> LocalStorage {
        LocalStorage::new(tmp.path().join("data"), tmp.path().join("data/combined"))
    }

    fn dated(mut t: SubmissionTable, day: u32) -> SubmissionTable {
        t.retrieved_at = Utc.with_ymd_and_hms(2024, 1, day, 12, 0, 0).unwrap();
        t
    }

    #[test]
    fn test_latest_observation_wins() {
        let a = table(vec![record("x1", 100, 200)]);
        let b = table(vec![record("x1", 100, 500)]);

        let combined = merge(None, vec![a, b]).unwrap();

        assert_eq!(combined.len(), 1);
        assert_eq!(combined.rows[0].retrieved_at.timestamp(), 500);
        assert_eq!(combined.retrieved_at.timestamp(), 500);
    }

    #[test]
    fn test_sorted_newest_first_with_id_tiebreak() {
        let snapshot = table(vec![
            record("b", 100, 300),
            record("c", 300, 400),
            record("a", 100, 300),
        ]);
        let combined = merge(None, vec![snapshot]).unwrap();
        assert_eq!(ids(&combined), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_dedupe_keeps_one_row_per_id() {
        let rows = vec![
            record("a", 100, 200),
            record("b", 150, 200),
            record("a", 100, 400),
            record("b", 150, 160),
            record("a", 100, 300),
        ];
        let deduped = sort_and_dedupe(rows);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].id, "b");
        assert_eq!(deduped[0].retrieved_at.timestamp(), 200);
        assert_eq!(deduped[1].retrieved_at.timestamp(), 400);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let snapshots = vec![
            table(vec![record("a", 100, 200), record("b", 150, 200)]),
            table(vec![record("a", 100, 260), record("c", 250, 260)]),
        ];

        let once = merge(None, snapshots.clone()).unwrap();
        let twice = merge(Some(once.clone()), vec![]).unwrap();
        let again = merge(Some(once.clone()), snapshots).unwrap();

        assert_eq!(
            once.to_json_bytes().unwrap(),
            twice.to_json_bytes().unwrap()
        );
        assert_eq!(once.digest().unwrap(), again.digest().unwrap());
    }

    #[test]
    fn test_merge_nothing() {
        assert!(merge(None, vec![]).is_none());
    }

    #[tokio::test]
    async fn test_merge_forum_nothing_to_do() {
        let tmp = TempDir::new().unwrap();
        let storage = storage(&tmp);

        let outcome = merge_forum(&storage, "washingtondc", "new", false)
            .await
            .unwrap();

        assert!(outcome.is_none());
        assert!(!tmp.path().join("data/combined").exists());
    }

    #[tokio::test]
    async fn test_merge_forum_writes_then_skips_unchanged() {
        let tmp = TempDir::new().unwrap();
        let storage = storage(&tmp);
        storage
            .write_snapshot(&dated(table(vec![record("x1", 100, 200)]), 1))
            .await
            .unwrap();
        storage
            .write_snapshot(&dated(table(vec![record("x1", 100, 500)]), 2))
            .await
            .unwrap();

        let first = merge_forum(&storage, "washingtondc", "new", false)
            .await
            .unwrap()
            .unwrap();
        assert!(!first.unchanged());
        assert_eq!(first.rows, 1);
        assert_eq!(first.merged_files.len(), 2);

        let combined = storage
            .load_combined("washingtondc", "new")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(combined.rows[0].retrieved_at.timestamp(), 500);

        let second = merge_forum(&storage, "washingtondc", "new", false)
            .await
            .unwrap()
            .unwrap();
        assert!(second.unchanged());
    }

    #[tokio::test]
    async fn test_merge_forum_deletes_after_write() {
        let tmp = TempDir::new().unwrap();
        let storage = storage(&tmp);
        storage
            .write_snapshot(&dated(table(vec![record("a", 100, 200)]), 1))
            .await
            .unwrap();

        let outcome = merge_forum(&storage, "washingtondc", "new", true)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(outcome.deleted, 1);
        assert!(
            storage
                .list_snapshots("washingtondc", "new")
                .await
                .unwrap()
                .is_empty()
        );
        assert!(
            storage
                .load_combined("washingtondc", "new")
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_merge_ignores_other_forums() {
        let tmp = TempDir::new().unwrap();
        let storage = storage(&tmp);
        let mut other = dated(table(vec![record("z", 100, 200)]), 1);
        other.forum = "dc".into();
        storage.write_snapshot(&other).await.unwrap();
        storage
            .write_snapshot(&dated(table(vec![record("a", 100, 200)]), 1))
            .await
            .unwrap();

        let outcome = merge_forum(&storage, "washingtondc", "new", false)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(outcome.merged_files.len(), 1);
        let combined = storage
            .load_combined("washingtondc", "new")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ids(&combined), vec!["a"]);
    }

    #[tokio::test]
    async fn test_run_merge_skips_empty_forums() {
        let tmp = TempDir::new().unwrap();
        let storage = storage(&tmp);
        storage
            .write_snapshot(&dated(table(vec![record("a", 100, 200)]), 1))
            .await
            .unwrap();

        let forums = vec!["washingtondc".to_string(), "nova".to_string()];
        let outcomes = run_merge(&storage, &forums, "new", false).await.unwrap();

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].forum, "washingtondc");
    }
}
