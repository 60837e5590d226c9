//! Local filesystem storage implementation.
//!
//! ## Storage Layout
//!
//! ```text
//! {snapshot_dir}/
//! ├── {YYYYMMDD}_{forum}_{sort_tag}_data.json       # Snapshot per fetch run
//! ├── {YYYYMMDD}_{forum}_{sort_tag}_data_{n}.json   # Same-day collision
//! └── {combined_dir}/
//!     └── combined_{sort_tag}_submissions_{forum}.json
//! ```
//!
//! Every write goes to a temp file first and is renamed into place.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{PathsConfig, SubmissionTable};
use crate::storage::naming::{
    combined_file_name, next_available_name, snapshot_file_name, snapshot_pattern,
};
use crate::storage::{SnapshotStorage, WriteMetadata};

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    snapshot_dir: PathBuf,
    combined_dir: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage with explicit snapshot and combined directories.
    pub fn new(snapshot_dir: impl Into<PathBuf>, combined_dir: impl Into<PathBuf>) -> Self {
        Self {
            snapshot_dir: snapshot_dir.into(),
            combined_dir: combined_dir.into(),
        }
    }

    pub fn from_config(paths: &PathsConfig) -> Self {
        Self::new(paths.snapshot_dir.clone(), paths.combined_dir())
    }

    pub fn snapshot_dir(&self) -> &Path {
        &self.snapshot_dir
    }

    pub fn combined_dir(&self) -> &Path {
        &self.combined_dir
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        self.ensure_dir(path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        if let Err(e) = tokio::fs::rename(&tmp, path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(AppError::Io(e));
        }
        Ok(())
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    async fn read_table(&self, path: &Path) -> Result<Option<SubmissionTable>> {
        match self.read_bytes(path).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn write_table(&self, path: PathBuf, table: &SubmissionTable) -> Result<WriteMetadata> {
        let bytes = table.to_json_bytes()?;
        self.write_bytes(&path, &bytes).await?;

        Ok(WriteMetadata {
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            location: path.display().to_string(),
            rows: table.len(),
            timestamp: Utc::now(),
        })
    }
}

#[async_trait]
impl SnapshotStorage for LocalStorage {
    async fn write_snapshot(&self, table: &SubmissionTable) -> Result<WriteMetadata> {
        tokio::fs::create_dir_all(&self.snapshot_dir).await?;

        let base = snapshot_file_name(table.retrieved_at, &table.forum, &table.sort);
        let name = next_available_name(&base, &self.snapshot_dir);
        if name != base {
            log::debug!("{} exists, writing {} instead", base, name);
        }

        self.write_table(self.snapshot_dir.join(name), table).await
    }

    async fn list_snapshots(&self, forum: &str, sort_tag: &str) -> Result<Vec<String>> {
        let pattern = snapshot_pattern(forum, sort_tag)?;

        let mut entries = match tokio::fs::read_dir(&self.snapshot_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AppError::Io(e)),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if pattern.is_match(name) {
                    names.push(name.to_string());
                }
            }
        }

        names.sort_unstable_by(|a, b| b.cmp(a));
        Ok(names)
    }

    async fn read_snapshot(&self, name: &str) -> Result<SubmissionTable> {
        let path = self.snapshot_dir.join(name);
        self.read_table(&path)
            .await?
            .ok_or_else(|| AppError::validation(format!("snapshot not found: {}", path.display())))
    }

    async fn remove_snapshot(&self, name: &str) -> Result<()> {
        tokio::fs::remove_file(self.snapshot_dir.join(name)).await?;
        Ok(())
    }

    async fn load_combined(
        &self,
        forum: &str,
        sort_tag: &str,
    ) -> Result<Option<SubmissionTable>> {
        let path = self.combined_dir.join(combined_file_name(forum, sort_tag));
        self.read_table(&path).await
    }

    async fn write_combined(&self, table: &SubmissionTable) -> Result<WriteMetadata> {
        let path = self
            .combined_dir
            .join(combined_file_name(&table.forum, &table.sort));
        self.write_table(path, table).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use tempfile::TempDir;

    use super::*;
    use crate::models::fixtures::{record, table};

    fn storage(tmp: &TempDir) -> LocalStorage {
        LocalStorage::new(tmp.path().join("data"), tmp.path().join("data/combined"))
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let tmp = TempDir::new().unwrap();
        let storage = storage(&tmp);
        let path = tmp.path().join("nested/test.txt");

        storage.write_bytes(&path, b"hello").await.unwrap();
        let data = storage.read_bytes(&path).await.unwrap();
        assert_eq!(data, Some(b"hello".to_vec()));
        assert!(!path.with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn test_read_nonexistent() {
        let tmp = TempDir::new().unwrap();
        let storage = storage(&tmp);

        let data = storage.read_bytes(&tmp.path().join("nope.txt")).await.unwrap();
        assert!(data.is_none());
        assert!(storage.load_combined("nova", "new").await.unwrap().is_none());
        assert!(storage.list_snapshots("nova", "new").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_names_never_collide() {
        let tmp = TempDir::new().unwrap();
        let storage = storage(&tmp);
        let mut snapshot = table(vec![record("a", 100, 200)]);
        snapshot.retrieved_at = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();

        let first = storage.write_snapshot(&snapshot).await.unwrap();
        let second = storage.write_snapshot(&snapshot).await.unwrap();

        assert_eq!(first.name, "20240309_washingtondc_new_data.json");
        assert_eq!(second.name, "20240309_washingtondc_new_data_1.json");
        assert_eq!(first.rows, 1);

        let loaded = storage.read_snapshot(&second.name).await.unwrap();
        assert_eq!(loaded, snapshot);
    }

    #[tokio::test]
    async fn test_list_snapshots_filters_and_orders() {
        let tmp = TempDir::new().unwrap();
        let storage = storage(&tmp);
        let dir = tmp.path().join("data");
        std::fs::create_dir_all(dir.join("combined")).unwrap();
        for name in [
            "20240101_washingtondc_new_data.json",
            "20240102_washingtondc_new_data.json",
            "20240102_washingtondc_new_data_1.json",
            "20240102_dc_new_data.json",
            "20240102_washingtondc_top_all_data.json",
            "20240102_washingtondc_new_data.tmp",
            "notes.txt",
        ] {
            std::fs::write(dir.join(name), b"{}").unwrap();
        }

        let names = storage.list_snapshots("washingtondc", "new").await.unwrap();
        assert_eq!(
            names,
            vec![
                "20240102_washingtondc_new_data_1.json",
                "20240102_washingtondc_new_data.json",
                "20240101_washingtondc_new_data.json",
            ]
        );
    }

    #[tokio::test]
    async fn test_combined_round_trip_and_remove() {
        let tmp = TempDir::new().unwrap();
        let storage = storage(&tmp);
        let combined = table(vec![record("b", 150, 300), record("a", 100, 200)]);

        let meta = storage.write_combined(&combined).await.unwrap();
        assert_eq!(meta.name, "combined_new_submissions_washingtondc.json");
        assert!(tmp.path().join("data/combined").join(&meta.name).exists());

        let loaded = storage
            .load_combined("washingtondc", "new")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.digest().unwrap(), combined.digest().unwrap());

        let snap = storage.write_snapshot(&combined).await.unwrap();
        storage.remove_snapshot(&snap.name).await.unwrap();
        assert!(storage.read_snapshot(&snap.name).await.is_err());
    }
}
