// src/storage/naming.rs

//! File naming for snapshots and combined tables.

use std::path::Path;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::error::Result;

/// Return `base_name`, or the first `{stem}_{n}{ext}` (n = 1, 2, ...) that
/// does not exist in `directory`.
///
/// The extension starts at the last `.`; a name without one gets the
/// suffix appended.
pub fn next_available_name(base_name: &str, directory: &Path) -> String {
    if !directory.join(base_name).exists() {
        return base_name.to_string();
    }

    let (stem, ext) = match base_name.rfind('.') {
        Some(idx) if idx > 0 => base_name.split_at(idx),
        _ => (base_name, ""),
    };

    (1u64..)
        .map(|n| format!("{stem}_{n}{ext}"))
        .find(|candidate| !directory.join(candidate).exists())
        .unwrap_or_else(|| base_name.to_string())
}

/// `{YYYYMMDD}_{forum}_{sort_tag}_data.json`, dated by the UTC retrieval day.
pub fn snapshot_file_name(retrieved_at: DateTime<Utc>, forum: &str, sort_tag: &str) -> String {
    format!(
        "{}_{}_{}_data.json",
        retrieved_at.format("%Y%m%d"),
        forum,
        sort_tag
    )
}

/// `combined_{sort_tag}_submissions_{forum}.json`
pub fn combined_file_name(forum: &str, sort_tag: &str) -> String {
    format!("combined_{sort_tag}_submissions_{forum}.json")
}

/// Matches snapshot file names of exactly this forum and sort tag, with or
/// without a disambiguation suffix.
pub fn snapshot_pattern(forum: &str, sort_tag: &str) -> Result<Regex> {
    let pattern = format!(
        r"^\d{{8}}_{}_{}_data(_\d+)?\.json$",
        regex::escape(forum),
        regex::escape(sort_tag)
    );
    Ok(Regex::new(&pattern)?)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_next_available_name_unchanged_without_collision() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(
            next_available_name("foo_new.pkl", tmp.path()),
            "foo_new.pkl"
        );
    }

    #[test]
    fn test_next_available_name_skips_taken_suffixes() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("foo_new.pkl"), b"").unwrap();
        assert_eq!(
            next_available_name("foo_new.pkl", tmp.path()),
            "foo_new_1.pkl"
        );

        std::fs::write(tmp.path().join("foo_new_1.pkl"), b"").unwrap();
        assert_eq!(
            next_available_name("foo_new.pkl", tmp.path()),
            "foo_new_2.pkl"
        );
    }

    #[test]
    fn test_next_available_name_without_extension() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("notes"), b"").unwrap();
        assert_eq!(next_available_name("notes", tmp.path()), "notes_1");
    }

    #[test]
    fn test_next_available_name_splits_at_last_dot() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a.tar.gz"), b"").unwrap();
        assert_eq!(next_available_name("a.tar.gz", tmp.path()), "a.tar_1.gz");
    }

    #[test]
    fn test_file_names() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 23, 59, 0).unwrap();
        assert_eq!(
            snapshot_file_name(at, "washingtondc", "top_all"),
            "20240309_washingtondc_top_all_data.json"
        );
        assert_eq!(
            combined_file_name("nova", "new"),
            "combined_new_submissions_nova.json"
        );
    }

    #[test]
    fn test_snapshot_pattern_is_exact() {
        let re = snapshot_pattern("dc", "new").unwrap();
        assert!(re.is_match("20240101_dc_new_data.json"));
        assert!(re.is_match("20240101_dc_new_data_3.json"));
        assert!(!re.is_match("20240101_washingtondc_new_data.json"));
        assert!(!re.is_match("20240101_dc_new_data.tmp"));
        assert!(!re.is_match("20240101_dc_top_all_data.json"));
        assert!(!re.is_match("combined_new_submissions_dc.json"));
    }

    #[test]
    fn test_snapshot_pattern_escapes_forum() {
        let re = snapshot_pattern("a.b", "new").unwrap();
        assert!(re.is_match("20240101_a.b_new_data.json"));
        assert!(!re.is_match("20240101_axb_new_data.json"));
    }
}
