// src/models/submission.rs

//! Submission records and the tables they are stored in.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::{AppError, Result};
use crate::models::{Field, FieldValue};

/// Raw submission data as delivered in a listing (`data` of a `t3` thing).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawSubmission {
    pub id: String,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub is_self: bool,
    #[serde(default)]
    pub selftext: String,
    /// Only present when the API classified the content
    #[serde(default)]
    pub post_hint: Option<String>,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub upvote_ratio: f64,
    #[serde(default)]
    pub num_comments: i64,
    pub created_utc: f64,
}

impl RawSubmission {
    /// Value of a field carried by the listing itself.
    ///
    /// Returns `None` for `Comments`, which needs its own request.
    pub fn scalar(&self, field: Field) -> Option<FieldValue> {
        let value = match field {
            Field::Title => FieldValue::Text(self.title.clone()),
            Field::CreatedUtc => FieldValue::Float(self.created_utc),
            Field::Id => FieldValue::Text(self.id.clone()),
            Field::Url => FieldValue::Text(self.url.clone()),
            Field::IsSelf => FieldValue::Bool(self.is_self),
            Field::Selftext => FieldValue::Text(self.selftext.clone()),
            Field::PostHint => FieldValue::OptionalText(self.post_hint.clone()),
            Field::Score => FieldValue::Int(self.score),
            Field::UpvoteRatio => FieldValue::Float(self.upvote_ratio),
            Field::NumComments => FieldValue::Int(self.num_comments),
            Field::Comments => return None,
        };
        Some(value)
    }
}

/// One extracted submission, frozen at the time it was retrieved.
///
/// Field order is the serialized column order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmissionRecord {
    pub id: String,
    pub forum: String,
    pub title: String,
    pub url: String,
    pub selftext: String,
    pub is_self: bool,
    pub post_hint: Option<String>,
    pub score: i64,
    pub upvote_ratio: f64,
    pub num_comments: i64,
    pub comments: Value,
    pub created_utc: f64,
    pub created_at: DateTime<Utc>,
    pub retrieved_at: DateTime<Utc>,
    /// Stored as whole nanoseconds
    #[serde(with = "duration_nanos")]
    pub age_at_retrieval: Duration,
}

impl SubmissionRecord {
    /// Number of serialized columns.
    pub const COLUMN_COUNT: usize = 15;

    /// Merge ordering key: newest `created_at`, then oldest at retrieval.
    pub fn recency_key(&self) -> (DateTime<Utc>, Duration) {
        (self.created_at, self.age_at_retrieval)
    }
}

/// Convert epoch seconds (possibly fractional) to a UTC timestamp.
pub fn timestamp_from_epoch(created_utc: f64) -> Option<DateTime<Utc>> {
    if !created_utc.is_finite() {
        return None;
    }
    let secs = created_utc.floor();
    let nanos = ((created_utc - secs) * 1e9).round() as u32;
    Utc.timestamp_opt(secs as i64, nanos.min(999_999_999))
        .single()
}

/// A table of submission records for one forum and sort mode.
///
/// Used both for single-run snapshots and for combined tables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmissionTable {
    pub forum: String,
    /// Sort tag, e.g. `new` or `top_all`
    pub sort: String,
    /// Retrieval instant of the snapshot, or the newest one in a combined table
    pub retrieved_at: DateTime<Utc>,
    pub count: usize,
    pub rows: Vec<SubmissionRecord>,
}

impl SubmissionTable {
    pub fn new(
        forum: impl Into<String>,
        sort: impl Into<String>,
        retrieved_at: DateTime<Utc>,
        rows: Vec<SubmissionRecord>,
    ) -> Self {
        Self {
            forum: forum.into(),
            sort: sort.into(),
            retrieved_at,
            count: rows.len(),
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), SubmissionRecord::COLUMN_COUNT)
    }

    pub fn newest_created(&self) -> Option<DateTime<Utc>> {
        self.rows.iter().map(|r| r.created_at).max()
    }

    pub fn oldest_created(&self) -> Option<DateTime<Utc>> {
        self.rows.iter().map(|r| r.created_at).min()
    }

    /// Serialized form written to disk.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(AppError::from)
    }

    /// SHA-256 of the serialized table, hex encoded.
    pub fn digest(&self) -> Result<String> {
        let bytes = self.to_json_bytes()?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }
}

/// `chrono::Duration` as a signed nanosecond count, so a stored age is
/// exactly `retrieved_at - created_at`.
mod duration_nanos {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer, ser};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let nanos = value.num_nanoseconds().ok_or_else(|| {
            <S::Error as ser::Error>::custom(format!("age {value} out of range"))
        })?;
        serializer.serialize_i64(nanos)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        i64::deserialize(deserializer).map(Duration::nanoseconds)
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::{record, table};
    use super::*;

    #[test]
    fn test_raw_submission_from_listing_json() {
        let json = r#"{
            "id": "1abcd2",
            "title": "Metro delays",
            "url": "https://i.redd.it/x.jpg",
            "is_self": false,
            "selftext": "",
            "post_hint": "image",
            "score": 42,
            "upvote_ratio": 0.97,
            "num_comments": 7,
            "created_utc": 1700000000.0,
            "author": "someone"
        }"#;
        let raw: RawSubmission = serde_json::from_str(json).unwrap();
        assert_eq!(raw.id, "1abcd2");
        assert_eq!(raw.post_hint.as_deref(), Some("image"));
        assert_eq!(raw.num_comments, 7);
    }

    #[test]
    fn test_raw_submission_missing_post_hint() {
        let json = r#"{"id": "x", "title": "t", "url": "u", "created_utc": 1.0}"#;
        let raw: RawSubmission = serde_json::from_str(json).unwrap();
        assert!(raw.post_hint.is_none());
        assert!(!raw.is_self);
    }

    #[test]
    fn test_timestamp_from_epoch() {
        let ts = timestamp_from_epoch(1_700_000_000.5).unwrap();
        assert_eq!(ts.timestamp(), 1_700_000_000);
        assert_eq!(ts.timestamp_subsec_millis(), 500);
        assert!(timestamp_from_epoch(f64::NAN).is_none());
    }

    #[test]
    fn test_record_column_order() {
        let json = serde_json::to_string(&record("a1", 100, 160)).unwrap();
        assert!(json.starts_with(r#"{"id":"a1","forum":"washingtondc","title":"#));
        assert!(json.ends_with(r#""age_at_retrieval":60000000000}"#));

        let position = |key: &str| json.find(&format!("\"{key}\":")).unwrap();
        assert!(position("comments") < position("created_utc"));
        assert!(position("created_at") < position("retrieved_at"));

        let value = serde_json::to_value(record("a1", 100, 160)).unwrap();
        assert_eq!(
            value.as_object().unwrap().len(),
            SubmissionRecord::COLUMN_COUNT
        );
    }

    #[test]
    fn test_age_keeps_subsecond_precision() {
        let mut row = record("a1", 100, 160);
        row.retrieved_at += Duration::nanoseconds(735_964_566);
        row.age_at_retrieval = row.retrieved_at - row.created_at;

        let json = serde_json::to_string(&row).unwrap();
        let loaded: SubmissionRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.age_at_retrieval, loaded.retrieved_at - loaded.created_at);
        assert_eq!(loaded, row);
    }

    #[test]
    fn test_corrupt_age_is_an_error() {
        let mut value = serde_json::to_value(record("a1", 100, 160)).unwrap();
        for bad in [
            serde_json::json!(u64::MAX),
            serde_json::json!(1e30),
            serde_json::json!("60"),
        ] {
            value["age_at_retrieval"] = bad;
            assert!(serde_json::from_value::<SubmissionRecord>(value.clone()).is_err());
        }

        let mut row = record("a1", 100, 160);
        row.age_at_retrieval = Duration::MAX;
        assert!(serde_json::to_string(&row).is_err());
    }

    #[test]
    fn test_table_summary_helpers() {
        let t = table(vec![record("a", 100, 200), record("b", 150, 200)]);
        assert_eq!(t.shape(), (2, SubmissionRecord::COLUMN_COUNT));
        assert_eq!(t.newest_created().unwrap().timestamp(), 150);
        assert_eq!(t.oldest_created().unwrap().timestamp(), 100);
    }

    #[test]
    fn test_digest_is_stable() {
        let t = table(vec![record("a", 100, 200)]);
        assert_eq!(t.digest().unwrap(), t.clone().digest().unwrap());
        assert_eq!(t.digest().unwrap().len(), 64);
    }
}
