// src/services/extractor.rs

//! Column-wise field extraction.
//!
//! Every declared field is read for all items of a batch before the next
//! field starts. A column that hits the rate limit is retried as a whole
//! under the extractor's [`RetryPolicy`].

use std::collections::HashMap;
use std::vec::IntoIter;

use crate::error::{AppError, Result};
use crate::models::{Field, FieldValue, SubmissionRecord, SubmissionTable, timestamp_from_epoch};
use crate::services::fetcher::FetchedBatch;
use crate::services::retry::RetryPolicy;
use crate::services::source::SubmissionItem;
use crate::utils::log;

/// One declared column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub field: Field,
    /// Retry on rate limits; otherwise a single attempt
    pub retry: bool,
}

impl FieldSpec {
    pub fn retried(field: Field) -> Self {
        Self { field, retry: true }
    }

    pub fn single(field: Field) -> Self {
        Self {
            field,
            retry: false,
        }
    }
}

/// Turns a fetched batch into a submission table.
#[derive(Debug, Clone)]
pub struct FieldExtractor {
    fields: Vec<FieldSpec>,
    policy: RetryPolicy,
}

impl FieldExtractor {
    /// Extractor for every field, all retried under `policy`.
    pub fn new(policy: RetryPolicy) -> Self {
        let fields = Field::ALL.iter().copied().map(FieldSpec::retried).collect();
        Self { fields, policy }
    }

    /// Extractor for an explicit, ordered field list.
    pub fn with_fields(fields: Vec<FieldSpec>, policy: RetryPolicy) -> Self {
        Self { fields, policy }
    }

    /// Extract all declared columns and assemble the table.
    ///
    /// Fails without a partial table if any column fails.
    pub async fn extract<I: SubmissionItem>(
        &self,
        batch: &FetchedBatch<I>,
    ) -> Result<SubmissionTable> {
        let mut columns = Columns::default();

        for spec in &self.fields {
            let column = self.extract_column(&batch.items, *spec).await?;
            columns.insert(spec.field, column);
        }

        let mut rows = Vec::with_capacity(batch.len());
        for _ in 0..batch.len() {
            rows.push(columns.next_record(batch)?);
        }

        let table = SubmissionTable::new(
            batch.forum.clone(),
            batch.sort.file_tag(),
            batch.retrieved_at,
            rows,
        );
        log_summary(&table);
        Ok(table)
    }

    async fn extract_column<I: SubmissionItem>(
        &self,
        items: &[I],
        spec: FieldSpec,
    ) -> Result<Vec<FieldValue>> {
        let policy = if spec.retry {
            self.policy
        } else {
            RetryPolicy::once()
        };
        let field = spec.field;

        let (column, attempt) = policy
            .run(field.name(), move |_| async move {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(item.field(field).await?);
                }
                Ok(values)
            })
            .await?;

        ::log::info!("Successfully extracted {} on attempt {}.", field, attempt);
        Ok(column)
    }
}

/// Extracted columns, consumed row by row.
#[derive(Default)]
struct Columns(HashMap<Field, IntoIter<FieldValue>>);

impl Columns {
    fn insert(&mut self, field: Field, values: Vec<FieldValue>) {
        self.0.insert(field, values.into_iter());
    }

    fn next(&mut self, field: Field) -> Result<FieldValue> {
        self.0
            .get_mut(&field)
            .ok_or_else(|| AppError::extraction(field.name(), "field was not extracted"))?
            .next()
            .ok_or_else(|| AppError::extraction(field.name(), "column is shorter than the batch"))
    }

    fn next_record<I>(&mut self, batch: &FetchedBatch<I>) -> Result<SubmissionRecord> {
        let id = self.next(Field::Id)?.into_text(Field::Id)?;
        let created_utc = self.next(Field::CreatedUtc)?.into_float(Field::CreatedUtc)?;
        let created_at = timestamp_from_epoch(created_utc).ok_or_else(|| {
            AppError::extraction(
                Field::CreatedUtc.name(),
                format!("invalid timestamp {created_utc} for {id}"),
            )
        })?;

        Ok(SubmissionRecord {
            forum: batch.forum.clone(),
            title: self.next(Field::Title)?.into_text(Field::Title)?,
            url: self.next(Field::Url)?.into_text(Field::Url)?,
            selftext: self.next(Field::Selftext)?.into_text(Field::Selftext)?,
            is_self: self.next(Field::IsSelf)?.into_bool(Field::IsSelf)?,
            post_hint: self
                .next(Field::PostHint)?
                .into_optional_text(Field::PostHint)?,
            score: self.next(Field::Score)?.into_int(Field::Score)?,
            upvote_ratio: self.next(Field::UpvoteRatio)?.into_float(Field::UpvoteRatio)?,
            num_comments: self.next(Field::NumComments)?.into_int(Field::NumComments)?,
            comments: self.next(Field::Comments)?.into_json(),
            created_utc,
            created_at,
            retrieved_at: batch.retrieved_at,
            age_at_retrieval: batch.retrieved_at - created_at,
            id,
        })
    }
}

fn log_summary(table: &SubmissionTable) {
    let stamp = |ts: Option<chrono::DateTime<chrono::Utc>>| {
        ts.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string())
    };
    let (rows, cols) = table.shape();
    log::summary(
        &format!("r/{} {}", table.forum, table.sort),
        &[
            ("Newest submission", stamp(table.newest_created())),
            ("Oldest submission", stamp(table.oldest_created())),
            ("Shape", format!("({rows}, {cols})")),
        ],
    );
}
