// src/services/fetcher.rs

//! Listing fetcher.
//!
//! Reads one forum listing from a [`SubmissionSource`] and stamps it with the
//! instant it was retrieved.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{ListingRequest, SortMode};
use crate::services::source::{SubmissionItem, SubmissionSource};

/// Items of one listing, all retrieved at the same instant.
#[derive(Debug)]
pub struct FetchedBatch<I> {
    pub forum: String,
    pub sort: SortMode,
    pub retrieved_at: DateTime<Utc>,
    pub items: Vec<I>,
}

impl<I> FetchedBatch<I> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Parse the sort mode and window, then fetch the listing.
///
/// Unsupported sort modes and windows fail here, before the source is
/// touched.
pub async fn fetch_listing<S: SubmissionSource + ?Sized>(
    source: &S,
    forum: &str,
    sort: &str,
    time_window: Option<&str>,
    limit: usize,
) -> Result<FetchedBatch<S::Item>> {
    let sort = SortMode::parse(sort, time_window)?;
    let request = ListingRequest::new(forum, sort, limit)?;
    fetch(source, &request).await
}

/// Fetch a validated listing request.
pub async fn fetch<S: SubmissionSource + ?Sized>(
    source: &S,
    request: &ListingRequest,
) -> Result<FetchedBatch<S::Item>> {
    let retrieved_at = Utc::now();
    let listed = source.listing(request).await?;

    let mut seen = HashSet::new();
    let mut items = Vec::with_capacity(listed.len().min(request.limit));
    for item in listed {
        if items.len() == request.limit {
            break;
        }
        if seen.insert(item.id().to_string()) {
            items.push(item);
        } else {
            log::debug!("Dropping repeated listing entry {}", item.id());
        }
    }

    log::info!(
        "Collected {} {} submissions{}from r/{} as of {}.",
        items.len(),
        request.sort.name().to_uppercase(),
        request.sort.window_phrase(),
        request.forum,
        retrieved_at.format("%Y-%m-%d at %H:%M")
    );

    Ok(FetchedBatch {
        forum: request.forum.clone(),
        sort: request.sort,
        retrieved_at,
        items,
    })
}

#[cfg(test)]
pub(crate) mod fakes {
    //! In-memory source used by service and pipeline tests.

    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::json;

    use crate::error::{AppError, Result};
    use crate::models::{Field, FieldValue, ListingRequest, RawSubmission};
    use crate::services::source::{SubmissionItem, SubmissionSource};

    /// Item backed by a raw submission. Reads of a field fail with
    /// `RateLimited` until that field's shared failure budget is used up.
    #[derive(Debug)]
    pub struct FakeItem {
        pub raw: RawSubmission,
        pub failures: Arc<Mutex<HashMap<Field, usize>>>,
        pub calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl SubmissionItem for FakeItem {
        fn id(&self) -> &str {
            &self.raw.id
        }

        async fn field(&self, field: Field) -> Result<FieldValue> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            {
                let mut failures = self.failures.lock().unwrap();
                if let Some(left) = failures.get_mut(&field) {
                    if *left > 0 {
                        *left -= 1;
                        return Err(AppError::RateLimited {
                            retry_after_secs: None,
                        });
                    }
                }
            }
            Ok(match self.raw.scalar(field) {
                Some(value) => value,
                None => FieldValue::Json(json!([{ "id": format!("c_{}", self.raw.id) }])),
            })
        }
    }

    /// Source serving a fixed listing and counting calls.
    #[derive(Debug, Default)]
    pub struct FakeSource {
        pub raws: Vec<RawSubmission>,
        /// Rate-limit failures per field, shared by all items
        pub failures: Arc<Mutex<HashMap<Field, usize>>>,
        pub listing_calls: AtomicUsize,
        pub field_calls: Arc<AtomicUsize>,
    }

    impl FakeSource {
        pub fn new(raws: Vec<RawSubmission>) -> Self {
            Self {
                raws,
                ..Self::default()
            }
        }

        pub fn fail_field(self, field: Field, times: usize) -> Self {
            self.failures.lock().unwrap().insert(field, times);
            self
        }
    }

    #[async_trait]
    impl SubmissionSource for FakeSource {
        type Item = FakeItem;

        async fn listing(&self, request: &ListingRequest) -> Result<Vec<FakeItem>> {
            self.listing_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .raws
                .iter()
                .take(request.limit)
                .map(|raw| FakeItem {
                    raw: raw.clone(),
                    failures: Arc::clone(&self.failures),
                    calls: Arc::clone(&self.field_calls),
                })
                .collect())
        }
    }

    pub fn raw(id: &str, created_utc: f64) -> RawSubmission {
        RawSubmission {
            id: id.to_string(),
            title: format!("Post {id}"),
            url: format!("https://www.reddit.com/r/washingtondc/comments/{id}/"),
            is_self: true,
            selftext: "body".to_string(),
            post_hint: None,
            score: 5,
            upvote_ratio: 0.75,
            num_comments: 1,
            created_utc,
        }
    }
}
