//! Service layer for the snapshot application.
//!
//! This module contains the business logic for:
//! - Listing retrieval (`fetch_listing`)
//! - Column-wise field extraction (`FieldExtractor`)
//! - Bounded retry on rate limits (`RetryPolicy`)
//! - The Reddit API source (`RedditClient`)

mod extractor;
mod fetcher;
mod reddit;
mod retry;
mod source;

pub use extractor::{FieldExtractor, FieldSpec};
pub use fetcher::{FetchedBatch, fetch, fetch_listing};
pub use reddit::{Credentials, RedditClient, RedditSubmission, classify_status};
pub use retry::RetryPolicy;
pub use source::{SubmissionItem, SubmissionSource};

#[cfg(test)]
pub(crate) use fetcher::fakes;
