// src/services/source.rs

//! Abstractions over the remote submission source.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Field, FieldValue, ListingRequest};

/// A listed item whose fields can be read on demand.
///
/// Reading a field may require network I/O and may fail with
/// `AppError::RateLimited`.
#[async_trait]
pub trait SubmissionItem: Send + Sync {
    /// Stable identifier, available without a remote call.
    fn id(&self) -> &str;

    /// Read one field.
    async fn field(&self, field: Field) -> Result<FieldValue>;
}

/// Trait for remote listing backends.
#[async_trait]
pub trait SubmissionSource: Send + Sync {
    type Item: SubmissionItem;

    /// List up to `request.limit` items of a forum in the requested order.
    async fn listing(&self, request: &ListingRequest) -> Result<Vec<Self::Item>>;
}
