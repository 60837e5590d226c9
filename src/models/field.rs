// src/models/field.rs

//! Extractable submission fields and their values.

use std::fmt;

use serde_json::Value;

use crate::error::{AppError, Result};

/// A scalar (or opaque) field read from a raw submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Title,
    CreatedUtc,
    Id,
    Url,
    IsSelf,
    Selftext,
    PostHint,
    Score,
    UpvoteRatio,
    NumComments,
    Comments,
}

impl Field {
    /// Extraction order. `Comments` is last: it needs network I/O per row
    /// and is the column most likely to hit the rate limit.
    pub const ALL: [Field; 11] = [
        Field::Title,
        Field::CreatedUtc,
        Field::Id,
        Field::Url,
        Field::IsSelf,
        Field::Selftext,
        Field::PostHint,
        Field::Score,
        Field::UpvoteRatio,
        Field::NumComments,
        Field::Comments,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::CreatedUtc => "created_utc",
            Field::Id => "id",
            Field::Url => "url",
            Field::IsSelf => "is_self",
            Field::Selftext => "selftext",
            Field::PostHint => "post_hint",
            Field::Score => "score",
            Field::UpvoteRatio => "upvote_ratio",
            Field::NumComments => "num_comments",
            Field::Comments => "comments",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Value of one cell in an extracted column.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    OptionalText(Option<String>),
    Bool(bool),
    Int(i64),
    Float(f64),
    Json(Value),
}

impl FieldValue {
    fn mismatch(field: Field, expected: &str, got: &FieldValue) -> AppError {
        AppError::extraction(field.name(), format!("expected {expected}, got {got:?}"))
    }

    pub fn into_text(self, field: Field) -> Result<String> {
        match self {
            FieldValue::Text(s) => Ok(s),
            other => Err(Self::mismatch(field, "text", &other)),
        }
    }

    pub fn into_optional_text(self, field: Field) -> Result<Option<String>> {
        match self {
            FieldValue::OptionalText(s) => Ok(s),
            FieldValue::Text(s) => Ok(Some(s)),
            other => Err(Self::mismatch(field, "optional text", &other)),
        }
    }

    pub fn into_bool(self, field: Field) -> Result<bool> {
        match self {
            FieldValue::Bool(b) => Ok(b),
            other => Err(Self::mismatch(field, "bool", &other)),
        }
    }

    pub fn into_int(self, field: Field) -> Result<i64> {
        match self {
            FieldValue::Int(n) => Ok(n),
            other => Err(Self::mismatch(field, "integer", &other)),
        }
    }

    pub fn into_float(self, field: Field) -> Result<f64> {
        match self {
            FieldValue::Float(x) => Ok(x),
            FieldValue::Int(n) => Ok(n as f64),
            other => Err(Self::mismatch(field, "float", &other)),
        }
    }

    pub fn into_json(self) -> Value {
        match self {
            FieldValue::Json(v) => v,
            FieldValue::Text(s) => Value::String(s),
            FieldValue::OptionalText(s) => s.map(Value::String).unwrap_or(Value::Null),
            FieldValue::Bool(b) => Value::Bool(b),
            FieldValue::Int(n) => Value::from(n),
            FieldValue::Float(x) => Value::from(x),
        }
    }
}
