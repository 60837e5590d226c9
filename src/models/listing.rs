// src/models/listing.rs

//! Sort modes, time windows, and listing requests.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Time period used by the `top` and `controversial` listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    All,
    Year,
    Month,
    Week,
    Day,
    Hour,
}

impl TimeWindow {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeWindow::All => "all",
            TimeWindow::Year => "year",
            TimeWindow::Month => "month",
            TimeWindow::Week => "week",
            TimeWindow::Day => "day",
            TimeWindow::Hour => "hour",
        }
    }
}

impl FromStr for TimeWindow {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "all" => Ok(TimeWindow::All),
            "year" => Ok(TimeWindow::Year),
            "month" => Ok(TimeWindow::Month),
            "week" => Ok(TimeWindow::Week),
            "day" => Ok(TimeWindow::Day),
            "hour" => Ok(TimeWindow::Hour),
            other => Err(AppError::UnsupportedTimeWindow(other.to_string())),
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ranking the remote source applies when listing a forum.
///
/// `Top` and `Controversial` carry their time window; the other modes
/// have none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortMode {
    New,
    Hot,
    Rising,
    Top(TimeWindow),
    Controversial(TimeWindow),
}

impl SortMode {
    /// Parse a sort mode and its optional time window.
    ///
    /// The window is ignored for `new`, `hot` and `rising`, and required for
    /// `top` and `controversial`.
    pub fn parse(sort: &str, time_window: Option<&str>) -> Result<Self> {
        let windowed = |make: fn(TimeWindow) -> SortMode| -> Result<SortMode> {
            let window = time_window.ok_or_else(|| {
                AppError::config(format!("sort mode '{sort}' requires a time window"))
            })?;
            Ok(make(window.parse()?))
        };

        match sort {
            "new" => Ok(SortMode::New),
            "hot" => Ok(SortMode::Hot),
            "rising" => Ok(SortMode::Rising),
            "top" => windowed(SortMode::Top),
            "controversial" => windowed(SortMode::Controversial),
            other => Err(AppError::UnsupportedSortMode(other.to_string())),
        }
    }

    /// Listing path segment (`/r/{forum}/{name}`).
    pub fn name(&self) -> &'static str {
        match self {
            SortMode::New => "new",
            SortMode::Hot => "hot",
            SortMode::Rising => "rising",
            SortMode::Top(_) => "top",
            SortMode::Controversial(_) => "controversial",
        }
    }

    pub fn time_window(&self) -> Option<TimeWindow> {
        match self {
            SortMode::Top(window) | SortMode::Controversial(window) => Some(*window),
            _ => None,
        }
    }

    /// Tag used in snapshot and combined file names, e.g. `new` or `top_all`.
    pub fn file_tag(&self) -> String {
        match self.time_window() {
            Some(window) => format!("{}_{}", self.name(), window),
            None => self.name().to_string(),
        }
    }

    /// Human-readable window description for status messages.
    pub fn window_phrase(&self) -> String {
        match self.time_window() {
            Some(TimeWindow::All) => " (from all time) ".to_string(),
            Some(window) => format!(" (in the past {window}) "),
            None => " ".to_string(),
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_tag())
    }
}

/// A validated request for one forum listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRequest {
    pub forum: String,
    pub sort: SortMode,
    pub limit: usize,
}

/// Forum names are ASCII letters, digits and underscores. They end up in
/// request paths and file names, so nothing else is accepted.
pub fn is_valid_forum_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl ListingRequest {
    pub fn new(forum: impl Into<String>, sort: SortMode, limit: usize) -> Result<Self> {
        let forum = forum.into();
        if forum.trim().is_empty() {
            return Err(AppError::config("forum name is empty"));
        }
        if !is_valid_forum_name(&forum) {
            return Err(AppError::config(format!("invalid forum name '{forum}'")));
        }
        if limit == 0 {
            return Err(AppError::config("fetch limit must be > 0"));
        }
        Ok(Self { forum, sort, limit })
    }
}
