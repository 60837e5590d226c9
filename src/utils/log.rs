// src/utils/log.rs

//! Formatted status output on top of the `log` facade.
//!
//! Run banners, steps and summaries go through `log::info!` so they share
//! the logger's timestamps and filtering.

use std::time::Duration;

/// Log an info message
pub fn info(message: &str) {
    ::log::info!("{}", message);
}

/// Log a warning message
pub fn warn(message: &str) {
    ::log::warn!("{}", message);
}

/// Log a success message
pub fn success(message: &str) {
    ::log::info!("✓ {}", message);
}

/// Log a step in a process
pub fn step(step_num: usize, total: usize, message: &str) {
    ::log::info!("[STEP {}/{}] {}", step_num, total, message);
}

/// Log a header
pub fn header(title: &str) {
    let border = "═".repeat(60);
    ::log::info!("{}", border);
    ::log::info!("  {}", title);
    ::log::info!("{}", border);
}

/// Log a sub-item (indented)
pub fn sub_item(message: &str) {
    ::log::info!("    {}", message);
}

/// Log a summary section
pub fn summary(title: &str, items: &[(&str, String)]) {
    ::log::info!("[SUMMARY] {}", title);
    for (key, value) in items {
        ::log::info!("    {}: {}", key, value);
    }
}

/// Log the time elapsed since the run started.
pub fn time_check(elapsed: Duration) {
    ::log::info!("Time check: {}", format_elapsed(elapsed));
}

/// `"{m} minutes and {s} seconds"`, seconds rounded.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64().round() as u64;
    format!("{} minutes and {} seconds", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::ZERO), "0 minutes and 0 seconds");
        assert_eq!(
            format_elapsed(Duration::from_millis(125_600)),
            "2 minutes and 6 seconds"
        );
        assert_eq!(
            format_elapsed(Duration::from_secs(3_600)),
            "60 minutes and 0 seconds"
        );
    }
}
