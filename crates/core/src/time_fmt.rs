// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Time formatting helpers for logs and display.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Timestamp used in job log line headers: `2026-01-30 08:14:09`
pub fn format_log_time(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Timestamp used in shutdown notifications and run listings: RFC 3339, seconds precision
pub fn format_run_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

/// Format a duration compactly (e.g., "5s", "2m 3s", "1h 4m", "3d 2h")
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    match secs {
        0..=59 => format!("{}s", secs),
        60..=3599 => format!("{}m {}s", secs / 60, secs % 60),
        3600..=86_399 => format!("{}h {}m", secs / 3600, secs % 3600 / 60),
        _ => format!("{}d {}h", secs / 86_400, secs % 86_400 / 3600),
    }
}

#[cfg(test)]
#[path = "time_fmt_tests.rs"]
mod tests;
