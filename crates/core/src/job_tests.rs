// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeZone;
use std::str::FromStr;

#[yare::parameterized(
    continuous = { "continuous", JobType::Continuous },
    triggered = { "triggered", JobType::Triggered },
    mixed_case = { "Triggered", JobType::Triggered },
)]
fn job_type_parses(input: &str, expected: JobType) {
    assert_eq!(JobType::from_str(input).unwrap(), expected);
}

#[test]
fn job_type_rejects_unknown() {
    assert!(JobType::from_str("cron").is_err());
}

#[test]
fn job_type_serializes_lowercase() {
    assert_eq!(serde_json::to_string(&JobType::Continuous).unwrap(), "\"continuous\"");
}

#[test]
fn run_id_uses_ten_thousandths() {
    let time = Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap()
        + chrono::Duration::microseconds(123_456);
    assert_eq!(RunId::at(time).as_str(), "202603040506071234");
}

#[test]
fn run_ids_sort_chronologically() {
    let early = Utc.with_ymd_and_hms(2026, 1, 9, 23, 59, 59).unwrap();
    let late = Utc.with_ymd_and_hms(2026, 1, 10, 0, 0, 0).unwrap();
    assert!(RunId::at(early) < RunId::at(late));
}

#[test]
fn marker_prefix_depends_on_job_type() {
    assert_eq!(JobType::Continuous.marker_prefix(), "WEBJOBS_CONTINUOUS_RUNNING_");
    assert_eq!(JobType::Triggered.marker_prefix(), "WEBJOBS_TRIGGERED_RUNNING_");
}
