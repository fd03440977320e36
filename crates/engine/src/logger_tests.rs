// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeZone;
use wj_core::JobType;
use wj_storage::read_status;

use crate::test_helpers::Site;

#[test]
fn continuous_status_written_only_on_change() {
    let site = Site::new();
    let paths = site.paths.job(JobType::Continuous, "worker");
    let logger = ContinuousJobLogger::new(&paths);

    logger.report_status(JobStatus::Starting);
    logger.report_status(JobStatus::Starting);
    logger.report_status(JobStatus::Running);

    let doc: ContinuousStatus = read_status(&paths.instance_status()).unwrap();
    assert_eq!(doc.status, JobStatus::Running);
    let log = std::fs::read_to_string(paths.job_log()).unwrap();
    assert_eq!(log.matches("Status changed to Starting").count(), 1);
    assert_eq!(log.matches("Status changed to Running").count(), 1);
}

#[test]
fn continuous_logger_holds_liveness_lock() {
    let site = Site::new();
    let paths = site.paths.job(JobType::Continuous, "worker");
    let logger = ContinuousJobLogger::new(&paths);
    assert!(FileLock::is_locked(&paths.instance_status_lock()));
    drop(logger);
    assert!(!FileLock::is_locked(&paths.instance_status_lock()));
}

#[test]
fn console_output_is_capped_per_run() {
    let site = Site::new();
    let paths = site.paths.job(JobType::Continuous, "chatty");
    let logger = ContinuousJobLogger::new(&paths);

    for i in 0..MAX_CONSOLE_LINES + 50 {
        logger.stdout(&format!("line {}", i));
    }
    let log = std::fs::read_to_string(paths.job_log()).unwrap();
    assert_eq!(log.lines().count(), MAX_CONSOLE_LINES + 1);
    assert_eq!(log.matches(CONSOLE_LIMIT_MESSAGE).count(), 1);

    logger.start_run();
    logger.stdout("after restart");
    let log = std::fs::read_to_string(paths.job_log()).unwrap();
    assert!(log.contains("after restart"));
}

fn run_logger(dir: &Path) -> TriggeredRunLogger {
    let doc = TriggeredRunStatus {
        trigger: "External".to_string(),
        status: JobStatus::Initializing,
        start_time: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        end_time: None,
    };
    TriggeredRunLogger::new("report", dir, "inst01", doc)
}

#[test]
fn triggered_stderr_goes_to_both_logs() {
    let dir = tempfile::tempdir().unwrap();
    let logger = run_logger(dir.path());
    logger.stdout("progress");
    logger.stderr("warning: disk");

    let output = std::fs::read_to_string(dir.path().join(OUTPUT_LOG_FILE)).unwrap();
    let errors = std::fs::read_to_string(dir.path().join(ERROR_LOG_FILE)).unwrap();
    assert!(output.contains("progress"));
    assert!(output.contains("warning: disk"));
    assert!(errors.contains("warning: disk"));
    assert!(!errors.contains("progress"));
}

#[test]
fn logged_error_turns_success_into_failure() {
    let dir = tempfile::tempdir().unwrap();
    let logger = run_logger(dir.path());
    logger.report_status(JobStatus::Running);
    logger.error("Job failed due to exit code 3");

    let end = Utc.with_ymd_and_hms(2026, 1, 1, 0, 1, 0).unwrap();
    assert_eq!(logger.finish(JobStatus::Success, end), JobStatus::Failed);

    let doc: TriggeredRunStatus = read_status(&dir.path().join(RUN_STATUS_FILE)).unwrap();
    assert_eq!(doc.status, JobStatus::Failed);
    assert_eq!(doc.end_time, Some(end));
}

#[test]
fn clean_run_finishes_with_success() {
    let dir = tempfile::tempdir().unwrap();
    let logger = run_logger(dir.path());
    let end = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 5).unwrap();
    assert_eq!(logger.finish(JobStatus::Success, end), JobStatus::Success);
}
