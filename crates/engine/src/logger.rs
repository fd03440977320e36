// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job loggers: where host messages, process output, and status go.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use wj_core::paths::{ERROR_LOG_FILE, OUTPUT_LOG_FILE, RUN_STATUS_FILE};
use wj_core::{ContinuousStatus, JobPaths, JobStatus, TriggeredRunStatus};
use wj_storage::{write_status, ConsoleBudget, ConsoleVerdict, FileLock, JobLog, LogLevel};

/// Console lines persisted per continuous process launch.
pub const MAX_CONSOLE_LINES: usize = 200;

const CONSOLE_LIMIT_MESSAGE: &str =
    "Reached maximum allowed console output lines for this run; further output is not persisted";

/// Sink for one job's host messages, process output, and status.
pub trait JobLogger: Send + Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
    fn stdout(&self, line: &str);
    fn stderr(&self, line: &str);
    fn report_status(&self, status: JobStatus);
}

/// Logger of one continuous job on this instance.
///
/// Writes `job_log.txt` (shared by all instances) and this instance's
/// `status_<instance>` document. While it lives it holds the instance
/// liveness lock that tells other instances the status document is current.
pub struct ContinuousJobLogger {
    name: String,
    log: JobLog,
    status_path: PathBuf,
    console: ConsoleBudget,
    last_status: Mutex<Option<JobStatus>>,
    // NOTE(lifetime): Held to mark this instance's status document as live; released on drop
    _liveness: FileLock,
}

impl ContinuousJobLogger {
    pub fn new(paths: &JobPaths) -> Self {
        let liveness = FileLock::new(paths.instance_status_lock());
        match liveness.try_acquire() {
            Ok(true) => {}
            Ok(false) => tracing::warn!(job = %paths.name, "instance status lock already held"),
            Err(e) => tracing::warn!(job = %paths.name, error = %e, "failed to take instance status lock"),
        }
        Self {
            name: paths.name.clone(),
            log: JobLog::rolling(
                paths.job_log(),
                paths.data.join(wj_storage::PREV_LOG_FILE),
                paths.instance_id.clone(),
            ),
            status_path: paths.instance_status(),
            console: ConsoleBudget::new(MAX_CONSOLE_LINES),
            last_status: Mutex::new(None),
            _liveness: liveness,
        }
    }

    pub fn log_path(&self) -> &Path {
        self.log.path()
    }

    /// Begin a new process launch; resets the console line budget.
    pub fn start_run(&self) {
        self.console.reset();
    }

    pub fn status(&self) -> Option<JobStatus> {
        *self.last_status.lock()
    }

    fn console(&self, level: LogLevel, line: &str) {
        match self.console.admit() {
            ConsoleVerdict::Write => self.log.append(level, line, false),
            ConsoleVerdict::LimitReached => self.log.append(LogLevel::Warn, CONSOLE_LIMIT_MESSAGE, true),
            ConsoleVerdict::Drop => {}
        }
    }
}

impl JobLogger for ContinuousJobLogger {
    fn info(&self, message: &str) {
        tracing::info!(job = %self.name, "{}", message);
        self.log.append(LogLevel::Info, message, true);
    }

    fn warn(&self, message: &str) {
        tracing::warn!(job = %self.name, "{}", message);
        self.log.append(LogLevel::Warn, message, true);
    }

    fn error(&self, message: &str) {
        tracing::error!(job = %self.name, "{}", message);
        self.log.append(LogLevel::Error, message, true);
    }

    fn stdout(&self, line: &str) {
        self.console(LogLevel::Info, line);
    }

    fn stderr(&self, line: &str) {
        self.console(LogLevel::Error, line);
    }

    /// Persist `status` if it differs from the last reported one.
    fn report_status(&self, status: JobStatus) {
        let mut last = self.last_status.lock();
        if *last == Some(status) {
            return;
        }
        if let Err(e) = write_status(&self.status_path, &ContinuousStatus { status }) {
            tracing::warn!(job = %self.name, error = %e, "failed to write job status");
        }
        *last = Some(status);
        drop(last);
        self.log.append(LogLevel::Info, &format!("Status changed to {}", status), true);
    }
}

/// Logger of one triggered run, writing into the run directory.
pub struct TriggeredRunLogger {
    name: String,
    run_dir: PathBuf,
    output: JobLog,
    errors: JobLog,
    doc: Mutex<TriggeredRunStatus>,
    failed: AtomicBool,
}

impl TriggeredRunLogger {
    pub fn new(name: &str, run_dir: &Path, instance_id: &str, doc: TriggeredRunStatus) -> Self {
        Self {
            name: name.to_string(),
            run_dir: run_dir.to_path_buf(),
            output: JobLog::append_only(run_dir.join(OUTPUT_LOG_FILE), instance_id),
            errors: JobLog::append_only(run_dir.join(ERROR_LOG_FILE), instance_id),
            doc: Mutex::new(doc),
            failed: AtomicBool::new(false),
        }
    }

    pub fn output_log(&self) -> &Path {
        self.output.path()
    }

    /// Record the terminal status and end time.
    ///
    /// A run that logged an error ends `Failed` even if it exited cleanly.
    pub fn finish(&self, status: JobStatus, end_time: DateTime<Utc>) -> JobStatus {
        let status = if status == JobStatus::Success && self.failed.load(Ordering::SeqCst) {
            JobStatus::Failed
        } else {
            status
        };
        let mut doc = self.doc.lock();
        doc.status = status;
        doc.end_time = Some(end_time);
        self.persist(&doc);
        status
    }

    fn persist(&self, doc: &TriggeredRunStatus) {
        if let Err(e) = write_status(&self.run_dir.join(RUN_STATUS_FILE), doc) {
            tracing::warn!(job = %self.name, error = %e, "failed to write run status");
        }
    }
}

impl JobLogger for TriggeredRunLogger {
    fn info(&self, message: &str) {
        tracing::info!(job = %self.name, "{}", message);
        self.output.append(LogLevel::Info, message, true);
    }

    fn warn(&self, message: &str) {
        tracing::warn!(job = %self.name, "{}", message);
        self.output.append(LogLevel::Warn, message, true);
    }

    fn error(&self, message: &str) {
        tracing::error!(job = %self.name, "{}", message);
        self.failed.store(true, Ordering::SeqCst);
        self.output.append(LogLevel::Error, message, true);
        self.errors.append(LogLevel::Error, message, true);
    }

    fn stdout(&self, line: &str) {
        self.output.append(LogLevel::Info, line, false);
    }

    fn stderr(&self, line: &str) {
        self.output.append(LogLevel::Error, line, false);
        self.errors.append(LogLevel::Error, line, false);
    }

    fn report_status(&self, status: JobStatus) {
        let mut doc = self.doc.lock();
        doc.status = status;
        self.persist(&doc);
    }
}

#[cfg(test)]
#[path = "logger_tests.rs"]
mod tests;
