// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run history of a triggered job: one directory per run, named by run id.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};
use wj_core::paths::{ERROR_LOG_FILE, OUTPUT_LOG_FILE, RUN_STATUS_FILE};
use wj_core::{JobStatus, RunId, TriggeredJobRun, TriggeredRunStatus};

use crate::status_file::{read_status, write_status};
use crate::StorageError;

#[derive(Debug, Clone)]
pub struct RunHistory {
    dir: PathBuf,
}

impl RunHistory {
    /// History rooted at a triggered job's data directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn run_dir(&self, id: &RunId) -> PathBuf {
        self.dir.join(id.as_str())
    }

    /// Run ids, newest first.
    pub fn run_ids(&self) -> Vec<RunId> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };
        let mut ids: Vec<RunId> = entries
            .filter_map(Result::ok)
            .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .filter_map(|e| e.file_name().into_string().ok())
            .filter(|name| !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit()))
            .map(RunId::from)
            .collect();
        ids.sort_by(|a, b| b.cmp(a));
        ids
    }

    /// Delete the oldest runs so that a new run fits within `max_runs`.
    ///
    /// Leaves at most `max_runs - 1` runs. Returns the removed ids.
    pub fn prune(&self, max_runs: usize) -> Vec<RunId> {
        let keep = max_runs.saturating_sub(1);
        let mut removed = Vec::new();
        for id in self.run_ids().into_iter().skip(keep) {
            match fs::remove_dir_all(self.run_dir(&id)) {
                Ok(()) => removed.push(id),
                Err(e) => {
                    tracing::warn!(run = %id, dir = %self.dir.display(), error = %e, "failed to prune run");
                }
            }
        }
        removed
    }

    /// Create the run directory and its initial status document.
    pub fn create_run(
        &self,
        id: &RunId,
        trigger: &str,
        start_time: DateTime<Utc>,
    ) -> Result<PathBuf, StorageError> {
        let dir = self.run_dir(id);
        fs::create_dir_all(&dir)?;
        let status = TriggeredRunStatus {
            trigger: trigger.to_string(),
            status: JobStatus::Initializing,
            start_time,
            end_time: None,
        };
        write_status(&dir.join(RUN_STATUS_FILE), &status)?;
        Ok(dir)
    }

    /// Read one run as persisted, without reconciling stale in-progress statuses.
    ///
    /// A missing or malformed status document reads as `Initializing`, started
    /// at the time encoded in the id.
    pub fn read_run(&self, id: &RunId) -> Option<TriggeredJobRun> {
        let dir = self.run_dir(id);
        if !dir.is_dir() {
            return None;
        }
        let status: Option<TriggeredRunStatus> = read_status(&dir.join(RUN_STATUS_FILE));
        let (trigger, status, start_time, end_time) = match status {
            Some(doc) => (doc.trigger, doc.status, doc.start_time, doc.end_time),
            None => (String::new(), JobStatus::Initializing, start_time_from_id(id)?, None),
        };
        let existing = |name: &str| Some(dir.join(name)).filter(|p| p.is_file());
        Some(TriggeredJobRun {
            id: id.clone(),
            trigger,
            status,
            start_time,
            end_time,
            output_log: existing(OUTPUT_LOG_FILE),
            error_log: existing(ERROR_LOG_FILE),
        })
    }

    /// All runs, newest first.
    ///
    /// Runs still marked in progress are reported `Aborted` unless they are the
    /// latest run and `run_lock_held` says a worker still owns it.
    pub fn runs(&self, run_lock_held: bool) -> Vec<TriggeredJobRun> {
        let mut runs: Vec<_> = self.run_ids().iter().filter_map(|id| self.read_run(id)).collect();
        for (index, run) in runs.iter_mut().enumerate() {
            let is_latest = index == 0;
            if run.status.is_in_progress() && (!is_latest || !run_lock_held) {
                run.status = JobStatus::Aborted;
            }
        }
        runs
    }
}

fn start_time_from_id(id: &RunId) -> Option<DateTime<Utc>> {
    let seconds = id.as_str().get(..14)?;
    NaiveDateTime::parse_from_str(seconds, "%Y%m%d%H%M%S").ok().map(|t| t.and_utc())
}

#[cfg(test)]
#[path = "history_tests.rs"]
mod tests;
