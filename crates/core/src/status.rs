// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job statuses and the documents they are persisted in.

use crate::job::RunId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

crate::string_enum! {
    /// Status of a continuous job instance or a triggered run.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub enum JobStatus {
        #[default]
        Initializing => "Initializing",
        Starting => "Starting",
        Running => "Running",
        PendingRestart => "PendingRestart",
        /// Another instance holds the singleton lock
        InactiveInstance => "InactiveInstance",
        Disabling => "Disabling",
        Stopping => "Stopping",
        Stopped => "Stopped",
        Success => "Success",
        Failed => "Failed",
        Aborted => "Aborted",
    }
}

impl JobStatus {
    /// Whether a triggered run in this status may still be executing.
    pub fn is_in_progress(&self) -> bool {
        matches!(self, JobStatus::Initializing | JobStatus::Starting | JobStatus::Running)
    }

    /// Rank used when reducing several instance statuses to one.
    ///
    /// Lower is more significant. `InactiveInstance` ranks last so any
    /// instance doing real work determines the reported status.
    pub fn aggregate_rank(&self) -> u8 {
        match self {
            JobStatus::Running => 0,
            JobStatus::Starting => 1,
            JobStatus::PendingRestart => 2,
            JobStatus::Stopping => 3,
            JobStatus::Disabling => 4,
            JobStatus::Stopped => 5,
            JobStatus::Failed => 6,
            JobStatus::Aborted => 7,
            JobStatus::Success => 8,
            JobStatus::Initializing => 9,
            JobStatus::InactiveInstance => 10,
        }
    }
}

/// Per-instance status document of a continuous job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinuousStatus {
    pub status: JobStatus,
}

/// Status document of one triggered run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggeredRunStatus {
    pub trigger: String,
    pub status: JobStatus,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
}

/// A triggered run as reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggeredJobRun {
    pub id: RunId,
    pub trigger: String,
    pub status: JobStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub output_log: Option<PathBuf>,
    pub error_log: Option<PathBuf>,
}

impl TriggeredJobRun {
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.end_time.map(|end| end - self.start_time)
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
