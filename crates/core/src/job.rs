// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job descriptors, job types, and run identifiers.

use crate::script_host::ScriptHost;
use crate::settings::JobSettings;
use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

crate::string_enum! {
    /// How a job is executed.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum JobType {
        /// Supervised, auto-restarting process
        Continuous => "continuous",
        /// One-shot invocation, on demand or by schedule
        Triggered => "triggered",
    }
}

impl JobType {
    /// Prefix of the environment variable that tags every process of a job.
    pub fn marker_prefix(&self) -> &'static str {
        match self {
            JobType::Continuous => "WEBJOBS_CONTINUOUS_RUNNING_",
            JobType::Triggered => "WEBJOBS_TRIGGERED_RUNNING_",
        }
    }
}

/// Names of the environment variables passed to job processes.
pub mod env_vars {
    pub const ROOT_PATH: &str = "WEBJOBS_PATH";
    pub const NAME: &str = "WEBJOBS_NAME";
    pub const TYPE: &str = "WEBJOBS_TYPE";
    pub const DATA_PATH: &str = "WEBJOBS_DATA_PATH";
    pub const RUN_ID: &str = "WEBJOBS_RUN_ID";
    pub const COMMAND_ARGUMENTS: &str = "WEBJOBS_COMMAND_ARGUMENTS";
    pub const SHUTDOWN_FILE: &str = "WEBJOBS_SHUTDOWN_FILE";
}

/// Immutable description of a discovered job.
///
/// Rebuilt on every catalog scan; a running job keeps the descriptor it was
/// started with until it is refreshed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobDescriptor {
    pub name: String,
    pub job_type: JobType,
    /// Source directory the job was discovered in
    pub directory: PathBuf,
    /// Absolute path of the entry script in the source directory
    pub script_path: PathBuf,
    /// Entry script path relative to the job directory
    pub run_command: PathBuf,
    pub script_host: ScriptHost,
    pub settings: JobSettings,
    pub extra_info_url: Option<String>,
}

impl JobDescriptor {
    /// Case-insensitive name comparison, matching filesystem-derived names.
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// Sortable identifier of a triggered run: UTC `yyyyMMddHHmmss` plus four
/// sub-second digits.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    pub fn at(time: DateTime<Utc>) -> Self {
        let ten_thousandths = time.nanosecond() % 1_000_000_000 / 100_000;
        Self(format!("{}{:04}", time.format("%Y%m%d%H%M%S"), ten_thousandths))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RunId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RunId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
