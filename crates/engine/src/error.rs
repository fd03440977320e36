// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types surfaced by the job managers and the process runner.

use thiserror::Error;
use wj_storage::StorageError;

/// Errors returned to callers of the job managers
#[derive(Debug, Error)]
pub enum JobsError {
    #[error("job not found: {0}")]
    NotFound(String),
    #[error("job {0} is already running")]
    Conflict(String),
    #[error("jobs are stopped on this host")]
    JobsStopped,
    #[error("invalid schedule {expression:?}: {message}")]
    ScheduleParse { expression: String, message: String },
    #[error("watcher error: {0}")]
    Watcher(#[from] notify::Error),
    #[error(transparent)]
    Runner(#[from] RunnerError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from staging or launching a job process
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to stage job files: {0}")]
    Staging(std::io::Error),
    #[error("job has no working directory")]
    NoWorkingDirectory,
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
