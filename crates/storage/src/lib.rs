// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! wj-storage: plain-file persistence shared across host instances
//!
//! Everything here must be safe when several host processes point at the
//! same data directory: locks are OS file locks, status documents are
//! replaced atomically, and log rolls are guarded by an exclusive lock.

mod history;
mod job_log;
mod lock;
mod status_file;

pub use history::RunHistory;
pub use job_log::{ConsoleBudget, ConsoleVerdict, JobLog, LogLevel, MAX_LOG_FILE_SIZE, PREV_LOG_FILE};
pub use lock::FileLock;
pub use status_file::{read_status, write_status};

use thiserror::Error;

/// Errors from storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
