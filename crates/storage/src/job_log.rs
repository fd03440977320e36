// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only job logs with single-generation rotation.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::Utc;
use fs2::FileExt;
use wj_core::format_log_time;

/// Size above which a rolling log is moved to its previous-generation slot.
pub const MAX_LOG_FILE_SIZE: u64 = 1024 * 1024;

/// Previous generation of a continuous job's `job_log.txt`.
pub const PREV_LOG_FILE: &str = "job_prev_log.txt";

wj_core::string_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum LogLevel {
        Info => "INFO",
        Warn => "WARN",
        Error => "ERR",
    }
}

#[derive(Debug, Clone)]
struct Rotation {
    max_size: u64,
    previous: PathBuf,
}

/// Append-only log file shared by every instance writing for a job.
///
/// Each line carries a `[time > instance: LEVEL]` header; lines written by the
/// host rather than the job process are marked `SYS`. Each `append()` opens,
/// writes, and closes the file, which keeps concurrent writers from different
/// instances interleaving whole lines.
#[derive(Debug, Clone)]
pub struct JobLog {
    path: PathBuf,
    instance_id: String,
    rotation: Option<Rotation>,
}

impl JobLog {
    /// A log that is never rotated.
    pub fn append_only(path: impl Into<PathBuf>, instance_id: impl Into<String>) -> Self {
        Self { path: path.into(), instance_id: instance_id.into(), rotation: None }
    }

    /// A log rolled to `previous` once it exceeds [`MAX_LOG_FILE_SIZE`].
    pub fn rolling(
        path: impl Into<PathBuf>,
        previous: impl Into<PathBuf>,
        instance_id: impl Into<String>,
    ) -> Self {
        Self::append_only(path, instance_id).with_max_size(MAX_LOG_FILE_SIZE, previous)
    }

    pub fn with_max_size(mut self, max_size: u64, previous: impl Into<PathBuf>) -> Self {
        self.rotation = Some(Rotation { max_size, previous: previous.into() });
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry.
    ///
    /// Failures are logged via tracing but do not propagate; logging must not
    /// break job supervision.
    pub fn append(&self, level: LogLevel, message: &str, system: bool) {
        if let Err(e) = self.write_line(level, message, system) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to write job log");
        }
    }

    fn write_line(&self, level: LogLevel, message: &str, system: bool) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        if let Some(rotation) = &self.rotation {
            self.roll_if_needed(rotation)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let line = format!(
            "[{} > {}: {}{}] {}\n",
            format_log_time(Utc::now()),
            self.instance_id,
            if system { "SYS " } else { "" },
            level,
            message
        );
        file.write_all(line.as_bytes())
    }

    /// Move an oversized log to the previous slot.
    ///
    /// Only the instance that wins the exclusive lock on the oversized file
    /// performs the roll; the others keep appending and see the fresh file on
    /// their next write.
    fn roll_if_needed(&self, rotation: &Rotation) -> io::Result<()> {
        match fs::metadata(&self.path) {
            Ok(meta) if meta.len() > rotation.max_size => {}
            Ok(_) => return Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        }
        let file = match OpenOptions::new().read(true).write(true).open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        };
        if file.try_lock_exclusive().is_err() {
            return Ok(());
        }
        // Another instance may have rolled between our size check and the lock.
        let still_oversized =
            fs::metadata(&self.path).map(|m| m.len() > rotation.max_size).unwrap_or(false);
        if still_oversized {
            match fs::remove_file(&rotation.previous) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
            fs::rename(&self.path, &rotation.previous)?;
        }
        FileExt::unlock(&file)
    }
}

/// Outcome of offering one console line to a [`ConsoleBudget`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleVerdict {
    Write,
    /// The cap was just reached; write a single warning instead
    LimitReached,
    Drop,
}

/// Caps the number of console lines persisted per process launch.
#[derive(Debug)]
pub struct ConsoleBudget {
    max_lines: usize,
    used: AtomicUsize,
}

impl ConsoleBudget {
    pub fn new(max_lines: usize) -> Self {
        Self { max_lines, used: AtomicUsize::new(0) }
    }

    pub fn reset(&self) {
        self.used.store(0, Ordering::SeqCst);
    }

    pub fn admit(&self) -> ConsoleVerdict {
        let used = self.used.fetch_add(1, Ordering::SeqCst);
        match used.cmp(&self.max_lines) {
            std::cmp::Ordering::Less => ConsoleVerdict::Write,
            std::cmp::Ordering::Equal => ConsoleVerdict::LimitReached,
            std::cmp::Ordering::Greater => ConsoleVerdict::Drop,
        }
    }
}

#[cfg(test)]
#[path = "job_log_tests.rs"]
mod tests;
