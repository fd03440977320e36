// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cross-instance mutual exclusion over shared storage.
//!
//! A lock is held by keeping an exclusively locked file handle open. The OS
//! drops the lock when the handle closes, including when the holding process
//! crashes, so another instance can always take over.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use parking_lot::Mutex;

use crate::StorageError;

/// File-backed lock keyed by path.
///
/// Acquisition never blocks; callers decide whether to fail fast or poll.
#[derive(Debug)]
pub struct FileLock {
    path: PathBuf,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    held: Mutex<Option<File>>,
}

impl FileLock {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), held: Mutex::new(None) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Try to take the lock.
    ///
    /// Returns `Ok(false)` when another handle holds it, or when this handle
    /// already does.
    pub fn try_acquire(&self) -> Result<bool, StorageError> {
        let mut held = self.held.lock();
        if held.is_some() {
            return Ok(false);
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        // Don't truncate before the lock is ours; the file names the current owner.
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)?;
        match file.try_lock_exclusive() {
            Ok(()) => {}
            Err(e) if is_contended(&e) => return Ok(false),
            Err(e) => return Err(e.into()),
        }
        if let Err(e) = file.set_len(0).and_then(|()| writeln!(&file, "{}", std::process::id())) {
            tracing::debug!(path = %self.path.display(), error = %e, "failed to record lock owner");
        }
        *held = Some(file);
        Ok(true)
    }

    /// Release the lock. Releasing an unheld lock is a no-op.
    pub fn release(&self) {
        if let Some(file) = self.held.lock().take() {
            if let Err(e) = FileExt::unlock(&file) {
                tracing::debug!(path = %self.path.display(), error = %e, "failed to unlock");
            }
        }
    }

    /// Whether this handle currently holds the lock.
    pub fn is_held(&self) -> bool {
        self.held.lock().is_some()
    }

    /// Probe whether any handle, in any process, holds the lock at `path`.
    pub fn is_locked(path: &Path) -> bool {
        let file = match OpenOptions::new().read(true).open(path) {
            Ok(file) => file,
            Err(_) => return false,
        };
        match file.try_lock_exclusive() {
            Ok(()) => {
                let _ = FileExt::unlock(&file);
                false
            }
            Err(e) => is_contended(&e),
        }
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        self.release();
    }
}

fn is_contended(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::WouldBlock
        || e.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
