// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Working copies of job sources.
//!
//! Jobs run from a private copy so deployments can replace the source tree
//! while a job is running. The copy is refreshed only when the source
//! signature changes.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::RunnerError;

#[derive(Debug)]
struct Staged {
    source: PathBuf,
    dir: PathBuf,
    signature: String,
}

/// Cached working copy of one job, under `<temp>/jobs/<type>/<name>/`.
#[derive(Debug)]
pub struct WorkingCopy {
    root: PathBuf,
    current: Option<Staged>,
}

impl WorkingCopy {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), current: None }
    }

    pub fn current_dir(&self) -> Option<&Path> {
        self.current.as_ref().map(|staged| staged.dir.as_path())
    }

    /// Return a working copy of `source`, restaging when it is stale.
    ///
    /// `before_restage` runs before the old copy is deleted. On failure the
    /// job is left without a working copy.
    pub fn ensure(
        &mut self,
        source: &Path,
        before_restage: impl FnOnce(),
    ) -> Result<PathBuf, RunnerError> {
        let signature = signature(source).map_err(RunnerError::Staging)?;
        if let Some(staged) = &self.current {
            if staged.source == source && staged.signature == signature && staged.dir.is_dir() {
                return Ok(staged.dir.clone());
            }
        }

        before_restage();
        self.current = None;
        remove_dir_if_exists(&self.root).map_err(RunnerError::Staging)?;

        let dir = self.root.join(random_dir_name());
        if let Err(e) = copy_dir(source, &dir) {
            let _ = remove_dir_if_exists(&self.root);
            return Err(RunnerError::Staging(e));
        }
        tracing::debug!(source = %source.display(), dir = %dir.display(), "staged working copy");
        self.current = Some(Staged { source: source.to_path_buf(), dir: dir.clone(), signature });
        Ok(dir)
    }

    /// Delete the working copy.
    pub fn discard(&mut self) {
        self.current = None;
        if let Err(e) = remove_dir_if_exists(&self.root) {
            tracing::warn!(dir = %self.root.display(), error = %e, "failed to delete working copy");
        }
    }
}

/// Signature of a source tree: a hash over every file's relative path, size,
/// and modification time.
pub fn signature(dir: &Path) -> io::Result<String> {
    let mut entries = Vec::new();
    collect_files(dir, dir, &mut entries)?;
    entries.sort();

    let mut hasher = Sha256::new();
    for (relative, len, modified) in entries {
        hasher.update(relative.as_bytes());
        hasher.update(len.to_le_bytes());
        hasher.update(modified.to_le_bytes());
    }
    Ok(format!("{:x}", hasher.finalize()))
}

fn collect_files(root: &Path, dir: &Path, out: &mut Vec<(String, u64, u128)>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let meta = fs::metadata(&path)?;
        if meta.is_dir() {
            collect_files(root, &path, out)?;
        } else {
            let modified = meta
                .modified()?
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or_default();
            let relative = path.strip_prefix(root).unwrap_or(&path).to_string_lossy().into_owned();
            out.push((relative, meta.len(), modified));
        }
    }
    Ok(())
}

fn copy_dir(source: &Path, dest: &Path) -> io::Result<()> {
    fs::create_dir_all(dest)?;
    for entry in fs::read_dir(source)? {
        let path = entry?.path();
        let Some(name) = path.file_name() else {
            continue;
        };
        let target = dest.join(name);
        if path.is_dir() {
            copy_dir(&path, &target)?;
        } else {
            fs::copy(&path, &target)?;
        }
    }
    Ok(())
}

fn remove_dir_if_exists(dir: &Path) -> io::Result<()> {
    match fs::remove_dir_all(dir) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

fn random_dir_name() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..12].to_string()
}

#[cfg(test)]
#[path = "staging_tests.rs"]
mod tests;
