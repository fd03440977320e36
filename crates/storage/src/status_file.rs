// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Small JSON status documents, replaced atomically.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::StorageError;

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Overwrite the document at `path`.
///
/// The document is written to a sibling temp file and renamed into place, so
/// readers see either the old or the new document, never a partial one.
pub fn write_status<T: Serialize>(path: &Path, doc: &T) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("status");
    let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
    let tmp = path.with_file_name(format!(".{}.{}.{}.tmp", file_name, std::process::id(), seq));
    let json = serde_json::to_vec_pretty(doc)?;
    if let Err(e) = fs::write(&tmp, json).and_then(|()| fs::rename(&tmp, path)) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

/// Read the document at `path`.
///
/// A missing or malformed document reads as `None`.
pub fn read_status<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let content = match fs::read(path) {
        Ok(content) => content,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::debug!(path = %path.display(), error = %e, "failed to read status");
            }
            return None;
        }
    };
    match serde_json::from_slice(&content) {
        Ok(doc) => Some(doc),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "malformed status");
            None
        }
    }
}

#[cfg(test)]
#[path = "status_file_tests.rs"]
mod tests;
