// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-instance status documents of a continuous job and their aggregate.

use std::fs;
use std::path::Path;

use serde::Serialize;
use wj_core::paths::INSTANCE_STATUS_PREFIX;
use wj_core::{ContinuousStatus, JobStatus};
use wj_storage::{read_status, FileLock};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceStatus {
    pub instance_id: String,
    pub status: JobStatus,
}

/// Read every instance's status from a job's data directory, sorted by instance.
///
/// A document from another instance whose liveness lock is free belongs to a
/// host that is gone; it is deleted rather than reported.
pub fn collect_instance_statuses(data_dir: &Path, own_instance: &str) -> Vec<InstanceStatus> {
    let Ok(entries) = fs::read_dir(data_dir) else {
        return Vec::new();
    };
    let mut statuses = Vec::new();
    for entry in entries.filter_map(Result::ok) {
        let Ok(file_name) = entry.file_name().into_string() else {
            continue;
        };
        let Some(instance_id) = file_name.strip_prefix(INSTANCE_STATUS_PREFIX) else {
            continue;
        };
        if instance_id.is_empty() || instance_id.contains('.') {
            continue;
        }
        let path = entry.path();
        let lock_path = data_dir.join(format!("{}.lock", file_name));
        if instance_id != own_instance && !FileLock::is_locked(&lock_path) {
            remove_stale(&path, &lock_path);
            continue;
        }
        let status = read_status::<ContinuousStatus>(&path).map(|doc| doc.status).unwrap_or_default();
        statuses.push(InstanceStatus { instance_id: instance_id.to_string(), status });
    }
    statuses.sort_by(|a, b| a.instance_id.cmp(&b.instance_id));
    statuses
}

fn remove_stale(status: &Path, lock: &Path) {
    tracing::debug!(path = %status.display(), "removing status of inactive instance");
    for path in [status, lock] {
        if let Err(e) = fs::remove_file(path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::debug!(path = %path.display(), error = %e, "failed to remove stale status");
            }
        }
    }
}

/// The most significant status across instances.
pub fn aggregate_status(statuses: &[InstanceStatus]) -> JobStatus {
    statuses
        .iter()
        .map(|s| s.status)
        .min_by_key(JobStatus::aggregate_rank)
        .unwrap_or_default()
}

#[cfg(test)]
#[path = "instances_tests.rs"]
mod tests;
