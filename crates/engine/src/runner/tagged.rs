// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Processes tagged with a job's marker environment variable.
//!
//! Every process a job starts inherits the marker, including grandchildren
//! the host never saw, so killing "all of job X" is a scan over the process
//! table rather than a walk of tracked pids.

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

/// Pids of live processes whose environment contains `marker_key`.
#[cfg(target_os = "linux")]
pub fn find_tagged(marker_key: &str) -> Vec<i32> {
    let own_pid = std::process::id() as i32;
    let needle = format!("{}=", marker_key);
    let entries = match std::fs::read_dir("/proc") {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };
    let mut pids: Vec<i32> = entries
        .filter_map(Result::ok)
        .filter_map(|e| e.file_name().to_str()?.parse::<i32>().ok())
        .filter(|pid| *pid != own_pid)
        .filter(|pid| {
            std::fs::read(format!("/proc/{}/environ", pid))
                .map(|environ| {
                    environ.split(|b| *b == 0).any(|var| var.starts_with(needle.as_bytes()))
                })
                .unwrap_or(false)
        })
        .collect();
    pids.sort_unstable();
    pids
}

#[cfg(not(target_os = "linux"))]
pub fn find_tagged(_marker_key: &str) -> Vec<i32> {
    Vec::new()
}

/// Kill every process tagged with `marker_key`. Returns how many were signalled.
pub fn kill_tagged(marker_key: &str) -> usize {
    let mut killed = 0;
    for pid in find_tagged(marker_key) {
        match kill(Pid::from_raw(pid), Signal::SIGKILL) {
            Ok(()) => {
                killed += 1;
                tracing::info!(pid, marker = marker_key, "killed tagged process");
            }
            Err(e) => tracing::debug!(pid, marker = marker_key, error = %e, "failed to kill tagged process"),
        }
    }
    killed
}

#[cfg(all(test, target_os = "linux"))]
#[path = "tagged_tests.rs"]
mod tests;
