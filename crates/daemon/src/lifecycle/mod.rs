// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup and shutdown.

mod startup;
pub use startup::startup;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Instant;

use thiserror::Error;
use tracing::{info, warn};
use wj_core::{HostPaths, SystemClock};
use wj_engine::JobHost;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Site directory holding `jobs/` and `data/`
    pub site_root: PathBuf,
    /// Job source, data, and temp locations for this instance
    pub paths: HostPaths,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
}

impl Config {
    /// Load configuration from the `WEBJOBS_*` environment.
    pub fn load() -> Result<Self, LifecycleError> {
        let site_root = crate::env::site_root()?;
        let paths = crate::env::host_paths()?;
        Ok(Self::for_site(&site_root, paths))
    }

    /// Lock and log files live under `<site>/data`, one pair per instance.
    pub fn for_site(site_root: &Path, paths: HostPaths) -> Self {
        let data = site_root.join("data");
        Self {
            lock_path: data.join(format!("wjd-{}.pid", paths.instance_id)),
            log_path: data.join("logs").join(format!("wjd-{}.log", paths.instance_id)),
            site_root: site_root.to_path_buf(),
            paths,
        }
    }
}

/// A running daemon.
pub struct Daemon {
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    pub host: JobHost<SystemClock>,
    pub start_time: Instant,
}

impl Daemon {
    /// Stop every job, then release the PID file.
    pub async fn shutdown(self) -> Result<(), LifecycleError> {
        info!("Shutting down daemon...");
        self.host.shutdown().await;

        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!("Failed to remove PID file: {}", e);
            }
        }

        info!(uptime_secs = self.start_time.elapsed().as_secs(), "Daemon shutdown complete");
        Ok(())
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine site root directory")]
    NoRootDir,

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
