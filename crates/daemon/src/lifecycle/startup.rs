// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup and initialization logic.

use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use fs2::FileExt;
use tracing::info;
use wj_core::{JobType, SettingsProvider, SystemClock, TracingAnalytics};
use wj_engine::{HostConfig, JobHost};

use super::{Config, Daemon, LifecycleError};
use crate::env::EnvSettings;

/// Start the daemon with settings read from the environment.
pub async fn startup(config: &Config) -> Result<Daemon, LifecycleError> {
    startup_with(config, Arc::new(EnvSettings), HostConfig::default()).await
}

pub(crate) async fn startup_with(
    config: &Config,
    settings: Arc<dyn SettingsProvider>,
    host_config: HostConfig,
) -> Result<Daemon, LifecycleError> {
    match startup_inner(config, settings, host_config).await {
        Ok(daemon) => Ok(daemon),
        Err(e) => {
            // The lock file belongs to the running daemon
            if !matches!(e, LifecycleError::LockFailed(_)) && config.lock_path.exists() {
                let _ = std::fs::remove_file(&config.lock_path);
            }
            Err(e)
        }
    }
}

async fn startup_inner(
    config: &Config,
    settings: Arc<dyn SettingsProvider>,
    host_config: HostConfig,
) -> Result<Daemon, LifecycleError> {
    if let Some(parent) = config.lock_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Open without truncating so a running daemon's PID survives a failed attempt
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file.try_lock_exclusive().map_err(LifecycleError::LockFailed)?;

    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file;

    for job_type in JobType::ALL {
        std::fs::create_dir_all(config.paths.jobs_root.join(job_type.as_str()))?;
        std::fs::create_dir_all(config.paths.data_dir(*job_type))?;
    }
    std::fs::create_dir_all(&config.paths.temp_root)?;

    let host = JobHost::new(
        config.paths.clone(),
        settings,
        Arc::new(TracingAnalytics),
        SystemClock,
        host_config,
    );
    host.start();

    info!(
        site = %config.site_root.display(),
        instance = %config.paths.instance_id,
        "Daemon started"
    );

    Ok(Daemon { config: config.clone(), lock_file, host, start_time: Instant::now() })
}

#[cfg(test)]
#[path = "startup_tests.rs"]
mod tests;
