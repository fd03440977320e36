// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon and CLI.

use std::path::PathBuf;
use std::time::Duration;

use sha2::{Digest, Sha256};
use wj_core::{HostPaths, HostSettings, SettingsProvider};

use crate::lifecycle::LifecycleError;

/// Resolve the site root: WEBJOBS_ROOT > <data-local-dir>/webjobs
pub fn site_root() -> Result<PathBuf, LifecycleError> {
    if let Some(dir) = var_path("WEBJOBS_ROOT") {
        return Ok(dir);
    }
    dirs::data_local_dir().map(|dir| dir.join("webjobs")).ok_or(LifecycleError::NoRootDir)
}

/// Secondary jobs root used when running from a deployed package.
pub fn package_root() -> Option<PathBuf> {
    var_path("WEBJOBS_PACKAGE_ROOT")
}

/// Temp root for working copies and shutdown files (default `<tmp>/webjobs`).
pub fn temp_root() -> PathBuf {
    var_path("WEBJOBS_TEMP").unwrap_or_else(|| std::env::temp_dir().join("webjobs"))
}

/// Identifier of this host instance (default derived from the host name).
pub fn instance_id() -> String {
    var("WEBJOBS_INSTANCE_ID").unwrap_or_else(|| default_instance_id(&hostname()))
}

/// First six hex characters of the SHA-256 of `host`.
pub fn default_instance_id(host: &str) -> String {
    let digest = Sha256::digest(host.as_bytes());
    digest.iter().take(3).map(|b| format!("{:02x}", b)).collect()
}

fn hostname() -> String {
    var("HOSTNAME")
        .or_else(|| {
            std::fs::read_to_string("/proc/sys/kernel/hostname")
                .ok()
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
        })
        .unwrap_or_else(|| "localhost".to_string())
}

/// Filesystem layout from the environment.
pub fn host_paths() -> Result<HostPaths, LifecycleError> {
    let mut paths = HostPaths::for_site(&site_root()?, temp_root(), instance_id());
    paths.secondary_jobs_root = package_root();
    Ok(paths)
}

/// Host settings read from the environment on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSettings;

impl SettingsProvider for EnvSettings {
    fn settings(&self) -> HostSettings {
        let defaults = HostSettings::default();
        HostSettings {
            jobs_stopped: flag("WEBJOBS_STOPPED").unwrap_or(defaults.jobs_stopped),
            schedules_disabled: flag("WEBJOBS_DISABLE_SCHEDULE").unwrap_or(defaults.schedules_disabled),
            history_size: var("WEBJOBS_HISTORY_SIZE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.history_size),
            idle_timeout: seconds("WEBJOBS_IDLE_TIMEOUT").unwrap_or(defaults.idle_timeout),
            restart_backoff: seconds("WEBJOBS_RESTART_TIME").unwrap_or(defaults.restart_backoff),
            stopping_wait: seconds("WEBJOBS_STOPPING_WAIT").unwrap_or(defaults.stopping_wait),
            always_on: flag("WEBJOBS_ALWAYS_ON").unwrap_or(defaults.always_on),
        }
    }
}

fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn var_path(name: &str) -> Option<PathBuf> {
    var(name).map(PathBuf::from)
}

fn flag(name: &str) -> Option<bool> {
    match var(name)?.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn seconds(name: &str) -> Option<Duration> {
    var(name).and_then(|s| s.parse::<u64>().ok()).map(Duration::from_secs)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
