// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-job settings documents and host-wide settings.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// File name of the per-job settings document.
pub const JOB_SETTINGS_FILE: &str = "job.settings.json";

/// Settings read from a job's `job.settings.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
    #[serde(default)]
    pub is_singleton: bool,
    /// Seconds to wait for a job to exit after a shutdown notification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stopping_wait_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_info_url_template: Option<String>,
    /// Seconds without output before a triggered run is aborted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_size: Option<usize>,
}

impl JobSettings {
    /// Load settings from the first of `dirs` that contains a settings file.
    ///
    /// A missing file yields defaults. A malformed file also yields defaults,
    /// with a warning, so one bad job never fails a catalog scan.
    pub fn load(dirs: &[&Path]) -> Self {
        for dir in dirs {
            let path = dir.join(JOB_SETTINGS_FILE);
            let content = match std::fs::read_to_string(&path) {
                Ok(content) => content,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to read job settings");
                    return Self::default();
                }
            };
            return match serde_json::from_str(&content) {
                Ok(settings) => settings,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "malformed job settings");
                    Self::default()
                }
            };
        }
        Self::default()
    }

    /// The cron expression, if the job declares a non-blank one.
    pub fn schedule(&self) -> Option<&str> {
        self.schedule.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn stopping_wait(&self) -> Option<Duration> {
        self.stopping_wait_time.map(Duration::from_secs)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout.map(Duration::from_secs)
    }
}

/// Host-wide settings consulted at the moment they are needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSettings {
    /// All jobs paused; triggered invocations are rejected
    pub jobs_stopped: bool,
    /// No cron schedules are created
    pub schedules_disabled: bool,
    /// Maximum retained runs per triggered job
    pub history_size: usize,
    /// Triggered runs are aborted after this long without output
    pub idle_timeout: Duration,
    /// Delay before restarting a continuous job that did not warm up
    pub restart_backoff: Duration,
    /// Default grace period between shutdown notification and kill
    pub stopping_wait: Duration,
    pub always_on: bool,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            jobs_stopped: false,
            schedules_disabled: false,
            history_size: 50,
            idle_timeout: Duration::from_secs(120),
            restart_backoff: Duration::from_secs(60),
            stopping_wait: Duration::from_secs(5),
            always_on: true,
        }
    }
}

impl HostSettings {
    /// History size for a job, honoring its override. Never less than one.
    pub fn history_size_for(&self, job: &JobSettings) -> usize {
        job.history_size.unwrap_or(self.history_size).max(1)
    }
}

/// Source of host-wide settings.
pub trait SettingsProvider: Send + Sync {
    fn settings(&self) -> HostSettings;
}

/// In-memory settings that can be changed at runtime.
#[derive(Debug, Default)]
pub struct StaticSettings {
    inner: RwLock<HostSettings>,
}

impl StaticSettings {
    pub fn new(settings: HostSettings) -> Self {
        Self { inner: RwLock::new(settings) }
    }

    pub fn update(&self, f: impl FnOnce(&mut HostSettings)) {
        f(&mut self.inner.write());
    }
}

impl SettingsProvider for StaticSettings {
    fn settings(&self) -> HostSettings {
        self.inner.read().clone()
    }
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
