// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process access to the job managers over the site's filesystem layout.
//!
//! The CLI never talks to `wjd`; both operate on the same locks and status
//! files, so a run started here conflicts with one started by the daemon.

use std::sync::Arc;

use anyhow::Result;
use wj_core::{HostPaths, JobType, ScriptHostRegistry, SettingsProvider, SystemClock, TracingAnalytics};
use wj_daemon::EnvSettings;
use wj_engine::{ContinuousJobsManager, TriggeredJobsManager};

use crate::exit_error::ExitError;

pub struct Context {
    pub continuous: ContinuousJobsManager,
    pub triggered: TriggeredJobsManager<SystemClock>,
}

impl Context {
    pub fn from_env() -> Result<Self> {
        let paths = wj_daemon::env::host_paths()?;
        Ok(Self::new(paths, Arc::new(EnvSettings)))
    }

    pub fn new(paths: HostPaths, settings: Arc<dyn SettingsProvider>) -> Self {
        let registry = Arc::new(ScriptHostRegistry::detect());
        let analytics = Arc::new(TracingAnalytics);
        Self {
            continuous: ContinuousJobsManager::new(
                paths.clone(),
                Arc::clone(&registry),
                Arc::clone(&settings),
                analytics.clone(),
            ),
            triggered: TriggeredJobsManager::new(paths, registry, settings, analytics, SystemClock),
        }
    }

    /// Determine which kind of job `name` is, honoring an explicit `--type`.
    pub fn resolve(&self, name: &str, requested: Option<JobType>) -> Result<JobType> {
        let continuous = self.continuous.catalog().get_job(name).is_some();
        let triggered = self.triggered.catalog().get_job(name).is_some();
        match (requested, continuous, triggered) {
            (Some(JobType::Continuous), true, _) => Ok(JobType::Continuous),
            (Some(JobType::Triggered), _, true) => Ok(JobType::Triggered),
            (None, true, false) => Ok(JobType::Continuous),
            (None, false, true) => Ok(JobType::Triggered),
            (None, true, true) => {
                Err(ExitError::new(2, format!("'{name}' is both a continuous and a triggered job; pass --type")).into())
            }
            _ => Err(not_found(name)),
        }
    }
}

pub fn not_found(name: &str) -> anyhow::Error {
    ExitError::new(1, format!("job not found: {name}")).into()
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
