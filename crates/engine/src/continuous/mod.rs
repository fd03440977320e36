// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Continuous jobs: one supervised, auto-restarting worker per job, reconciled
//! against the catalog whenever the watcher reports a change.

mod instances;
mod supervisor;

pub use instances::{aggregate_status, collect_instance_statuses, InstanceStatus};
pub use supervisor::{restart_delay, ContinuousJobRunner, SupervisorConfig};

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use wj_core::paths::disable_file;
use wj_core::{Analytics, HostPaths, JobDescriptor, JobStatus, JobType, ScriptHostRegistry, SettingsProvider};

use crate::catalog::JobCatalog;
use crate::error::JobsError;
use crate::logger::JobLogger;
use crate::watcher::{DebouncedWatcher, JobNames, WatchTiming};

/// A continuous job with its status across instances.
#[derive(Debug, Clone, Serialize)]
pub struct ContinuousJobView {
    #[serde(flatten)]
    pub job: JobDescriptor,
    pub status: JobStatus,
    pub instances: Vec<InstanceStatus>,
    pub log_path: PathBuf,
    pub disabled: bool,
}

pub struct ContinuousJobsManager {
    catalog: JobCatalog,
    paths: HostPaths,
    settings: Arc<dyn SettingsProvider>,
    analytics: Arc<dyn Analytics>,
    supervisor_config: SupervisorConfig,
    watch_timing: WatchTiming,
    runners: Mutex<HashMap<String, Arc<ContinuousJobRunner>>>,
    active: AtomicBool,
    watchers: Mutex<Vec<DebouncedWatcher>>,
    reconciler: Mutex<Option<JoinHandle<()>>>,
}

impl ContinuousJobsManager {
    pub fn new(
        paths: HostPaths,
        registry: Arc<ScriptHostRegistry>,
        settings: Arc<dyn SettingsProvider>,
        analytics: Arc<dyn Analytics>,
    ) -> Self {
        Self {
            catalog: JobCatalog::new(&paths, JobType::Continuous, registry),
            paths,
            settings,
            analytics,
            supervisor_config: SupervisorConfig::default(),
            watch_timing: WatchTiming::default(),
            runners: Mutex::new(HashMap::new()),
            active: AtomicBool::new(false),
            watchers: Mutex::new(Vec::new()),
            reconciler: Mutex::new(None),
        }
    }

    pub fn with_supervisor_config(mut self, config: SupervisorConfig) -> Self {
        self.supervisor_config = config;
        self
    }

    pub fn with_watch_timing(mut self, timing: WatchTiming) -> Self {
        self.watch_timing = timing;
        self
    }

    pub fn catalog(&self) -> &JobCatalog {
        &self.catalog
    }

    pub fn list_jobs(&self) -> Vec<ContinuousJobView> {
        self.catalog.list_jobs().into_iter().map(|job| self.view(job)).collect()
    }

    pub fn get_job(&self, name: &str) -> Option<ContinuousJobView> {
        self.catalog.get_job(name).map(|job| self.view(job))
    }

    fn view(&self, job: JobDescriptor) -> ContinuousJobView {
        let paths = self.paths.job(JobType::Continuous, &job.name);
        let instances = collect_instance_statuses(&paths.data, &self.paths.instance_id);
        ContinuousJobView {
            status: aggregate_status(&instances),
            instances,
            log_path: paths.job_log(),
            disabled: disable_file(&job.directory).exists(),
            job,
        }
    }

    /// Begin watching the job roots; every job is reconciled once the
    /// watchers report in.
    pub fn start(self: &Arc<Self>) {
        if self.active.swap(true, Ordering::SeqCst) {
            return;
        }
        if !self.settings.settings().always_on {
            tracing::warn!(
                "always-on is disabled; continuous jobs stop when the host goes idle"
            );
        }

        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let weak = Arc::downgrade(self);
        let job_names: JobNames = Arc::new(move || known_job_names(&weak));
        let watchers: Vec<DebouncedWatcher> = self
            .catalog
            .roots()
            .iter()
            .map(|root| DebouncedWatcher::spawn(root.clone(), self.watch_timing, Arc::clone(&job_names), tx.clone()))
            .collect();
        *self.watchers.lock() = watchers;

        let weak = Arc::downgrade(self);
        let reconciler = tokio::spawn(async move {
            while let Some(name) = rx.recv().await {
                let Some(manager) = weak.upgrade() else { break };
                manager.on_job_changed(&name).await;
            }
        });
        *self.reconciler.lock() = Some(reconciler);
    }

    /// Stop reacting to file changes.
    pub async fn stop_watching(&self) {
        let watchers = std::mem::take(&mut *self.watchers.lock());
        for watcher in &watchers {
            watcher.stop().await;
        }
        let reconciler = self.reconciler.lock().take();
        if let Some(reconciler) = reconciler {
            reconciler.abort();
            let _ = reconciler.await;
        }
    }

    /// Stop every job on this instance.
    pub async fn stop_all(&self) {
        self.active.store(false, Ordering::SeqCst);
        let runners: Vec<Arc<ContinuousJobRunner>> = self.runners.lock().values().cloned().collect();
        for runner in runners {
            runner.stop().await;
        }
    }

    /// Stop watching first so no change restarts a job mid-shutdown.
    pub async fn shutdown(&self) {
        self.stop_watching().await;
        self.stop_all().await;
    }

    /// Bring the worker of `name` in line with the catalog.
    pub async fn on_job_changed(&self, name: &str) {
        match self.catalog.get_job(name) {
            Some(job) => {
                if !self.active.load(Ordering::SeqCst) {
                    return;
                }
                tracing::info!(job = %job.name, "continuous job changed, refreshing");
                self.runner_for(&job).refresh(job).await;
            }
            None => {
                let removed = self.runners.lock().remove(&name.to_lowercase());
                if let Some(runner) = removed {
                    tracing::info!(job = name, "continuous job removed");
                    runner.remove().await;
                }
            }
        }
    }

    pub async fn enable_job(&self, name: &str) -> Result<(), JobsError> {
        let job = self.catalog.get_job(name).ok_or_else(|| JobsError::NotFound(name.to_string()))?;
        match fs::remove_file(disable_file(&job.directory)) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        tracing::info!(job = %job.name, "continuous job enabled");
        if self.active.load(Ordering::SeqCst) {
            self.runner_for(&job).start(job).await;
        }
        Ok(())
    }

    pub async fn disable_job(&self, name: &str) -> Result<(), JobsError> {
        let job = self.catalog.get_job(name).ok_or_else(|| JobsError::NotFound(name.to_string()))?;
        let runner = self.runners.lock().get(&job.name.to_lowercase()).cloned();
        if let Some(runner) = &runner {
            runner.logger().report_status(JobStatus::Disabling);
        }
        fs::write(disable_file(&job.directory), b"")?;
        tracing::info!(job = %job.name, "continuous job disabled");
        if let Some(runner) = runner {
            runner.stop().await;
            runner.logger().report_status(JobStatus::Stopped);
        }
        Ok(())
    }

    /// Remove data directories of continuous jobs that no longer exist.
    pub fn cleanup_deleted_jobs(&self) {
        for dir in self.catalog.orphaned_data_dirs() {
            let supervised = dir
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| self.runners.lock().contains_key(&name.to_lowercase()));
            if supervised {
                continue;
            }
            match fs::remove_dir_all(&dir) {
                Ok(()) => tracing::info!(dir = %dir.display(), "removed data of deleted job"),
                Err(e) => tracing::warn!(dir = %dir.display(), error = %e, "failed to remove job data"),
            }
        }
    }

    fn runner_for(&self, job: &JobDescriptor) -> Arc<ContinuousJobRunner> {
        let mut runners = self.runners.lock();
        let runner = runners.entry(job.name.to_lowercase()).or_insert_with(|| {
            Arc::new(ContinuousJobRunner::new(
                self.paths.job(JobType::Continuous, &job.name),
                Arc::clone(&self.settings),
                Arc::clone(&self.analytics),
                self.supervisor_config,
            ))
        });
        Arc::clone(runner)
    }

    #[cfg(test)]
    pub(crate) fn runner(&self, name: &str) -> Option<Arc<ContinuousJobRunner>> {
        self.runners.lock().get(&name.to_lowercase()).cloned()
    }
}

/// Catalog names plus jobs still supervised after leaving the catalog.
fn known_job_names(manager: &Weak<ContinuousJobsManager>) -> Vec<String> {
    let Some(manager) = manager.upgrade() else {
        return Vec::new();
    };
    let mut names = manager.catalog.job_names();
    let supervised: Vec<String> = manager.runners.lock().keys().cloned().collect();
    for name in supervised {
        if !names.iter().any(|n| n.eq_ignore_ascii_case(&name)) {
            names.push(name);
        }
    }
    names
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
