// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The job host: continuous and triggered managers plus the cron scheduler,
//! started and stopped together.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use wj_core::{Analytics, Clock, HostPaths, ScriptHostRegistry, SettingsProvider};

use crate::continuous::{ContinuousJobsManager, SupervisorConfig};
use crate::scheduler::TriggeredJobsScheduler;
use crate::triggered::TriggeredJobsManager;
use crate::watcher::{DebouncedWatcher, JobNames, WatchTiming};

/// Tunable timings of a host.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostConfig {
    pub supervisor: SupervisorConfig,
    pub watch: WatchTiming,
}

pub struct JobHost<C: Clock> {
    config: HostConfig,
    continuous: Arc<ContinuousJobsManager>,
    triggered: Arc<TriggeredJobsManager<C>>,
    scheduler: Arc<TriggeredJobsScheduler<C>>,
    schedule_watchers: Mutex<Vec<DebouncedWatcher>>,
    schedule_reconciler: Mutex<Option<JoinHandle<()>>>,
}

impl<C: Clock> JobHost<C> {
    pub fn new(
        paths: HostPaths,
        settings: Arc<dyn SettingsProvider>,
        analytics: Arc<dyn Analytics>,
        clock: C,
        config: HostConfig,
    ) -> Self {
        let registry = Arc::new(ScriptHostRegistry::detect());
        let continuous = ContinuousJobsManager::new(
            paths.clone(),
            Arc::clone(&registry),
            Arc::clone(&settings),
            Arc::clone(&analytics),
        )
        .with_supervisor_config(config.supervisor)
        .with_watch_timing(config.watch);
        let triggered = Arc::new(TriggeredJobsManager::new(
            paths,
            registry,
            Arc::clone(&settings),
            analytics,
            clock.clone(),
        ));
        let scheduler = Arc::new(TriggeredJobsScheduler::new(Arc::clone(&triggered), settings, clock));
        Self {
            config,
            continuous: Arc::new(continuous),
            triggered,
            scheduler,
            schedule_watchers: Mutex::new(Vec::new()),
            schedule_reconciler: Mutex::new(None),
        }
    }

    pub fn continuous(&self) -> &Arc<ContinuousJobsManager> {
        &self.continuous
    }

    pub fn triggered(&self) -> &Arc<TriggeredJobsManager<C>> {
        &self.triggered
    }

    pub fn scheduler(&self) -> &Arc<TriggeredJobsScheduler<C>> {
        &self.scheduler
    }

    /// Start continuous jobs and schedules. Must be called within a tokio runtime.
    pub fn start(&self) {
        self.continuous.cleanup_deleted_jobs();
        self.triggered.cleanup_deleted_jobs();
        self.continuous.start();

        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let triggered = Arc::clone(&self.triggered);
        let scheduler = Arc::clone(&self.scheduler);
        let job_names: JobNames = Arc::new(move || {
            let mut names = triggered.catalog().job_names();
            for name in scheduler.scheduled_jobs() {
                if !names.iter().any(|n| n.eq_ignore_ascii_case(&name)) {
                    names.push(name);
                }
            }
            names
        });
        let watchers = self
            .triggered
            .catalog()
            .roots()
            .iter()
            .map(|root| DebouncedWatcher::spawn(root.clone(), self.config.watch, Arc::clone(&job_names), tx.clone()))
            .collect();
        *self.schedule_watchers.lock() = watchers;

        let scheduler = Arc::clone(&self.scheduler);
        let reconciler = tokio::spawn(async move {
            while let Some(name) = rx.recv().await {
                scheduler.on_job_changed(&name);
            }
        });
        *self.schedule_reconciler.lock() = Some(reconciler);
        tracing::info!("job host started");
    }

    /// Stop watchers first, then jobs.
    pub async fn shutdown(&self) {
        let watchers = std::mem::take(&mut *self.schedule_watchers.lock());
        for watcher in &watchers {
            watcher.stop().await;
        }
        let reconciler = self.schedule_reconciler.lock().take();
        if let Some(reconciler) = reconciler {
            reconciler.abort();
            let _ = reconciler.await;
        }
        self.continuous.stop_watching().await;

        self.continuous.stop_all().await;
        self.scheduler.shutdown().await;
        self.triggered.shutdown().await;
        tracing::info!("job host stopped");
    }
}

#[cfg(test)]
#[path = "host_tests.rs"]
mod tests;
