// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Triggered jobs: one-shot invocations guarded by a cross-instance run lock,
//! with a bounded per-job run history.

use std::collections::HashMap;
use std::fs;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use wj_core::{
    Analytics, Clock, HostPaths, JobDescriptor, JobPaths, JobStatus, JobType, RunId,
    ScriptHostRegistry, SettingsProvider, TriggeredJobRun, TriggeredRunStatus,
};
use wj_storage::{FileLock, RunHistory};

use crate::catalog::JobCatalog;
use crate::error::JobsError;
use crate::logger::{JobLogger, TriggeredRunLogger};
use crate::runner::{ProcessRunner, RunOptions, RunOutcome};

/// A triggered job with its most recent run.
#[derive(Debug, Clone, Serialize)]
pub struct TriggeredJobView {
    #[serde(flatten)]
    pub job: JobDescriptor,
    pub latest_run: Option<TriggeredJobRun>,
}

struct InFlight {
    run_id: RunId,
    handle: JoinHandle<()>,
}

type InFlightRuns = Arc<Mutex<HashMap<String, InFlight>>>;

pub struct TriggeredJobsManager<C: Clock> {
    catalog: JobCatalog,
    paths: HostPaths,
    settings: Arc<dyn SettingsProvider>,
    analytics: Arc<dyn Analytics>,
    clock: C,
    in_flight: InFlightRuns,
    shutdown: CancellationToken,
}

impl<C: Clock> TriggeredJobsManager<C> {
    pub fn new(
        paths: HostPaths,
        registry: Arc<ScriptHostRegistry>,
        settings: Arc<dyn SettingsProvider>,
        analytics: Arc<dyn Analytics>,
        clock: C,
    ) -> Self {
        Self {
            catalog: JobCatalog::new(&paths, JobType::Triggered, registry),
            paths,
            settings,
            analytics,
            clock,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn catalog(&self) -> &JobCatalog {
        &self.catalog
    }

    pub fn job_paths(&self, name: &str) -> JobPaths {
        self.paths.job(JobType::Triggered, name)
    }

    pub fn list_jobs(&self) -> Vec<TriggeredJobView> {
        self.catalog.list_jobs().into_iter().map(|job| self.view(job)).collect()
    }

    pub fn get_job(&self, name: &str) -> Option<TriggeredJobView> {
        self.catalog.get_job(name).map(|job| self.view(job))
    }

    fn view(&self, job: JobDescriptor) -> TriggeredJobView {
        let latest_run = self.runs_of(&job.name).into_iter().next();
        TriggeredJobView { job, latest_run }
    }

    /// Start a run of `name` in the background and return its id.
    ///
    /// Fails with `NotFound` for unknown jobs, `JobsStopped` while jobs are
    /// globally stopped, and `Conflict` while any instance is running the job.
    /// Must be called from within a tokio runtime.
    pub fn invoke(&self, name: &str, args: Option<&str>, trigger: &str) -> Result<RunId, JobsError> {
        let job = self.catalog.get_job(name).ok_or_else(|| JobsError::NotFound(name.to_string()))?;
        let settings = self.settings.settings();
        if settings.jobs_stopped {
            return Err(JobsError::JobsStopped);
        }

        let paths = self.job_paths(&job.name);
        fs::create_dir_all(&paths.data)?;
        let lock = FileLock::new(paths.run_lock());
        if !lock.try_acquire()? {
            return Err(JobsError::Conflict(job.name));
        }

        let history = RunHistory::new(&paths.data);
        let pruned = history.prune(settings.history_size_for(&job.settings));
        if !pruned.is_empty() {
            tracing::debug!(job = %job.name, count = pruned.len(), "pruned run history");
        }

        let start_time = self.clock.utc_now();
        let run_id = RunId::at(start_time);
        let run_dir = history.create_run(&run_id, trigger, start_time)?;
        let logger = TriggeredRunLogger::new(
            &job.name,
            &run_dir,
            &self.paths.instance_id,
            TriggeredRunStatus {
                trigger: trigger.to_string(),
                status: JobStatus::Initializing,
                start_time,
                end_time: None,
            },
        );
        let options = RunOptions {
            run_id: Some(run_id.clone()),
            args: args.map(str::to_string),
            idle_timeout: Some(job.settings.idle_timeout().unwrap_or(settings.idle_timeout)),
            shutdown_grace: job.settings.stopping_wait().unwrap_or(settings.stopping_wait),
        };
        tracing::info!(job = %job.name, run = %run_id, trigger, "invoking triggered job");

        let key = job.name.to_lowercase();
        let run = TriggeredRun {
            runner: ProcessRunner::new(&paths, Arc::clone(&self.analytics)),
            job,
            paths,
            logger,
            options,
            lock,
            clock: self.clock.clone(),
            cancel: self.shutdown.child_token(),
        };
        let mut in_flight = self.in_flight.lock();
        let handle = tokio::spawn(run.execute(key.clone(), Arc::clone(&self.in_flight)));
        in_flight.insert(key, InFlight { run_id: run_id.clone(), handle });
        Ok(run_id)
    }

    /// Wait for this host's in-flight run of `name`, if any, to finish.
    pub async fn wait_for_run(&self, name: &str) {
        let run = self.in_flight.lock().remove(&name.to_lowercase());
        if let Some(run) = run {
            let _ = run.handle.await;
        }
    }

    /// Runs of `name`, newest first.
    pub fn history(&self, name: &str) -> Result<Vec<TriggeredJobRun>, JobsError> {
        let job = self.catalog.get_job(name).ok_or_else(|| JobsError::NotFound(name.to_string()))?;
        Ok(self.runs_of(&job.name))
    }

    pub fn get_run(&self, name: &str, id: &RunId) -> Result<Option<TriggeredJobRun>, JobsError> {
        Ok(self.history(name)?.into_iter().find(|run| run.id == *id))
    }

    pub fn latest_run(&self, name: &str) -> Result<Option<TriggeredJobRun>, JobsError> {
        Ok(self.history(name)?.into_iter().next())
    }

    fn runs_of(&self, name: &str) -> Vec<TriggeredJobRun> {
        let paths = self.job_paths(name);
        let lock_held = FileLock::is_locked(&paths.run_lock());
        RunHistory::new(&paths.data).runs(lock_held)
    }

    /// Remove data directories of triggered jobs that no longer exist.
    pub fn cleanup_deleted_jobs(&self) {
        for dir in self.catalog.orphaned_data_dirs() {
            let run_lock = dir.join(wj_core::paths::RUN_LOCK_FILE);
            if FileLock::is_locked(&run_lock) {
                continue;
            }
            match fs::remove_dir_all(&dir) {
                Ok(()) => tracing::info!(dir = %dir.display(), "removed data of deleted job"),
                Err(e) => tracing::warn!(dir = %dir.display(), error = %e, "failed to remove job data"),
            }
        }
    }

    /// Abort in-flight runs and wait for them to record their status.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let runs: Vec<InFlight> = self.in_flight.lock().drain().map(|(_, run)| run).collect();
        for run in runs {
            tracing::debug!(run = %run.run_id, "waiting for triggered run to stop");
            let _ = run.handle.await;
        }
    }
}

struct TriggeredRun<C: Clock> {
    runner: ProcessRunner,
    job: JobDescriptor,
    paths: JobPaths,
    logger: TriggeredRunLogger,
    options: RunOptions,
    lock: FileLock,
    clock: C,
    cancel: CancellationToken,
}

impl<C: Clock> TriggeredRun<C> {
    async fn execute(mut self, key: String, in_flight: InFlightRuns) {
        let report = self.runner.run(&self.job, &self.logger, &self.options, None, &self.cancel).await;
        let status = match report {
            Ok(report) => match report.outcome {
                RunOutcome::Exited(Some(0)) => JobStatus::Success,
                RunOutcome::Exited(_) => JobStatus::Failed,
                RunOutcome::IdleTimeout | RunOutcome::Cancelled => JobStatus::Aborted,
            },
            Err(e) => {
                self.logger.error(&format!("Failed to run job: {}", e));
                JobStatus::Failed
            }
        };
        let status = self.logger.finish(status, self.clock.utc_now());
        self.runner.discard_working_copy();
        self.lock.release();
        tracing::info!(
            job = %self.job.name,
            run = ?self.options.run_id.as_ref().map(RunId::as_str),
            data = %self.paths.data.display(),
            %status,
            "triggered run finished"
        );

        let mut in_flight = in_flight.lock();
        let finished_here = in_flight.get(&key).map(|run| Some(&run.run_id) == self.options.run_id.as_ref());
        if finished_here == Some(true) {
            in_flight.remove(&key);
        }
    }
}

#[cfg(test)]
#[path = "triggered_tests.rs"]
mod tests;
