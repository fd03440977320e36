// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervision loop of one continuous job on this instance.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use wj_core::{format_elapsed, paths::disable_file, Analytics, JobDescriptor, JobPaths, JobStatus, SettingsProvider};
use wj_storage::FileLock;

use crate::error::JobsError;
use crate::logger::{ContinuousJobLogger, JobLogger};
use crate::runner::{kill_tagged, ProcessRunner, RunOptions, RunOutcome, ShutdownNotice};

/// Extra time allowed past the grace period before the worker is aborted.
const STOP_MARGIN: Duration = Duration::from_secs(5);

/// Timings of the supervision loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorConfig {
    /// A process that ran at least this long is restarted immediately
    pub warmup: Duration,
    /// Wait between attempts to take the singleton lock
    pub inactive_retry: Duration,
    /// Extra wait after an unexpected supervision error
    pub error_cooldown: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            warmup: Duration::from_secs(2 * 60),
            inactive_retry: Duration::from_secs(5),
            error_cooldown: Duration::from_secs(60),
        }
    }
}

/// Delay before relaunching a process that ran for `ran_for`.
pub fn restart_delay(ran_for: Duration, warmup: Duration, backoff: Duration) -> Duration {
    if ran_for >= warmup {
        Duration::ZERO
    } else {
        backoff
    }
}

struct Supervisor {
    paths: JobPaths,
    logger: ContinuousJobLogger,
    runner: tokio::sync::Mutex<ProcessRunner>,
    settings: Arc<dyn SettingsProvider>,
    config: SupervisorConfig,
    shutdown: parking_lot::Mutex<Option<ShutdownNotice>>,
}

struct Worker {
    job: JobDescriptor,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

enum Cycle {
    Exited(Duration),
    Cancelled,
}

/// Runs one continuous job, restarting it whenever it exits.
pub struct ContinuousJobRunner {
    supervisor: Arc<Supervisor>,
    worker: tokio::sync::Mutex<Option<Worker>>,
}

impl ContinuousJobRunner {
    pub fn new(
        paths: JobPaths,
        settings: Arc<dyn SettingsProvider>,
        analytics: Arc<dyn Analytics>,
        config: SupervisorConfig,
    ) -> Self {
        let supervisor = Supervisor {
            logger: ContinuousJobLogger::new(&paths),
            runner: tokio::sync::Mutex::new(ProcessRunner::new(&paths, analytics)),
            paths,
            settings,
            config,
            shutdown: parking_lot::Mutex::new(None),
        };
        Self { supervisor: Arc::new(supervisor), worker: tokio::sync::Mutex::new(None) }
    }

    pub fn logger(&self) -> &ContinuousJobLogger {
        &self.supervisor.logger
    }

    pub fn paths(&self) -> &JobPaths {
        &self.supervisor.paths
    }

    pub async fn is_running(&self) -> bool {
        self.worker.lock().await.as_ref().is_some_and(|w| !w.handle.is_finished())
    }

    /// Start supervising `job`. A no-op while already running.
    pub async fn start(&self, job: JobDescriptor) {
        let mut worker = self.worker.lock().await;
        self.start_locked(&mut worker, job);
    }

    /// Stop the worker, giving the process its grace period to exit.
    pub async fn stop(&self) {
        let mut worker = self.worker.lock().await;
        if let Some(running) = worker.take() {
            self.stop_worker(running).await;
        }
    }

    /// Restart with a freshly built descriptor.
    pub async fn refresh(&self, job: JobDescriptor) {
        let mut worker = self.worker.lock().await;
        if let Some(running) = worker.take() {
            self.stop_worker(running).await;
        }
        self.start_locked(&mut worker, job);
    }

    /// Stop and delete the working copy; the job no longer exists.
    pub async fn remove(&self) {
        self.stop().await;
        self.supervisor.runner.lock().await.discard_working_copy();
    }

    fn start_locked(&self, worker: &mut Option<Worker>, job: JobDescriptor) {
        if worker.as_ref().is_some_and(|w| !w.handle.is_finished()) {
            return;
        }
        let supervisor = &self.supervisor;
        if is_disabled(&job) {
            supervisor.logger.report_status(JobStatus::Stopped);
            *worker = None;
            return;
        }
        let notice = match ShutdownNotice::prepare(&supervisor.paths.shutdown_root) {
            Ok(notice) => Some(notice),
            Err(e) => {
                tracing::warn!(job = %job.name, error = %e, "failed to prepare shutdown notification");
                None
            }
        };
        *supervisor.shutdown.lock() = notice;

        tracing::info!(job = %job.name, "starting continuous job");
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(Arc::clone(supervisor).supervise(job.clone(), cancel.clone()));
        *worker = Some(Worker { job, cancel, handle });
    }

    async fn stop_worker(&self, worker: Worker) {
        let supervisor = &self.supervisor;
        if !worker.handle.is_finished() {
            supervisor.logger.report_status(JobStatus::Stopping);
            if let Some(notice) = supervisor.shutdown.lock().as_ref() {
                notice.notify();
            }
            worker.cancel.cancel();
            let mut handle = worker.handle;
            let grace = supervisor.grace(&worker.job);
            if tokio::time::timeout(grace + STOP_MARGIN, &mut handle).await.is_err() {
                tracing::warn!(job = %worker.job.name, "supervisor did not stop in time, aborting");
                handle.abort();
                let _ = handle.await;
                let killed = kill_tagged(&supervisor.paths.marker_key());
                if killed > 0 {
                    tracing::info!(job = %worker.job.name, killed, "killed remaining job processes");
                }
            }
        }
        supervisor.logger.report_status(JobStatus::Stopped);
    }
}

impl Drop for ContinuousJobRunner {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.get_mut().as_ref() {
            worker.cancel.cancel();
        }
    }
}

impl Supervisor {
    async fn supervise(self: Arc<Self>, job: JobDescriptor, cancel: CancellationToken) {
        while !cancel.is_cancelled() {
            if is_disabled(&job) {
                self.logger.info("WebJob is disabled");
                self.logger.report_status(JobStatus::Stopped);
                break;
            }
            let delay = match self.run_once(&job, &cancel).await {
                Ok(Cycle::Cancelled) => break,
                Ok(Cycle::Exited(ran_for)) => {
                    let backoff = self.settings.settings().restart_backoff;
                    let delay = restart_delay(ran_for, self.config.warmup, backoff);
                    if delay.is_zero() {
                        self.logger.info(&format!(
                            "Process went down after {}, restarting immediately",
                            format_elapsed(ran_for)
                        ));
                    } else {
                        self.logger.info(&format!("Process went down, waiting for {} seconds", delay.as_secs()));
                    }
                    delay
                }
                Err(e) => {
                    self.logger.error(&format!("Failed to run WebJob: {}", e));
                    self.config.error_cooldown
                }
            };
            if delay.is_zero() {
                continue;
            }
            self.logger.report_status(JobStatus::PendingRestart);
            if !sleep_or_cancel(delay, &cancel).await {
                break;
            }
        }
        tracing::debug!(job = %job.name, "supervision loop ended");
    }

    async fn run_once(&self, job: &JobDescriptor, cancel: &CancellationToken) -> Result<Cycle, JobsError> {
        let _singleton = if job.settings.is_singleton {
            match self.acquire_singleton(cancel).await? {
                Some(lock) => Some(lock),
                None => return Ok(Cycle::Cancelled),
            }
        } else {
            None
        };

        self.logger.report_status(JobStatus::Starting);
        self.logger.start_run();
        let options = RunOptions { shutdown_grace: self.grace(job), ..RunOptions::default() };
        let notice = self.shutdown.lock().clone();
        let report = {
            let mut runner = self.runner.lock().await;
            runner.run(job, &self.logger, &options, notice.as_ref(), cancel).await?
        };
        Ok(match report.outcome {
            RunOutcome::Cancelled => Cycle::Cancelled,
            RunOutcome::Exited(_) | RunOutcome::IdleTimeout => Cycle::Exited(report.elapsed),
        })
    }

    /// Wait for the cross-instance singleton lock. `None` when cancelled first.
    async fn acquire_singleton(&self, cancel: &CancellationToken) -> Result<Option<FileLock>, JobsError> {
        let lock = FileLock::new(self.paths.singleton_lock());
        loop {
            if lock.try_acquire()? {
                return Ok(Some(lock));
            }
            self.logger.report_status(JobStatus::InactiveInstance);
            if !sleep_or_cancel(self.config.inactive_retry, cancel).await {
                return Ok(None);
            }
        }
    }

    fn grace(&self, job: &JobDescriptor) -> Duration {
        job.settings.stopping_wait().unwrap_or_else(|| self.settings.settings().stopping_wait)
    }
}

fn is_disabled(job: &JobDescriptor) -> bool {
    disable_file(&job.directory).exists()
}

/// Sleep for `duration`; false if cancelled first.
async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        () = cancel.cancelled() => false,
        () = tokio::time::sleep(duration) => true,
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
