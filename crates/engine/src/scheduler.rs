// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cron-driven invocation of triggered jobs.
//!
//! Each scheduled job owns one task that sleeps until its next occurrence,
//! re-checks that the occurrence is still due, invokes the job, and re-arms.
//! Schedules are (re)built whenever the watcher reports a job change.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use wj_core::{format_elapsed, Clock, SettingsProvider};
use wj_storage::{JobLog, LogLevel};

use crate::error::JobsError;
use crate::schedule::Schedule;
use crate::triggered::TriggeredJobsManager;

/// Longest single timer wait; longer intervals re-arm on expiry.
pub const MAX_TIMER_INTERVAL: Duration = Duration::from_secs(40 * 24 * 60 * 60);

struct ScheduledJob {
    schedule: Schedule,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct TriggeredJobsScheduler<C: Clock> {
    manager: Arc<TriggeredJobsManager<C>>,
    settings: Arc<dyn SettingsProvider>,
    clock: C,
    jobs: Mutex<HashMap<String, ScheduledJob>>,
}

impl<C: Clock> TriggeredJobsScheduler<C> {
    pub fn new(
        manager: Arc<TriggeredJobsManager<C>>,
        settings: Arc<dyn SettingsProvider>,
        clock: C,
    ) -> Self {
        Self { manager, settings, clock, jobs: Mutex::new(HashMap::new()) }
    }

    /// Expression currently scheduled for `name`.
    pub fn schedule_of(&self, name: &str) -> Option<String> {
        self.jobs.lock().get(&name.to_lowercase()).map(|job| job.schedule.expression().to_string())
    }

    pub fn scheduled_jobs(&self) -> Vec<String> {
        let mut names: Vec<String> = self.jobs.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Create, replace, or remove the schedule of `name` to match its settings.
    pub fn on_job_changed(&self, name: &str) {
        let key = name.to_lowercase();
        let job = self.manager.catalog().get_job(name);
        let expression = job.as_ref().and_then(|job| job.settings.schedule().map(str::to_string));

        let (Some(job), Some(expression)) = (job, expression) else {
            self.remove(&key, name);
            return;
        };
        let log = self.log_for(&job.name);
        if self.settings.settings().schedules_disabled {
            if self.remove(&key, &job.name) {
                log.append(LogLevel::Info, "Schedules are disabled on this host", true);
            }
            return;
        }
        let schedule = match Schedule::parse(&expression) {
            Ok(schedule) => schedule,
            Err(e) => {
                log.append(LogLevel::Error, &format!("Failed to parse schedule: {}", e), true);
                self.remove(&key, &job.name);
                return;
            }
        };

        let cancel = CancellationToken::new();
        let task = ScheduleTask {
            manager: Arc::clone(&self.manager),
            schedule: schedule.clone(),
            name: job.name.clone(),
            log,
            clock: self.clock.clone(),
        };
        let handle = tokio::spawn(task.run(cancel.clone()));
        let previous = self.jobs.lock().insert(key, ScheduledJob { schedule, cancel, handle });
        if let Some(previous) = previous {
            previous.cancel.cancel();
        }
    }

    fn remove(&self, key: &str, name: &str) -> bool {
        let removed = self.jobs.lock().remove(key);
        match removed {
            Some(job) => {
                job.cancel.cancel();
                tracing::info!(job = name, schedule = %job.schedule, "removing schedule");
                self.log_for(name).append(LogLevel::Info, "Removing schedule", true);
                true
            }
            None => false,
        }
    }

    /// Cancel every schedule and wait for the timer tasks to end.
    pub async fn shutdown(&self) {
        let jobs: Vec<ScheduledJob> = self.jobs.lock().drain().map(|(_, job)| job).collect();
        for job in &jobs {
            job.cancel.cancel();
        }
        for job in jobs {
            let _ = job.handle.await;
        }
    }

    fn log_for(&self, name: &str) -> JobLog {
        let paths = self.manager.job_paths(name);
        JobLog::append_only(paths.scheduler_log(), paths.instance_id)
    }
}

impl<C: Clock> Drop for TriggeredJobsScheduler<C> {
    fn drop(&mut self) {
        for job in self.jobs.get_mut().values() {
            job.cancel.cancel();
        }
    }
}

struct ScheduleTask<C: Clock> {
    manager: Arc<TriggeredJobsManager<C>>,
    schedule: Schedule,
    name: String,
    log: JobLog,
    clock: C,
}

impl<C: Clock> ScheduleTask<C> {
    async fn run(self, cancel: CancellationToken) {
        let mut last_run = self.latest_start();
        let mut announced = false;
        loop {
            let now = self.local_now();
            let next = self.schedule.next_interval(last_run.map(local), &now, false);
            if next.missed > 0 && !next.interval.is_zero() {
                self.log.append(LogLevel::Warn, &format!("Missed {} schedules", next.missed), true);
            }
            if !announced {
                self.log.append(
                    LogLevel::Info,
                    &format!(
                        "Scheduling WebJob with {} next schedule expected in {}",
                        self.schedule,
                        format_elapsed(next.interval)
                    ),
                    true,
                );
                announced = true;
            }

            let wait = next.interval.min(MAX_TIMER_INTERVAL);
            tokio::select! {
                () = cancel.cancelled() => return,
                () = tokio::time::sleep(wait) => {}
            }
            if wait < next.interval {
                continue;
            }

            // Another instance, or a manual run, may have covered this occurrence.
            let latest = self
                .latest_start()
                .unwrap_or_else(|| self.clock.utc_now() - chrono::Duration::minutes(1));
            if !self.schedule.next_interval(Some(local(latest)), &self.local_now(), true).interval.is_zero() {
                last_run = Some(latest);
                continue;
            }

            let trigger = format!("Schedule - {}", self.schedule);
            match self.manager.invoke(&self.name, None, &trigger) {
                Ok(run_id) => {
                    tracing::info!(job = %self.name, run = %run_id, "scheduled run started");
                    self.log.append(LogLevel::Info, "WebJob invoked", true);
                }
                Err(JobsError::Conflict(_)) => {
                    tracing::debug!(job = %self.name, "scheduled run skipped, job already running");
                }
                Err(e) => {
                    tracing::warn!(job = %self.name, error = %e, "scheduled invocation failed");
                    self.log.append(LogLevel::Error, &format!("Failed to invoke WebJob: {}", e), true);
                }
            }
            last_run = Some(self.clock.utc_now());
        }
    }

    fn latest_start(&self) -> Option<DateTime<Utc>> {
        self.manager.latest_run(&self.name).ok().flatten().map(|run| run.start_time)
    }

    fn local_now(&self) -> DateTime<Local> {
        local(self.clock.utc_now())
    }
}

fn local(time: DateTime<Utc>) -> DateTime<Local> {
    time.with_timezone(&Local)
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
