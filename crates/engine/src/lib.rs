// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! wj-engine: job discovery, supervision, invocation, scheduling, and change
//! detection

pub mod catalog;
pub mod continuous;
mod error;
pub mod host;
pub mod logger;
pub mod runner;
pub mod schedule;
pub mod scheduler;
pub mod triggered;
pub mod watcher;

#[cfg(test)]
mod test_helpers;

pub use catalog::JobCatalog;
pub use continuous::{ContinuousJobView, ContinuousJobsManager, InstanceStatus, SupervisorConfig};
pub use error::{JobsError, RunnerError};
pub use host::{HostConfig, JobHost};
pub use logger::{ContinuousJobLogger, JobLogger, TriggeredRunLogger};
pub use runner::{ProcessRunner, RunOptions, RunOutcome, RunReport, ShutdownNotice};
pub use schedule::{NextInterval, Schedule};
pub use scheduler::TriggeredJobsScheduler;
pub use triggered::{TriggeredJobView, TriggeredJobsManager};
pub use watcher::{DebouncedWatcher, WatchTiming};
