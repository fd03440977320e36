// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! wj-core: domain types shared by the WebJobs host crates

pub mod macros;

pub mod analytics;
pub mod clock;
pub mod job;
pub mod paths;
pub mod script_host;
pub mod settings;
pub mod status;
pub mod time_fmt;

pub use analytics::{Analytics, TracingAnalytics};
pub use clock::{Clock, FakeClock, SystemClock};
pub use job::{env_vars, JobDescriptor, JobType, RunId};
pub use macros::UnknownVariant;
pub use paths::{HostPaths, JobPaths};
pub use script_host::{HostProgram, ResolvedScript, ScriptHost, ScriptHostRegistry};
pub use settings::{HostSettings, JobSettings, SettingsProvider, StaticSettings};
pub use status::{ContinuousStatus, JobStatus, TriggeredJobRun, TriggeredRunStatus};
pub use time_fmt::{format_elapsed, format_log_time, format_run_time};
