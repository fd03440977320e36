// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem layout shared by every host instance.
//!
//! ```text
//! <jobs_root>/{continuous|triggered}/<name>/          job sources
//! <data_root>/{continuous|triggered}/<name>/          status, logs, run history
//! <temp_root>/jobs/<type>/<name>/<instance>/<random>/            working copies
//! <temp_root>/JobsShutdown/<type>/<name>/<instance>/<random>     shutdown notifications
//! ```

use crate::job::JobType;
use std::path::{Path, PathBuf};

pub const DISABLE_FILE: &str = "disable.job";
pub const EXTRA_INFO_TEMPLATE_FILE: &str = "job.extra_info_url.template";
pub const SINGLETON_LOCK_FILE: &str = "singleton.job.lock";
pub const RUN_LOCK_FILE: &str = "triggeredJob.lock";
pub const JOB_LOG_FILE: &str = "job_log.txt";
pub const SCHEDULER_LOG_FILE: &str = "job_scheduler.log";
pub const RUN_STATUS_FILE: &str = "status";
pub const OUTPUT_LOG_FILE: &str = "output_log.txt";
pub const ERROR_LOG_FILE: &str = "error_log.txt";
pub const INSTANCE_STATUS_PREFIX: &str = "status_";

/// Root directories of one host instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPaths {
    pub jobs_root: PathBuf,
    /// Lower-priority jobs root used in run-from-package mode
    pub secondary_jobs_root: Option<PathBuf>,
    pub data_root: PathBuf,
    pub temp_root: PathBuf,
    /// Short identifier of this host instance
    pub instance_id: String,
}

impl HostPaths {
    /// Layout rooted at a site directory: `<site>/jobs` and `<site>/data/jobs`.
    pub fn for_site(site: &Path, temp_root: PathBuf, instance_id: impl Into<String>) -> Self {
        Self {
            jobs_root: site.join("jobs"),
            secondary_jobs_root: None,
            data_root: site.join("data").join("jobs"),
            temp_root,
            instance_id: instance_id.into(),
        }
    }

    /// Source roots for a job type, highest priority first.
    pub fn binaries_roots(&self, job_type: JobType) -> Vec<PathBuf> {
        std::iter::once(&self.jobs_root)
            .chain(self.secondary_jobs_root.as_ref())
            .map(|root| root.join(job_type.as_str()))
            .collect()
    }

    pub fn data_dir(&self, job_type: JobType) -> PathBuf {
        self.data_root.join(job_type.as_str())
    }

    pub fn job(&self, job_type: JobType, name: &str) -> JobPaths {
        let scratch = |area: &str| self.temp_root.join(area).join(job_type.as_str()).join(name).join(&self.instance_id);
        JobPaths {
            job_type,
            name: name.to_string(),
            data: self.data_dir(job_type).join(name),
            working_root: scratch("jobs"),
            shutdown_root: scratch("JobsShutdown"),
            instance_id: self.instance_id.clone(),
        }
    }
}

/// Per-job locations derived from [`HostPaths`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPaths {
    pub job_type: JobType,
    pub name: String,
    pub data: PathBuf,
    /// Parent of this job's working copies
    pub working_root: PathBuf,
    /// Parent of this job's shutdown notification files
    pub shutdown_root: PathBuf,
    pub instance_id: String,
}

impl JobPaths {
    /// Environment variable whose presence tags a process as started by this
    /// instance for this job. Instances sharing a host never match each other.
    pub fn marker_key(&self) -> String {
        format!("{}{}_{}", self.job_type.marker_prefix(), self.name, self.instance_id)
    }

    pub fn singleton_lock(&self) -> PathBuf {
        self.data.join(SINGLETON_LOCK_FILE)
    }

    pub fn run_lock(&self) -> PathBuf {
        self.data.join(RUN_LOCK_FILE)
    }

    pub fn job_log(&self) -> PathBuf {
        self.data.join(JOB_LOG_FILE)
    }

    pub fn scheduler_log(&self) -> PathBuf {
        self.data.join(SCHEDULER_LOG_FILE)
    }

    pub fn instance_status(&self) -> PathBuf {
        self.data.join(format!("{}{}", INSTANCE_STATUS_PREFIX, self.instance_id))
    }

    pub fn instance_status_lock(&self) -> PathBuf {
        self.data.join(format!("{}{}.lock", INSTANCE_STATUS_PREFIX, self.instance_id))
    }
}

/// Sentinel whose presence disables a continuous job.
pub fn disable_file(job_dir: &Path) -> PathBuf {
    job_dir.join(DISABLE_FILE)
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
