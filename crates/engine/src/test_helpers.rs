// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for engine tests.

use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use wj_core::settings::JOB_SETTINGS_FILE;
use wj_core::{HostPaths, JobType, ScriptHostRegistry};

use crate::catalog::JobCatalog;

/// A throwaway site directory with the standard layout.
pub(crate) struct Site {
    pub dir: TempDir,
    pub paths: HostPaths,
}

impl Site {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let paths = HostPaths::for_site(dir.path(), dir.path().join("tmp"), "inst01");
        Self { dir, paths }
    }

    /// The same site as seen by another host instance.
    pub fn instance(&self, instance_id: &str) -> HostPaths {
        HostPaths { instance_id: instance_id.to_string(), ..self.paths.clone() }
    }

    pub fn job_dir(&self, job_type: JobType, name: &str) -> PathBuf {
        self.paths.jobs_root.join(job_type.as_str()).join(name)
    }

    /// Write job files; `.sh` files are made executable.
    pub fn add_job(&self, job_type: JobType, name: &str, files: &[(&str, &str)]) -> PathBuf {
        let dir = self.job_dir(job_type, name);
        std::fs::create_dir_all(&dir).unwrap();
        for (file, content) in files {
            let path = dir.join(file);
            std::fs::write(&path, content).unwrap();
            if file.ends_with(".sh") || *file == "run" {
                std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            }
        }
        dir
    }

    pub fn add_script(&self, job_type: JobType, name: &str, script: &str) -> PathBuf {
        self.add_job(job_type, name, &[("run.sh", script)])
    }

    pub fn write_settings(&self, job_type: JobType, name: &str, json: &str) {
        std::fs::write(self.job_dir(job_type, name).join(JOB_SETTINGS_FILE), json).unwrap();
    }

    pub fn catalog(&self, job_type: JobType) -> JobCatalog {
        JobCatalog::new(&self.paths, job_type, Arc::new(ScriptHostRegistry::default()))
    }
}

/// Poll `check` until it returns true or `timeout` elapses.
pub(crate) async fn wait_for(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}

/// Logger that records everything it is given.
#[derive(Default)]
pub(crate) struct RecordingLogger {
    pub lines: parking_lot::Mutex<Vec<String>>,
    pub statuses: parking_lot::Mutex<Vec<wj_core::JobStatus>>,
}

impl RecordingLogger {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.lock().iter().any(|line| line.contains(needle))
    }
}

impl crate::logger::JobLogger for RecordingLogger {
    fn info(&self, message: &str) {
        self.lines.lock().push(format!("info: {}", message));
    }

    fn warn(&self, message: &str) {
        self.lines.lock().push(format!("warn: {}", message));
    }

    fn error(&self, message: &str) {
        self.lines.lock().push(format!("error: {}", message));
    }

    fn stdout(&self, line: &str) {
        self.lines.lock().push(format!("out: {}", line));
    }

    fn stderr(&self, line: &str) {
        self.lines.lock().push(format!("err: {}", line));
    }

    fn report_status(&self, status: wj_core::JobStatus) {
        self.statuses.lock().push(status);
    }
}
