// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared site fixture for CLI integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;

const SETTINGS_VARS: &[&str] = &[
    "WEBJOBS_PACKAGE_ROOT",
    "WEBJOBS_STOPPED",
    "WEBJOBS_DISABLE_SCHEDULE",
    "WEBJOBS_HISTORY_SIZE",
    "WEBJOBS_IDLE_TIMEOUT",
    "WEBJOBS_RESTART_TIME",
    "WEBJOBS_STOPPING_WAIT",
    "WEBJOBS_ALWAYS_ON",
];

/// A site root in a temp directory with its own temp root and instance id.
pub struct TestSite {
    dir: TempDir,
}

impl TestSite {
    pub fn new() -> Self {
        Self { dir: TempDir::new().expect("Failed to create temp directory") }
    }

    pub fn root(&self) -> PathBuf {
        self.dir.path().join("site")
    }

    pub fn job_dir(&self, job_type: &str, name: &str) -> PathBuf {
        self.root().join("jobs").join(job_type).join(name)
    }

    /// Add a job whose entry point is `run.sh` with the given body.
    pub fn add_job(&self, job_type: &str, name: &str, script: &str) -> PathBuf {
        let dir = self.job_dir(job_type, name);
        fs::create_dir_all(&dir).expect("Failed to create job dir");
        fs::write(dir.join("run.sh"), script).expect("Failed to write script");
        dir
    }

    pub fn write_settings(&self, job_type: &str, name: &str, json: &str) {
        fs::write(self.job_dir(job_type, name).join("job.settings.json"), json).expect("Failed to write settings");
    }

    /// `wj` bound to this site.
    pub fn wj(&self) -> Command {
        let mut cmd = Command::cargo_bin("wj").expect("wj binary");
        cmd.env("WEBJOBS_ROOT", self.root())
            .env("WEBJOBS_TEMP", self.dir.path().join("tmp"))
            .env("WEBJOBS_INSTANCE_ID", "cli001")
            .env("NO_COLOR", "1");
        for name in SETTINGS_VARS {
            cmd.env_remove(name);
        }
        cmd
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

/// Parse a command's stdout as JSON.
pub fn json(output: &[u8]) -> serde_json::Value {
    serde_json::from_slice(output).expect("stdout is JSON")
}
