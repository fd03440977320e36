// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job discovery: one job per subdirectory of a job-type root.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use wj_core::paths::EXTRA_INFO_TEMPLATE_FILE;
use wj_core::{HostPaths, JobDescriptor, JobSettings, JobType, ScriptHostRegistry};

/// Builds job descriptors for one job type.
///
/// Roots are searched in priority order; a job found in an earlier root
/// shadows a job of the same name in later roots.
#[derive(Debug, Clone)]
pub struct JobCatalog {
    job_type: JobType,
    roots: Vec<PathBuf>,
    data_dir: PathBuf,
    registry: Arc<ScriptHostRegistry>,
}

impl JobCatalog {
    pub fn new(paths: &HostPaths, job_type: JobType, registry: Arc<ScriptHostRegistry>) -> Self {
        Self {
            job_type,
            roots: paths.binaries_roots(job_type),
            data_dir: paths.data_dir(job_type),
            registry,
        }
    }

    pub fn job_type(&self) -> JobType {
        self.job_type
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// All jobs with a resolvable entry script, sorted by name.
    pub fn list_jobs(&self) -> Vec<JobDescriptor> {
        let mut jobs: Vec<JobDescriptor> = Vec::new();
        for root in &self.roots {
            for (name, dir) in job_dirs(root) {
                if jobs.iter().any(|job| job.is_named(&name)) {
                    continue;
                }
                if let Some(job) = self.build_job(&name, &dir) {
                    jobs.push(job);
                }
            }
        }
        jobs.sort_by_key(|job| job.name.to_lowercase());
        jobs
    }

    /// Look up a job by case-insensitive name.
    pub fn get_job(&self, name: &str) -> Option<JobDescriptor> {
        self.roots.iter().find_map(|root| {
            job_dirs(root)
                .into_iter()
                .find(|(dir_name, _)| dir_name.eq_ignore_ascii_case(name))
                .and_then(|(dir_name, dir)| self.build_job(&dir_name, &dir))
        })
    }

    pub fn job_names(&self) -> Vec<String> {
        self.list_jobs().into_iter().map(|job| job.name).collect()
    }

    /// Data directory of a job, whether or not it is still in the catalog.
    pub fn data_dir(&self, name: &str) -> PathBuf {
        self.data_dir.join(name)
    }

    /// Names of data directories whose job no longer exists.
    pub fn orphaned_data_dirs(&self) -> Vec<PathBuf> {
        let names = self.job_names();
        job_dirs(&self.data_dir)
            .into_iter()
            .filter(|(name, _)| !names.iter().any(|n| n.eq_ignore_ascii_case(name)))
            .map(|(_, dir)| dir)
            .collect()
    }

    fn build_job(&self, name: &str, dir: &Path) -> Option<JobDescriptor> {
        let files = match entry_candidates(dir) {
            Ok(files) => files,
            Err(e) => {
                tracing::warn!(job = name, dir = %dir.display(), error = %e, "failed to scan job directory");
                return None;
            }
        };
        let resolved = self.registry.resolve(&files)?;
        let data_dir = self.data_dir(name);
        let settings = JobSettings::load(&[dir, &data_dir]);
        let extra_info_url = self.extra_info_url(name, &data_dir, &settings);
        let run_command = resolved.path.strip_prefix(dir).unwrap_or(&resolved.path).to_path_buf();
        Some(JobDescriptor {
            name: name.to_string(),
            job_type: self.job_type,
            directory: dir.to_path_buf(),
            script_path: resolved.path,
            run_command,
            script_host: resolved.host,
            settings,
            extra_info_url,
        })
    }

    fn extra_info_url(&self, name: &str, data_dir: &Path, settings: &JobSettings) -> Option<String> {
        let template = match &settings.extra_info_url_template {
            Some(template) => template.clone(),
            None => fs::read_to_string(data_dir.join(EXTRA_INFO_TEMPLATE_FILE)).ok()?,
        };
        let template = template.lines().next()?.trim();
        if template.is_empty() {
            return None;
        }
        Some(template.replace("{jobName}", name).replace("{jobType}", self.job_type.as_str()))
    }
}

/// Subdirectories of `root` as `(name, path)`, sorted by name.
fn job_dirs(root: &Path) -> Vec<(String, PathBuf)> {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };
    let mut dirs: Vec<_> = entries
        .filter_map(Result::ok)
        .filter(|e| e.path().is_dir())
        .filter_map(|e| Some((e.file_name().into_string().ok()?, e.path())))
        .collect();
    dirs.sort();
    dirs
}

/// Files directly inside a job directory, sorted by name.
fn entry_candidates(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
#[path = "catalog_tests.rs"]
mod tests;
