// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `wj list` - List continuous and triggered jobs

use std::str::FromStr;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;
use wj_core::{JobStatus, JobType};

use crate::color;
use crate::context::Context;
use crate::output::{format_time_ago, handle_list, render_table, OutputFormat};

#[derive(Args)]
pub struct ListArgs {
    /// Only list jobs of this type (continuous, triggered)
    #[arg(long = "type")]
    pub job_type: Option<JobType>,
}

#[derive(Debug, Serialize)]
pub(crate) struct JobSummary {
    pub name: String,
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub status: Option<JobStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
    pub disabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_run: Option<DateTime<Utc>>,
}

pub fn handle(args: ListArgs, ctx: &Context, format: OutputFormat) -> Result<()> {
    let jobs = summaries(ctx, args.job_type);
    handle_list(format, &jobs, "No jobs found", |items, out| {
        let rows: Vec<Vec<String>> = items.iter().map(row).collect();
        render_table(out, &["NAME", "TYPE", "STATUS", "SCHEDULE", "LAST RUN"], &rows, |col, cell| {
            match (col, JobStatus::from_str(cell)) {
                (2, Ok(status)) => color::status(status),
                (_, _) if cell == "-" => color::muted(cell),
                _ => cell.to_string(),
            }
        });
    })
}

pub(crate) fn summaries(ctx: &Context, only: Option<JobType>) -> Vec<JobSummary> {
    let mut jobs = Vec::new();
    if only != Some(JobType::Triggered) {
        jobs.extend(ctx.continuous.list_jobs().into_iter().map(|view| JobSummary {
            name: view.job.name,
            job_type: JobType::Continuous,
            status: Some(view.status),
            schedule: None,
            disabled: view.disabled,
            last_run: None,
        }));
    }
    if only != Some(JobType::Continuous) {
        jobs.extend(ctx.triggered.list_jobs().into_iter().map(|view| JobSummary {
            schedule: view.job.settings.schedule().map(str::to_string),
            name: view.job.name,
            job_type: JobType::Triggered,
            status: view.latest_run.as_ref().map(|run| run.status),
            disabled: false,
            last_run: view.latest_run.map(|run| run.start_time),
        }));
    }
    jobs.sort_by(|a, b| {
        a.name.to_lowercase().cmp(&b.name.to_lowercase()).then_with(|| a.job_type.as_str().cmp(b.job_type.as_str()))
    });
    jobs
}

fn row(job: &JobSummary) -> Vec<String> {
    let status = match (job.disabled, job.status) {
        (true, _) => "disabled".to_string(),
        (false, Some(status)) => status.to_string(),
        (false, None) => "-".to_string(),
    };
    vec![
        job.name.clone(),
        job.job_type.to_string(),
        status,
        job.schedule.clone().unwrap_or_else(|| "-".to_string()),
        job.last_run.map(format_time_ago).unwrap_or_else(|| "-".to_string()),
    ]
}

#[cfg(test)]
#[path = "list_tests.rs"]
mod tests;
