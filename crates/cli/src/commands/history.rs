// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `wj history` - List past runs of a triggered job

use std::str::FromStr;

use anyhow::Result;
use clap::Args;
use wj_core::{format_run_time, JobStatus, JobType, TriggeredJobRun};

use crate::color;
use crate::context::Context;
use crate::output::{handle_list, render_table, OutputFormat};

#[derive(Args)]
pub struct HistoryArgs {
    /// Triggered job name
    pub name: String,

    /// Maximum number of runs to show, newest first
    #[arg(short = 'n', long, default_value = "20")]
    pub limit: usize,
}

pub fn handle(args: HistoryArgs, ctx: &Context, format: OutputFormat) -> Result<()> {
    ctx.resolve(&args.name, Some(JobType::Triggered))?;
    let mut runs = ctx.triggered.history(&args.name)?;
    runs.truncate(args.limit);

    let empty = format!("No runs of {} yet", args.name);
    handle_list(format, &runs, &empty, |items, out| {
        let rows: Vec<Vec<String>> = items.iter().map(row).collect();
        render_table(out, &["RUN", "STATUS", "STARTED", "DURATION", "TRIGGER"], &rows, |col, cell| {
            match JobStatus::from_str(cell) {
                Ok(status) if col == 1 => color::status(status),
                _ if col == 4 => color::muted(cell),
                _ => cell.to_string(),
            }
        });
    })
}

fn row(run: &TriggeredJobRun) -> Vec<String> {
    let duration = run.duration().and_then(|d| d.to_std().ok()).map(wj_core::format_elapsed);
    vec![
        run.id.to_string(),
        run.status.to_string(),
        format_run_time(run.start_time),
        duration.unwrap_or_else(|| "-".to_string()),
        run.trigger.clone(),
    ]
}
