// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `wj run` - Run a triggered job and wait for it to finish

use anyhow::Result;
use clap::Args;
use wj_core::{JobStatus, JobType, TriggeredJobRun};

use crate::color;
use crate::context::Context;
use crate::exit_error::ExitError;
use crate::output::{format_or_json, OutputFormat};

/// Trigger text recorded for runs started from the CLI.
pub const CLI_TRIGGER: &str = "External - wj";

#[derive(Args)]
pub struct RunArgs {
    /// Triggered job name
    pub name: String,

    /// Arguments appended to the job's command line
    #[arg(long)]
    pub args: Option<String>,
}

pub async fn handle(args: RunArgs, ctx: &Context, format: OutputFormat) -> Result<()> {
    match ctx.resolve(&args.name, Some(JobType::Triggered)) {
        Ok(_) => {}
        Err(_) if ctx.continuous.catalog().get_job(&args.name).is_some() => {
            let message = format!("'{}' is a continuous job; only triggered jobs can be run", args.name);
            return Err(ExitError::new(2, message).into());
        }
        Err(e) => return Err(e),
    }

    let id = ctx.triggered.invoke(&args.name, args.args.as_deref(), CLI_TRIGGER)?;
    if format == OutputFormat::Text {
        eprintln!("Started run {} of {}", id, color::header(&args.name));
    }

    let interrupted = tokio::select! {
        _ = ctx.triggered.wait_for_run(&args.name) => false,
        _ = tokio::signal::ctrl_c() => true,
    };
    if interrupted {
        // Aborts the run and records it before exiting
        ctx.triggered.shutdown().await;
        return Err(ExitError::new(130, format!("run {} interrupted", id)).into());
    }

    let run = ctx
        .triggered
        .get_run(&args.name, &id)?
        .ok_or_else(|| anyhow::anyhow!("run {} of {} disappeared from history", id, args.name))?;

    format_or_json(format, &run, || print_run_output(&run))?;
    match run.status {
        JobStatus::Success => Ok(()),
        status => Err(ExitError::new(1, format!("run {} {}", run.id, status.as_str().to_lowercase())).into()),
    }
}

fn print_run_output(run: &TriggeredJobRun) {
    if let Some(content) = run.output_log.as_ref().and_then(|path| std::fs::read_to_string(path).ok()) {
        print!("{}", content);
    }
    let duration = run.duration().and_then(|d| d.to_std().ok()).map(wj_core::format_elapsed);
    eprintln!("Run {} {} after {}", run.id, color::status(run.status), duration.as_deref().unwrap_or("-"));
}
