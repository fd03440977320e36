// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `wj logs` - View job logs

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use wj_core::{JobType, RunId};

use crate::context::{not_found, Context};
use crate::exit_error::ExitError;
use crate::output::{display_log, OutputFormat};

#[derive(Args)]
pub struct LogsArgs {
    /// Job name
    pub name: String,

    /// Job type, needed only when the name exists as both kinds
    #[arg(long = "type")]
    pub job_type: Option<JobType>,

    /// Run id of a triggered job (default: latest run)
    #[arg(long)]
    pub run: Option<String>,

    /// Show the run's error log instead of its output log
    #[arg(long)]
    pub errors: bool,

    /// Stream new lines as they are written (like tail -f)
    #[arg(long, short)]
    pub follow: bool,
}

pub async fn handle(args: LogsArgs, ctx: &Context, format: OutputFormat) -> Result<()> {
    let (path, label) = match ctx.resolve(&args.name, args.job_type)? {
        JobType::Continuous => {
            if args.run.is_some() {
                return Err(ExitError::new(2, "--run applies to triggered jobs only").into());
            }
            let view = ctx.continuous.get_job(&args.name).ok_or_else(|| not_found(&args.name))?;
            (view.log_path, format!("continuous job {}", args.name))
        }
        JobType::Triggered => triggered_log(&args, ctx)?,
    };
    display_log(&path, args.follow, format, &label).await
}

fn triggered_log(args: &LogsArgs, ctx: &Context) -> Result<(PathBuf, String)> {
    let run = match &args.run {
        Some(id) => ctx
            .triggered
            .get_run(&args.name, &RunId::from(id.as_str()))?
            .ok_or_else(|| ExitError::new(1, format!("run {} of {} not found", id, args.name)))?,
        None => ctx
            .triggered
            .latest_run(&args.name)?
            .ok_or_else(|| ExitError::new(1, format!("{} has not run yet", args.name)))?,
    };
    let path = if args.errors { run.error_log } else { run.output_log };
    let path = path.ok_or_else(|| ExitError::new(1, format!("run {} has no log", run.id)))?;
    Ok((path, format!("run {} of {}", run.id, args.name)))
}
