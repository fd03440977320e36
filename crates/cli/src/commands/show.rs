// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `wj show` - Show details of one job

use anyhow::Result;
use clap::Args;
use wj_core::{JobDescriptor, JobType};

use crate::color;
use crate::context::{not_found, Context};
use crate::output::{format_or_json, format_time_ago, OutputFormat};

#[derive(Args)]
pub struct ShowArgs {
    /// Job name
    pub name: String,

    /// Job type, needed only when the name exists as both kinds
    #[arg(long = "type")]
    pub job_type: Option<JobType>,
}

pub fn handle(args: ShowArgs, ctx: &Context, format: OutputFormat) -> Result<()> {
    match ctx.resolve(&args.name, args.job_type)? {
        JobType::Continuous => {
            let view = ctx.continuous.get_job(&args.name).ok_or_else(|| not_found(&args.name))?;
            format_or_json(format, &view, || {
                print_descriptor(&view.job);
                println!("  {} {}", color::header("Status:"), color::status(view.status));
                println!("  {} {}", color::header("Disabled:"), view.disabled);
                println!("  {} {}", color::header("Log:"), view.log_path.display());
                if !view.instances.is_empty() {
                    println!("  {}", color::header("Instances:"));
                    for instance in &view.instances {
                        println!("    {}  {}", instance.instance_id, color::status(instance.status));
                    }
                }
            })
        }
        JobType::Triggered => {
            let view = ctx.triggered.get_job(&args.name).ok_or_else(|| not_found(&args.name))?;
            format_or_json(format, &view, || {
                print_descriptor(&view.job);
                let schedule = view.job.settings.schedule().unwrap_or("-");
                println!("  {} {}", color::header("Schedule:"), schedule);
                match &view.latest_run {
                    Some(run) => println!(
                        "  {} {} {} ({})",
                        color::header("Latest run:"),
                        run.id,
                        color::status(run.status),
                        format_time_ago(run.start_time)
                    ),
                    None => println!("  {} {}", color::header("Latest run:"), color::muted("never")),
                }
            })
        }
    }
}

fn print_descriptor(job: &JobDescriptor) {
    println!("{} ({})", color::header(&job.name), job.job_type);
    println!("  {} {}", color::header("Script:"), job.script_path.display());
    println!("  {} {}", color::header("Host:"), job.script_host.name);
    if let Some(url) = &job.extra_info_url {
        println!("  {} {}", color::header("Info:"), url);
    }
}
