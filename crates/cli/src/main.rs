// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! wj - WebJobs CLI

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod color;
mod commands;
mod context;
mod exit_error;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{history, list, logs, run, show, toggle};
use output::OutputFormat;

use crate::context::Context;

#[derive(Parser)]
#[command(name = "wj", version, about = "WebJobs - inspect and run background jobs", styles = color::styles())]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, default_value_t, global = true)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List jobs with their current status
    List(list::ListArgs),
    /// Show details of a job
    Show(show::ShowArgs),
    /// Run a triggered job and wait for it to finish
    Run(run::RunArgs),
    /// List past runs of a triggered job
    History(history::HistoryArgs),
    /// Enable a continuous job
    Enable(toggle::ToggleArgs),
    /// Disable a continuous job
    Disable(toggle::ToggleArgs),
    /// View job logs
    Logs(logs::LogsArgs),
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(e) = run().await {
        let code = e.downcast_ref::<exit_error::ExitError>().map_or(1, |c| c.code);
        let msg = format_error(&e);
        if !msg.is_empty() {
            eprintln!("Error: {}", msg);
        }
        std::process::exit(code);
    }
}

/// Engine warnings go to stderr; `WJ_LOG` overrides the `warn` default.
fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env("WJ_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

/// Format an anyhow error, skipping the cause chain when the top-level
/// message already repeats it.
fn format_error(err: &anyhow::Error) -> String {
    let top = err.to_string();
    let chain_redundant = err.chain().skip(1).all(|cause| top.contains(&cause.to_string()));
    if chain_redundant {
        return top;
    }

    let mut buf = top;
    for (i, cause) in err.chain().skip(1).enumerate() {
        buf.push_str(&format!("\n\nCaused by:\n    {}: {}", i, cause));
    }
    buf
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let format = cli.output;

    let Some(command) = cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let ctx = Context::from_env()?;
    match command {
        Commands::List(args) => list::handle(args, &ctx, format),
        Commands::Show(args) => show::handle(args, &ctx, format),
        Commands::Run(args) => run::handle(args, &ctx, format).await,
        Commands::History(args) => history::handle(args, &ctx, format),
        Commands::Enable(args) => toggle::enable(args, &ctx).await,
        Commands::Disable(args) => toggle::disable(args, &ctx).await,
        Commands::Logs(args) => logs::handle(args, &ctx, format).await,
    }
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
