// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use anyhow::Context as _;
use wj_core::JobType;

#[test]
fn format_error_skips_redundant_chain() {
    let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
    let err = anyhow::Error::new(io).context("write failed: disk full");
    assert_eq!(format_error(&err), "write failed: disk full");
}

#[test]
fn format_error_keeps_new_causes() {
    let err: Result<(), std::io::Error> = Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
    let err = err.context("could not record run").unwrap_err();
    assert_eq!(format_error(&err), "could not record run\n\nCaused by:\n    0: disk full");
}

#[test]
fn parses_global_output_after_subcommand() {
    let cli = Cli::try_parse_from(["wj", "list", "--type", "Triggered", "-o", "json"]).unwrap();
    assert_eq!(cli.output, OutputFormat::Json);
    match cli.command {
        Some(Commands::List(args)) => assert_eq!(args.job_type, Some(JobType::Triggered)),
        _ => panic!("expected list"),
    }
}

#[test]
fn run_takes_args_string() {
    let cli = Cli::try_parse_from(["wj", "run", "nightly", "--args", "--full -v"]).unwrap();
    match cli.command {
        Some(Commands::Run(args)) => {
            assert_eq!(args.name, "nightly");
            assert_eq!(args.args.as_deref(), Some("--full -v"));
        }
        _ => panic!("expected run"),
    }
}

#[test]
fn unknown_job_type_is_rejected() {
    assert!(Cli::try_parse_from(["wj", "list", "--type", "cron"]).is_err());
}

#[test]
fn logs_flags() {
    let cli = Cli::try_parse_from(["wj", "logs", "nightly", "--run", "202601020304050000", "-f"]).unwrap();
    match cli.command {
        Some(Commands::Logs(args)) => {
            assert_eq!(args.run.as_deref(), Some("202601020304050000"));
            assert!(args.follow);
            assert!(!args.errors);
        }
        _ => panic!("expected logs"),
    }
}
