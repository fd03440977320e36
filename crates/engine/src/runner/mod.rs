// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process runner: stage a job, launch it with a tagged environment, forward
//! its output, and enforce idle timeouts and cancellation.

mod staging;
mod tagged;

pub use staging::{signature, WorkingCopy};
pub use tagged::{find_tagged, kill_tagged};

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::process::Child;
use tokio_util::sync::CancellationToken;
use wj_core::{env_vars, format_elapsed, format_run_time, Analytics, JobDescriptor, JobPaths, JobStatus, RunId};

use crate::error::RunnerError;
use crate::logger::JobLogger;

/// How long to keep reading output after the process exits.
const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Per-launch options.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub run_id: Option<RunId>,
    pub args: Option<String>,
    /// Abort when no output arrives for this long
    pub idle_timeout: Option<Duration>,
    /// Time a cancelled process gets to exit before it is killed
    pub shutdown_grace: Duration,
}

/// How a launched process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Exit code, or `None` when ended by a signal
    Exited(Option<i32>),
    IdleTimeout,
    Cancelled,
}

impl RunOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, RunOutcome::Exited(Some(0)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub elapsed: Duration,
}

/// File through which a job learns it is being shut down.
///
/// The path is handed to the job in its environment; stopping the job writes
/// the current time into it.
#[derive(Debug, Clone)]
pub struct ShutdownNotice {
    path: PathBuf,
}

impl ShutdownNotice {
    /// Allocate a fresh notice path under `root`, clearing older ones.
    pub fn prepare(root: &Path) -> std::io::Result<Self> {
        match std::fs::remove_dir_all(root) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e),
            _ => {}
        }
        std::fs::create_dir_all(root)?;
        let name = uuid::Uuid::new_v4().simple().to_string();
        Ok(Self { path: root.join(&name[..12]) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn notify(&self) {
        if let Err(e) = std::fs::write(&self.path, format_run_time(Utc::now())) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to write shutdown notification");
        }
    }
}

/// Launches one job's processes from its working copy.
pub struct ProcessRunner {
    data_dir: PathBuf,
    marker: String,
    working_copy: WorkingCopy,
    analytics: Arc<dyn Analytics>,
}

impl ProcessRunner {
    pub fn new(paths: &JobPaths, analytics: Arc<dyn Analytics>) -> Self {
        Self {
            data_dir: paths.data.clone(),
            marker: paths.marker_key(),
            working_copy: WorkingCopy::new(&paths.working_root),
            analytics,
        }
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.working_copy.current_dir()
    }

    pub fn discard_working_copy(&mut self) {
        self.working_copy.discard();
    }

    /// Stage `job`, launch it, and wait for it to end.
    ///
    /// Reports `Running` once the process has started. A non-zero exit is
    /// logged as an error but still returned as a report.
    pub async fn run(
        &mut self,
        job: &JobDescriptor,
        logger: &dyn JobLogger,
        options: &RunOptions,
        shutdown: Option<&ShutdownNotice>,
        cancel: &CancellationToken,
    ) -> Result<RunReport, RunnerError> {
        let marker = self.marker.clone();
        let working_dir = self.working_copy.ensure(&job.directory, || {
            let killed = kill_tagged(&marker);
            if killed > 0 {
                logger.info(&format!("Killed {} process(es) left over from a previous run", killed));
            }
        })?;
        if let Err(e) = std::fs::create_dir_all(&self.data_dir) {
            tracing::warn!(job = %job.name, error = %e, "failed to create job data directory");
        }

        let script = working_dir.join(&job.run_command);
        let script_dir = script.parent().unwrap_or(&working_dir).to_path_buf();
        let (program, argv) = job.script_host.command_line(&script, options.args.as_deref());
        logger.info(&format!(
            "Run script '{}' with script host - '{}'",
            job.run_command.display(),
            job.script_host.name
        ));

        let mut command = tokio::process::Command::new(&program);
        command
            .args(&argv)
            .current_dir(&script_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .env(&marker, "true")
            .env(env_vars::ROOT_PATH, &working_dir)
            .env(env_vars::NAME, &job.name)
            .env(env_vars::TYPE, job.job_type.as_str())
            .env(env_vars::DATA_PATH, &self.data_dir);
        if let Some(run_id) = &options.run_id {
            command.env(env_vars::RUN_ID, run_id.as_str());
        }
        if let Some(args) = &options.args {
            command.env(env_vars::COMMAND_ARGUMENTS, args);
        }
        if let Some(notice) = shutdown {
            command.env(env_vars::SHUTDOWN_FILE, notice.path());
        }

        let started = Instant::now();
        let mut child = match command.spawn() {
            Ok(child) => {
                self.analytics.job_started(job, None);
                child
            }
            Err(source) => {
                self.analytics.job_started(job, Some(&source.to_string()));
                return Err(RunnerError::Spawn { program: program.display().to_string(), source });
            }
        };
        tracing::info!(job = %job.name, pid = child.id().unwrap_or_default(), "job process started");
        logger.report_status(JobStatus::Running);

        let outcome = supervise(&mut child, logger, options, cancel, &marker).await?;
        let elapsed = started.elapsed();
        match outcome {
            RunOutcome::Exited(Some(0)) => {}
            RunOutcome::Exited(Some(code)) => {
                logger.error(&format!("Job failed due to exit code {}", code));
            }
            RunOutcome::Exited(None) => logger.error("Job process was terminated by a signal"),
            RunOutcome::IdleTimeout => logger.error(&format!(
                "Job aborted after {} without output",
                format_elapsed(options.idle_timeout.unwrap_or_default())
            )),
            RunOutcome::Cancelled => logger.info("Job process stopped"),
        }
        Ok(RunReport { outcome, elapsed })
    }
}

async fn supervise(
    child: &mut Child,
    logger: &dyn JobLogger,
    options: &RunOptions,
    cancel: &CancellationToken,
    marker: &str,
) -> Result<RunOutcome, RunnerError> {
    let mut stdout = child.stdout.take().map(|s| BufReader::new(s).lines());
    let mut stderr = child.stderr.take().map(|s| BufReader::new(s).lines());

    loop {
        let idle = idle_sleep(options.idle_timeout);
        tokio::select! {
            line = next_line(&mut stdout) => match line {
                Some(line) => logger.stdout(&line),
                None => stdout = None,
            },
            line = next_line(&mut stderr) => match line {
                Some(line) => logger.stderr(&line),
                None => stderr = None,
            },
            status = child.wait() => {
                let status = status?;
                drain(&mut stdout, &mut stderr, logger).await;
                return Ok(RunOutcome::Exited(status.code()));
            }
            () = idle => {
                terminate(child, marker).await;
                return Ok(RunOutcome::IdleTimeout);
            }
            () = cancel.cancelled() => {
                match tokio::time::timeout(options.shutdown_grace, child.wait()).await {
                    Ok(_) => drain(&mut stdout, &mut stderr, logger).await,
                    Err(_) => logger.warn(&format!(
                        "Job did not exit within {}, killing it",
                        format_elapsed(options.shutdown_grace)
                    )),
                }
                terminate(child, marker).await;
                return Ok(RunOutcome::Cancelled);
            }
        }
    }
}

async fn idle_sleep(timeout: Option<Duration>) {
    match timeout {
        Some(timeout) => tokio::time::sleep(timeout).await,
        None => std::future::pending().await,
    }
}

/// Next line of a stream; never resolves once the stream is closed.
async fn next_line<R: AsyncBufRead + Unpin>(lines: &mut Option<Lines<R>>) -> Option<String> {
    match lines {
        Some(lines) => lines.next_line().await.ok().flatten(),
        None => std::future::pending().await,
    }
}

async fn drain<O, E>(stdout: &mut Option<Lines<O>>, stderr: &mut Option<Lines<E>>, logger: &dyn JobLogger)
where
    O: AsyncBufRead + Unpin,
    E: AsyncBufRead + Unpin,
{
    let drain = async {
        if let Some(lines) = stdout.as_mut() {
            while let Ok(Some(line)) = lines.next_line().await {
                logger.stdout(&line);
            }
        }
        if let Some(lines) = stderr.as_mut() {
            while let Ok(Some(line)) = lines.next_line().await {
                logger.stderr(&line);
            }
        }
    };
    let _ = tokio::time::timeout(OUTPUT_DRAIN_TIMEOUT, drain).await;
}

/// Kill the process and everything else tagged for the job.
async fn terminate(child: &mut Child, marker: &str) {
    if let Err(e) = child.start_kill() {
        tracing::debug!(error = %e, "failed to kill job process");
    }
    let _ = child.wait().await;
    kill_tagged(marker);
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
