// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use wj_core::{HostPaths, HostSettings, JobType, StaticSettings, TracingAnalytics};

use crate::runner::find_tagged;
use crate::test_helpers::{wait_for, Site};

const WAIT: Duration = Duration::from_secs(10);

fn quick_config() -> SupervisorConfig {
    SupervisorConfig {
        warmup: Duration::from_secs(120),
        inactive_retry: Duration::from_millis(200),
        error_cooldown: Duration::from_secs(1),
    }
}

fn runner(site: &Site, paths: &HostPaths, name: &str, config: SupervisorConfig) -> (ContinuousJobRunner, JobDescriptor) {
    let job = site.catalog(JobType::Continuous).get_job(name).unwrap();
    let settings = HostSettings {
        restart_backoff: Duration::from_secs(1),
        stopping_wait: Duration::from_secs(3),
        ..HostSettings::default()
    };
    let runner = ContinuousJobRunner::new(
        paths.job(JobType::Continuous, name),
        Arc::new(StaticSettings::new(settings)),
        Arc::new(TracingAnalytics),
        config,
    );
    (runner, job)
}

fn log_text(runner: &ContinuousJobRunner) -> String {
    std::fs::read_to_string(runner.logger().log_path()).unwrap_or_default()
}

#[yare::parameterized(
    crashed_early = { 10, 60 },
    just_short = { 119, 60 },
    warmed_up = { 120, 0 },
    long_lived = { 3600, 0 },
)]
fn delay_depends_on_uptime(ran_for: u64, expected: u64) {
    let delay = restart_delay(Duration::from_secs(ran_for), Duration::from_secs(120), Duration::from_secs(60));
    assert_eq!(delay, Duration::from_secs(expected));
}

#[tokio::test]
async fn crashing_job_restarts_after_backoff() {
    let site = Site::new();
    site.add_script(JobType::Continuous, "flaky", "echo started\nexit 1\n");
    let (runner, job) = runner(&site, &site.paths, "flaky", quick_config());

    runner.start(job).await;
    let restarted = wait_for(WAIT, || log_text(&runner).matches("] started").count() >= 2).await;
    assert!(restarted);

    let log = log_text(&runner);
    assert!(log.contains("Job failed due to exit code 1"));
    assert!(log.contains("Process went down, waiting for 1 seconds"));
    assert!(log.contains("Status changed to PendingRestart"));
    runner.stop().await;
}

#[tokio::test]
async fn warmed_up_job_restarts_immediately() {
    let site = Site::new();
    site.add_script(JobType::Continuous, "short", "exit 0\n");
    let config = SupervisorConfig { warmup: Duration::ZERO, ..quick_config() };
    let (runner, job) = runner(&site, &site.paths, "short", config);

    runner.start(job).await;
    assert!(wait_for(WAIT, || log_text(&runner).contains("restarting immediately")).await);
    runner.stop().await;
    assert!(!log_text(&runner).contains("Status changed to PendingRestart"));
}

#[tokio::test]
async fn stop_ends_a_running_job() {
    let site = Site::new();
    site.add_script(JobType::Continuous, "daemon", "echo up\nsleep 30\n");
    let (runner, job) = runner(&site, &site.paths, "daemon", quick_config());
    let marker = runner.paths().marker_key();

    runner.start(job.clone()).await;
    runner.start(job).await;
    assert!(wait_for(WAIT, || runner.logger().status() == Some(JobStatus::Running)).await);
    assert!(runner.is_running().await);

    runner.stop().await;

    assert_eq!(runner.logger().status(), Some(JobStatus::Stopped));
    assert!(!runner.is_running().await);
    assert!(wait_for(WAIT, || find_tagged(&marker).is_empty()).await);
    assert_eq!(log_text(&runner).matches("Run script").count(), 1);
}

#[tokio::test]
async fn stopping_writes_the_shutdown_notice() {
    let site = Site::new();
    site.add_script(
        JobType::Continuous,
        "graceful",
        "while [ ! -s \"$WEBJOBS_SHUTDOWN_FILE\" ]; do sleep 0.1; done\necho graceful exit\n",
    );
    let (runner, job) = runner(&site, &site.paths, "graceful", quick_config());

    runner.start(job).await;
    assert!(wait_for(WAIT, || runner.logger().status() == Some(JobStatus::Running)).await);
    runner.stop().await;

    let log = log_text(&runner);
    assert!(log.contains("graceful exit"));
    assert!(!log.contains("did not exit within"));
}

#[tokio::test]
async fn disabled_job_is_not_launched() {
    let site = Site::new();
    let dir = site.add_script(JobType::Continuous, "paused", "echo up\nsleep 30\n");
    std::fs::write(dir.join("disable.job"), "").unwrap();
    let (runner, job) = runner(&site, &site.paths, "paused", quick_config());

    runner.start(job).await;

    assert_eq!(runner.logger().status(), Some(JobStatus::Stopped));
    assert!(!runner.is_running().await);
    assert!(!log_text(&runner).contains("Run script"));
}

#[tokio::test]
async fn singleton_runs_on_one_instance_at_a_time() {
    let site = Site::new();
    site.add_script(JobType::Continuous, "single", "sleep 30\n");
    site.write_settings(JobType::Continuous, "single", r#"{"is_singleton": true}"#);
    let (first, job) = runner(&site, &site.paths, "single", quick_config());
    let (second, _) = runner(&site, &site.instance("inst02"), "single", quick_config());

    first.start(job.clone()).await;
    assert!(wait_for(WAIT, || first.logger().status() == Some(JobStatus::Running)).await);
    second.start(job).await;
    assert!(wait_for(WAIT, || second.logger().status() == Some(JobStatus::InactiveInstance)).await);

    first.stop().await;
    assert!(wait_for(WAIT, || second.logger().status() == Some(JobStatus::Running)).await);
    second.stop().await;
}

#[tokio::test]
async fn instances_sharing_a_host_do_not_kill_each_other() {
    let site = Site::new();
    site.add_script(JobType::Continuous, "shared", "echo up\nsleep 30\n");
    let (first, job) = runner(&site, &site.paths, "shared", quick_config());
    let (second, _) = runner(&site, &site.instance("inst02"), "shared", quick_config());

    first.start(job.clone()).await;
    assert!(wait_for(WAIT, || first.logger().status() == Some(JobStatus::Running)).await);
    second.start(job).await;
    assert!(wait_for(WAIT, || second.logger().status() == Some(JobStatus::Running)).await);
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(first.logger().status(), Some(JobStatus::Running));
    assert_eq!(second.logger().status(), Some(JobStatus::Running));
    assert!(!find_tagged(&first.paths().marker_key()).is_empty());
    assert!(!find_tagged(&second.paths().marker_key()).is_empty());
    let log = log_text(&first);
    let launches = |instance: &str| {
        log.lines().filter(|line| line.contains(&format!("> {}:", instance)) && line.contains("Run script")).count()
    };
    assert_eq!(launches("inst01"), 1);
    assert_eq!(launches("inst02"), 1);
    assert!(!log.contains("left over from a previous run"));
    assert!(!log.contains("terminated by a signal"));
    assert!(first.paths().working_root.is_dir());

    first.stop().await;
    second.stop().await;
}

#[tokio::test]
async fn console_output_is_capped_per_launch() {
    let site = Site::new();
    site.add_script(
        JobType::Continuous,
        "chatty",
        "for i in $(seq 1 250); do echo line $i; done\nsleep 30\n",
    );
    let (runner, job) = runner(&site, &site.paths, "chatty", quick_config());

    runner.start(job).await;
    let capped = wait_for(WAIT, || log_text(&runner).contains("Reached maximum allowed console output lines")).await;
    assert!(capped);
    runner.stop().await;

    assert_eq!(log_text(&runner).matches("] line ").count(), 200);
}
