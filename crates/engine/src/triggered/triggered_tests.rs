// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;

use wj_core::{FakeClock, HostSettings, StaticSettings, SystemClock, TracingAnalytics};
use wj_storage::write_status;

use crate::test_helpers::Site;

fn settings(f: impl FnOnce(&mut HostSettings)) -> Arc<StaticSettings> {
    let mut settings = HostSettings { stopping_wait: Duration::from_secs(1), ..HostSettings::default() };
    f(&mut settings);
    Arc::new(StaticSettings::new(settings))
}

fn manager_with<C: Clock>(paths: &HostPaths, settings: Arc<StaticSettings>, clock: C) -> TriggeredJobsManager<C> {
    TriggeredJobsManager::new(
        paths.clone(),
        Arc::new(ScriptHostRegistry::default()),
        settings,
        Arc::new(TracingAnalytics),
        clock,
    )
}

fn manager(site: &Site) -> TriggeredJobsManager<SystemClock> {
    manager_with(&site.paths, settings(|_| {}), SystemClock)
}

fn read(path: &Option<std::path::PathBuf>) -> String {
    std::fs::read_to_string(path.as_ref().unwrap()).unwrap()
}

#[tokio::test]
async fn successful_run_is_recorded() {
    let site = Site::new();
    site.add_script(JobType::Triggered, "report", "echo generating report\n");
    let manager = manager(&site);

    let run_id = manager.invoke("report", None, "cli").unwrap();
    manager.wait_for_run("report").await;

    let run = manager.get_run("report", &run_id).unwrap().unwrap();
    assert_eq!(run.status, JobStatus::Success);
    assert_eq!(run.trigger, "cli");
    assert!(run.end_time.is_some());
    assert!(read(&run.output_log).contains("generating report"));
}

#[tokio::test]
async fn failing_run_keeps_stderr() {
    let site = Site::new();
    site.add_script(JobType::Triggered, "broken", "echo 'disk full' >&2\nexit 4\n");
    let manager = manager(&site);

    manager.invoke("broken", None, "cli").unwrap();
    manager.wait_for_run("broken").await;

    let run = manager.latest_run("broken").unwrap().unwrap();
    assert_eq!(run.status, JobStatus::Failed);
    assert!(read(&run.error_log).contains("disk full"));
    assert!(read(&run.output_log).contains("exit code 4"));
}

#[tokio::test]
async fn arguments_reach_the_script() {
    let site = Site::new();
    site.add_script(JobType::Triggered, "echoer", "echo \"args: $1 $2\"\n");
    let manager = manager(&site);

    manager.invoke("echoer", Some("alpha beta"), "cli").unwrap();
    manager.wait_for_run("echoer").await;

    let run = manager.latest_run("echoer").unwrap().unwrap();
    assert!(read(&run.output_log).contains("args: alpha beta"));
}

#[tokio::test]
async fn concurrent_invocation_conflicts_across_instances() {
    let site = Site::new();
    site.add_script(JobType::Triggered, "slow", "sleep 30\n");
    let first = manager(&site);
    let second = manager_with(&site.instance("inst02"), settings(|_| {}), SystemClock);

    first.invoke("slow", None, "cli").unwrap();
    assert!(matches!(first.invoke("slow", None, "cli"), Err(JobsError::Conflict(_))));
    assert!(matches!(second.invoke("slow", None, "cli"), Err(JobsError::Conflict(_))));

    let running = second.latest_run("slow").unwrap().unwrap();
    assert!(running.status.is_in_progress());

    first.shutdown().await;
    let run = first.latest_run("slow").unwrap().unwrap();
    assert_eq!(run.status, JobStatus::Aborted);
}

#[tokio::test]
async fn lock_is_released_after_a_run() {
    let site = Site::new();
    site.add_script(JobType::Triggered, "quick", "true\n");
    let manager = manager(&site);

    manager.invoke("quick", None, "cli").unwrap();
    manager.wait_for_run("quick").await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    manager.invoke("quick", None, "cli").unwrap();
    manager.wait_for_run("quick").await;

    assert_eq!(manager.history("quick").unwrap().len(), 2);
}

#[tokio::test]
async fn unknown_job_is_not_found_even_when_stopped() {
    let site = Site::new();
    let manager = manager_with(&site.paths, settings(|s| s.jobs_stopped = true), SystemClock);
    assert!(matches!(manager.invoke("ghost", None, "cli"), Err(JobsError::NotFound(_))));
    assert!(matches!(manager.history("ghost"), Err(JobsError::NotFound(_))));
}

#[tokio::test]
async fn stopped_jobs_reject_invocation() {
    let site = Site::new();
    site.add_script(JobType::Triggered, "report", "true\n");
    let manager = manager_with(&site.paths, settings(|s| s.jobs_stopped = true), SystemClock);

    assert!(matches!(manager.invoke("report", None, "cli"), Err(JobsError::JobsStopped)));
    assert!(manager.history("report").unwrap().is_empty());
}

#[tokio::test]
async fn history_is_pruned_before_each_run() {
    let site = Site::new();
    site.add_script(JobType::Triggered, "tick", "true\n");
    let clock = FakeClock::new();
    let manager = manager_with(&site.paths, settings(|s| s.history_size = 3), clock.clone());

    let mut ids = Vec::new();
    for _ in 0..5 {
        ids.push(manager.invoke("tick", None, "cli").unwrap());
        manager.wait_for_run("tick").await;
        clock.advance(Duration::from_secs(1));
    }

    let history: Vec<RunId> = manager.history("tick").unwrap().into_iter().map(|run| run.id).collect();
    ids.reverse();
    assert_eq!(history, ids[..3].to_vec());
}

#[tokio::test]
async fn per_job_history_size_overrides_host_setting() {
    let site = Site::new();
    site.add_script(JobType::Triggered, "tick", "true\n");
    site.write_settings(JobType::Triggered, "tick", r#"{"history_size": 1}"#);
    let clock = FakeClock::new();
    let manager = manager_with(&site.paths, settings(|_| {}), clock.clone());

    for _ in 0..3 {
        manager.invoke("tick", None, "cli").unwrap();
        manager.wait_for_run("tick").await;
        clock.advance(Duration::from_secs(1));
    }
    assert_eq!(manager.history("tick").unwrap().len(), 1);
}

#[tokio::test]
async fn silent_run_is_aborted_after_idle_timeout() {
    let site = Site::new();
    site.add_script(JobType::Triggered, "stuck", "sleep 30\n");
    site.write_settings(JobType::Triggered, "stuck", r#"{"idle_timeout": 1}"#);
    let manager = manager(&site);

    manager.invoke("stuck", None, "cli").unwrap();
    tokio::time::timeout(Duration::from_secs(10), manager.wait_for_run("stuck")).await.unwrap();

    let run = manager.latest_run("stuck").unwrap().unwrap();
    assert_eq!(run.status, JobStatus::Aborted);
}

#[test]
fn unfinished_run_without_lock_reads_as_aborted() {
    let site = Site::new();
    site.add_script(JobType::Triggered, "crashed", "true\n");
    let manager = manager(&site);

    let paths = site.paths.job(JobType::Triggered, "crashed");
    let history = RunHistory::new(&paths.data);
    let start = chrono::Utc::now();
    let id = RunId::at(start);
    let dir = history.create_run(&id, "cli", start).unwrap();
    let doc = TriggeredRunStatus { trigger: "cli".into(), status: JobStatus::Running, start_time: start, end_time: None };
    write_status(&dir.join(wj_core::paths::RUN_STATUS_FILE), &doc).unwrap();

    assert_eq!(manager.latest_run("crashed").unwrap().unwrap().status, JobStatus::Aborted);
}

#[test]
fn views_carry_latest_run() {
    let site = Site::new();
    site.add_script(JobType::Triggered, "a", "true\n");
    site.add_script(JobType::Triggered, "b", "true\n");
    let manager = manager(&site);

    let views = manager.list_jobs();
    assert_eq!(views.iter().map(|v| v.job.name.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
    assert!(views.iter().all(|v| v.latest_run.is_none()));
    assert!(manager.get_job("A").is_some());
}

#[test]
fn cleanup_removes_data_of_deleted_jobs() {
    let site = Site::new();
    site.add_script(JobType::Triggered, "kept", "true\n");
    let kept = site.paths.job(JobType::Triggered, "kept").data;
    let gone = site.paths.job(JobType::Triggered, "gone").data;
    std::fs::create_dir_all(&kept).unwrap();
    std::fs::create_dir_all(&gone).unwrap();

    manager(&site).cleanup_deleted_jobs();

    assert!(kept.is_dir());
    assert!(!gone.exists());
}
