// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeZone;
use proptest::prelude::*;

fn start(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 1, 12, minute, 0).unwrap()
}

fn history_with_runs(count: u32) -> (tempfile::TempDir, RunHistory) {
    let dir = tempfile::tempdir().unwrap();
    let history = RunHistory::new(dir.path().join("nightly"));
    for minute in 0..count {
        let time = start(minute);
        history.create_run(&RunId::at(time), "External", time).unwrap();
    }
    (dir, history)
}

#[test]
fn run_ids_are_newest_first() {
    let (_dir, history) = history_with_runs(3);
    let ids = history.run_ids();
    assert_eq!(ids.len(), 3);
    assert_eq!(ids[0], RunId::at(start(2)));
    assert_eq!(ids[2], RunId::at(start(0)));
}

#[test]
fn non_run_entries_are_ignored() {
    let (_dir, history) = history_with_runs(1);
    std::fs::write(history.dir().join("triggeredJob.lock"), "").unwrap();
    std::fs::create_dir_all(history.dir().join("scratch")).unwrap();
    assert_eq!(history.run_ids().len(), 1);
}

#[test]
fn prune_keeps_room_for_next_run() {
    let (_dir, history) = history_with_runs(5);
    let removed = history.prune(3);
    assert_eq!(removed, vec![RunId::at(start(2)), RunId::at(start(1)), RunId::at(start(0))]);
    assert_eq!(history.run_ids(), vec![RunId::at(start(4)), RunId::at(start(3))]);
}

#[test]
fn created_run_starts_initializing() {
    let (_dir, history) = history_with_runs(1);
    let run = history.read_run(&RunId::at(start(0))).unwrap();
    assert_eq!(run.status, JobStatus::Initializing);
    assert_eq!(run.trigger, "External");
    assert_eq!(run.start_time, start(0));
    assert_eq!(run.output_log, None);
}

#[test]
fn missing_status_falls_back_to_id_time() {
    let dir = tempfile::tempdir().unwrap();
    let history = RunHistory::new(dir.path());
    std::fs::create_dir_all(dir.path().join("202605011203000000")).unwrap();

    let run = history.read_run(&RunId::from("202605011203000000")).unwrap();
    assert_eq!(run.status, JobStatus::Initializing);
    assert_eq!(run.start_time, start(3));
}

#[yare::parameterized(
    lock_held = { true, JobStatus::Running },
    lock_free = { false, JobStatus::Aborted },
)]
fn latest_in_progress_run_depends_on_lock(held: bool, expected: JobStatus) {
    let (_dir, history) = history_with_runs(2);
    for id in history.run_ids() {
        let path = history.run_dir(&id).join(RUN_STATUS_FILE);
        let mut doc: TriggeredRunStatus = read_status(&path).unwrap();
        doc.status = JobStatus::Running;
        write_status(&path, &doc).unwrap();
    }

    let runs = history.runs(held);
    assert_eq!(runs[0].status, expected);
    assert_eq!(runs[1].status, JobStatus::Aborted);
}

#[test]
fn finished_runs_keep_their_status() {
    let (_dir, history) = history_with_runs(1);
    let id = RunId::at(start(0));
    let path = history.run_dir(&id).join(RUN_STATUS_FILE);
    let mut doc: TriggeredRunStatus = read_status(&path).unwrap();
    doc.status = JobStatus::Success;
    doc.end_time = Some(start(1));
    write_status(&path, &doc).unwrap();

    let runs = history.runs(false);
    assert_eq!(runs[0].status, JobStatus::Success);
    assert_eq!(runs[0].duration(), Some(chrono::Duration::minutes(1)));
}

proptest! {
    #[test]
    fn prune_retains_newest(existing in 0u32..12, max_runs in 1usize..8) {
        let (_dir, history) = history_with_runs(existing);
        let before = history.run_ids();
        history.prune(max_runs);
        let after = history.run_ids();

        let expected_len = before.len().min(max_runs - 1);
        prop_assert_eq!(after.len(), expected_len);
        prop_assert_eq!(&after[..], &before[..expected_len]);
    }
}
