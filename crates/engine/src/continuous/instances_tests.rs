// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use wj_storage::write_status;

fn write(dir: &Path, instance: &str, status: JobStatus) {
    write_status(&dir.join(format!("status_{}", instance)), &ContinuousStatus { status }).unwrap();
}

fn status(instance: &str, status: JobStatus) -> InstanceStatus {
    InstanceStatus { instance_id: instance.to_string(), status }
}

#[test]
fn live_instances_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "aaa", JobStatus::Running);
    write(dir.path(), "bbb", JobStatus::InactiveInstance);
    let lock = FileLock::new(dir.path().join("status_bbb.lock"));
    assert!(lock.try_acquire().unwrap());

    let statuses = collect_instance_statuses(dir.path(), "aaa");
    assert_eq!(
        statuses,
        vec![status("aaa", JobStatus::Running), status("bbb", JobStatus::InactiveInstance)]
    );
}

#[test]
fn unlocked_foreign_status_is_deleted() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "aaa", JobStatus::Running);
    write(dir.path(), "gone", JobStatus::Running);
    std::fs::write(dir.path().join("status_gone.lock"), "123\n").unwrap();

    let statuses = collect_instance_statuses(dir.path(), "aaa");

    assert_eq!(statuses, vec![status("aaa", JobStatus::Running)]);
    assert!(!dir.path().join("status_gone").exists());
    assert!(!dir.path().join("status_gone.lock").exists());
}

#[test]
fn unrelated_files_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("job_log.txt"), "").unwrap();
    std::fs::write(dir.path().join("status"), "{}").unwrap();
    assert!(collect_instance_statuses(dir.path(), "aaa").is_empty());
    assert!(collect_instance_statuses(&dir.path().join("missing"), "aaa").is_empty());
}

#[yare::parameterized(
    running_wins = { &[JobStatus::InactiveInstance, JobStatus::Running, JobStatus::Stopped], JobStatus::Running },
    pending_over_stopped = { &[JobStatus::Stopped, JobStatus::PendingRestart], JobStatus::PendingRestart },
    all_inactive = { &[JobStatus::InactiveInstance, JobStatus::InactiveInstance], JobStatus::InactiveInstance },
    none = { &[], JobStatus::Initializing },
)]
fn aggregates_by_significance(inputs: &[JobStatus], expected: JobStatus) {
    let statuses: Vec<_> =
        inputs.iter().enumerate().map(|(i, s)| status(&format!("i{}", i), *s)).collect();
    assert_eq!(aggregate_status(&statuses), expected);
}
