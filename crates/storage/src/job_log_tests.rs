// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

#[test]
fn lines_carry_instance_and_level_header() {
    let dir = tempfile::tempdir().unwrap();
    let log = JobLog::append_only(dir.path().join("logs").join("job_log.txt"), "a1b2c3");

    log.append(LogLevel::Info, "Status changed to Running", true);
    log.append(LogLevel::Error, "boom", false);

    let content = read(log.path());
    let lines: Vec<_> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with('['));
    assert!(lines[0].ends_with(" > a1b2c3: SYS INFO] Status changed to Running"), "{}", lines[0]);
    assert!(lines[1].ends_with(" > a1b2c3: ERR] boom"), "{}", lines[1]);
}

#[test]
fn exceeding_one_mebibyte_rolls_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("job_log.txt");
    let previous = dir.path().join(PREV_LOG_FILE);
    let log = JobLog::rolling(&path, &previous, "inst01");

    let filler = "x".repeat(1000);
    while std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0) <= MAX_LOG_FILE_SIZE {
        log.append(LogLevel::Info, &filler, false);
    }
    assert!(!previous.exists());

    log.append(LogLevel::Info, "fresh", false);

    assert!(std::fs::metadata(&previous).unwrap().len() > MAX_LOG_FILE_SIZE);
    let active = read(&path);
    assert_eq!(active.lines().count(), 1);
    assert!(active.trim_end().ends_with("] fresh"));

    let generations = std::fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(generations, 2);
}

#[test]
fn roll_replaces_previous_generation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("job_log.txt");
    let previous = dir.path().join(PREV_LOG_FILE);
    let log = JobLog::append_only(&path, "inst01").with_max_size(64, &previous);

    for round in 0..3 {
        for _ in 0..4 {
            log.append(LogLevel::Info, &format!("round {}", round), false);
        }
    }

    assert!(read(&previous).contains("round"));
    assert!(!read(&previous).contains("round 0"));
}

#[test]
fn console_budget_warns_once() {
    let budget = ConsoleBudget::new(2);
    assert_eq!(budget.admit(), ConsoleVerdict::Write);
    assert_eq!(budget.admit(), ConsoleVerdict::Write);
    assert_eq!(budget.admit(), ConsoleVerdict::LimitReached);
    assert_eq!(budget.admit(), ConsoleVerdict::Drop);
    assert_eq!(budget.admit(), ConsoleVerdict::Drop);

    budget.reset();
    assert_eq!(budget.admit(), ConsoleVerdict::Write);
}
