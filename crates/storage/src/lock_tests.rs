// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::Arc;

#[test]
fn acquire_release_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("job.lock");
    let lock = FileLock::new(&path);

    assert!(!lock.is_held());
    assert!(lock.try_acquire().unwrap());
    assert!(lock.is_held());
    assert!(FileLock::is_locked(&path));

    // A second attempt through the same handle does not re-enter
    assert!(!lock.try_acquire().unwrap());

    lock.release();
    assert!(!lock.is_held());
    assert!(!FileLock::is_locked(&path));

    assert!(lock.try_acquire().unwrap());
}

#[test]
fn release_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let lock = FileLock::new(dir.path().join("job.lock"));
    lock.release();
    assert!(lock.try_acquire().unwrap());
    lock.release();
    lock.release();
    assert!(!lock.is_held());
}

#[test]
fn second_handle_is_excluded_until_release() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("singleton.job.lock");
    let first = FileLock::new(&path);
    let second = FileLock::new(&path);

    assert!(first.try_acquire().unwrap());
    assert!(!second.try_acquire().unwrap());

    drop(first);
    assert!(second.try_acquire().unwrap());
}

#[test]
fn lock_file_records_owner_pid() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("job.lock");
    let lock = FileLock::new(&path);
    assert!(lock.try_acquire().unwrap());
    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content.trim(), std::process::id().to_string());
}

#[test]
fn probe_of_missing_file_is_unlocked() {
    let dir = tempfile::tempdir().unwrap();
    assert!(!FileLock::is_locked(&dir.path().join("absent.lock")));
}

#[test]
fn concurrent_counting_is_serialized() {
    const THREADS: usize = 8;
    const ROUNDS: usize = 25;

    let dir = tempfile::tempdir().unwrap();
    let lock_path = Arc::new(dir.path().join("counter.lock"));
    let counter_path = Arc::new(dir.path().join("counter"));
    std::fs::write(&*counter_path, "0").unwrap();

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let lock_path = Arc::clone(&lock_path);
            let counter_path = Arc::clone(&counter_path);
            std::thread::spawn(move || {
                let lock = FileLock::new(&*lock_path);
                for _ in 0..ROUNDS {
                    while !lock.try_acquire().unwrap() {
                        std::thread::yield_now();
                    }
                    let n: usize =
                        std::fs::read_to_string(&*counter_path).unwrap().trim().parse().unwrap();
                    std::fs::write(&*counter_path, (n + 1).to_string()).unwrap();
                    lock.release();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let total: usize = std::fs::read_to_string(&*counter_path).unwrap().trim().parse().unwrap();
    assert_eq!(total, THREADS * ROUNDS);
}
