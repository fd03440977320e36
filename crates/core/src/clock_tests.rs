// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn system_clock_returns_increasing_time() {
    let clock = SystemClock;
    let t1 = clock.now();
    std::thread::sleep(Duration::from_millis(1));
    let t2 = clock.now();
    assert!(t2 > t1);
}

#[test]
fn fake_clock_advances_both_clocks() {
    let clock = FakeClock::new();
    let t1 = clock.now();
    let u1 = clock.utc_now();
    clock.advance(Duration::from_secs(90));
    assert!(clock.now().duration_since(t1) >= Duration::from_secs(90));
    assert_eq!((clock.utc_now() - u1).num_seconds(), 90);
}

#[test]
fn fake_clock_set_utc_leaves_monotonic_time() {
    let clock = FakeClock::new();
    let before = clock.now();
    let target = Utc.with_ymd_and_hms(2015, 1, 1, 0, 0, 0).unwrap();
    clock.set_utc(target);
    assert_eq!(clock.utc_now(), target);
    assert_eq!(clock.now(), before);
}

#[test]
fn fake_clock_clones_share_state() {
    let clock = FakeClock::new();
    let other = clock.clone();
    clock.advance(Duration::from_secs(5));
    assert_eq!(clock.utc_now(), other.utc_now());
}
