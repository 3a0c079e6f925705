//! Worker threads must not outlive the call that created them.
//!
//! Kept in its own test binary with a single test, so nothing else spawns
//! threads while the live count is being measured.
#![cfg(target_os = "linux")]

use csrmv_core::build_matrix;
use csrmv_kernels::*;
use std::time::{Duration, Instant};

fn live_threads() -> usize {
    std::fs::read_dir("/proc/self/task").unwrap().count()
}

/// Joined threads can linger in /proc for a moment after `join` returns.
fn settles_to(limit: usize) -> bool {
    let deadline = Instant::now() + Duration::from_millis(50);
    loop {
        if live_threads() <= limit {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn parallel_calls_leave_no_threads_behind() {
    let a = build_matrix(500, 200, 0.05).unwrap();
    let x = vec![1.0; 200];
    let want = spmv_sequential(&a, &x).unwrap();
    let before = live_threads();

    let threads = available_threads();
    assert!(threads >= 1);
    assert_eq!(live_threads(), before, "counting threads started a pool");

    for _ in 0..20 {
        assert_eq!(spmv_static(&a, &x, 32).unwrap(), want);
        assert_eq!(spmv_dynamic(&a, &x, 32).unwrap(), want);
    }
    assert!(
        settles_to(before),
        "{} live threads after the calls, {before} before",
        live_threads()
    );
}
