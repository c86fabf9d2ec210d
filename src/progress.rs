//! # Progress — Atomic Iteration Counters
//!
//! Thread-safe progress tracking shared between the driver loop and the
//! background status reporter. Counters are atomics so the reporter never
//! blocks the squaring loop; a Mutex guards only the current-stage string
//! (updated a few times per run, not per iteration).
//!
//! ## Background Reporter
//!
//! A dedicated thread logs progress every 30 seconds: completed iterations,
//! total, rate (iterations/sec) and snapshot count. Shuts down cleanly via
//! the `shutdown` atomic flag.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tracing::info;

pub struct Progress {
    pub iterations: AtomicU64,
    pub total: AtomicU64,
    pub snapshots: AtomicU64,
    pub stage: Mutex<String>,
    start: Instant,
    shutdown: AtomicBool,
}

impl Progress {
    pub fn new(total: u64) -> Arc<Self> {
        Arc::new(Progress {
            iterations: AtomicU64::new(0),
            total: AtomicU64::new(total),
            snapshots: AtomicU64::new(0),
            stage: Mutex::new(String::new()),
            start: Instant::now(),
            shutdown: AtomicBool::new(false),
        })
    }

    pub fn start_reporter(self: &Arc<Self>) -> thread::JoinHandle<()> {
        let progress = Arc::clone(self);
        thread::spawn(move || loop {
            thread::sleep(Duration::from_secs(30));
            if progress.shutdown.load(Ordering::Relaxed) {
                break;
            }
            progress.print_status();
        })
    }

    pub fn print_status(&self) {
        let elapsed = self.start.elapsed();
        let done = self.iterations.load(Ordering::Relaxed);
        let total = self.total.load(Ordering::Relaxed);
        let snapshots = self.snapshots.load(Ordering::Relaxed);
        let stage = self.stage.lock().unwrap().clone();
        let rate = if elapsed.as_secs() > 0 {
            done as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };
        let percent = if total > 0 {
            done as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        info!(
            stage = %stage,
            iterations = done,
            total,
            percent = format_args!("{:.2}", percent),
            rate = format_args!("{:.0}", rate),
            snapshots,
            "progress"
        );
    }

    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}
