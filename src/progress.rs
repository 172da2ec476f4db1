//! Progress reporting for long scans.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// How often scans call the observer, in records.
pub const REPORT_EVERY: u64 = 4096;

/// Receives running totals during a scan.
pub trait ProgressObserver: Sync {
    fn report(&self, lines_read: u64, matches_found: u64);
}

/// Discards every report.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl ProgressObserver for Silent {
    fn report(&self, _lines_read: u64, _matches_found: u64) {}
}

/// Logs at most once per `interval` through `tracing`.
#[derive(Debug)]
pub struct LogProgress {
    label: &'static str,
    interval: Duration,
    last: Mutex<Instant>,
}

impl LogProgress {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            interval: Duration::from_secs(1),
            last: Mutex::new(Instant::now()),
        }
    }
}

impl ProgressObserver for LogProgress {
    fn report(&self, lines_read: u64, matches_found: u64) {
        let Ok(mut last) = self.last.try_lock() else {
            return;
        };
        if last.elapsed() < self.interval {
            return;
        }
        *last = Instant::now();
        tracing::info!(lines_read, matches_found, "{}", self.label);
    }
}

/// Shared running totals, safe to bump from several scan workers.
#[derive(Debug, Default)]
pub struct Counters {
    lines: AtomicU64,
    found: AtomicU64,
}

impl Counters {
    /// Count one record; every `REPORT_EVERY` records, forward the totals.
    pub fn tick(&self, observer: &dyn ProgressObserver) {
        let lines = self.lines.fetch_add(1, Ordering::Relaxed) + 1;
        if lines % REPORT_EVERY == 0 {
            observer.report(lines, self.found.load(Ordering::Relaxed));
        }
    }

    pub fn found(&self, n: u64) {
        self.found.fetch_add(n, Ordering::Relaxed);
    }

    pub fn lines(&self) -> u64 {
        self.lines.load(Ordering::Relaxed)
    }

    pub fn matches(&self) -> u64 {
        self.found.load(Ordering::Relaxed)
    }
}
