//! Stress tests for pagelog.
//!
//! These drive many rotators against one manager from several threads
//! while an observer checks the accounting identity.

use pagelog_core::{Manager, ManagerConfig, StatsSnapshot};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::fixtures::context;

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Log calls issued.
    pub total_calls: usize,
    /// Final manager counters.
    pub stats: StatsSnapshot,
    /// Snapshots where `active + deleted != created`.
    pub accounting_violations: usize,
    /// Snapshots taken by the observer.
    pub observations: usize,
    /// Total duration.
    pub duration: Duration,
    /// Calls per second.
    pub calls_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(
        total_calls: usize,
        stats: StatsSnapshot,
        accounting_violations: usize,
        observations: usize,
        duration: Duration,
    ) -> Self {
        let calls_per_second = if duration.as_secs_f64() > 0.0 {
            total_calls as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_calls,
            stats,
            accounting_violations,
            observations,
            duration,
            calls_per_second,
        }
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Log calls: {}", self.total_calls);
        println!("Records written: {}", self.stats.records_written);
        println!("Records dropped: {}", self.stats.records_dropped);
        println!(
            "Pages: {} created, {} deleted, {} active",
            self.stats.created, self.stats.deleted, self.stats.active
        );
        println!("Sweeps: {}", self.stats.sweeps);
        println!(
            "Accounting violations: {} of {} observations",
            self.accounting_violations, self.observations
        );
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} calls/sec", self.calls_per_second);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Log calls per thread.
    pub calls_per_thread: usize,
    /// Number of concurrent threads, one rotator each.
    pub threads: usize,
    /// Payload size in bytes.
    pub payload_size: usize,
    /// Page capacity.
    pub page_capacity: usize,
    /// Eviction bound.
    pub max_pages: u64,
    /// Flush every this many calls (0 = only at the end).
    pub flush_every: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            calls_per_thread: 10_000,
            threads: 4,
            payload_size: 64,
            page_capacity: 4096,
            max_pages: 16,
            flush_every: 0,
        }
    }
}

impl StressConfig {
    fn manager_config(&self) -> ManagerConfig {
        ManagerConfig::new()
            .page_capacity(self.page_capacity)
            .max_pages(self.max_pages)
    }
}

fn watch_accounting(
    manager: Arc<Manager>,
    done: Arc<AtomicBool>,
    violations: Arc<AtomicUsize>,
) -> thread::JoinHandle<usize> {
    thread::spawn(move || {
        let mut observations = 0usize;
        loop {
            let finished = done.load(Ordering::Acquire);
            let stats = manager.stats();
            if stats.active + stats.deleted != stats.created {
                violations.fetch_add(1, Ordering::Relaxed);
            }
            observations += 1;
            if finished {
                return observations;
            }
            thread::yield_now();
        }
    })
}

/// Run one rotator per thread against a shared manager.
pub fn stress_concurrent_rotators(config: &StressConfig) -> StressTestResult {
    let manager = Manager::new(config.manager_config()).expect("Invalid stress configuration");
    let done = Arc::new(AtomicBool::new(false));
    let violations = Arc::new(AtomicUsize::new(0));
    let observer = watch_accounting(Arc::clone(&manager), Arc::clone(&done), Arc::clone(&violations));

    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let mut rotator = manager.rotator(context(&format!("worker-{t}")));
            let payload = "x".repeat(config.payload_size);
            let calls = config.calls_per_thread;
            let flush_every = config.flush_every;

            thread::spawn(move || {
                for i in 0..calls {
                    rotator.info(&format_args!("{i} {payload}"));
                    if flush_every > 0 && (i + 1) % flush_every == 0 {
                        rotator.flush();
                    }
                }
                rotator.flush();
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }
    let duration = start.elapsed();

    done.store(true, Ordering::Release);
    let observations = observer.join().expect("Observer panicked");

    StressTestResult::new(
        config.threads * config.calls_per_thread,
        manager.stats(),
        violations.load(Ordering::Relaxed),
        observations,
        duration,
    )
}

/// Run writers while other threads export and purge.
pub fn stress_export_while_logging(config: &StressConfig) -> StressTestResult {
    let manager = Manager::new(config.manager_config()).expect("Invalid stress configuration");
    let done = Arc::new(AtomicBool::new(false));
    let violations = Arc::new(AtomicUsize::new(0));
    let observer = watch_accounting(Arc::clone(&manager), Arc::clone(&done), Arc::clone(&violations));

    let exporter = {
        let manager = Arc::clone(&manager);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut exports = 0usize;
            while !done.load(Ordering::Acquire) {
                // Every export must decode, whatever the writers are doing.
                manager.records().expect("Export should decode");
                exports += 1;
                if exports % 16 == 0 {
                    manager.purge();
                }
                thread::yield_now();
            }
        })
    };

    let start = Instant::now();
    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let mut rotator = manager.rotator(context(&format!("writer-{t}")));
            let payload = "y".repeat(config.payload_size);
            let calls = config.calls_per_thread;
            thread::spawn(move || {
                for i in 0..calls {
                    rotator.warn(&format_args!("{i} {payload}"));
                }
                rotator.flush();
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }
    let duration = start.elapsed();

    done.store(true, Ordering::Release);
    exporter.join().expect("Exporter panicked");
    let observations = observer.join().expect("Observer panicked");

    StressTestResult::new(
        config.threads * config.calls_per_thread,
        manager.stats(),
        violations.load(Ordering::Relaxed),
        observations,
        duration,
    )
}
