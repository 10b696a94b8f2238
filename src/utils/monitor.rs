use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PublishStats {
    pub iterations: u64,
    pub registry_publishes: u64,
    pub registry_failures: u64,
    pub fused_publishes: u64,
    pub fused_skipped: u64,
}

/// Counters shared between the publish loop and whoever reports on it.
#[derive(Debug)]
pub struct PublishMonitor {
    iterations: AtomicU64,
    registry_publishes: AtomicU64,
    registry_failures: AtomicU64,
    fused_publishes: AtomicU64,
    fused_skipped: AtomicU64,
    start_time: Instant,
}

impl PublishMonitor {
    pub fn new() -> Self {
        Self {
            iterations: AtomicU64::new(0),
            registry_publishes: AtomicU64::new(0),
            registry_failures: AtomicU64::new(0),
            fused_publishes: AtomicU64::new(0),
            fused_skipped: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_iteration(&self) {
        self.iterations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_registry_publish(&self) {
        self.registry_publishes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_registry_failure(&self) {
        self.registry_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fused_publish(&self) {
        self.fused_publishes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fused_skipped(&self) {
        self.fused_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PublishStats {
        PublishStats {
            iterations: self.iterations.load(Ordering::Relaxed),
            registry_publishes: self.registry_publishes.load(Ordering::Relaxed),
            registry_failures: self.registry_failures.load(Ordering::Relaxed),
            fused_publishes: self.fused_publishes.load(Ordering::Relaxed),
            fused_skipped: self.fused_skipped.load(Ordering::Relaxed),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn log_stats(&self, phase: &str) {
        let stats = self.snapshot();
        tracing::info!(
            "📊 {} - iterations: {}, registry: {} ok / {} failed, fused: {} ok / {} skipped, uptime: {:?}",
            phase,
            stats.iterations,
            stats.registry_publishes,
            stats.registry_failures,
            stats.fused_publishes,
            stats.fused_skipped,
            self.elapsed()
        );
    }
}

impl Default for PublishMonitor {
    fn default() -> Self {
        Self::new()
    }
}
