use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Keeps the most recent `capacity` latency samples for percentile queries
#[derive(Debug, Clone)]
pub struct PercentileTracker {
    samples: Arc<Mutex<VecDeque<u64>>>,
    capacity: usize,
}

impl PercentileTracker {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    /// Record a sample in nanoseconds
    pub fn record(&self, nanos: u64) {
        let mut samples = self.samples.lock();
        if samples.len() >= self.capacity {
            samples.pop_front();
        }
        samples.push_back(nanos);
    }

    /// Percentile `p` (0.0-1.0) in microseconds, 0 when empty
    pub fn percentile_us(&self, p: f64) -> f64 {
        let samples = self.samples.lock();
        if samples.is_empty() {
            return 0.0;
        }

        let mut sorted: Vec<u64> = samples.iter().copied().collect();
        sorted.sort_unstable();

        let idx = ((sorted.len() as f64 * p).ceil() as usize)
            .saturating_sub(1)
            .min(sorted.len() - 1);
        sorted[idx] as f64 / 1000.0
    }

    pub fn count(&self) -> usize {
        self.samples.lock().len()
    }
}

/// Consumer-side run metrics.
///
/// Cheap to clone; clones share counters, so a handle taken before a run can
/// be read from another thread while the consumer is draining.
#[derive(Debug, Clone)]
pub struct ConsumerMetrics {
    processed: Arc<AtomicU64>,
    idle_polls: Arc<AtomicU64>,
    advance_latency: PercentileTracker,
    start_time: Arc<Mutex<Instant>>,
}

impl ConsumerMetrics {
    pub fn new() -> Self {
        Self {
            processed: Arc::new(AtomicU64::new(0)),
            idle_polls: Arc::new(AtomicU64::new(0)),
            advance_latency: PercentileTracker::new(1000),
            start_time: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Restart the throughput clock
    pub fn mark_start(&self) {
        *self.start_time.lock() = Instant::now();
    }

    pub fn record_processed(&self, advance_nanos: u64) {
        self.processed.fetch_add(1, Ordering::Relaxed);
        self.advance_latency.record(advance_nanos);
    }

    pub fn record_idle_poll(&self) {
        self.idle_polls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total_processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn total_idle_polls(&self) -> u64 {
        self.idle_polls.load(Ordering::Relaxed)
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.lock().elapsed()
    }

    /// Items per second since the last `mark_start`
    pub fn throughput_ips(&self) -> f64 {
        let secs = self.elapsed().as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.total_processed() as f64 / secs
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_processed: self.total_processed(),
            idle_polls: self.total_idle_polls(),
            throughput_ips: self.throughput_ips(),
            advance_p50_us: self.advance_latency.percentile_us(0.50),
            advance_p95_us: self.advance_latency.percentile_us(0.95),
            advance_p99_us: self.advance_latency.percentile_us(0.99),
            elapsed: self.elapsed(),
        }
    }
}

impl Default for ConsumerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Metrics at a point in time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsSnapshot {
    pub total_processed: u64,
    pub idle_polls: u64,
    pub throughput_ips: f64,
    pub advance_p50_us: f64,
    pub advance_p95_us: f64,
    pub advance_p99_us: f64,
    pub elapsed: Duration,
}

impl MetricsSnapshot {
    /// Format metrics as a human-readable string
    pub fn format(&self) -> String {
        format!(
            "Processed: {}, Idle polls: {}, Throughput: {:.2} items/s, \
             Advance P50: {:.2}µs, P95: {:.2}µs, P99: {:.2}µs, Elapsed: {:.2}s",
            self.total_processed,
            self.idle_polls,
            self.throughput_ips,
            self.advance_p50_us,
            self.advance_p95_us,
            self.advance_p99_us,
            self.elapsed.as_secs_f64()
        )
    }
}
