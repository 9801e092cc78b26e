use crate::error::{PipelineError, Result};
use std::num::NonZeroUsize;
use std::thread;
use std::time::Duration;

/// Default number of producer workers per available CPU
pub const DEFAULT_WORKERS_PER_CPU: usize = 2;

/// Default time the consumer waits on an empty buffer before re-checking
pub const DEFAULT_IDLE_POLL: Duration = Duration::from_millis(50);

/// Number of trailing items a window maximum is computed over.
/// Always at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowSize(u64);

impl WindowSize {
    /// Create a window size, clamping anything below 1 up to 1
    pub fn new(requested: i64) -> Self {
        Self(requested.max(1) as u64)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    /// A window of one makes every value its own maximum
    pub fn is_passthrough(self) -> bool {
        self.0 == 1
    }
}

impl Default for WindowSize {
    fn default() -> Self {
        Self(1)
    }
}

impl From<i64> for WindowSize {
    fn from(requested: i64) -> Self {
        Self::new(requested)
    }
}

/// Capacity mode of the shared buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferMode {
    /// Push never blocks
    #[default]
    Unbounded,
    /// Push suspends the producer while the buffer holds this many values
    Bounded(usize),
}

impl BufferMode {
    /// Build a mode from an optional capacity, rejecting zero
    pub fn from_capacity(capacity: Option<usize>) -> Result<Self> {
        match capacity {
            None => Ok(BufferMode::Unbounded),
            Some(0) => Err(PipelineError::ConfigError(
                "buffer capacity must be greater than zero".into(),
            )),
            Some(n) => Ok(BufferMode::Bounded(n)),
        }
    }
}

/// Settings for one run. Immutable once the pipeline is built.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub window_size: WindowSize,
    pub buffer_mode: BufferMode,
    pub workers_per_cpu: usize,
    pub idle_poll: Duration,
}

impl PipelineConfig {
    pub fn new(window_size: WindowSize) -> Self {
        Self {
            window_size,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let BufferMode::Bounded(0) = self.buffer_mode {
            return Err(PipelineError::ConfigError(
                "buffer capacity must be greater than zero".into(),
            ));
        }
        if self.workers_per_cpu == 0 {
            return Err(PipelineError::ConfigError(
                "workers per cpu must be greater than zero".into(),
            ));
        }
        if self.idle_poll.is_zero() {
            return Err(PipelineError::ConfigError(
                "idle poll interval must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// Producer threads to spawn for `sources` sources.
    /// Never more than there are sources, never fewer than one.
    pub fn worker_count(&self, sources: usize) -> usize {
        let cpus = thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1);
        cpus.saturating_mul(self.workers_per_cpu)
            .min(sources)
            .max(1)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            window_size: WindowSize::default(),
            buffer_mode: BufferMode::default(),
            workers_per_cpu: DEFAULT_WORKERS_PER_CPU,
            idle_poll: DEFAULT_IDLE_POLL,
        }
    }
}
