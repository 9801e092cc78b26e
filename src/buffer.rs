use crate::config::BufferMode;
use crate::error::{PipelineError, Result};
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Counters shared by every handle of one buffer
#[derive(Debug, Default)]
struct BufferCounters {
    pushed: AtomicU64,
    blocks: AtomicU64,
    lost: AtomicU64,
}

/// The multi-producer/single-consumer queue between the producer pool and
/// the consumer loop.
///
/// Splits into any number of [`BufferWriter`]s and exactly one
/// [`BufferReader`]. Completion is the channel disconnecting: once the last
/// writer is dropped and every queued value has been delivered, the reader
/// reports [`Pop::Drained`].
pub struct SharedBuffer;

impl SharedBuffer {
    /// Create a buffer in the given capacity mode
    #[allow(clippy::new_ret_no_self)]
    pub fn new(mode: BufferMode) -> (BufferWriter, BufferReader) {
        let (sender, receiver) = match mode {
            BufferMode::Unbounded => channel::unbounded(),
            BufferMode::Bounded(capacity) => channel::bounded(capacity),
        };
        let counters = Arc::new(BufferCounters::default());
        (
            BufferWriter {
                sender,
                counters: Arc::clone(&counters),
            },
            BufferReader { receiver, counters },
        )
    }
}

/// Producer-side handle. Cloned once per producer worker.
#[derive(Debug, Clone)]
pub struct BufferWriter {
    sender: Sender<f64>,
    counters: Arc<BufferCounters>,
}

impl BufferWriter {
    /// Push a value, waiting for room if the buffer is bounded and full.
    ///
    /// Fails with [`PipelineError::BufferClosed`] when the reader is gone;
    /// the value is lost and counted.
    pub fn push(&self, value: f64) -> Result<()> {
        match self.sender.try_send(value) {
            Ok(()) => {}
            Err(TrySendError::Full(value)) => {
                self.counters.blocks.fetch_add(1, Ordering::Relaxed);
                if self.sender.send(value).is_err() {
                    return Err(self.lose());
                }
            }
            Err(TrySendError::Disconnected(_)) => return Err(self.lose()),
        }
        self.counters.pushed.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn lose(&self) -> PipelineError {
        self.counters.lost.fetch_add(1, Ordering::Relaxed);
        PipelineError::BufferClosed
    }

    pub fn stats(&self) -> BufferStats {
        BufferStats::read(&self.counters)
    }
}

/// Outcome of a single pop attempt
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pop {
    /// A value left the buffer
    Value(f64),
    /// Nothing arrived within the wait, producers are still active
    Idle,
    /// Every writer is gone and the buffer is empty
    Drained,
}

/// Consumer-side handle. There is only ever one.
#[derive(Debug)]
pub struct BufferReader {
    receiver: Receiver<f64>,
    counters: Arc<BufferCounters>,
}

impl BufferReader {
    /// Wait up to `wait` for the next value.
    ///
    /// [`Pop::Drained`] is only returned after all queued values were
    /// delivered, so a value enqueued concurrently with the last writer
    /// dropping is never skipped.
    pub fn pop(&self, wait: Duration) -> Pop {
        match self.receiver.recv_timeout(wait) {
            Ok(value) => Pop::Value(value),
            Err(RecvTimeoutError::Timeout) => Pop::Idle,
            Err(RecvTimeoutError::Disconnected) => Pop::Drained,
        }
    }

    /// Take a value if one is queued right now
    pub fn try_pop(&self) -> Option<f64> {
        self.receiver.try_recv().ok()
    }

    /// Get the current number of queued values
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Capacity, `None` when unbounded
    pub fn capacity(&self) -> Option<usize> {
        self.receiver.capacity()
    }

    /// Fill level of a bounded buffer as a percentage (0-100)
    pub fn utilization(&self) -> Option<u32> {
        self.capacity()
            .map(|cap| ((self.len() * 100) / cap.max(1)).min(100) as u32)
    }

    pub fn stats(&self) -> BufferStats {
        BufferStats::read(&self.counters)
    }
}

/// Point-in-time buffer counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BufferStats {
    /// Values successfully enqueued
    pub pushed: u64,
    /// Pushes that had to wait for room
    pub blocks: u64,
    /// Values dropped because the reader was gone
    pub lost: u64,
}

impl BufferStats {
    fn read(counters: &BufferCounters) -> Self {
        Self {
            pushed: counters.pushed.load(Ordering::Relaxed),
            blocks: counters.blocks.load(Ordering::Relaxed),
            lost: counters.lost.load(Ordering::Relaxed),
        }
    }
}
