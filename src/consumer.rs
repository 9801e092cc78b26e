use crate::buffer::{BufferReader, BufferStats, Pop};
use crate::config::{WindowSize, DEFAULT_IDLE_POLL};
use crate::error::Result;
use crate::metrics::ConsumerMetrics;
use crate::sequencer::Sequencer;
use crate::sink::OutputSink;
use crate::window::WindowEngine;
use log::{debug, trace};
use std::time::{Duration, Instant};

/// Consumer loop state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    /// Pulling values; producers may still be active
    Draining,
    /// All producers finished and the buffer was empty. Terminal.
    Done,
}

/// The single consumer of the shared buffer.
///
/// Owns the sequencer and the window engine, so neither is reachable from
/// producer threads.
pub struct ConsumerLoop<S: OutputSink> {
    reader: BufferReader,
    sequencer: Sequencer,
    engine: WindowEngine,
    sink: S,
    metrics: ConsumerMetrics,
    idle_poll: Duration,
    state: ConsumerState,
}

impl<S: OutputSink> ConsumerLoop<S> {
    pub fn new(reader: BufferReader, window_size: WindowSize, sink: S) -> Self {
        Self {
            reader,
            sequencer: Sequencer::new(),
            engine: WindowEngine::new(window_size),
            sink,
            metrics: ConsumerMetrics::new(),
            idle_poll: DEFAULT_IDLE_POLL,
            state: ConsumerState::Draining,
        }
    }

    /// How long a single pop waits before the loop re-checks for completion
    pub fn with_idle_poll(mut self, idle_poll: Duration) -> Self {
        self.idle_poll = idle_poll;
        self
    }

    /// Record into an existing metrics handle
    pub fn with_metrics(mut self, metrics: ConsumerMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn state(&self) -> ConsumerState {
        self.state
    }

    pub fn metrics(&self) -> &ConsumerMetrics {
        &self.metrics
    }

    /// Items processed so far (last index + 1, or 0)
    pub fn total_processed(&self) -> u64 {
        self.sequencer.total()
    }

    /// Perform one pop and the transition it implies.
    ///
    /// An idle pop keeps the loop in `Draining`; only a drained buffer,
    /// meaning every writer is gone and nothing is queued, moves it to `Done`.
    pub fn step(&mut self) -> Result<ConsumerState> {
        if self.state == ConsumerState::Done {
            return Ok(ConsumerState::Done);
        }

        match self.reader.pop(self.idle_poll) {
            Pop::Value(value) => {
                let item = self.sequencer.assign(value);
                let start = Instant::now();
                let max = self.engine.advance(item);
                self.metrics
                    .record_processed(start.elapsed().as_nanos() as u64);
                self.sink.emit(value, max)?;
            }
            Pop::Idle => {
                self.metrics.record_idle_poll();
                trace!("Buffer idle after {} items", self.sequencer.total());
            }
            Pop::Drained => {
                debug!(
                    "Buffer drained, {} items processed",
                    self.sequencer.total()
                );
                self.state = ConsumerState::Done;
            }
        }

        Ok(self.state)
    }

    /// Drain until done, then finish the sink. Returns the processed count.
    pub fn run(&mut self) -> Result<u64> {
        self.metrics.mark_start();
        while self.step()? == ConsumerState::Draining {}
        self.sink.finish()?;
        Ok(self.total_processed())
    }

    pub fn buffer_stats(&self) -> BufferStats {
        self.reader.stats()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}
