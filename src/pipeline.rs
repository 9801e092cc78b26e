use crate::buffer::{BufferStats, SharedBuffer};
use crate::config::{BufferMode, PipelineConfig, WindowSize};
use crate::consumer::ConsumerLoop;
use crate::error::Result;
use crate::metrics::{ConsumerMetrics, MetricsSnapshot};
use crate::producer::{ProducerPool, SourceReport};
use crate::sink::OutputSink;
use crate::source::Source;
use log::{debug, info, warn};
use std::time::Duration;

/// Builder for constructing pipelines
#[derive(Debug, Clone, Default)]
pub struct PipelineBuilder {
    config: PipelineConfig,
}

impl PipelineBuilder {
    /// Create a new pipeline builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the window size; values below 1 are clamped to 1
    pub fn window_size(mut self, size: i64) -> Self {
        self.config.window_size = WindowSize::new(size);
        self
    }

    pub fn buffer_mode(mut self, mode: BufferMode) -> Self {
        self.config.buffer_mode = mode;
        self
    }

    /// Bound the shared buffer; producers wait while it is full
    pub fn bounded(self, capacity: usize) -> Self {
        self.buffer_mode(BufferMode::Bounded(capacity))
    }

    pub fn workers_per_cpu(mut self, workers: usize) -> Self {
        self.config.workers_per_cpu = workers;
        self
    }

    pub fn idle_poll(mut self, idle_poll: Duration) -> Self {
        self.config.idle_poll = idle_poll;
        self
    }

    /// Replace every setting at once
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the pipeline
    pub fn build(self) -> Result<Pipeline> {
        self.config.validate()?;
        Ok(Pipeline {
            config: self.config,
            metrics: ConsumerMetrics::new(),
        })
    }
}

/// Sliding-window-maximum pipeline: producer pool, shared buffer and one consumer
pub struct Pipeline {
    config: PipelineConfig,
    metrics: ConsumerMetrics,
}

impl Pipeline {
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Live metrics handle, readable from another thread during `run`
    pub fn metrics(&self) -> ConsumerMetrics {
        self.metrics.clone()
    }

    /// Drain every source through the window engine into `sink`.
    ///
    /// Blocks the calling thread, which becomes the consumer, until all
    /// producers finished and the buffer is empty. Source failures end up in
    /// the report; only a sink failure or a failed thread spawn is returned
    /// as an error.
    pub fn run<S: OutputSink>(&self, sources: Vec<Box<dyn Source>>, sink: S) -> Result<RunReport> {
        let (writer, reader) = SharedBuffer::new(self.config.buffer_mode);

        // consumer is Draining before any producer starts
        let mut consumer = ConsumerLoop::new(reader, self.config.window_size, sink)
            .with_idle_poll(self.config.idle_poll)
            .with_metrics(self.metrics.clone());

        let workers = self.config.worker_count(sources.len());
        debug!(
            "Starting {} producers for {} sources, window size {}, {:?} buffer",
            workers,
            sources.len(),
            self.config.window_size.get(),
            self.config.buffer_mode
        );
        let pool = ProducerPool::new(workers).start(sources, writer)?;

        let consumed = consumer.run();
        let buffer = consumer.buffer_stats();
        // closes the buffer so producers blocked on a full one can exit
        drop(consumer);

        let sources = pool.join();
        let processed = consumed?;

        let report = RunReport {
            processed,
            sources,
            buffer,
            metrics: self.metrics.snapshot(),
        };
        if !report.is_complete() {
            warn!(
                "Processed {} of {} ingested values",
                report.processed,
                report.ingested()
            );
        }
        Ok(report)
    }
}

/// Outcome of one pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// Items emitted to the sink
    pub processed: u64,
    /// One entry per source, in the order the sources were given
    pub sources: Vec<SourceReport>,
    pub buffer: BufferStats,
    pub metrics: MetricsSnapshot,
}

impl RunReport {
    /// Values pushed into the buffer across all sources
    pub fn ingested(&self) -> u64 {
        self.sources.iter().map(|s| s.pushed).sum()
    }

    pub fn failed_sources(&self) -> impl Iterator<Item = &SourceReport> {
        self.sources.iter().filter(|s| s.is_failed())
    }

    /// Every ingested value was processed
    pub fn is_complete(&self) -> bool {
        self.processed == self.ingested()
    }

    /// Write the report to the log at info level
    pub fn log(&self) {
        info!(
            "Run finished: {} processed, {} ingested from {} sources ({} failed)",
            self.processed,
            self.ingested(),
            self.sources.len(),
            self.failed_sources().count()
        );
        info!(
            "Buffer: {} pushed, {} blocked pushes, {} lost",
            self.buffer.pushed, self.buffer.blocks, self.buffer.lost
        );
        info!("{}", self.metrics.format());
        for source in self.failed_sources() {
            info!("  {}: {:?} after {} values", source.source_id, source.outcome, source.pushed);
        }
    }
}
