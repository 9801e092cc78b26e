//! Sliding-window maximum over numbers streamed concurrently from many sources.
//!
//! A pool of producer threads reads sources in parallel and pushes every
//! decoded value into one shared buffer. A single consumer drains the buffer,
//! tags each value with its arrival index and feeds it to an amortized O(1)
//! sliding-window-maximum engine, emitting one `(value, window max)` pair per
//! value in processing order.
//!
//! # Features
//!
//! - Monotonic-deque window engine, single-threaded by construction
//! - crossbeam channel as the shared buffer, unbounded or bounded
//! - Completion detected by channel disconnection, never by spinning
//! - Per-source failure isolation with a run-level report
//! - Consumer metrics: throughput and window-advance latency percentiles
//!
//! # Example
//!
//! ```ignore
//! use window_max::{CollectSink, MemorySource, PipelineBuilder, Source};
//!
//! let pipeline = PipelineBuilder::new().window_size(3).build()?;
//! let sources: Vec<Box<dyn Source>> = vec![
//!     Box::new(MemorySource::new("a", vec![1.0, 4.0, 2.0])),
//! ];
//!
//! let mut sink = CollectSink::new();
//! let report = pipeline.run(sources, &mut sink)?;
//! assert_eq!(report.processed, 3);
//! ```

pub mod buffer;
pub mod config;
pub mod consumer;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod producer;
pub mod sequencer;
pub mod sink;
pub mod source;
pub mod window;

// Re-exports for convenience
pub use buffer::{BufferReader, BufferStats, BufferWriter, Pop, SharedBuffer};
pub use config::{BufferMode, PipelineConfig, WindowSize};
pub use consumer::{ConsumerLoop, ConsumerState};
pub use error::{PipelineError, Result};
pub use metrics::{ConsumerMetrics, MetricsSnapshot};
pub use pipeline::{Pipeline, PipelineBuilder, RunReport};
pub use producer::{PoolHandle, ProducerPool, SourceOutcome, SourceReport};
pub use sequencer::Sequencer;
pub use sink::{CollectSink, OutputSink, WriterSink};
pub use source::{prepare_sources, FileSource, MemorySource, Source, Tokens, ValueStream};
pub use window::{ValueItem, WindowEngine};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
