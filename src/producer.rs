use crate::buffer::BufferWriter;
use crate::error::{PipelineError, Result};
use crate::source::Source;
use crossbeam::channel::{self, Receiver};
use log::{debug, error, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// How draining one source ended
#[derive(Debug, Clone, PartialEq)]
pub enum SourceOutcome {
    /// Read to the end (or to the first non-numeric token)
    Completed,
    /// Aborted; values pushed before the failure stay in the run
    Failed(PipelineError),
    /// Never opened because the consumer went away first
    Skipped,
}

/// Per-source result of a run
#[derive(Debug, Clone, PartialEq)]
pub struct SourceReport {
    pub source_id: String,
    /// Values this source got into the shared buffer
    pub pushed: u64,
    pub outcome: SourceOutcome,
}

impl SourceReport {
    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, SourceOutcome::Failed(_))
    }
}

type Job = (usize, Box<dyn Source>);
type Reports = Arc<Mutex<Vec<(usize, SourceReport)>>>;

/// Fixed-size pool of producer threads.
///
/// Sources are handed out from a shared job queue; each worker drains one
/// source at a time into the shared buffer and takes the next one until
/// none remain. A worker never signals completion itself: its clone of the
/// [`BufferWriter`] is dropped when it exits, and the buffer reports drained
/// once every clone is gone.
pub struct ProducerPool {
    workers: usize,
}

impl ProducerPool {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Spawn the workers and hand them `sources`.
    ///
    /// Takes the caller's writer by value so that only workers keep the
    /// buffer open.
    pub fn start(self, sources: Vec<Box<dyn Source>>, writer: BufferWriter) -> Result<PoolHandle> {
        let (job_tx, job_rx) = channel::unbounded::<Job>();
        for job in sources.into_iter().enumerate() {
            // receiver is alive, send cannot fail
            let _ = job_tx.send(job);
        }
        drop(job_tx);

        let reports: Reports = Arc::new(Mutex::new(Vec::new()));
        let mut handles = Vec::with_capacity(self.workers);

        for worker_idx in 0..self.workers {
            let jobs = job_rx.clone();
            let writer = writer.clone();
            let reports = Arc::clone(&reports);

            let handle = thread::Builder::new()
                .name(format!("producer-{}", worker_idx))
                .spawn(move || run_worker(jobs, writer, reports))
                .map_err(|e| PipelineError::ThreadError(e.to_string()))?;
            handles.push(handle);
        }

        Ok(PoolHandle {
            handles,
            reports,
            pending: job_rx,
        })
    }
}

fn run_worker(jobs: Receiver<Job>, writer: BufferWriter, reports: Reports) {
    for (position, source) in jobs.iter() {
        let report = drain_source(source.as_ref(), &writer);
        let consumer_gone = matches!(
            report.outcome,
            SourceOutcome::Failed(PipelineError::BufferClosed)
        );
        reports.lock().push((position, report));
        if consumer_gone {
            break;
        }
    }
}

/// Push every value of one source. Any failure ends this source only.
fn drain_source(source: &dyn Source, writer: &BufferWriter) -> SourceReport {
    let mut pushed = 0u64;
    let result = source.open().and_then(|stream| {
        for value in stream {
            writer.push(value?)?;
            pushed += 1;
        }
        Ok(())
    });

    let outcome = match result {
        Ok(()) => {
            debug!("Source {} drained, {} values", source.id(), pushed);
            SourceOutcome::Completed
        }
        Err(PipelineError::BufferClosed) => {
            warn!(
                "Source {} stopped after {} values: consumer gone, in-flight value lost",
                source.id(),
                pushed
            );
            SourceOutcome::Failed(PipelineError::BufferClosed)
        }
        Err(e) => {
            warn!("Source {} aborted after {} values: {}", source.id(), pushed, e);
            SourceOutcome::Failed(e)
        }
    };

    SourceReport {
        source_id: source.id().to_string(),
        pushed,
        outcome,
    }
}

/// Handle to a started pool
pub struct PoolHandle {
    handles: Vec<JoinHandle<()>>,
    reports: Reports,
    pending: Receiver<Job>,
}

impl PoolHandle {
    /// Wait for every worker and return one report per source, in source order.
    ///
    /// A worker panic is logged, not propagated; its in-progress source gets
    /// no report.
    pub fn join(self) -> Vec<SourceReport> {
        for handle in self.handles {
            let name = handle.thread().name().unwrap_or("producer").to_string();
            if handle.join().is_err() {
                error!("Worker {} panicked", name);
            }
        }

        let mut reports = std::mem::take(&mut *self.reports.lock());
        reports.extend(self.pending.try_iter().map(|(position, source)| {
            (
                position,
                SourceReport {
                    source_id: source.id().to_string(),
                    pushed: 0,
                    outcome: SourceOutcome::Skipped,
                },
            )
        }));
        reports.sort_by_key(|(position, _)| *position);
        reports.into_iter().map(|(_, report)| report).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{Pop, SharedBuffer};
    use crate::config::BufferMode;
    use crate::source::{FileSource, MemorySource};
    use std::time::Duration;

    fn memory_sources(count: usize, per_source: usize) -> Vec<Box<dyn Source>> {
        (0..count)
            .map(|s| {
                let values = (0..per_source).map(|v| (s * 1000 + v) as f64).collect();
                Box::new(MemorySource::new(format!("mem-{}", s), values)) as Box<dyn Source>
            })
            .collect()
    }

    fn drain(reader: &crate::buffer::BufferReader) -> Vec<f64> {
        let mut values = Vec::new();
        loop {
            match reader.pop(Duration::from_millis(20)) {
                Pop::Value(v) => values.push(v),
                Pop::Idle => continue,
                Pop::Drained => return values,
            }
        }
    }

    #[test]
    fn test_pool_pushes_every_value() {
        let (writer, reader) = SharedBuffer::new(BufferMode::Unbounded);
        let handle = ProducerPool::new(3)
            .start(memory_sources(5, 40), writer)
            .unwrap();

        let values = drain(&reader);
        let reports = handle.join();

        assert_eq!(values.len(), 200);
        assert_eq!(reports.len(), 5);
        assert!(reports
            .iter()
            .all(|r| r.outcome == SourceOutcome::Completed && r.pushed == 40));
    }

    #[test]
    fn test_per_source_order_preserved() {
        let (writer, reader) = SharedBuffer::new(BufferMode::Bounded(4));
        let handle = ProducerPool::new(2)
            .start(memory_sources(2, 100), writer)
            .unwrap();

        let values = drain(&reader);
        handle.join();

        for source in 0..2 {
            let from_source: Vec<f64> = values
                .iter()
                .copied()
                .filter(|v| (*v as usize) / 1000 == source)
                .collect();
            let expected: Vec<f64> = (0..100).map(|v| (source * 1000 + v) as f64).collect();
            assert_eq!(from_source, expected);
        }
    }

    #[test]
    fn test_missing_source_does_not_affect_siblings() {
        let (writer, reader) = SharedBuffer::new(BufferMode::Unbounded);
        let sources: Vec<Box<dyn Source>> = vec![
            Box::new(MemorySource::new("a", vec![1.0, 2.0])),
            Box::new(FileSource::new("/no/such/source")),
            Box::new(MemorySource::new("b", vec![3.0])),
        ];
        let handle = ProducerPool::new(2).start(sources, writer).unwrap();

        let values = drain(&reader);
        let reports = handle.join();

        assert_eq!(values.len(), 3);
        assert_eq!(reports[0].source_id, "a");
        assert!(reports[1].is_failed());
        assert!(matches!(
            reports[1].outcome,
            SourceOutcome::Failed(PipelineError::SourceUnavailable { .. })
        ));
        assert_eq!(reports[2].outcome, SourceOutcome::Completed);
    }

    #[test]
    fn test_consumer_gone_stops_workers() {
        let (writer, reader) = SharedBuffer::new(BufferMode::Unbounded);
        drop(reader);

        let handle = ProducerPool::new(1)
            .start(memory_sources(3, 10), writer)
            .unwrap();
        let reports = handle.join();

        assert_eq!(reports.len(), 3);
        assert_eq!(
            reports[0].outcome,
            SourceOutcome::Failed(PipelineError::BufferClosed)
        );
        assert_eq!(reports[0].pushed, 0);
        assert_eq!(reports[1].outcome, SourceOutcome::Skipped);
        assert_eq!(reports[2].outcome, SourceOutcome::Skipped);
    }

    #[test]
    fn test_empty_source_list_drains_immediately() {
        let (writer, reader) = SharedBuffer::new(BufferMode::Unbounded);
        let handle = ProducerPool::new(4).start(Vec::new(), writer).unwrap();
        assert!(drain(&reader).is_empty());
        assert!(handle.join().is_empty());
    }
}
