use crate::error::{PipelineError, Result};
use std::io::Write;

/// Receives one (value, window max) pair per processed item, in processing order
pub trait OutputSink: Send {
    /// Accept the next result
    fn emit(&mut self, value: f64, max: f64) -> Result<()>;

    /// Called once after the last result
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }

    /// Get a human-readable name for this sink
    fn name(&self) -> &str {
        "sink"
    }
}

impl<S: OutputSink + ?Sized> OutputSink for &mut S {
    fn emit(&mut self, value: f64, max: f64) -> Result<()> {
        (**self).emit(value, max)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Writes `<value> <max>` lines to any writer
pub struct WriterSink<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> OutputSink for WriterSink<W> {
    fn emit(&mut self, value: f64, max: f64) -> Result<()> {
        writeln!(self.writer, "{:?} {:?}", value, max)
            .map_err(|e| PipelineError::Sink(e.to_string()))
    }

    fn finish(&mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| PipelineError::Sink(e.to_string()))
    }

    fn name(&self) -> &str {
        "writer"
    }
}

/// Keeps every result in memory
#[derive(Debug, Default, Clone)]
pub struct CollectSink {
    results: Vec<(f64, f64)>,
}

impl CollectSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn results(&self) -> &[(f64, f64)] {
        &self.results
    }

    /// Window maxima in processing order
    pub fn maxima(&self) -> Vec<f64> {
        self.results.iter().map(|&(_, max)| max).collect()
    }

    /// Input values in processing order
    pub fn values(&self) -> Vec<f64> {
        self.results.iter().map(|&(value, _)| value).collect()
    }

    pub fn into_results(self) -> Vec<(f64, f64)> {
        self.results
    }
}

impl OutputSink for CollectSink {
    fn emit(&mut self, value: f64, max: f64) -> Result<()> {
        self.results.push((value, max));
        Ok(())
    }

    fn name(&self) -> &str {
        "collect"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writer_sink_format() {
        let mut sink = WriterSink::new(Vec::new());
        sink.emit(86.99, 86.99).unwrap();
        sink.emit(-44.31, 31.4).unwrap();
        sink.emit(5.0, 7.0).unwrap();
        sink.finish().unwrap();

        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(text, "86.99 86.99\n-44.31 31.4\n5.0 7.0\n");
    }

    #[test]
    fn test_writer_sink_surfaces_write_errors() {
        struct Closed;
        impl Write for Closed {
            fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
                Err(std::io::ErrorKind::BrokenPipe.into())
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let mut sink = WriterSink::new(Closed);
        assert!(matches!(sink.emit(1.0, 1.0), Err(PipelineError::Sink(_))));
    }

    #[test]
    fn test_collect_sink() {
        let mut sink = CollectSink::new();
        sink.emit(1.0, 3.0).unwrap();
        sink.emit(2.0, 3.0).unwrap();
        assert_eq!(sink.values(), vec![1.0, 2.0]);
        assert_eq!(sink.maxima(), vec![3.0, 3.0]);
        assert_eq!(sink.results().len(), 2);
    }
}
