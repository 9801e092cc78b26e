use crate::error::{PipelineError, Result};
use log::debug;
use std::fs::File;
use std::io::{BufRead, BufReader, Split};
use std::path::{Path, PathBuf};

/// Stream of decoded values from one opened source
pub type ValueStream = Box<dyn Iterator<Item = Result<f64>> + Send>;

/// Something a producer worker can drain into the shared buffer
pub trait Source: Send + 'static {
    /// Identifier used in logs and reports
    fn id(&self) -> &str;

    /// Open the source for reading.
    /// The stream ends at the first token that is not a number.
    fn open(&self) -> Result<ValueStream>;
}

/// A whitespace-separated text file of numbers
#[derive(Debug, Clone)]
pub struct FileSource {
    id: String,
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        Self {
            id: path.display().to_string(),
            path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Source for FileSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn open(&self) -> Result<ValueStream> {
        let file = File::open(&self.path).map_err(|e| PipelineError::SourceUnavailable {
            source_id: self.id.clone(),
            reason: e.to_string(),
        })?;
        Ok(Box::new(Tokens::new(self.id.clone(), BufReader::new(file))))
    }
}

/// A fixed list of values held in memory
#[derive(Debug, Clone)]
pub struct MemorySource {
    id: String,
    values: Vec<f64>,
}

impl MemorySource {
    pub fn new(id: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            id: id.into(),
            values,
        }
    }
}

impl Source for MemorySource {
    fn id(&self) -> &str {
        &self.id
    }

    fn open(&self) -> Result<ValueStream> {
        Ok(Box::new(self.values.clone().into_iter().map(Ok)))
    }
}

/// Turn source identifiers into file sources, keeping their order
pub fn prepare_sources<I, S>(identifiers: I) -> Vec<Box<dyn Source>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<Path>,
{
    identifiers
        .into_iter()
        .map(|id| Box::new(FileSource::new(id)) as Box<dyn Source>)
        .collect()
}

/// Numeric tokenizer over buffered text.
///
/// Tokens are split on ASCII whitespace, across line breaks. Iteration stops
/// for good at the first token that does not parse as a number; NaN and
/// bytes that are not UTF-8 count as not a number. A read failure is yielded
/// once as [`PipelineError::SourceRead`] and also ends the stream.
pub struct Tokens<R> {
    source_id: String,
    lines: Split<R>,
    pending: std::vec::IntoIter<Vec<u8>>,
    finished: bool,
}

impl<R: BufRead> Tokens<R> {
    pub fn new(source_id: impl Into<String>, reader: R) -> Self {
        Self {
            source_id: source_id.into(),
            lines: reader.split(b'\n'),
            pending: Vec::new().into_iter(),
            finished: false,
        }
    }
}

impl<R: BufRead> Iterator for Tokens<R> {
    type Item = Result<f64>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            if let Some(token) = self.pending.next() {
                return match parse_token(&token) {
                    Some(value) => Some(Ok(value)),
                    None => {
                        debug!(
                            "Source {} stopped at non-numeric token {:?}",
                            self.source_id,
                            String::from_utf8_lossy(&token)
                        );
                        self.finished = true;
                        None
                    }
                };
            }

            match self.lines.next() {
                Some(Ok(line)) => {
                    self.pending = line
                        .split(u8::is_ascii_whitespace)
                        .filter(|token| !token.is_empty())
                        .map(<[u8]>::to_vec)
                        .collect::<Vec<_>>()
                        .into_iter();
                }
                Some(Err(e)) => {
                    self.finished = true;
                    return Some(Err(PipelineError::SourceRead {
                        source_id: self.source_id.clone(),
                        reason: e.to_string(),
                    }));
                }
                None => {
                    self.finished = true;
                    return None;
                }
            }
        }
    }
}

fn parse_token(token: &[u8]) -> Option<f64> {
    std::str::from_utf8(token)
        .ok()?
        .parse::<f64>()
        .ok()
        .filter(|value| !value.is_nan())
}
