use thiserror::Error;

/// Result type for window-max operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that can occur while feeding or draining the window pipeline
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// A source could not be opened
    #[error("Source {source_id} unavailable: {reason}")]
    SourceUnavailable { source_id: String, reason: String },

    /// A source failed part way through reading
    #[error("Source {source_id} read failed: {reason}")]
    SourceRead { source_id: String, reason: String },

    /// The consumer side of the shared buffer is gone; the pushed value was lost
    #[error("Shared buffer closed, value lost")]
    BufferClosed,

    /// Output sink failed to accept a result
    #[error("Output sink error: {0}")]
    Sink(String),

    /// Thread spawn or join error
    #[error("Thread error: {0}")]
    ThreadError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl PipelineError {
    /// Whether the error is scoped to a single source
    pub fn is_source_error(&self) -> bool {
        matches!(
            self,
            PipelineError::SourceUnavailable { .. } | PipelineError::SourceRead { .. }
        )
    }
}
