use thiserror::Error;

/// Errors raised by the detection timeline library.
///
/// `InvalidFrameRate` and `Configuration` abort a run. `MalformedTimestamp` and
/// `MalformedRecord` are recoverable: callers exclude the offending record and
/// count it. An empty series is not an error at all.
#[derive(Error, Debug)]
pub enum TimelineError {
    #[error("invalid frame rate {0}: must be a finite number greater than zero")]
    InvalidFrameRate(f64),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("malformed timestamp '{0}'")]
    MalformedTimestamp(String),

    #[error("malformed record at line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    #[error("invalid frame: {0}")]
    Frame(String),

    #[error("detector error: {0}")]
    Detector(String),

    #[error("chart error: {0}")]
    Chart(String),
}

pub type Result<T> = std::result::Result<T, TimelineError>;
