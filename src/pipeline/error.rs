use std::path::PathBuf;
use thiserror::Error;

/// Shape errors raised while reading input files. All of them abort the run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("IO error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed JSON in {path:?} at line {line}: {source}")]
    Json {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("No record found in {0:?}")]
    EmptyFile(PathBuf),

    #[error("Invalid userId {value:?} in {path:?} at line {line}")]
    InvalidUserId {
        path: PathBuf,
        line: usize,
        value: String,
    },

    #[error("Timestamp {ts} out of range in {path:?} at line {line}")]
    InvalidTimestamp { path: PathBuf, line: usize, ts: i64 },

    #[error("Input root not found: {0:?}")]
    RootNotFound(PathBuf),

    #[error("Input root is not a directory: {0:?}")]
    NotADirectory(PathBuf),
}
