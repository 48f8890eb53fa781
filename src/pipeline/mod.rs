//! Extract-transform-load pipelines over the song and log corpora.

pub mod batch;
pub mod error;
pub mod events;
pub mod lookup;
pub mod songs;

pub use batch::{discover_files, run_batch, BatchOptions, BatchSummary, FileSummary};
pub use error::PipelineError;
pub use events::{process_log_file, LogEvent, LogFileSummary, RejectReason, Validation};
pub use lookup::{LookupStrategy, SongLookup};
pub use songs::{process_song_file, SongFileSummary, SongRecord};
