//! Common test infrastructure
//!
//! Builds song and log corpora on disk and a warehouse on a temporary
//! database file. Tests should only import from this module.

mod constants;
mod fixtures;

pub use constants::*;
pub use fixtures::{log_line, song_json, TestCorpus};
