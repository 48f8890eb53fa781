//! Batch runner: applies a per-file handler to every input file under a root,
//! committing the warehouse after each file.

use super::error::PipelineError;
use crate::warehouse::Warehouse;
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::info;
use walkdir::WalkDir;

/// Per-file outcome that can be folded into a run total.
pub trait FileSummary: Default {
    fn merge(&mut self, other: Self);
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary<S> {
    pub files_found: usize,
    pub files_processed: usize,
    pub totals: S,
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// File extension to pick up, without the dot. Matched case-insensitively.
    pub extension: String,
    pub show_progress: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        BatchOptions {
            extension: "json".to_string(),
            show_progress: false,
        }
    }
}

/// Recursively lists every regular file under `root` with the given extension.
///
/// Symlinks are not followed. Within a directory entries are visited by file
/// name, so the order is stable across runs.
pub fn discover_files(root: &Path, extension: &str) -> Result<Vec<PathBuf>, PipelineError> {
    if !root.exists() {
        return Err(PipelineError::RootNotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(PipelineError::NotADirectory(root.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| root.to_path_buf());
            PipelineError::Io {
                path,
                source: e.into(),
            }
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let matches = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case(extension))
            .unwrap_or(false);
        if matches {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn progress_bar(total: usize, root: &Path, visible: bool) -> ProgressBar {
    let bar = ProgressBar::new(total as u64);
    if visible {
        bar.set_style(
            ProgressStyle::with_template(
                "{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}, ETA: {eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
        );
        bar.set_message(root.display().to_string());
    } else {
        bar.set_draw_target(ProgressDrawTarget::hidden());
    }
    bar
}

/// Runs `handler` once per discovered file, committing after each one.
///
/// The first failing file aborts the run. Its partial writes are left
/// uncommitted; files before it stay committed.
pub fn run_batch<S, F>(
    warehouse: &mut dyn Warehouse,
    root: &Path,
    options: &BatchOptions,
    mut handler: F,
) -> Result<BatchSummary<S>>
where
    S: FileSummary,
    F: FnMut(&mut dyn Warehouse, &Path) -> Result<S>,
{
    let files = discover_files(root, &options.extension)?;
    let total = files.len();
    info!("{} files found in {}", total, root.display());

    let bar = progress_bar(total, root, options.show_progress);
    let mut summary = BatchSummary {
        files_found: total,
        files_processed: 0,
        totals: S::default(),
    };

    for (index, file) in files.iter().enumerate() {
        let file_summary = handler(&mut *warehouse, file)
            .with_context(|| format!("Failed to process {}", file.display()))?;
        warehouse
            .commit()
            .with_context(|| format!("Failed to commit {}", file.display()))?;

        summary.totals.merge(file_summary);
        summary.files_processed += 1;
        bar.inc(1);
        bar.suspend(|| info!("{}/{} files processed.", index + 1, total));
    }
    bar.finish_and_clear();

    Ok(summary)
}
