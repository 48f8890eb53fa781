//! Top-level run: song metadata first, then the listening logs.

use crate::config::AppConfig;
use crate::pipeline::{
    process_log_file, process_song_file, run_batch, BatchSummary, LogFileSummary,
    SongFileSummary, SongLookup,
};
use crate::warehouse::{TableCounts, Warehouse};
use anyhow::{Context, Result};
use tracing::{info, warn};

#[derive(Debug, Clone, Default)]
pub struct EtlReport {
    pub songs: BatchSummary<SongFileSummary>,
    pub logs: BatchSummary<LogFileSummary>,
    pub counts: TableCounts,
}

/// Loads both corpora into `warehouse`, committing after every file.
///
/// Songplays are resolved against whatever the song pass (and any earlier
/// run) left in the dimensions.
pub fn run_etl(warehouse: &mut dyn Warehouse, config: &AppConfig) -> Result<EtlReport> {
    let options = config.batch_options();

    info!("Loading song metadata from {}", config.song_data.display());
    let songs = run_batch(warehouse, &config.song_data, &options, process_song_file)
        .context("Song metadata load failed")?;

    let lookup = SongLookup::build(config.lookup, warehouse)?;

    info!("Loading listening logs from {}", config.log_data.display());
    let logs = run_batch(warehouse, &config.log_data, &options, |w, path| {
        process_log_file(w, path, &lookup)
    })
    .context("Listening log load failed")?;

    let counts = warehouse.counts()?;
    let report = EtlReport {
        songs,
        logs,
        counts,
    };
    log_report(&report);
    Ok(report)
}

fn log_report(report: &EtlReport) {
    let logs = &report.logs.totals;
    info!("");
    info!("Load Summary");
    info!("============");
    info!(
        "Song files: {} ({} songs, {} artists inserted, {} duplicates)",
        report.songs.files_processed,
        report.songs.totals.songs_inserted,
        report.songs.totals.artists_inserted,
        report.songs.totals.duplicates
    );
    info!(
        "Log files: {} ({} records, {} playbacks, {} filtered out)",
        report.logs.files_processed, logs.records, logs.songplays_inserted, logs.filtered_out
    );
    if logs.rejected > 0 {
        warn!("Log records rejected for missing fields: {}", logs.rejected);
    }
    info!(
        "Song lookups: {} matched, {} unmatched",
        logs.lookup_hits, logs.lookup_misses
    );
    info!("");
    info!("Database contains:");
    info!("  {} songs", report.counts.songs);
    info!("  {} artists", report.counts.artists);
    info!("  {} users", report.counts.users);
    info!("  {} time rows", report.counts.time);
    info!("  {} songplays", report.counts.songplays);
}
