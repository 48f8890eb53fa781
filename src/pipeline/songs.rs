//! Song metadata pipeline: one JSON record per file, split into a song row
//! and an artist row.

use super::batch::FileSummary;
use super::error::PipelineError;
use crate::warehouse::{Artist, Song, Warehouse};
use anyhow::Result;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// Raw song metadata record as found in the song corpus.
#[derive(Debug, Clone, Deserialize)]
pub struct SongRecord {
    pub song_id: String,
    pub title: String,
    pub artist_id: String,
    pub year: i64,
    pub duration: f64,
    pub artist_name: String,
    #[serde(default)]
    pub artist_location: Option<String>,
    #[serde(default)]
    pub artist_latitude: Option<f64>,
    #[serde(default)]
    pub artist_longitude: Option<f64>,
}

impl SongRecord {
    pub fn song(&self) -> Song {
        Song {
            song_id: self.song_id.clone(),
            title: self.title.clone(),
            artist_id: self.artist_id.clone(),
            year: self.year,
            duration: self.duration,
        }
    }

    pub fn artist(&self) -> Artist {
        Artist {
            artist_id: self.artist_id.clone(),
            name: self.artist_name.clone(),
            location: self.artist_location.clone(),
            latitude: self.artist_latitude,
            longitude: self.artist_longitude,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SongFileSummary {
    pub songs_inserted: usize,
    pub artists_inserted: usize,
    /// Rows whose key already existed and were left untouched.
    pub duplicates: usize,
}

impl FileSummary for SongFileSummary {
    fn merge(&mut self, other: Self) {
        self.songs_inserted += other.songs_inserted;
        self.artists_inserted += other.artists_inserted;
        self.duplicates += other.duplicates;
    }
}

/// Reads the first JSON record of a song file. Anything after it is ignored.
pub fn read_song_record(path: &Path) -> Result<SongRecord, PipelineError> {
    let content = std::fs::read_to_string(path).map_err(|source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut records = serde_json::Deserializer::from_str(&content).into_iter::<SongRecord>();
    match records.next() {
        Some(Ok(record)) => Ok(record),
        Some(Err(source)) => Err(PipelineError::Json {
            path: path.to_path_buf(),
            line: source.line(),
            source,
        }),
        None => Err(PipelineError::EmptyFile(path.to_path_buf())),
    }
}

/// Loads one song metadata file into the songs and artists tables.
pub fn process_song_file(warehouse: &mut dyn Warehouse, path: &Path) -> Result<SongFileSummary> {
    let record = read_song_record(path)?;
    let mut summary = SongFileSummary::default();

    if warehouse.insert_song(&record.song())? {
        summary.songs_inserted += 1;
    } else {
        debug!("Song {} already loaded", record.song_id);
        summary.duplicates += 1;
    }

    if warehouse.insert_artist(&record.artist())? {
        summary.artists_inserted += 1;
    } else {
        debug!("Artist {} already loaded", record.artist_id);
        summary.duplicates += 1;
    }

    Ok(summary)
}
