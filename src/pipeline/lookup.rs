//! Fact-join lookup: resolves a log record's (song, artist, length) to the
//! song/artist keys of the dimension tables.

use crate::warehouse::{SongArtistKeys, Warehouse};
use anyhow::Result;
use clap::ValueEnum;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::info;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupStrategy {
    /// One query per qualifying event.
    #[default]
    Query,
    /// Load every song/artist pair up front and join in memory.
    Preload,
}

/// Exact-match key. Durations compare by bit pattern, with -0.0 folded into 0.0.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PairKey {
    title: String,
    artist_name: String,
    duration_bits: u64,
}

impl PairKey {
    fn new(title: &str, artist_name: &str, duration: f64) -> Self {
        let duration = if duration == 0.0 { 0.0 } else { duration };
        PairKey {
            title: title.to_string(),
            artist_name: artist_name.to_string(),
            duration_bits: duration.to_bits(),
        }
    }
}

pub enum SongLookup {
    Query,
    Preloaded(HashMap<PairKey, SongArtistKeys>),
}

impl SongLookup {
    pub fn build(strategy: LookupStrategy, warehouse: &mut dyn Warehouse) -> Result<Self> {
        match strategy {
            LookupStrategy::Query => Ok(SongLookup::Query),
            LookupStrategy::Preload => {
                let mut index: HashMap<PairKey, SongArtistKeys> = HashMap::new();
                for (title, artist_name, duration, keys) in warehouse.all_song_artist_pairs()? {
                    let key = PairKey::new(&title, &artist_name, duration);
                    let replace = index.get(&key).map_or(true, |existing| {
                        (&keys.song_id, &keys.artist_id) < (&existing.song_id, &existing.artist_id)
                    });
                    if replace {
                        index.insert(key, keys);
                    }
                }
                info!("Preloaded {} song/artist pairs for lookup", index.len());
                Ok(SongLookup::Preloaded(index))
            }
        }
    }

    /// Returns the matching keys, or None when nothing in the dimensions matches.
    pub fn resolve(
        &self,
        warehouse: &mut dyn Warehouse,
        title: &str,
        artist_name: &str,
        duration: f64,
    ) -> Result<Option<SongArtistKeys>> {
        match self {
            SongLookup::Query => warehouse.find_song_artist(title, artist_name, duration),
            SongLookup::Preloaded(index) => Ok(index
                .get(&PairKey::new(title, artist_name, duration))
                .cloned()),
        }
    }
}
