//! Warehouse trait definition.
//!
//! The pipelines talk to the store only through this trait, so the loading
//! semantics can be exercised against any backend holding the five tables.

use super::models::{Artist, NewSongplay, Song, SongArtistKeys, TableCounts, TimeRow, User};
use anyhow::Result;

/// Write-side of the star schema plus the fact-join lookup.
///
/// Every write joins the current unit of work; nothing is durable until
/// [`Warehouse::commit`] returns.
pub trait Warehouse {
    // =========================================================================
    // Dimension Writes
    // =========================================================================

    /// Inserts a song. An existing `song_id` is left untouched.
    /// Returns true if a row was inserted.
    fn insert_song(&mut self, song: &Song) -> Result<bool>;

    /// Inserts an artist. An existing `artist_id` is left untouched.
    /// Returns true if a row was inserted.
    fn insert_artist(&mut self, artist: &Artist) -> Result<bool>;

    /// Inserts a user, or overwrites only the `level` of an existing `user_id`.
    fn upsert_user(&mut self, user: &User) -> Result<()>;

    /// Inserts a time row. An existing `start_time` is left untouched.
    /// Returns true if a row was inserted.
    fn insert_time(&mut self, time: &TimeRow) -> Result<bool>;

    // =========================================================================
    // Facts
    // =========================================================================

    /// Inserts a songplay and returns its generated `songplay_id`.
    fn insert_songplay(&mut self, songplay: &NewSongplay) -> Result<i64>;

    /// Finds the song/artist pair matching title, artist name and exact duration.
    ///
    /// At most one pair is returned; among several candidates the lowest
    /// `song_id` (then `artist_id`) wins.
    fn find_song_artist(
        &mut self,
        title: &str,
        artist_name: &str,
        duration: f64,
    ) -> Result<Option<SongArtistKeys>>;

    /// Every (title, artist name, duration) -> keys candidate, for joining in memory.
    fn all_song_artist_pairs(&mut self) -> Result<Vec<(String, String, f64, SongArtistKeys)>>;

    // =========================================================================
    // Unit of Work
    // =========================================================================

    /// Makes every write since the previous commit durable.
    fn commit(&mut self) -> Result<()>;

    fn counts(&mut self) -> Result<TableCounts>;
}
