//! SQLite-backed warehouse.
//!
//! A single connection carries every statement of a run. The first write after
//! opening (or after a commit) opens a transaction; `commit` closes it.

use super::models::*;
use super::schema::WAREHOUSE_VERSIONED_SCHEMAS;
use super::trait_def::Warehouse;
use anyhow::{Context, Result};
use rusqlite::{params, types::Type, Connection, OpenFlags, Row};
use std::path::Path;
use tracing::{debug, info, warn};

pub struct SqliteWarehouse {
    conn: Connection,
    unit_open: bool,
}

fn prepare_schema(conn: &Connection, recreate: bool) -> Result<()> {
    let schema = &WAREHOUSE_VERSIONED_SCHEMAS[WAREHOUSE_VERSIONED_SCHEMAS.len() - 1];

    if recreate {
        info!("Dropping warehouse tables");
        schema.drop(conn)?;
    }

    if schema.is_absent(conn)? {
        info!("Creating warehouse schema at version {}", schema.version);
        schema.create(conn)?;
        return Ok(());
    }

    schema
        .validate(conn)
        .context("Existing database does not match the warehouse schema")
}

fn level_from_row(row: &Row, idx: usize) -> rusqlite::Result<Level> {
    let raw: String = row.get(idx)?;
    Level::from_str(&raw).ok_or(rusqlite::Error::InvalidColumnType(
        idx,
        "level".to_string(),
        Type::Text,
    ))
}

impl SqliteWarehouse {
    /// Opens (creating if needed) the warehouse database at `db_path`.
    ///
    /// A database without the warehouse tables gets them created; one that
    /// has them is validated. With `recreate_schema` the tables are dropped first.
    pub fn open<P: AsRef<Path>>(db_path: P, recreate_schema: bool) -> Result<Self> {
        let conn = Connection::open_with_flags(
            db_path.as_ref(),
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("Failed to open warehouse database {:?}", db_path.as_ref()))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Self::from_connection(conn, recreate_schema)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?, false)
    }

    fn from_connection(conn: Connection, recreate_schema: bool) -> Result<Self> {
        prepare_schema(&conn, recreate_schema)?;
        Ok(SqliteWarehouse {
            conn,
            unit_open: false,
        })
    }

    fn begin_unit(&mut self) -> Result<()> {
        if !self.unit_open {
            self.conn.execute_batch("BEGIN")?;
            self.unit_open = true;
        }
        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn get_song(&self, song_id: &str) -> Result<Option<Song>> {
        match self.conn.query_row(
            "SELECT song_id, title, artist_id, year, duration FROM songs WHERE song_id = ?1",
            params![song_id],
            |row| {
                Ok(Song {
                    song_id: row.get(0)?,
                    title: row.get(1)?,
                    artist_id: row.get(2)?,
                    year: row.get(3)?,
                    duration: row.get(4)?,
                })
            },
        ) {
            Ok(song) => Ok(Some(song)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_artist(&self, artist_id: &str) -> Result<Option<Artist>> {
        match self.conn.query_row(
            "SELECT artist_id, name, location, latitude, longitude FROM artists WHERE artist_id = ?1",
            params![artist_id],
            |row| {
                Ok(Artist {
                    artist_id: row.get(0)?,
                    name: row.get(1)?,
                    location: row.get(2)?,
                    latitude: row.get(3)?,
                    longitude: row.get(4)?,
                })
            },
        ) {
            Ok(artist) => Ok(Some(artist)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        match self.conn.query_row(
            "SELECT user_id, first_name, last_name, gender, level FROM users WHERE user_id = ?1",
            params![user_id],
            |row| {
                let gender: Option<String> = row.get(3)?;
                Ok(User {
                    user_id: row.get(0)?,
                    first_name: row.get(1)?,
                    last_name: row.get(2)?,
                    gender: gender.as_deref().and_then(Gender::from_str),
                    level: level_from_row(row, 4)?,
                })
            },
        ) {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_time(&self, start_time: &str) -> Result<Option<TimeRow>> {
        match self.conn.query_row(
            "SELECT start_time, hour, day, week, month, year, weekday FROM time WHERE start_time = ?1",
            params![start_time],
            |row| {
                Ok(TimeRow {
                    start_time: row.get(0)?,
                    hour: row.get(1)?,
                    day: row.get(2)?,
                    week: row.get(3)?,
                    month: row.get(4)?,
                    year: row.get(5)?,
                    weekday: row.get(6)?,
                })
            },
        ) {
            Ok(time) => Ok(Some(time)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// All songplays in insertion order.
    pub fn get_songplays(&self) -> Result<Vec<Songplay>> {
        let mut stmt = self.conn.prepare(
            "SELECT songplay_id, start_time, user_id, level, song_id, artist_id,
                    session_id, location, user_agent
             FROM songplays
             ORDER BY songplay_id ASC",
        )?;
        let songplays = stmt
            .query_map([], |row| {
                Ok(Songplay {
                    songplay_id: row.get(0)?,
                    start_time: row.get(1)?,
                    user_id: row.get(2)?,
                    level: level_from_row(row, 3)?,
                    song_id: row.get(4)?,
                    artist_id: row.get(5)?,
                    session_id: row.get(6)?,
                    location: row.get(7)?,
                    user_agent: row.get(8)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(songplays)
    }

    fn count(&self, table: &str) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))
            .with_context(|| format!("Failed to count rows of {}", table))?;
        Ok(count as usize)
    }
}

impl Warehouse for SqliteWarehouse {
    fn insert_song(&mut self, song: &Song) -> Result<bool> {
        self.begin_unit()?;
        let inserted = self
            .conn
            .prepare_cached(
                "INSERT INTO songs (song_id, title, artist_id, year, duration)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(song_id) DO NOTHING",
            )?
            .execute(params![
                song.song_id,
                song.title,
                song.artist_id,
                song.year,
                song.duration
            ])
            .with_context(|| format!("Failed to insert song {}", song.song_id))?;
        Ok(inserted > 0)
    }

    fn insert_artist(&mut self, artist: &Artist) -> Result<bool> {
        self.begin_unit()?;
        let inserted = self
            .conn
            .prepare_cached(
                "INSERT INTO artists (artist_id, name, location, latitude, longitude)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(artist_id) DO NOTHING",
            )?
            .execute(params![
                artist.artist_id,
                artist.name,
                artist.location,
                artist.latitude,
                artist.longitude
            ])
            .with_context(|| format!("Failed to insert artist {}", artist.artist_id))?;
        Ok(inserted > 0)
    }

    fn upsert_user(&mut self, user: &User) -> Result<()> {
        self.begin_unit()?;
        self.conn
            .prepare_cached(
                "INSERT INTO users (user_id, first_name, last_name, gender, level)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(user_id) DO UPDATE SET level = excluded.level",
            )?
            .execute(params![
                user.user_id,
                user.first_name,
                user.last_name,
                user.gender.map(|g| g.as_str()),
                user.level.as_str()
            ])
            .with_context(|| format!("Failed to upsert user {}", user.user_id))?;
        Ok(())
    }

    fn insert_time(&mut self, time: &TimeRow) -> Result<bool> {
        self.begin_unit()?;
        let inserted = self
            .conn
            .prepare_cached(
                "INSERT INTO time (start_time, hour, day, week, month, year, weekday)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(start_time) DO NOTHING",
            )?
            .execute(params![
                time.start_time,
                time.hour,
                time.day,
                time.week,
                time.month,
                time.year,
                time.weekday
            ])
            .with_context(|| format!("Failed to insert time {}", time.start_time))?;
        Ok(inserted > 0)
    }

    fn insert_songplay(&mut self, songplay: &NewSongplay) -> Result<i64> {
        self.begin_unit()?;
        let (song_id, artist_id) = match &songplay.keys {
            Some(keys) => (Some(keys.song_id.as_str()), Some(keys.artist_id.as_str())),
            None => (None, None),
        };
        self.conn
            .prepare_cached(
                "INSERT INTO songplays (start_time, user_id, level, song_id, artist_id,
                                        session_id, location, user_agent)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?
            .execute(params![
                songplay.start_time,
                songplay.user_id,
                songplay.level.as_str(),
                song_id,
                artist_id,
                songplay.session_id,
                songplay.location,
                songplay.user_agent
            ])
            .context("Failed to insert songplay")?;
        Ok(self.conn.last_insert_rowid())
    }

    fn find_song_artist(
        &mut self,
        title: &str,
        artist_name: &str,
        duration: f64,
    ) -> Result<Option<SongArtistKeys>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT s.song_id, s.artist_id
             FROM songs s
             JOIN artists a ON s.artist_id = a.artist_id
             WHERE s.title = ?1 AND a.name = ?2 AND s.duration = ?3
             ORDER BY s.song_id ASC, a.artist_id ASC
             LIMIT 1",
        )?;
        match stmt.query_row(params![title, artist_name, duration], |row| {
            Ok(SongArtistKeys {
                song_id: row.get(0)?,
                artist_id: row.get(1)?,
            })
        }) {
            Ok(keys) => Ok(Some(keys)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn all_song_artist_pairs(&mut self) -> Result<Vec<(String, String, f64, SongArtistKeys)>> {
        let mut stmt = self.conn.prepare(
            "SELECT s.title, a.name, s.duration, s.song_id, s.artist_id
             FROM songs s
             JOIN artists a ON s.artist_id = a.artist_id",
        )?;
        let pairs = stmt
            .query_map([], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    SongArtistKeys {
                        song_id: row.get(3)?,
                        artist_id: row.get(4)?,
                    },
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(pairs)
    }

    fn commit(&mut self) -> Result<()> {
        if self.unit_open {
            self.conn
                .execute_batch("COMMIT")
                .context("Failed to commit unit of work")?;
            self.unit_open = false;
            debug!("Committed unit of work");
        }
        Ok(())
    }

    fn counts(&mut self) -> Result<TableCounts> {
        Ok(TableCounts {
            songs: self.count("songs")?,
            artists: self.count("artists")?,
            users: self.count("users")?,
            time: self.count("time")?,
            songplays: self.count("songplays")?,
        })
    }
}

impl Drop for SqliteWarehouse {
    fn drop(&mut self) {
        if self.unit_open {
            warn!("Discarding uncommitted warehouse writes");
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                warn!("Rollback failed: {}", e);
            }
        }
    }
}
