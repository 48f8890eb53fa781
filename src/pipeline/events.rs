//! Listening-log pipeline.
//!
//! A log file holds one JSON event per line. Events with any null or missing
//! field are rejected, non-playback events are filtered out, and the survivors feed the
//! time and user dimensions and then the songplays fact table.

use super::batch::FileSummary;
use super::error::PipelineError;
use super::lookup::SongLookup;
use crate::warehouse::{Gender, Level, NewSongplay, TimeRow, User, Warehouse};
use anyhow::Result;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info};

/// `page` value of an actual song playback.
pub const NEXT_SONG_PAGE: &str = "NextSong";

/// `userId` shows up both as a number and as a (possibly empty) string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawUserId {
    Number(i64),
    Text(String),
}

/// A log line as written by the event collector. Every field may be absent.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLogEvent {
    ts: Option<i64>,
    page: Option<String>,
    user_id: Option<RawUserId>,
    first_name: Option<String>,
    last_name: Option<String>,
    gender: Option<Gender>,
    level: Option<Level>,
    song: Option<String>,
    artist: Option<String>,
    length: Option<f64>,
    session_id: Option<i64>,
    location: Option<String>,
    user_agent: Option<String>,
    /// Keys the loader does not consume. Still none of them may be null.
    #[serde(flatten)]
    rest: Map<String, Value>,
}

/// A log event with every field present.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    pub ts: i64,
    pub page: String,
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    pub level: Level,
    pub song: String,
    pub artist: String,
    pub length: f64,
    pub session_id: i64,
    pub location: String,
    pub user_agent: String,
}

impl LogEvent {
    pub fn is_playback(&self) -> bool {
        self.page == NEXT_SONG_PAGE
    }

    pub fn user(&self) -> User {
        User {
            user_id: self.user_id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            gender: Some(self.gender),
            level: self.level,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    MissingField(&'static str),
    NullField(String),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::MissingField(name) => write!(f, "missing field {}", name),
            RejectReason::NullField(name) => write!(f, "null field {}", name),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Validation {
    Valid(LogEvent),
    Rejected(RejectReason),
}

impl RawLogEvent {
    /// All fields must be present before anything is interpreted, so a
    /// partially empty line is a rejection even if its userId is garbage.
    fn validate(self, path: &Path, line: usize) -> Result<Validation, PipelineError> {
        macro_rules! require {
            ($value:expr, $name:literal) => {
                match $value {
                    Some(value) => value,
                    None => return Ok(Validation::Rejected(RejectReason::MissingField($name))),
                }
            };
        }

        let ts = require!(self.ts, "ts");
        let page = require!(self.page, "page");
        let raw_user_id = match self.user_id {
            Some(RawUserId::Text(ref s)) if s.trim().is_empty() => None,
            other => other,
        };
        let Some(raw_user_id) = raw_user_id else {
            return Ok(Validation::Rejected(RejectReason::MissingField("userId")));
        };
        let first_name = require!(self.first_name, "firstName");
        let last_name = require!(self.last_name, "lastName");
        let gender = require!(self.gender, "gender");
        let level = require!(self.level, "level");
        let song = require!(self.song, "song");
        let artist = require!(self.artist, "artist");
        let length = require!(self.length, "length");
        let session_id = require!(self.session_id, "sessionId");
        let location = require!(self.location, "location");
        let user_agent = require!(self.user_agent, "userAgent");
        if let Some((name, _)) = self.rest.iter().find(|(_, value)| value.is_null()) {
            return Ok(Validation::Rejected(RejectReason::NullField(name.clone())));
        }

        let user_id = match raw_user_id {
            RawUserId::Number(id) => id,
            RawUserId::Text(text) => {
                text.trim()
                    .parse::<i64>()
                    .map_err(|_| PipelineError::InvalidUserId {
                        path: path.to_path_buf(),
                        line,
                        value: text.clone(),
                    })?
            }
        };

        Ok(Validation::Valid(LogEvent {
            ts,
            page,
            user_id,
            first_name,
            last_name,
            gender,
            level,
            song,
            artist,
            length,
            session_id,
            location,
            user_agent,
        }))
    }
}

/// Parses and validates one log line. Type errors are fatal; missing values are not.
pub fn parse_log_line(text: &str, path: &Path, line: usize) -> Result<Validation, PipelineError> {
    let raw: RawLogEvent = serde_json::from_str(text).map_err(|source| PipelineError::Json {
        path: path.to_path_buf(),
        line,
        source,
    })?;
    raw.validate(path, line)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogFileSummary {
    pub records: usize,
    pub rejected: usize,
    /// Valid records that are not playback events.
    pub filtered_out: usize,
    pub time_rows_inserted: usize,
    pub users_upserted: usize,
    pub songplays_inserted: usize,
    pub lookup_hits: usize,
    pub lookup_misses: usize,
}

impl FileSummary for LogFileSummary {
    fn merge(&mut self, other: Self) {
        self.records += other.records;
        self.rejected += other.rejected;
        self.filtered_out += other.filtered_out;
        self.time_rows_inserted += other.time_rows_inserted;
        self.users_upserted += other.users_upserted;
        self.songplays_inserted += other.songplays_inserted;
        self.lookup_hits += other.lookup_hits;
        self.lookup_misses += other.lookup_misses;
    }
}

/// Reads a log file and returns its playback events in file order,
/// each paired with its derived time row.
pub fn read_playback_events(
    path: &Path,
    summary: &mut LogFileSummary,
) -> Result<Vec<(LogEvent, TimeRow)>, PipelineError> {
    let io_error = |source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    };
    let reader = BufReader::new(File::open(path).map_err(io_error)?);

    let mut events = Vec::new();
    for (index, text) in reader.lines().enumerate() {
        let text = text.map_err(io_error)?;
        let line = index + 1;
        if text.trim().is_empty() {
            continue;
        }
        summary.records += 1;

        let event = match parse_log_line(&text, path, line)? {
            Validation::Valid(event) => event,
            Validation::Rejected(reason) => {
                debug!("Rejected {}:{}: {}", path.display(), line, reason);
                summary.rejected += 1;
                continue;
            }
        };
        if !event.is_playback() {
            summary.filtered_out += 1;
            continue;
        }

        let time = TimeRow::from_epoch_millis(event.ts).ok_or(PipelineError::InvalidTimestamp {
            path: path.to_path_buf(),
            line,
            ts: event.ts,
        })?;
        events.push((event, time));
    }
    Ok(events)
}

/// Loads one log file: time rows, then users, then one songplay per playback event.
pub fn process_log_file(
    warehouse: &mut dyn Warehouse,
    path: &Path,
    lookup: &SongLookup,
) -> Result<LogFileSummary> {
    let mut summary = LogFileSummary::default();
    let events = read_playback_events(path, &mut summary)?;

    for (_, time) in &events {
        if warehouse.insert_time(time)? {
            summary.time_rows_inserted += 1;
        }
    }

    for (event, _) in &events {
        warehouse.upsert_user(&event.user())?;
        summary.users_upserted += 1;
    }

    for (event, time) in &events {
        let keys = lookup.resolve(warehouse, &event.song, &event.artist, event.length)?;
        if keys.is_some() {
            summary.lookup_hits += 1;
        } else {
            summary.lookup_misses += 1;
        }

        warehouse.insert_songplay(&NewSongplay {
            start_time: time.start_time.clone(),
            user_id: event.user_id,
            level: event.level,
            keys,
            session_id: event.session_id,
            location: event.location.clone(),
            user_agent: event.user_agent.clone(),
        })?;
        summary.songplays_inserted += 1;
    }

    if summary.rejected > 0 {
        info!(
            "{}: {} of {} records rejected for missing fields",
            path.display(),
            summary.rejected,
            summary.records
        );
    }

    Ok(summary)
}
