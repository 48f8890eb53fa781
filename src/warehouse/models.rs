//! Row types of the songplay star schema.

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::Deserialize;
use std::fmt;

/// Subscription plan of a user at the time of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Free,
    Paid,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Free => "free",
            Level::Paid => "paid",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "free" => Some(Level::Free),
            "paid" => Some(Level::Paid),
            _ => None,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Gender {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "M",
            Gender::Female => "F",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "M" => Some(Gender::Male),
            "F" => Some(Gender::Female),
            _ => None,
        }
    }
}

/// Song dimension row.
#[derive(Debug, Clone, PartialEq)]
pub struct Song {
    pub song_id: String,
    pub title: String,
    pub artist_id: String,
    /// 0 means unknown
    pub year: i64,
    /// Seconds
    pub duration: f64,
}

/// Artist dimension row.
#[derive(Debug, Clone, PartialEq)]
pub struct Artist {
    pub artist_id: String,
    pub name: String,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// User dimension row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub gender: Option<Gender>,
    pub level: Level,
}

/// Time dimension row, keyed by the rendered `start_time`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeRow {
    pub start_time: String,
    pub hour: u32,
    pub day: u32,
    /// ISO-8601 week number, 1..=53
    pub week: u32,
    pub month: u32,
    pub year: i32,
    /// Monday = 0 .. Sunday = 6
    pub weekday: u32,
}

/// Format used for `start_time` keys: UTC, millisecond precision.
pub const START_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

impl TimeRow {
    /// Derives the calendar fields of an absolute timestamp.
    pub fn from_datetime(timestamp: &DateTime<Utc>) -> Self {
        TimeRow {
            start_time: timestamp.format(START_TIME_FORMAT).to_string(),
            hour: timestamp.hour(),
            day: timestamp.day(),
            week: timestamp.iso_week().week(),
            month: timestamp.month(),
            year: timestamp.year(),
            weekday: timestamp.weekday().num_days_from_monday(),
        }
    }

    /// Returns None when `millis` is outside the representable range.
    pub fn from_epoch_millis(millis: i64) -> Option<Self> {
        DateTime::<Utc>::from_timestamp_millis(millis).map(|ts| Self::from_datetime(&ts))
    }
}

/// Keys of a song/artist pair resolved by the fact-join lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongArtistKeys {
    pub song_id: String,
    pub artist_id: String,
}

/// Songplay fact row, before the surrogate key is assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSongplay {
    pub start_time: String,
    pub user_id: i64,
    pub level: Level,
    /// Both set or both absent.
    pub keys: Option<SongArtistKeys>,
    pub session_id: i64,
    pub location: String,
    pub user_agent: String,
}

/// Songplay fact row as stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Songplay {
    pub songplay_id: i64,
    pub start_time: String,
    pub user_id: i64,
    pub level: Level,
    pub song_id: Option<String>,
    pub artist_id: Option<String>,
    pub session_id: i64,
    pub location: Option<String>,
    pub user_agent: Option<String>,
}

/// Row counts of every table in the warehouse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableCounts {
    pub songs: usize,
    pub artists: usize,
    pub users: usize,
    pub time: usize,
    pub songplays: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_row_from_epoch_millis() {
        // 2018-11-02 01:25:34.796 UTC, a Friday
        let row = TimeRow::from_epoch_millis(1541121934796).unwrap();
        assert_eq!(row.start_time, "2018-11-02 01:25:34.796");
        assert_eq!(row.hour, 1);
        assert_eq!(row.day, 2);
        assert_eq!(row.week, 44);
        assert_eq!(row.month, 11);
        assert_eq!(row.year, 2018);
        assert_eq!(row.weekday, 4);
    }

    #[test]
    fn test_time_row_iso_week_crosses_calendar_year() {
        // 2018-12-31 is a Monday in ISO week 1 of 2019
        let row = TimeRow::from_epoch_millis(1546214400000).unwrap();
        assert_eq!(row.start_time, "2018-12-31 00:00:00.000");
        assert_eq!(row.year, 2018);
        assert_eq!(row.week, 1);
        assert_eq!(row.weekday, 0);
    }

    #[test]
    fn test_time_row_out_of_range() {
        assert!(TimeRow::from_epoch_millis(i64::MAX).is_none());
    }

    #[test]
    fn test_level_and_gender_strings() {
        assert_eq!(Level::from_str("paid"), Some(Level::Paid));
        assert_eq!(Level::from_str("gold"), None);
        assert_eq!(Level::Free.to_string(), "free");
        assert_eq!(Gender::from_str("F"), Some(Gender::Female));
        assert_eq!(Gender::Male.as_str(), "M");
        assert_eq!(Gender::from_str("X"), None);
    }

    #[test]
    fn test_level_and_gender_deserialize_from_log_values() {
        let level: Level = serde_json::from_str("\"paid\"").unwrap();
        assert_eq!(level, Level::Paid);
        let gender: Gender = serde_json::from_str("\"M\"").unwrap();
        assert_eq!(gender, Gender::Male);
        assert!(serde_json::from_str::<Gender>("\"Male\"").is_err());
    }
}
