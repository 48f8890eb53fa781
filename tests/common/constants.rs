#![allow(dead_code)]

pub const SONG_ID: &str = "S1";
pub const SONG_TITLE: &str = "T";
pub const ARTIST_ID: &str = "A1";
pub const ARTIST_NAME: &str = "N";
pub const SONG_DURATION: f64 = 180.0;

/// 2018-11-02 01:25:34.796 UTC
pub const TS: i64 = 1541121934796;
pub const START_TIME: &str = "2018-11-02 01:25:34.796";

pub const USER_ID: i64 = 26;
