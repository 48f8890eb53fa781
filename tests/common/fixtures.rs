#![allow(dead_code)]

use serde_json::{json, Value};
use sparkify_etl::config::{AppConfig, CliConfig};
use sparkify_etl::pipeline::LookupStrategy;
use sparkify_etl::SqliteWarehouse;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A metadata root, a log root and a database path inside one temp dir.
pub struct TestCorpus {
    pub dir: TempDir,
}

impl TestCorpus {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        fs::create_dir_all(dir.path().join("song_data")).unwrap();
        fs::create_dir_all(dir.path().join("log_data")).unwrap();
        TestCorpus { dir }
    }

    pub fn song_root(&self) -> PathBuf {
        self.dir.path().join("song_data")
    }

    pub fn log_root(&self) -> PathBuf {
        self.dir.path().join("log_data")
    }

    pub fn db_path(&self) -> PathBuf {
        self.dir.path().join("sparkify.db")
    }

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    pub fn add_song_file(&self, relative: &str, record: &Value) {
        Self::write(&self.song_root(), relative, &record.to_string());
    }

    pub fn add_log_file(&self, relative: &str, lines: &[Value]) {
        let content = lines
            .iter()
            .map(Value::to_string)
            .collect::<Vec<_>>()
            .join("\n");
        Self::write(&self.log_root(), relative, &content);
    }

    pub fn add_raw_log_file(&self, relative: &str, content: &str) {
        Self::write(&self.log_root(), relative, content);
    }

    pub fn config(&self, lookup: LookupStrategy) -> AppConfig {
        let cli = CliConfig {
            db_path: Some(self.db_path()),
            song_data: Some(self.song_root()),
            log_data: Some(self.log_root()),
            lookup,
            show_progress: false,
            ..Default::default()
        };
        AppConfig::resolve(&cli, None).expect("Failed to resolve test config")
    }

    pub fn open_warehouse(&self) -> SqliteWarehouse {
        SqliteWarehouse::open(self.db_path(), false).expect("Failed to open warehouse")
    }
}

pub fn song_json(
    song_id: &str,
    title: &str,
    artist_id: &str,
    artist_name: &str,
    duration: f64,
) -> Value {
    json!({
        "num_songs": 1,
        "song_id": song_id,
        "title": title,
        "artist_id": artist_id,
        "year": 2000,
        "duration": duration,
        "artist_name": artist_name,
        "artist_location": "L",
        "artist_latitude": 1.0,
        "artist_longitude": 2.0
    })
}

/// A playback event; `page` and the rest can be changed on the returned value.
pub fn log_line(song: &str, artist: &str, length: f64, ts: i64, level: &str) -> Value {
    json!({
        "artist": artist,
        "auth": "Logged In",
        "firstName": "Ryan",
        "gender": "M",
        "itemInSession": 0,
        "lastName": "Smith",
        "length": length,
        "level": level,
        "location": "San Jose-Sunnyvale-Santa Clara, CA",
        "method": "PUT",
        "page": "NextSong",
        "registration": 1541016707796.0,
        "sessionId": 583,
        "song": song,
        "status": 200,
        "ts": ts,
        "userAgent": "Mozilla/5.0 (X11; Linux x86_64)",
        "userId": "26"
    })
}
