mod file_config;

pub use file_config::FileConfig;

use crate::pipeline::{BatchOptions, LookupStrategy};
use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

pub const DEFAULT_DB_PATH: &str = "sparkify.db";
pub const DEFAULT_SONG_DATA: &str = "data/song_data";
pub const DEFAULT_LOG_DATA: &str = "data/log_data";
pub const DEFAULT_EXTENSION: &str = "json";

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub db_path: Option<PathBuf>,
    pub song_data: Option<PathBuf>,
    pub log_data: Option<PathBuf>,
    pub extension: String,
    pub lookup: LookupStrategy,
    pub recreate_schema: bool,
    pub show_progress: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        CliConfig {
            db_path: None,
            song_data: None,
            log_data: None,
            extension: DEFAULT_EXTENSION.to_string(),
            lookup: LookupStrategy::default(),
            recreate_schema: false,
            show_progress: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub song_data: PathBuf,
    pub log_data: PathBuf,
    pub extension: String,
    pub lookup: LookupStrategy,
    pub recreate_schema: bool,
    pub show_progress: bool,
}

fn require_dir(path: &Path, what: &str) -> Result<()> {
    if !path.exists() {
        bail!("{} directory does not exist: {:?}", what, path);
    }
    if !path.is_dir() {
        bail!("{} is not a directory: {:?}", what, path);
    }
    Ok(())
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_path = file
            .db_path
            .map(PathBuf::from)
            .or_else(|| cli.db_path.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            require_dir(parent, "Database")?;
        }

        let song_data = file
            .song_data
            .map(PathBuf::from)
            .or_else(|| cli.song_data.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SONG_DATA));
        require_dir(&song_data, "Song data")?;

        let log_data = file
            .log_data
            .map(PathBuf::from)
            .or_else(|| cli.log_data.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DATA));
        require_dir(&log_data, "Log data")?;

        let extension = file
            .extension
            .unwrap_or_else(|| cli.extension.clone())
            .trim_start_matches('.')
            .to_string();
        if extension.is_empty() {
            bail!("File extension must not be empty");
        }

        let lookup = file.lookup.unwrap_or(cli.lookup);

        let show_progress = file.progress.unwrap_or(cli.show_progress);

        Ok(Self {
            db_path,
            song_data,
            log_data,
            extension,
            lookup,
            recreate_schema: cli.recreate_schema,
            show_progress,
        })
    }

    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            extension: self.extension.clone(),
            show_progress: self.show_progress,
        }
    }
}
