use anyhow::{Context, Result};
use clap::Parser;
use sparkify_etl::config::{AppConfig, CliConfig, FileConfig};
use sparkify_etl::pipeline::LookupStrategy;
use sparkify_etl::{run_etl, SqliteWarehouse};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(name = "sparkify-etl")]
#[command(about = "Load song metadata and listening logs into a songplay star schema")]
struct CliArgs {
    /// Path to a TOML config file. Its values override the flags below.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Path to the SQLite warehouse database file.
    #[clap(long, value_parser = parse_path)]
    pub db: Option<PathBuf>,

    /// Root directory of the song metadata corpus.
    #[clap(long, value_parser = parse_path)]
    pub song_data: Option<PathBuf>,

    /// Root directory of the listening log corpus.
    #[clap(long, value_parser = parse_path)]
    pub log_data: Option<PathBuf>,

    /// Extension of the input files.
    #[clap(long, default_value = "json")]
    pub extension: String,

    /// How songplays are joined to the song and artist tables.
    #[clap(long, value_enum, default_value_t = LookupStrategy::Query)]
    pub lookup: LookupStrategy,

    /// Drop and recreate the warehouse tables before loading.
    #[clap(long, default_value_t = false)]
    pub recreate_schema: bool,

    /// Do not draw progress bars.
    #[clap(long, default_value_t = false)]
    pub no_progress: bool,
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    let cli_config = CliConfig {
        db_path: cli_args.db,
        song_data: cli_args.song_data,
        log_data: cli_args.log_data,
        extension: cli_args.extension,
        lookup: cli_args.lookup,
        recreate_schema: cli_args.recreate_schema,
        show_progress: !cli_args.no_progress,
    };
    let config = AppConfig::resolve(&cli_config, file_config)?;

    info!("Opening warehouse database at {:?}...", config.db_path);
    let mut warehouse = SqliteWarehouse::open(&config.db_path, config.recreate_schema)?;

    let started = Instant::now();
    run_etl(&mut warehouse, &config)?;
    info!("Load completed in {:.1}s", started.elapsed().as_secs_f64());

    Ok(())
}
