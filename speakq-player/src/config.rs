//! Configuration management
//!
//! Two-tier configuration:
//! 1. **TOML bootstrap**: database path, port, provider endpoints, logging
//!    (static, cannot change while running)
//! 2. **Database runtime**: volume, rate, voice and queue selection from
//!    the `settings` table, initialized with built-in defaults on first use
//!
//! Priority: command-line arguments > environment variables > TOML file >
//! database settings > built-in defaults.

use crate::error::{Error, Result};
use serde::Deserialize;
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

fn default_port() -> u16 {
    5775
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Bootstrap configuration loaded from the TOML file
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// Path to the SQLite database file
    pub database_path: PathBuf,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Synthesis provider
    pub synthesis: SynthesisConfig,

    /// Mark-consumed endpoint base URL; disabled when absent
    #[serde(default)]
    pub consumed_url: Option<String>,

    /// Optional normalization dictionary (JSON object file)
    #[serde(default)]
    pub lexicon_path: Option<PathBuf>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Synthesis provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SynthesisConfig {
    /// Provider base URL, e.g. `http://localhost:5880`
    pub base_url: String,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Runtime settings loaded from the database
///
/// Each getter initializes a missing key with its built-in default and
/// writes it back, so the settings table is self-seeding.
#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub volume_level: f32,
    pub playback_rate: f32,
    pub voice_id: String,
    pub selected_item_id: Option<String>,
}

impl RuntimeSettings {
    pub async fn load(pool: &SqlitePool) -> Result<Self> {
        let settings = Self {
            volume_level: crate::db::settings::get_volume(pool).await?,
            playback_rate: crate::db::settings::get_playback_rate(pool).await?,
            voice_id: crate::db::settings::get_voice(pool).await?,
            selected_item_id: crate::db::settings::load_selected_item(pool).await?,
        };

        info!("Loaded runtime settings from database");
        Ok(settings)
    }
}

/// Command-line configuration overrides
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub database_path: Option<PathBuf>,
    pub port: Option<u16>,
}

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: PathBuf,
    pub port: u16,
    pub synthesis: SynthesisConfig,
    pub consumed_url: Option<String>,
    pub lexicon_path: Option<PathBuf>,
    pub logging: LoggingConfig,
    pub db_pool: SqlitePool,
    pub runtime: RuntimeSettings,
}

impl Config {
    /// Load complete configuration from TOML and database
    pub async fn load(toml_path: &PathBuf, cli_overrides: ConfigOverrides) -> Result<Self> {
        let toml_str = tokio::fs::read_to_string(toml_path).await.map_err(|e| {
            Error::Config(format!("Failed to read config file {:?}: {}", toml_path, e))
        })?;

        let toml_config: TomlConfig = toml::from_str(&toml_str)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;

        info!("Loaded TOML configuration from {:?}", toml_path);

        let database_path = cli_overrides
            .database_path
            .unwrap_or(toml_config.database_path);
        let port = cli_overrides.port.unwrap_or(toml_config.port);

        let db_url = format!("sqlite:{}?mode=rwc", database_path.display());
        let db_pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .connect(&db_url)
            .await?;

        info!("Connected to database: {:?}", database_path);

        crate::db::init::init_schema(&db_pool).await?;
        crate::db::init::init_settings_defaults(&db_pool).await?;

        let runtime = RuntimeSettings::load(&db_pool).await?;

        Ok(Config {
            database_path,
            port,
            synthesis: toml_config.synthesis,
            consumed_url: toml_config.consumed_url,
            lexicon_path: toml_config.lexicon_path,
            logging: toml_config.logging,
            db_pool,
            runtime,
        })
    }
}
