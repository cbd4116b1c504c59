//! Service configuration
//!
//! Layers, lowest precedence first: built-in defaults, the YAML file,
//! `ARCML__SECTION__KEY` environment variables, `DATABASE_URL`, then CLI flags.

use arcml_analysis::{BatchSettings, DbConfig, JobSettings};
use arcml_models::ModelSettings;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file, read when present
pub const DEFAULT_CONFIG_FILE: &str = "arcml.yaml";

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Deployment environment reported by the health endpoint
    pub environment: String,

    pub server: ServerConfig,

    pub database: DbConfig,

    pub models: ModelSettings,

    pub processing: BatchSettings,

    pub jobs: JobSettings,

    pub logging: LoggingConfig,

    pub cors: CorsConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            server: ServerConfig::default(),
            database: DbConfig::default(),
            models: ModelSettings::default(),
            processing: BatchSettings::default(),
            jobs: JobSettings::default(),
            logging: LoggingConfig::default(),
            cors: CorsConfig::default(),
        }
    }
}

/// Values that take precedence over every other layer
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl AppConfig {
    /// Load configuration from file, environment and overrides
    ///
    /// A missing file is only an error when `config_path` was given explicitly.
    pub fn load(config_path: Option<&str>, overrides: &ConfigOverrides) -> anyhow::Result<Self> {
        let (path, required) = match config_path {
            Some(path) => (path, true),
            None => (DEFAULT_CONFIG_FILE, false),
        };
        if required && !Path::new(path).exists() {
            anyhow::bail!("Configuration file not found: {}", path);
        }

        let settings = Config::builder()
            .add_source(Config::try_from(&Self::default())?)
            .add_source(File::new(path, FileFormat::Yaml).required(required))
            .add_source(
                Environment::with_prefix("ARCML")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("cors.allowed_origins"),
            )
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .set_override_option("server.host", overrides.host.clone())?
            .set_override_option("server.port", overrides.port.map(i64::from))?
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the batchers cannot work with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.processing.max_batch_size == 0 {
            anyhow::bail!("processing.max_batch_size must be greater than 0");
        }
        if self.processing.max_text_length == 0 {
            anyhow::bail!("processing.max_text_length must be greater than 0");
        }
        if self.database.max_connections == 0 {
            anyhow::bail!("database.max_connections must be greater than 0");
        }
        if self.database.min_connections > self.database.max_connections {
            anyhow::bail!("database.min_connections exceeds database.max_connections");
        }
        if self.cors.allowed_origins.iter().any(|o| o.trim() == "*") {
            anyhow::bail!(
                "cors.allowed_origins must list explicit origins; \"*\" cannot be combined with credentials"
            );
        }
        if self.jobs.timeout_secs == Some(0) {
            anyhow::bail!("jobs.timeout_secs must be greater than 0 when set");
        }
        Ok(())
    }

    /// Socket address string the server binds to
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive for the service crates
    pub level: String,

    /// Output format
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line
    #[default]
    Json,
    /// Human-readable multi-line output
    Pretty,
}

/// Cross-origin settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Origins allowed to call the API
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:4000".to_string(),
            ],
        }
    }
}
