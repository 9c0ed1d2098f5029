use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

pub use common::config::{JobsConfig, MqAppConfig, SummarizerConfig};

/// Database settings the worker needs to claim and complete jobs.
#[derive(Debug, Deserialize, Clone)]
pub struct WorkerDatabaseConfig {
    /// Default: "sqlite://summarizer.db?mode=rwc".
    #[serde(default = "default_database_url")]
    pub url: String,
    /// Default: 5.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_url() -> String {
    "sqlite://summarizer.db?mode=rwc".into()
}
fn default_max_connections() -> u32 {
    5
}

impl Default for WorkerDatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

/// Standalone worker configuration. Shares the file layout with the server
/// so both processes can read the same `config/config.toml`.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct WorkerAppConfig {
    #[serde(default)]
    pub database: WorkerDatabaseConfig,
    #[serde(default)]
    pub mq: MqAppConfig,
    #[serde(default)]
    pub jobs: JobsConfig,
    #[serde(default)]
    pub summarizer: SummarizerConfig,
}

impl WorkerAppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("SUMMARIZER_CONFIG").unwrap_or_else(|_| "config/config".to_string());

        let s = Config::builder()
            .add_source(File::with_name(&config_path).required(false))
            .add_source(Environment::with_prefix("SUMMARIZER").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
