use common::config::{JobsConfig, MqAppConfig, SummarizerConfig};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    #[serde(default)]
    pub allow_origins: Vec<String>,
    #[serde(default = "default_cors_max_age")]
    pub max_age: u64,
}

fn default_cors_max_age() -> u64 {
    3600
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origins: Vec::new(),
            max_age: default_cors_max_age(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub cors: CorsConfig,
    /// Largest accepted JSON body. Uploads are capped by `summarizer.max_upload_bytes`.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    3000
}
fn default_max_body_bytes() -> usize {
    2 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors: CorsConfig::default(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_url() -> String {
    "sqlite://summarizer.db?mode=rwc".into()
}
fn default_max_connections() -> u32 {
    10
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// HS256 signing key. Startup fails when empty.
    #[serde(default)]
    pub jwt_secret: String,
    /// Default: 60.
    #[serde(default = "default_token_ttl_minutes")]
    pub token_ttl_minutes: i64,
}

fn default_token_ttl_minutes() -> i64 {
    60
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_minutes: default_token_ttl_minutes(),
        }
    }
}

/// Where rate limit counters live.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RateLimitBackend {
    /// Per-process counters. Limits are not shared between server replicas.
    #[default]
    Memory,
    /// Sliding window in Redis, shared by every replica.
    Redis,
}

/// What to do when the rate limit backend cannot be reached.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FailureMode {
    /// Let the request through and log a warning.
    Open,
    /// Reject the request with 503.
    Closed,
}

/// Limit for one endpoint class.
#[derive(Debug, Deserialize, Clone)]
pub struct ClassLimit {
    #[serde(default = "default_limit_enabled")]
    pub enabled: bool,
    /// Requests allowed per client within `window_secs`.
    pub requests: u32,
    pub window_secs: u64,
    pub failure_mode: FailureMode,
}

fn default_limit_enabled() -> bool {
    true
}

fn default_auth_limit() -> ClassLimit {
    ClassLimit {
        enabled: true,
        requests: 10,
        window_secs: 60,
        failure_mode: FailureMode::Closed,
    }
}

fn default_api_limit() -> ClassLimit {
    ClassLimit {
        enabled: true,
        requests: 120,
        window_secs: 60,
        failure_mode: FailureMode::Open,
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitConfig {
    #[serde(default)]
    pub backend: RateLimitBackend,
    /// Default: "redis://localhost:6379".
    #[serde(default = "default_rate_limit_redis_url")]
    pub redis_url: String,
    /// Register and login. Fails closed by default.
    #[serde(default = "default_auth_limit")]
    pub auth: ClassLimit,
    /// Every other `/api` route. Fails open by default.
    #[serde(default = "default_api_limit")]
    pub api: ClassLimit,
}

fn default_rate_limit_redis_url() -> String {
    "redis://localhost:6379".into()
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            backend: RateLimitBackend::default(),
            redis_url: default_rate_limit_redis_url(),
            auth: default_auth_limit(),
            api: default_api_limit(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Per-user quota reported by the storage endpoint. Default: 100 MiB.
    #[serde(default = "default_storage_limit")]
    pub limit_bytes: i64,
}

fn default_storage_limit() -> i64 {
    100 * 1024 * 1024
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            limit_bytes: default_storage_limit(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub mq: MqAppConfig,
    #[serde(default)]
    pub jobs: JobsConfig,
    #[serde(default)]
    pub summarizer: SummarizerConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., SUMMARIZER__AUTH__JWT_SECRET)
            .add_source(Environment::with_prefix("SUMMARIZER").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
