use serde::Deserialize;

/// Which transport carries job messages.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MqBackend {
    /// Redis through broccoli_queue; consumed by the standalone worker.
    #[default]
    Redis,
    /// In-process channel consumed by a task inside the server.
    Memory,
}

/// App-level MQ configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct MqAppConfig {
    /// Whether MQ is enabled. When false every job runs inline. Default: true.
    /// Note: Worker ignores this field (always requires MQ).
    #[serde(default = "default_mq_enabled")]
    pub enabled: bool,
    /// Default: redis.
    #[serde(default)]
    pub backend: MqBackend,
    /// Redis connection URL. Default: "redis://localhost:6379".
    #[serde(default = "default_mq_url")]
    pub url: String,
    /// Connection pool size. Default: 5.
    #[serde(default = "default_mq_pool_size")]
    pub pool_size: u8,
    /// Queue the server publishes to and workers consume. Default: "summarize_jobs".
    #[serde(default = "default_mq_queue_name")]
    pub queue_name: String,
}

fn default_mq_enabled() -> bool {
    true
}
fn default_mq_url() -> String {
    "redis://localhost:6379".into()
}
fn default_mq_pool_size() -> u8 {
    5
}
fn default_mq_queue_name() -> String {
    "summarize_jobs".into()
}

impl Default for MqAppConfig {
    fn default() -> Self {
        Self {
            enabled: default_mq_enabled(),
            backend: MqBackend::default(),
            url: default_mq_url(),
            pool_size: default_mq_pool_size(),
            queue_name: default_mq_queue_name(),
        }
    }
}

/// Job lease and recovery settings, shared by the server and workers.
#[derive(Debug, Deserialize, Clone)]
pub struct JobsConfig {
    /// Identifier recorded on claimed jobs. Default: "worker-1".
    #[serde(default = "default_worker_id")]
    pub worker_id: String,
    /// How long a claim stays valid without a heartbeat. Default: 120.
    #[serde(default = "default_lease_secs")]
    pub lease_secs: u64,
    /// Claims allowed before an expired job is failed instead of redelivered. Default: 3.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: i32,
    /// Reaper scan period. Default: 30.
    #[serde(default = "default_reaper_interval_secs")]
    pub reaper_interval_secs: u64,
    /// Age after which a still-queued job is redelivered. Default: 300.
    #[serde(default = "default_stale_queued_secs")]
    pub stale_queued_secs: u64,
    /// Minimum gap between two redeliveries of a job nobody has claimed. Default: 300.
    #[serde(default = "default_redelivery_backoff_secs")]
    pub redelivery_backoff_secs: u64,
    /// Jobs a consumer processes concurrently. Default: 4.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_worker_id() -> String {
    "worker-1".into()
}
fn default_lease_secs() -> u64 {
    120
}
fn default_max_attempts() -> i32 {
    3
}
fn default_reaper_interval_secs() -> u64 {
    30
}
fn default_stale_queued_secs() -> u64 {
    300
}
fn default_redelivery_backoff_secs() -> u64 {
    300
}
fn default_concurrency() -> usize {
    4
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            worker_id: default_worker_id(),
            lease_secs: default_lease_secs(),
            max_attempts: default_max_attempts(),
            reaper_interval_secs: default_reaper_interval_secs(),
            stale_queued_secs: default_stale_queued_secs(),
            redelivery_backoff_secs: default_redelivery_backoff_secs(),
            concurrency: default_concurrency(),
        }
    }
}

/// A hosted, OpenAI-compatible chat completion provider.
#[derive(Debug, Deserialize, Clone)]
pub struct RemoteProviderConfig {
    /// Provider name used in requests, e.g. "together_ai".
    pub name: String,
    /// API root, e.g. "https://api.together.xyz/v1".
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Models this provider may be asked for.
    #[serde(default)]
    pub models: Vec<String>,
}

/// Remote URL fetch limits.
#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    /// Default: 10.
    #[serde(default = "default_fetch_timeout_secs")]
    pub timeout_secs: u64,
    /// Default: 5.
    #[serde(default = "default_dns_timeout_secs")]
    pub dns_timeout_secs: u64,
    /// Default: 5 MiB.
    #[serde(default = "default_fetch_max_bytes")]
    pub max_bytes: usize,
}

fn default_fetch_timeout_secs() -> u64 {
    10
}
fn default_dns_timeout_secs() -> u64 {
    5
}
fn default_fetch_max_bytes() -> usize {
    5 * 1024 * 1024
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout_secs(),
            dns_timeout_secs: default_dns_timeout_secs(),
            max_bytes: default_fetch_max_bytes(),
        }
    }
}

/// Summarization defaults and limits.
#[derive(Debug, Deserialize, Clone)]
pub struct SummarizerConfig {
    /// Default: 5.
    #[serde(default = "default_num_sentences")]
    pub default_num_sentences: u32,
    /// Default: 1.
    #[serde(default = "default_min_sentences")]
    pub min_sentences: u32,
    /// Default: 20.
    #[serde(default = "default_max_sentences")]
    pub max_sentences: u32,
    /// Default: "extractive".
    #[serde(default = "default_model")]
    pub default_model: String,
    /// Default: "local".
    #[serde(default = "default_provider")]
    pub default_provider: String,
    /// Whether the in-process provider may be used. Default: true.
    #[serde(default = "default_local_enabled")]
    pub local_enabled: bool,
    /// Upper bound on a single summarization call. Default: 60.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Largest accepted input text in bytes. Default: 1 MiB.
    #[serde(default = "default_max_input_bytes")]
    pub max_input_bytes: usize,
    /// Largest accepted upload in bytes. Default: 10 MiB.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    /// Accepted upload extensions. Default: txt, md, rst.
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub remote: Vec<RemoteProviderConfig>,
}

fn default_num_sentences() -> u32 {
    5
}
fn default_min_sentences() -> u32 {
    1
}
fn default_max_sentences() -> u32 {
    20
}
fn default_model() -> String {
    "extractive".into()
}
fn default_provider() -> String {
    "local".into()
}
fn default_local_enabled() -> bool {
    true
}
fn default_request_timeout_secs() -> u64 {
    60
}
fn default_max_input_bytes() -> usize {
    1024 * 1024
}
fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}
fn default_allowed_extensions() -> Vec<String> {
    vec!["txt".into(), "md".into(), "rst".into()]
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            default_num_sentences: default_num_sentences(),
            min_sentences: default_min_sentences(),
            max_sentences: default_max_sentences(),
            default_model: default_model(),
            default_provider: default_provider(),
            local_enabled: default_local_enabled(),
            request_timeout_secs: default_request_timeout_secs(),
            max_input_bytes: default_max_input_bytes(),
            max_upload_bytes: default_max_upload_bytes(),
            allowed_extensions: default_allowed_extensions(),
            fetch: FetchConfig::default(),
            remote: Vec::new(),
        }
    }
}
