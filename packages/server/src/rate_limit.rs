use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;
use governor::clock::{Clock, DefaultClock};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use redis::aio::MultiplexedConnection;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::{ClassLimit, FailureMode, RateLimitBackend, RateLimitConfig};
use crate::error::AppError;
use crate::state::AppState;

const REDIS_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// The only ways a limiter check can fail. Callers map these to the class's
/// configured failure mode.
#[derive(Debug, Error)]
pub enum RateLimitError {
    #[error("rate limit backend unavailable: {0}")]
    Backend(String),

    #[error("invalid rate limit settings: {0}")]
    Config(String),
}

impl From<redis::RedisError> for RateLimitError {
    fn from(e: redis::RedisError) -> Self {
        RateLimitError::Backend(e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Limited { retry_after: u64 },
}

enum Backend {
    Memory(DefaultKeyedRateLimiter<String>),
    Redis(RedisWindow),
}

/// Limiter for one endpoint class, keyed by client address.
pub struct ClassLimiter {
    class: &'static str,
    settings: ClassLimit,
    backend: Backend,
}

impl ClassLimiter {
    pub fn new(
        class: &'static str,
        settings: ClassLimit,
        config: &RateLimitConfig,
    ) -> Result<Self, RateLimitError> {
        let requests = NonZeroU32::new(settings.requests)
            .ok_or_else(|| RateLimitError::Config(format!("{class}: requests must be > 0")))?;
        let window = Duration::from_secs(settings.window_secs);

        let backend = match config.backend {
            RateLimitBackend::Memory => {
                let quota = Quota::with_period(window / requests.get())
                    .ok_or_else(|| {
                        RateLimitError::Config(format!("{class}: window_secs must be > 0"))
                    })?
                    .allow_burst(requests);
                Backend::Memory(RateLimiter::keyed(quota))
            }
            RateLimitBackend::Redis => Backend::Redis(RedisWindow {
                client: redis::Client::open(config.redis_url.as_str())?,
                conn: Mutex::new(None),
                class,
                requests: requests.get(),
                window,
            }),
        };

        Ok(Self {
            class,
            settings,
            backend,
        })
    }

    pub fn enabled(&self) -> bool {
        self.settings.enabled
    }

    pub fn failure_mode(&self) -> FailureMode {
        self.settings.failure_mode
    }

    /// Count one request from `client` against the limit.
    pub async fn check(&self, client: &str) -> Result<Decision, RateLimitError> {
        match &self.backend {
            Backend::Memory(limiter) => match limiter.check_key(&client.to_string()) {
                Ok(()) => Ok(Decision::Allowed),
                Err(not_until) => {
                    let wait = not_until.wait_time_from(DefaultClock::default().now());
                    Ok(Decision::Limited {
                        retry_after: ceil_secs(wait.as_millis()),
                    })
                }
            },
            Backend::Redis(window) => window.check(client).await,
        }
    }

    /// Forget clients whose limit has fully replenished. Redis expires its
    /// own keys.
    pub fn prune(&self) {
        if let Backend::Memory(limiter) = &self.backend {
            limiter.retain_recent();
            limiter.shrink_to_fit();
        }
    }

    /// Clients currently held in memory.
    pub fn tracked_clients(&self) -> usize {
        match &self.backend {
            Backend::Memory(limiter) => limiter.len(),
            Backend::Redis(_) => 0,
        }
    }
}

/// Sliding window log kept in a Redis sorted set per class and client.
struct RedisWindow {
    client: redis::Client,
    conn: Mutex<Option<MultiplexedConnection>>,
    class: &'static str,
    requests: u32,
    window: Duration,
}

impl RedisWindow {
    async fn connection(&self) -> Result<MultiplexedConnection, RateLimitError> {
        let mut cached = self.conn.lock().await;
        if let Some(conn) = cached.as_ref() {
            return Ok(conn.clone());
        }
        let conn = tokio::time::timeout(
            REDIS_CONNECT_TIMEOUT,
            self.client.get_multiplexed_async_connection(),
        )
        .await
        .map_err(|_| RateLimitError::Backend("connection timed out".into()))??;
        *cached = Some(conn.clone());
        Ok(conn)
    }

    async fn check(&self, client: &str) -> Result<Decision, RateLimitError> {
        let key = format!("ratelimit:{}:{client}", self.class);
        let now_ms = Utc::now().timestamp_millis();
        let window_ms = self.window.as_millis() as i64;
        let member = format!("{now_ms}-{}", Uuid::new_v4());

        let mut conn = self.connection().await?;
        let result: redis::RedisResult<(u64, Vec<(String, f64)>)> = redis::pipe()
            .atomic()
            .zrembyscore(&key, 0, now_ms - window_ms)
            .ignore()
            .zadd(&key, &member, now_ms)
            .ignore()
            .zcard(&key)
            .zrange_withscores(&key, 0, 0)
            .expire(&key, self.window.as_secs().max(1) as i64)
            .ignore()
            .query_async(&mut conn)
            .await;

        let (count, oldest) = match result {
            Ok(reply) => reply,
            Err(e) => {
                // Drop the cached connection so the next request reconnects.
                *self.conn.lock().await = None;
                return Err(e.into());
            }
        };

        if count <= u64::from(self.requests) {
            return Ok(Decision::Allowed);
        }
        let oldest_ms = oldest.first().map(|(_, score)| *score as i64).unwrap_or(now_ms);
        let wait_ms = (oldest_ms + window_ms - now_ms).max(0) as u128;
        Ok(Decision::Limited {
            retry_after: ceil_secs(wait_ms),
        })
    }
}

fn ceil_secs(millis: u128) -> u64 {
    (millis.div_ceil(1000) as u64).max(1)
}

/// The limiters for each endpoint class.
pub struct RateLimits {
    pub auth: ClassLimiter,
    pub api: ClassLimiter,
}

impl RateLimits {
    pub fn from_config(config: &RateLimitConfig) -> Result<Self, RateLimitError> {
        Ok(Self {
            auth: ClassLimiter::new("auth", config.auth.clone(), config)?,
            api: ClassLimiter::new("api", config.api.clone(), config)?,
        })
    }

    pub fn prune(&self) {
        self.auth.prune();
        self.api.prune();
    }
}

/// Prune idle clients from the in-memory limiters until the task is aborted.
pub async fn run_pruner(limits: Arc<RateLimits>) {
    let mut interval = tokio::time::interval(PRUNE_INTERVAL);
    loop {
        interval.tick().await;
        limits.prune();
        debug!(
            auth = limits.auth.tracked_clients(),
            api = limits.api.tracked_clients(),
            "Pruned rate limiter state"
        );
    }
}

/// Limit register and login.
pub async fn limit_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client = client_key(&request);
    enforce(&state.rate_limits.auth, client).await?;
    Ok(next.run(request).await)
}

/// Limit every other API route.
pub async fn limit_api(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client = client_key(&request);
    enforce(&state.rate_limits.api, client).await?;
    Ok(next.run(request).await)
}

async fn enforce(limiter: &ClassLimiter, client: String) -> Result<(), AppError> {
    if !limiter.enabled() {
        return Ok(());
    }

    match limiter.check(&client).await {
        Ok(Decision::Allowed) => Ok(()),
        Ok(Decision::Limited { retry_after }) => {
            debug!(class = limiter.class, %client, retry_after, "Rate limit exceeded");
            Err(AppError::RateLimited { retry_after })
        }
        Err(e) => match limiter.failure_mode() {
            FailureMode::Open => {
                warn!(class = limiter.class, error = %e, "Rate limiter unavailable, allowing request");
                Ok(())
            }
            FailureMode::Closed => Err(AppError::ServiceUnavailable(format!(
                "{} rate limiter: {e}",
                limiter.class
            ))),
        },
    }
}

fn client_key(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".into())
}
