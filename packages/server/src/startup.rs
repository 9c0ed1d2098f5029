use std::sync::Arc;
use std::time::Duration;

use common::config::MqBackend;
use mq::{BroccoliJobQueue, JobQueue, MemoryQueue, MemoryReceiver};
use sea_orm::DatabaseConnection;
use summarizer::{SummarizerRegistry, UrlFetcher};
use tracing::{info, warn};
use worker::JobRunner;

use crate::config::AppConfig;
use crate::dispatcher::Dispatcher;
use crate::rate_limit::RateLimits;
use crate::state::AppState;

/// Everything `main` needs once the shared components are wired.
pub struct Started {
    pub state: AppState,
    /// Present with the memory backend; drive it with
    /// [`worker::consumer::consume_memory`].
    pub memory_receiver: Option<MemoryReceiver>,
    pub runner: Arc<JobRunner>,
}

/// Construct the registry, runner, queue and limiters from configuration.
///
/// A Redis queue that cannot be reached at startup is logged and left out,
/// so every job runs inline until the server restarts.
pub async fn build_state(config: AppConfig, db: DatabaseConnection) -> anyhow::Result<Started> {
    let registry = Arc::new(SummarizerRegistry::from_config(&config.summarizer)?);
    let runner = Arc::new(JobRunner::new(
        db.clone(),
        Arc::clone(&registry),
        Arc::new(UrlFetcher::new(config.summarizer.fetch.clone())),
        format!("{}-server", config.jobs.worker_id),
        Duration::from_secs(config.jobs.lease_secs),
        Duration::from_secs(config.summarizer.request_timeout_secs),
    ));

    let mut memory_receiver = None;
    let queue: Option<Arc<dyn JobQueue>> = if !config.mq.enabled {
        info!("MQ disabled, jobs run inline");
        None
    } else {
        match config.mq.backend {
            MqBackend::Memory => {
                let (queue, receiver) = MemoryQueue::new();
                memory_receiver = Some(receiver);
                info!("Using in-process job queue");
                Some(Arc::new(queue))
            }
            MqBackend::Redis => match mq::connect(&config.mq).await {
                Ok(mq) => {
                    info!(queue_name = %config.mq.queue_name, "MQ connected");
                    Some(Arc::new(BroccoliJobQueue::new(
                        Arc::new(mq),
                        config.mq.queue_name.clone(),
                    )))
                }
                Err(e) => {
                    warn!(error = %e, "MQ unavailable, jobs will run inline");
                    None
                }
            },
        }
    };

    let rate_limits = Arc::new(RateLimits::from_config(&config.rate_limit)?);
    let dispatcher = Arc::new(Dispatcher::new(db.clone(), queue, Arc::clone(&runner)));

    Ok(Started {
        state: AppState {
            db,
            config: Arc::new(config),
            dispatcher,
            registry,
            rate_limits,
        },
        memory_receiver,
        runner,
    })
}
