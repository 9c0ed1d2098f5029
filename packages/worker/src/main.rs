use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use summarizer::{SummarizerRegistry, UrlFetcher};
use tracing::info;
use tracing_subscriber::EnvFilter;
use worker::JobRunner;
use worker::config::WorkerAppConfig;
use worker::consumer::consume_broker;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .init();

    let config = WorkerAppConfig::load().context("Failed to load config")?;
    info!(worker_id = %config.jobs.worker_id, "Worker starting");

    let db = store::init_db(&config.database.url, config.database.max_connections)
        .await
        .context("Failed to connect to database")?;

    let mq = Arc::new(
        mq::connect(&config.mq)
            .await
            .context("Failed to connect to the broker")?,
    );
    info!(queue_name = %config.mq.queue_name, "MQ connected");

    let registry = SummarizerRegistry::from_config(&config.summarizer)
        .context("Failed to configure summarizers")?;
    let runner = Arc::new(JobRunner::new(
        db,
        Arc::new(registry),
        Arc::new(UrlFetcher::new(config.summarizer.fetch.clone())),
        config.jobs.worker_id.clone(),
        Duration::from_secs(config.jobs.lease_secs),
        Duration::from_secs(config.summarizer.request_timeout_secs),
    ));

    consume_broker(
        mq,
        config.mq.queue_name.clone(),
        runner,
        config.jobs.concurrency,
    )
    .await;

    Ok(())
}
