use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, bail};
use server::config::AppConfig;
use server::rate_limit::run_pruner;
use server::reaper::run_reaper;
use server::startup::build_state;
use tracing::info;
use tracing_subscriber::EnvFilter;
use worker::consumer::consume_memory;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .init();

    let config = AppConfig::load().context("Failed to load config")?;
    if config.auth.jwt_secret.trim().is_empty() {
        bail!("auth.jwt_secret must be set (SUMMARIZER__AUTH__JWT_SECRET)");
    }

    let db = store::init_db(&config.database.url, config.database.max_connections)
        .await
        .context("Failed to connect to database")?;
    info!("Database ready");

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;
    let jobs_config = config.jobs.clone();

    let started = build_state(config, db.clone()).await?;
    if let Some(receiver) = started.memory_receiver {
        tokio::spawn(consume_memory(
            receiver,
            Arc::clone(&started.runner),
            jobs_config.concurrency,
        ));
    }
    tokio::spawn(run_reaper(
        db,
        Arc::clone(&started.state.dispatcher),
        jobs_config,
    ));
    tokio::spawn(run_pruner(Arc::clone(&started.state.rate_limits)));

    let app = server::build_router(started.state);

    info!("Server running at http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
