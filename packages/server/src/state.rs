use std::sync::Arc;

use sea_orm::DatabaseConnection;
use summarizer::SummarizerRegistry;

use crate::config::AppConfig;
use crate::dispatcher::Dispatcher;
use crate::rate_limit::RateLimits;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<AppConfig>,
    pub dispatcher: Arc<Dispatcher>,
    pub registry: Arc<SummarizerRegistry>,
    pub rate_limits: Arc<RateLimits>,
}
