use broccoli_queue::queue::BroccoliQueue;
pub use broccoli_queue::{brokers::broker::BrokerMessage, error::BroccoliError};
use common::config::MqAppConfig;
use tracing::debug;

use crate::error::MqError;

/// Redis broker handle shared by publishers and consumers.
pub type Mq = BroccoliQueue;

/// Open a pooled connection to the broker named in `config`.
pub async fn connect(config: &MqAppConfig) -> Result<Mq, MqError> {
    debug!(pool_size = config.pool_size, "Connecting to broker");
    BroccoliQueue::builder(&config.url)
        .pool_connections(config.pool_size)
        .build()
        .await
        .map_err(MqError::from)
}
