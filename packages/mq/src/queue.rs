use std::sync::Arc;

use async_trait::async_trait;
use common::SummarizeJob;
use tracing::debug;

use crate::broker::Mq;
use crate::error::MqError;

/// Transport that hands job ids to workers.
///
/// Delivery is at-least-once: a job id may reach more than one consumer, and
/// the job row's claim step decides which one runs it.
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, job: SummarizeJob) -> Result<(), MqError>;
}

/// Redis-backed queue shared with the standalone worker process.
pub struct BroccoliJobQueue {
    mq: Arc<Mq>,
    queue_name: String,
}

impl BroccoliJobQueue {
    pub fn new(mq: Arc<Mq>, queue_name: impl Into<String>) -> Self {
        Self {
            mq,
            queue_name: queue_name.into(),
        }
    }
}

#[async_trait]
impl JobQueue for BroccoliJobQueue {
    async fn enqueue(&self, job: SummarizeJob) -> Result<(), MqError> {
        self.mq
            .publish(&self.queue_name, None, &job, None)
            .await
            .map_err(MqError::from)?;
        debug!(job_id = %job.job_id, queue = %self.queue_name, "Published job");
        Ok(())
    }
}
