use std::sync::Arc;

use common::{JobInput, SummarizeJob};
use mq::{JobQueue, MqError};
use sea_orm::{DatabaseConnection, EntityTrait};
use serde::Serialize;
use store::entity::job;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;
use worker::{JobRunner, RunOutcome};

use crate::error::AppError;

/// How a submitted job is being executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// Handed to the queue; poll the job for its outcome.
    Queued,
    /// Run within the request; the job is already terminal.
    Inline,
}

#[derive(Debug)]
pub struct Dispatched {
    pub job: job::Model,
    pub mode: DispatchMode,
}

/// Chooses between the queue and inline execution for each job.
pub struct Dispatcher {
    db: DatabaseConnection,
    queue: Option<Arc<dyn JobQueue>>,
    runner: Arc<JobRunner>,
}

impl Dispatcher {
    /// `queue` is `None` when queueing is disabled; every job then runs inline.
    pub fn new(
        db: DatabaseConnection,
        queue: Option<Arc<dyn JobQueue>>,
        runner: Arc<JobRunner>,
    ) -> Self {
        Self { db, queue, runner }
    }

    pub fn runner(&self) -> &Arc<JobRunner> {
        &self.runner
    }

    /// Record a job for an already validated input and start it.
    ///
    /// A queue that cannot take the message is not an error: the job runs
    /// inline instead and the caller gets its terminal state.
    #[instrument(skip(self, input), fields(user_id = %user_id))]
    pub async fn submit(&self, user_id: Uuid, input: &JobInput) -> Result<Dispatched, AppError> {
        let job = store::jobs::create(&self.db, user_id, input).await?;

        if let Some(queue) = &self.queue {
            match queue.enqueue(SummarizeJob::new(job.id)).await {
                Ok(()) => {
                    info!(job_id = %job.id, "Queued job");
                    return Ok(Dispatched {
                        job,
                        mode: DispatchMode::Queued,
                    });
                }
                Err(MqError::Unavailable(reason)) => {
                    warn!(job_id = %job.id, %reason, "Queue unavailable, running job inline");
                }
            }
        } else {
            debug!(job_id = %job.id, "Queueing disabled, running job inline");
        }

        let job = self.run_inline(job.id).await?;
        Ok(Dispatched {
            job,
            mode: DispatchMode::Inline,
        })
    }

    /// Run a job in the current task and return its latest state.
    pub async fn run_inline(&self, job_id: Uuid) -> Result<job::Model, AppError> {
        match self.runner.run(job_id).await? {
            RunOutcome::Finished(job) => Ok(job),
            RunOutcome::Skipped(_) | RunOutcome::LeaseLost => job::Entity::find_by_id(job_id)
                .one(&self.db)
                .await?
                .ok_or_else(|| AppError::Internal(format!("job {job_id} vanished"))),
        }
    }

    /// Hand an existing job back for execution, inline in the background
    /// when the queue cannot take it.
    pub async fn redeliver(&self, job_id: Uuid) {
        if let Some(queue) = &self.queue {
            match queue.enqueue(SummarizeJob::new(job_id)).await {
                Ok(()) => {
                    debug!(job_id = %job_id, "Redelivered job to queue");
                    return;
                }
                Err(MqError::Unavailable(reason)) => {
                    warn!(job_id = %job_id, %reason, "Queue unavailable, redelivering inline");
                }
            }
        }

        let runner = Arc::clone(&self.runner);
        tokio::spawn(async move {
            if let Err(e) = runner.run(job_id).await {
                error!(job_id = %job_id, error = %e, "Inline redelivery failed");
            }
        });
    }
}
