use std::sync::Arc;

use common::SummarizeJob;
use mq::{BrokerMessage, MemoryReceiver, Mq};
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::runner::{JobRunner, RunOutcome};

async fn handle(runner: &JobRunner, job: SummarizeJob) -> crate::Result<()> {
    match runner.run(job.job_id).await? {
        RunOutcome::Finished(done) => {
            info!(job_id = %done.id, status = %done.status, "Processed job");
        }
        RunOutcome::Skipped(status) => {
            info!(job_id = %job.job_id, %status, "Job not claimable, message dropped");
        }
        RunOutcome::LeaseLost => {
            warn!(job_id = %job.job_id, "Lease lost, another holder will finish the job");
        }
    }
    Ok(())
}

/// Drain an in-process queue until every sender is dropped, running up to
/// `concurrency` jobs at once.
pub async fn consume_memory(
    mut receiver: MemoryReceiver,
    runner: Arc<JobRunner>,
    concurrency: usize,
) {
    info!(worker_id = %runner.worker_id(), concurrency, "Starting in-memory job consumer");
    let permits = Arc::new(Semaphore::new(concurrency.max(1)));

    while let Some(job) = receiver.recv().await {
        let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
            break;
        };
        let runner = Arc::clone(&runner);
        tokio::spawn(async move {
            if let Err(e) = handle(&runner, job).await {
                error!(job_id = %job.job_id, error = %e, "Failed to process job");
            }
            drop(permit);
        });
    }

    info!("In-memory job consumer stopped");
}

/// Consume jobs from the broker queue until the broker connection fails.
pub async fn consume_broker(
    mq: Arc<Mq>,
    queue_name: String,
    runner: Arc<JobRunner>,
    concurrency: usize,
) {
    info!(queue = %queue_name, worker_id = %runner.worker_id(), "Starting job consumer");

    let result = mq
        .process_messages(
            &queue_name,
            Some(concurrency.max(1)),
            None,
            move |message: BrokerMessage<SummarizeJob>| {
                let runner = Arc::clone(&runner);
                async move {
                    let job = message.payload;
                    handle(&runner, job).await.map_err(|e| {
                        error!(job_id = %job.job_id, error = %e, "Failed to process job");
                        mq::BroccoliError::Job(e.to_string())
                    })
                }
            },
        )
        .await;

    if let Err(e) = result {
        error!(error = %e, "Job consumer stopped unexpectedly");
    }
}
