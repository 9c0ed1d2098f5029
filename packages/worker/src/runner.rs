use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use common::{JobInput, JobStatus, SourceInput};
use futures::FutureExt;
use sea_orm::{DatabaseConnection, EntityTrait};
use store::entity::job;
use store::jobs::{self, ClaimOutcome, Completion, JobOutcome, NewSummary};
use summarizer::{SummarizeError, SummarizerRegistry, SummaryRequest, UrlFetcher};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::error::Result;

/// Shortest interval between lease renewals.
const MIN_HEARTBEAT: Duration = Duration::from_millis(100);

/// How a [`JobRunner::run`] call ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// The job reached a terminal state, by this run or an earlier one.
    Finished(job::Model),
    /// Another holder owns the job, so this run did nothing.
    Skipped(JobStatus),
    /// The lease was taken over mid-run; the outcome was discarded.
    LeaseLost,
}

/// Executes summarization jobs against the shared store.
pub struct JobRunner {
    db: DatabaseConnection,
    registry: Arc<SummarizerRegistry>,
    fetcher: Arc<UrlFetcher>,
    worker_id: String,
    lease: Duration,
    request_timeout: Duration,
}

impl JobRunner {
    pub fn new(
        db: DatabaseConnection,
        registry: Arc<SummarizerRegistry>,
        fetcher: Arc<UrlFetcher>,
        worker_id: impl Into<String>,
        lease: Duration,
        request_timeout: Duration,
    ) -> Self {
        Self {
            db,
            registry,
            fetcher,
            worker_id: worker_id.into(),
            lease,
            request_timeout,
        }
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    fn lease_delta(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(self.lease.as_millis().min(i64::MAX as u128) as i64)
    }

    /// Claim and execute one job.
    ///
    /// Summarizer failures, timeouts and panics all end as a `failed` job;
    /// `Err` is returned only when the store itself is unreachable, in which
    /// case the lease expires and the reaper takes over.
    #[instrument(skip(self), fields(worker_id = %self.worker_id))]
    pub async fn run(&self, job_id: Uuid) -> Result<RunOutcome> {
        let claimed = match jobs::claim(&self.db, job_id, &self.worker_id, self.lease_delta())
            .await?
        {
            ClaimOutcome::Claimed(job) => job,
            ClaimOutcome::NotClaimable(status) => {
                debug!(%status, "Skipping job held elsewhere");
                if status.is_terminal() {
                    let job = job::Entity::find_by_id(job_id).one(&self.db).await?;
                    if let Some(job) = job {
                        return Ok(RunOutcome::Finished(job));
                    }
                }
                return Ok(RunOutcome::Skipped(status));
            }
        };

        let outcome = match jobs::decode_input(&claimed) {
            Ok(input) => {
                tokio::select! {
                    outcome = self.execute(job_id, &input) => outcome,
                    () = self.heartbeat(job_id) => {
                        warn!("Lease lost during execution, discarding result");
                        return Ok(RunOutcome::LeaseLost);
                    }
                }
            }
            Err(e) => {
                error!(error = %e, "Unreadable job input");
                JobOutcome::Failed {
                    error: "Job input could not be read".into(),
                }
            }
        };

        let completion = jobs::complete(&self.db, job_id, outcome).await?;
        if let Completion::AlreadyTerminal(job) = &completion {
            info!(status = %job.status, "Job was finished by another holder");
        }
        Ok(RunOutcome::Finished(completion.into_job()))
    }

    async fn execute(&self, job_id: Uuid, input: &JobInput) -> JobOutcome {
        match self.summarize(input).await {
            Ok(content) => JobOutcome::Succeeded(NewSummary {
                title: input.source.title(),
                source_type: input.source.source_type(),
                source_value: input.source.source_value(),
                content,
                model: input.options.model.clone(),
                provider: input.options.provider.clone(),
                num_sentences: input.options.num_sentences as i32,
            }),
            Err(e) => {
                warn!(job_id = %job_id, error = %e, "Summarization failed");
                JobOutcome::Failed {
                    error: e.user_message(),
                }
            }
        }
    }

    async fn summarize(&self, input: &JobInput) -> std::result::Result<String, SummarizeError> {
        let text = match &input.source {
            SourceInput::Url { url } => self.fetcher.fetch_text(url).await?,
            SourceInput::Text { text } | SourceInput::File { text, .. } => text.clone(),
        };

        let request = SummaryRequest {
            text,
            num_sentences: input.options.num_sentences,
            keep_citations: input.options.keep_citations,
            model: input.options.model.clone(),
        };

        let call = AssertUnwindSafe(self.registry.summarize(&input.options.provider, &request))
            .catch_unwind();
        match tokio::time::timeout(self.request_timeout, call).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => {
                error!("Summarizer panicked");
                Err(SummarizeError::Panicked)
            }
            Err(_) => Err(SummarizeError::Timeout(self.request_timeout)),
        }
    }

    /// Renew the lease every third of its length. Resolves only once the
    /// lease has been lost.
    async fn heartbeat(&self, job_id: Uuid) {
        let period = (self.lease / 3).max(MIN_HEARTBEAT);
        let mut interval = tokio::time::interval(period);
        interval.tick().await;

        loop {
            interval.tick().await;
            match jobs::renew_lease(&self.db, job_id, &self.worker_id, self.lease_delta()).await {
                Ok(true) => debug!(job_id = %job_id, "Renewed lease"),
                Ok(false) => return,
                Err(e) => warn!(job_id = %job_id, error = %e, "Failed to renew lease"),
            }
        }
    }
}
