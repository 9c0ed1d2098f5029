//! Job records and their state machine.
//!
//! `queued -> running -> {succeeded, failed}`. The claim is a single
//! conditional UPDATE, so the database decides which of several concurrent
//! claimers wins. [`complete`] is the only code path that moves a job out of
//! `running`; the inline request path, the worker and the reaper all go
//! through it.

use chrono::{DateTime, Duration, Utc};
use common::{JobInput, JobStatus, SourceType};
use sea_orm::sea_query::{Expr, ExprTrait};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionSession, TransactionTrait,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::entity::{job, summary};
use crate::error::StoreError;

/// Fields of the summary a successful job produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSummary {
    pub title: String,
    pub source_type: SourceType,
    pub source_value: String,
    pub content: String,
    pub model: String,
    pub provider: String,
    pub num_sentences: i32,
}

/// Result of a summarization attempt, handed to [`complete`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded(NewSummary),
    /// Carries the user-facing message; raw upstream errors belong in logs.
    Failed { error: String },
}

impl JobOutcome {
    pub fn status(&self) -> JobStatus {
        match self {
            Self::Succeeded(_) => JobStatus::Succeeded,
            Self::Failed { .. } => JobStatus::Failed,
        }
    }
}

#[derive(Debug)]
pub enum ClaimOutcome {
    /// This caller now holds the lease.
    Claimed(job::Model),
    /// Someone else holds it, or the job already finished.
    NotClaimable(JobStatus),
}

#[derive(Debug)]
pub enum Completion {
    /// This call performed the terminal transition.
    Completed(job::Model),
    /// The job was already terminal; nothing changed.
    AlreadyTerminal(job::Model),
}

impl Completion {
    pub fn into_job(self) -> job::Model {
        match self {
            Self::Completed(job) | Self::AlreadyTerminal(job) => job,
        }
    }
}

/// Decode the input descriptor stored on a job.
pub fn decode_input(job: &job::Model) -> Result<JobInput, StoreError> {
    serde_json::from_value(job.input.clone())
        .map_err(|e| StoreError::Corrupt(format!("job {} input: {e}", job.id)))
}

/// Insert a new `queued` job.
pub async fn create<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    input: &JobInput,
) -> Result<job::Model, StoreError> {
    let input = serde_json::to_value(input)
        .map_err(|e| StoreError::Corrupt(format!("job input: {e}")))?;

    let job = job::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        status: Set(JobStatus::Queued),
        input: Set(input),
        result_summary_id: Set(None),
        error: Set(None),
        attempts: Set(0),
        worker_id: Set(None),
        lease_expires_at: Set(None),
        redelivered_at: Set(None),
        created_at: Set(Utc::now()),
        started_at: Set(None),
        completed_at: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;

    debug!(job_id = %job.id, user_id = %user_id, "Created job");
    Ok(job)
}

/// Find a job owned by `user_id`.
pub async fn find_owned<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    job_id: Uuid,
) -> Result<job::Model, StoreError> {
    job::Entity::find_by_id(job_id)
        .filter(job::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or(StoreError::NotFound("Job"))
}

/// A page of the owner's jobs, newest first, with the total count.
pub async fn list_owned<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    limit: u64,
    offset: u64,
) -> Result<(Vec<job::Model>, u64), StoreError> {
    let query = job::Entity::find().filter(job::Column::UserId.eq(user_id));
    let total = query.clone().count(db).await?;
    let jobs = query
        .order_by_desc(job::Column::CreatedAt)
        .limit(limit)
        .offset(offset)
        .all(db)
        .await?;
    Ok((jobs, total))
}

/// Atomically take the lease on a job.
///
/// Succeeds for a `queued` job, or for a `running` job whose lease has
/// expired (its previous holder is presumed dead). Exactly one of several
/// concurrent callers can succeed.
pub async fn claim<C: ConnectionTrait>(
    db: &C,
    job_id: Uuid,
    worker_id: &str,
    lease: Duration,
) -> Result<ClaimOutcome, StoreError> {
    let now = Utc::now();

    let result = job::Entity::update_many()
        .col_expr(job::Column::Status, Expr::value(JobStatus::Running))
        .col_expr(job::Column::WorkerId, Expr::value(worker_id))
        .col_expr(job::Column::StartedAt, Expr::value(now))
        .col_expr(job::Column::LeaseExpiresAt, Expr::value(now + lease))
        .col_expr(
            job::Column::RedeliveredAt,
            Expr::value(Option::<DateTime<Utc>>::None),
        )
        .col_expr(
            job::Column::Attempts,
            Expr::col(job::Column::Attempts).add(1),
        )
        .filter(job::Column::Id.eq(job_id))
        .filter(
            Condition::any()
                .add(job::Column::Status.eq(JobStatus::Queued))
                .add(
                    Condition::all()
                        .add(job::Column::Status.eq(JobStatus::Running))
                        .add(job::Column::LeaseExpiresAt.lt(now)),
                ),
        )
        .exec(db)
        .await?;

    let job = job::Entity::find_by_id(job_id)
        .one(db)
        .await?
        .ok_or(StoreError::NotFound("Job"))?;

    if result.rows_affected == 1 {
        info!(job_id = %job_id, worker_id, attempt = job.attempts, "Claimed job");
        Ok(ClaimOutcome::Claimed(job))
    } else {
        debug!(job_id = %job_id, status = %job.status, "Job not claimable");
        Ok(ClaimOutcome::NotClaimable(job.status))
    }
}

/// Extend the lease held by `worker_id`. Returns false once the lease has
/// been lost (job reclaimed or completed).
pub async fn renew_lease<C: ConnectionTrait>(
    db: &C,
    job_id: Uuid,
    worker_id: &str,
    lease: Duration,
) -> Result<bool, StoreError> {
    let result = job::Entity::update_many()
        .col_expr(
            job::Column::LeaseExpiresAt,
            Expr::value(Utc::now() + lease),
        )
        .filter(job::Column::Id.eq(job_id))
        .filter(job::Column::Status.eq(JobStatus::Running))
        .filter(job::Column::WorkerId.eq(worker_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected == 1)
}

/// Move a running job to its terminal state.
///
/// On success the summary row is inserted and linked in the same
/// transaction, so a job is never `succeeded` without a result. Calling this
/// again for a job that is already terminal is a no-op returning
/// [`Completion::AlreadyTerminal`]; calling it for a job that was never
/// claimed is [`StoreError::IllegalTransition`].
pub async fn complete<C: ConnectionTrait + TransactionTrait>(
    db: &C,
    job_id: Uuid,
    outcome: JobOutcome,
) -> Result<Completion, StoreError> {
    let target = outcome.status();
    let txn = db.begin().await?;

    let current = job::Entity::find_by_id(job_id)
        .one(&txn)
        .await?
        .ok_or(StoreError::NotFound("Job"))?;

    if current.status.is_terminal() {
        txn.rollback().await?;
        debug!(job_id = %job_id, status = %current.status, "Job already terminal, skipping");
        return Ok(Completion::AlreadyTerminal(current));
    }
    if !current.status.can_transition_to(target) {
        txn.rollback().await?;
        return Err(StoreError::IllegalTransition {
            job_id,
            from: current.status,
            to: target,
        });
    }

    let now = Utc::now();
    let (result_summary_id, error) = match outcome {
        JobOutcome::Succeeded(new) => {
            let summary = summary::ActiveModel {
                id: Set(Uuid::new_v4()),
                user_id: Set(current.user_id),
                title: Set(new.title),
                source_type: Set(new.source_type),
                source_value: Set(new.source_value),
                content: Set(new.content),
                model: Set(new.model),
                provider: Set(new.provider),
                num_sentences: Set(new.num_sentences),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            (Some(summary.id), None)
        }
        JobOutcome::Failed { error } => (None, Some(error)),
    };

    let result = job::Entity::update_many()
        .col_expr(job::Column::Status, Expr::value(target))
        .col_expr(job::Column::ResultSummaryId, Expr::value(result_summary_id))
        .col_expr(job::Column::Error, Expr::value(error))
        .col_expr(job::Column::CompletedAt, Expr::value(now))
        .col_expr(
            job::Column::LeaseExpiresAt,
            Expr::value(Option::<DateTime<Utc>>::None),
        )
        .filter(job::Column::Id.eq(job_id))
        .filter(job::Column::Status.eq(JobStatus::Running))
        .exec(&txn)
        .await?;

    if result.rows_affected != 1 {
        txn.rollback().await?;
        let latest = job::Entity::find_by_id(job_id)
            .one(db)
            .await?
            .ok_or(StoreError::NotFound("Job"))?;
        warn!(job_id = %job_id, status = %latest.status, "Lost completion race");
        return Ok(Completion::AlreadyTerminal(latest));
    }

    let updated = job::Entity::find_by_id(job_id)
        .one(&txn)
        .await?
        .ok_or(StoreError::NotFound("Job"))?;
    txn.commit().await?;

    info!(job_id = %job_id, status = %target, "Completed job");
    Ok(Completion::Completed(updated))
}

/// Running jobs whose lease ended before `now`, with their attempt counts.
pub async fn expired_leases<C: ConnectionTrait>(
    db: &C,
    now: DateTime<Utc>,
) -> Result<Vec<(Uuid, i32)>, StoreError> {
    Ok(job::Entity::find()
        .select_only()
        .column(job::Column::Id)
        .column(job::Column::Attempts)
        .filter(job::Column::Status.eq(JobStatus::Running))
        .filter(job::Column::LeaseExpiresAt.lt(now))
        .into_tuple()
        .all(db)
        .await?)
}

/// Jobs still queued that were created before `cutoff`.
pub async fn stale_queued<C: ConnectionTrait>(
    db: &C,
    cutoff: DateTime<Utc>,
) -> Result<Vec<Uuid>, StoreError> {
    Ok(job::Entity::find()
        .select_only()
        .column(job::Column::Id)
        .filter(job::Column::Status.eq(JobStatus::Queued))
        .filter(job::Column::CreatedAt.lt(cutoff))
        .into_tuple()
        .all(db)
        .await?)
}

/// Record that the reaper is redelivering a job.
///
/// Returns false when the job was already redelivered after `backoff_cutoff`
/// and has not been claimed since, or when it is no longer waiting for a
/// consumer. Only a caller that gets true should publish the job again.
pub async fn mark_redelivered<C: ConnectionTrait>(
    db: &C,
    job_id: Uuid,
    now: DateTime<Utc>,
    backoff_cutoff: DateTime<Utc>,
) -> Result<bool, StoreError> {
    let result = job::Entity::update_many()
        .col_expr(job::Column::RedeliveredAt, Expr::value(now))
        .filter(job::Column::Id.eq(job_id))
        .filter(
            Condition::any()
                .add(job::Column::Status.eq(JobStatus::Queued))
                .add(
                    Condition::all()
                        .add(job::Column::Status.eq(JobStatus::Running))
                        .add(job::Column::LeaseExpiresAt.lt(now)),
                ),
        )
        .filter(
            Condition::any()
                .add(job::Column::RedeliveredAt.is_null())
                .add(job::Column::RedeliveredAt.lt(backoff_cutoff)),
        )
        .exec(db)
        .await?;
    Ok(result.rows_affected == 1)
}
