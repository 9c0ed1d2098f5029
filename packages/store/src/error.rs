use common::JobStatus;
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The row does not exist or belongs to another user.
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    /// A caller tried a job transition the state machine forbids. This is a
    /// bug in the caller, never a user error.
    #[error("illegal job transition for {job_id}: {from} -> {to}")]
    IllegalTransition {
        job_id: Uuid,
        from: JobStatus,
        to: JobStatus,
    },

    /// Persisted data failed to decode.
    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Db(#[from] DbErr),
}
