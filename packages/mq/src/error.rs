use thiserror::Error;

#[derive(Debug, Error)]
pub enum MqError {
    /// The transport could not accept the message. Callers fall back to
    /// running the job themselves.
    #[error("Queue unavailable: {0}")]
    Unavailable(String),
}

impl From<broccoli_queue::error::BroccoliError> for MqError {
    fn from(e: broccoli_queue::error::BroccoliError) -> Self {
        MqError::Unavailable(e.to_string())
    }
}
