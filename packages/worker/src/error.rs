use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("MQ error: {0}")]
    Mq(String),

    #[error("Store error: {0}")]
    Store(#[from] store::StoreError),

    #[error("Database error: {0}")]
    Db(#[from] sea_orm::DbErr),

    #[error("Summarizer setup error: {0}")]
    Summarizer(#[from] summarizer::SummarizeError),
}

impl From<mq::MqError> for WorkerError {
    fn from(e: mq::MqError) -> Self {
        WorkerError::Mq(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, WorkerError>;
