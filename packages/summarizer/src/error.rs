use std::time::Duration;

use thiserror::Error;

use crate::MAX_ERROR_MESSAGE_LEN;

/// Why a remote document could not be used.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("URL is not allowed: {0}")]
    Forbidden(String),

    #[error("Could not resolve host")]
    Resolve,

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Remote server returned status {0}")]
    Status(u16),

    #[error("Document exceeds {0} bytes")]
    TooLarge(usize),

    #[error("Document is not text")]
    NotText,
}

/// Why an uploaded file was rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UploadError {
    #[error("Filename is required")]
    MissingFilename,

    #[error("File type not allowed. Allowed types: {0}")]
    Extension(String),

    #[error("File exceeds {0} bytes")]
    TooLarge(usize),

    #[error("File is empty")]
    Empty,

    #[error("File must be UTF-8 text")]
    NotUtf8,
}

/// Failure of a summarization call.
#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("Input text is empty")]
    EmptyInput,

    #[error("Unknown provider '{0}'")]
    UnknownProvider(String),

    #[error("Model '{model}' is not available from provider '{provider}'")]
    UnknownModel { provider: String, model: String },

    #[error("Local models are disabled")]
    LocalDisabled,

    #[error("Upstream provider error: {0}")]
    Upstream(String),

    #[error("Summarization timed out after {0:?}")]
    Timeout(Duration),

    #[error("Summarizer crashed")]
    Panicked,

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl SummarizeError {
    /// Text safe to show the job's owner. Upstream detail stays in the logs.
    pub fn user_message(&self) -> String {
        let message = match self {
            Self::Upstream(_) => "The summarization provider returned an error".to_string(),
            Self::Panicked => "Summarization failed unexpectedly".to_string(),
            Self::Fetch(FetchError::Request(_)) => "Failed to fetch the document".to_string(),
            other => other.to_string(),
        };
        truncate_message(&message)
    }

    /// Whether the error is a caller mistake rather than an execution failure.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::EmptyInput
                | Self::UnknownProvider(_)
                | Self::UnknownModel { .. }
                | Self::LocalDisabled
        )
    }
}

/// Cut a message to [`MAX_ERROR_MESSAGE_LEN`] characters.
pub fn truncate_message(message: &str) -> String {
    if message.chars().count() <= MAX_ERROR_MESSAGE_LEN {
        return message.to_string();
    }
    message.chars().take(MAX_ERROR_MESSAGE_LEN).collect()
}
