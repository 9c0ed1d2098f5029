use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::SourceType;

/// What a job summarizes. Stored with the job row so any worker can run it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(tag = "source_type", rename_all = "lowercase")]
pub enum SourceInput {
    /// Pasted text.
    Text { text: String },
    /// A remote document fetched by the worker.
    Url { url: String },
    /// An uploaded file, already decoded to text at submission time.
    File { filename: String, text: String },
}

impl SourceInput {
    pub fn source_type(&self) -> SourceType {
        match self {
            Self::Text { .. } => SourceType::Text,
            Self::Url { .. } => SourceType::Url,
            Self::File { .. } => SourceType::File,
        }
    }

    /// Short human-readable reference stored as the summary's `source_value`.
    pub fn source_value(&self) -> String {
        match self {
            Self::Text { text } => {
                let preview: String = text.chars().take(200).collect();
                preview
            }
            Self::Url { url } => url.clone(),
            Self::File { filename, .. } => filename.clone(),
        }
    }

    /// Default title for the resulting summary.
    pub fn title(&self) -> String {
        match self {
            Self::Text { .. } => "Text summary".to_string(),
            Self::Url { url } => url.clone(),
            Self::File { filename, .. } => filename.clone(),
        }
    }

    /// The inline text, if the source is not fetched remotely.
    pub fn inline_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } | Self::File { text, .. } => Some(text),
            Self::Url { .. } => None,
        }
    }
}

/// Resolved summarization options for a job.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SummaryOptions {
    pub num_sentences: u32,
    pub keep_citations: bool,
    pub model: String,
    pub provider: String,
}

/// Input descriptor persisted on the job row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct JobInput {
    pub source: SourceInput,
    pub options: SummaryOptions,
}

/// Queue message asking a worker to run a job.
///
/// Only the id travels through the queue; the worker reads everything else
/// from the job row after claiming it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummarizeJob {
    pub job_id: Uuid,
}

impl SummarizeJob {
    pub fn new(job_id: Uuid) -> Self {
        Self { job_id }
    }
}
