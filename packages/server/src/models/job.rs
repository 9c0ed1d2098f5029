use chrono::{DateTime, Utc};
use common::config::SummarizerConfig;
use common::{JobStatus, SummaryOptions};
use serde::{Deserialize, Serialize};
use store::entity::{job, user_settings};
use summarizer::SummarizerRegistry;
use uuid::Uuid;

use crate::dispatcher::{DispatchMode, Dispatched};
use crate::error::AppError;
use crate::models::shared::Pagination;
use crate::models::summary::SummaryResponse;

/// Files accepted by one batch upload.
pub const MAX_BATCH_FILES: usize = 20;

/// Where the text of a JSON job submission comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RequestSource {
    Text,
    Url,
}

/// Summarization options a request may set. Unset options fall back to the
/// user's settings, then to server defaults.
#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct OptionOverrides {
    /// Sentences in the summary.
    #[schema(example = 5)]
    pub num_sentences: Option<u32>,
    #[schema(example = "extractive")]
    pub model: Option<String>,
    #[schema(example = "local")]
    pub provider: Option<String>,
    /// Keep bracketed citations in the input text.
    pub keep_citations: Option<bool>,
}

impl OptionOverrides {
    /// Fill unset options and check the result against the configured
    /// bounds and the registered models.
    pub fn resolve(
        &self,
        settings: Option<&user_settings::Model>,
        config: &SummarizerConfig,
        registry: &SummarizerRegistry,
    ) -> Result<SummaryOptions, AppError> {
        let num_sentences = self
            .num_sentences
            .or_else(|| settings.and_then(|s| u32::try_from(s.summary_length).ok()))
            .unwrap_or(config.default_num_sentences);
        if !(config.min_sentences..=config.max_sentences).contains(&num_sentences) {
            return Err(AppError::Validation(format!(
                "num_sentences must be between {} and {}",
                config.min_sentences, config.max_sentences
            )));
        }

        let model = self
            .model
            .clone()
            .or_else(|| settings.map(|s| s.default_model.clone()))
            .unwrap_or_else(|| config.default_model.clone());
        let provider = self
            .provider
            .clone()
            .or_else(|| settings.map(|s| s.default_provider.clone()))
            .unwrap_or_else(|| config.default_provider.clone());
        registry.resolve(&provider, &model)?;

        let keep_citations = self
            .keep_citations
            .or_else(|| settings.map(|s| s.citation_handling == "keep"))
            .unwrap_or(false);

        Ok(SummaryOptions {
            num_sentences,
            keep_citations,
            model,
            provider,
        })
    }
}

/// Request body for a text or URL job.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateJobRequest {
    pub source_type: RequestSource,
    /// Required when `source_type` is `text`.
    pub text: Option<String>,
    /// Required when `source_type` is `url`.
    #[schema(example = "https://arxiv.org/abs/1706.03762")]
    pub url: Option<String>,
    #[serde(flatten)]
    pub options: OptionOverrides,
}

/// A job and, once it has succeeded, its summary.
#[derive(Serialize, utoipa::ToSchema)]
pub struct JobResponse {
    pub id: Uuid,
    pub status: JobStatus,
    /// How the job was started. Only present on submission responses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<DispatchMode>,
    pub result_summary_id: Option<Uuid>,
    /// Failure reason when `status` is `failed`.
    pub error: Option<String>,
    pub attempts: i32,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<SummaryResponse>,
}

impl From<job::Model> for JobResponse {
    fn from(job: job::Model) -> Self {
        Self {
            id: job.id,
            status: job.status,
            mode: None,
            result_summary_id: job.result_summary_id,
            error: job.error,
            attempts: job.attempts,
            created_at: job.created_at,
            started_at: job.started_at,
            completed_at: job.completed_at,
            summary: None,
        }
    }
}

impl From<Dispatched> for JobResponse {
    fn from(dispatched: Dispatched) -> Self {
        Self {
            mode: Some(dispatched.mode),
            ..Self::from(dispatched.job)
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct JobListResponse {
    pub data: Vec<JobResponse>,
    pub pagination: Pagination,
}

/// A file a batch upload did not turn into a job.
#[derive(Serialize, utoipa::ToSchema)]
pub struct SkippedFile {
    pub filename: Option<String>,
    pub reason: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct BatchJobResponse {
    pub jobs: Vec<JobResponse>,
    pub skipped: Vec<SkippedFile>,
}
