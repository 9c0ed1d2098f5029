use chrono::{DateTime, Utc};
use common::SourceType;
use serde::{Deserialize, Serialize};
use store::entity::summary;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::shared::{Pagination, validate_non_empty, validate_title};
use crate::utils::export::ExportFormat;
use crate::utils::synthesis::Synthesis;

/// Items accepted by one import request.
pub const MAX_IMPORT_ITEMS: usize = 1000;
/// Summaries accepted by one synthesis request.
pub const MAX_SYNTHESIS_IDS: usize = 50;

#[derive(Serialize, utoipa::ToSchema)]
pub struct SummaryResponse {
    pub id: Uuid,
    #[schema(example = "Attention Is All You Need")]
    pub title: String,
    pub source_type: SourceType,
    /// URL, filename, or a preview of the pasted text.
    pub source_value: String,
    pub content: String,
    #[schema(example = "extractive")]
    pub model: String,
    #[schema(example = "local")]
    pub provider: String,
    pub num_sentences: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<summary::Model> for SummaryResponse {
    fn from(s: summary::Model) -> Self {
        Self {
            id: s.id,
            title: s.title,
            source_type: s.source_type,
            source_value: s.source_value,
            content: s.content,
            model: s.model,
            provider: s.provider,
            num_sentences: s.num_sentences,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SummaryListResponse {
    pub data: Vec<SummaryResponse>,
    pub pagination: Pagination,
}

/// Edit a summary. Absent fields are left unchanged.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateSummaryRequest {
    pub title: Option<String>,
    pub content: Option<String>,
}

pub fn validate_update_summary(payload: &UpdateSummaryRequest) -> Result<(), AppError> {
    if payload.title.is_none() && payload.content.is_none() {
        return Err(AppError::Validation(
            "At least one of title or content is required".into(),
        ));
    }
    if let Some(title) = &payload.title {
        validate_title(title)?;
    }
    if let Some(content) = &payload.content {
        validate_non_empty(content, "content")?;
    }
    Ok(())
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExportQuery {
    /// `txt` (default) or `md`.
    pub format: Option<ExportFormat>,
}

/// One summary in an import request. Items without content are skipped.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct ImportItem {
    pub title: Option<String>,
    pub content: Option<String>,
    pub source_value: Option<String>,
    pub model: Option<String>,
    pub provider: Option<String>,
    pub num_sentences: Option<i32>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct ImportRequest {
    pub summaries: Vec<ImportItem>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ImportResponse {
    pub imported: usize,
    pub skipped: usize,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct SynthesizeRequest {
    /// 1-50 summary ids. Ids the caller does not own are ignored.
    pub summary_ids: Vec<Uuid>,
}

pub fn validate_synthesize_request(payload: &SynthesizeRequest) -> Result<(), AppError> {
    if payload.summary_ids.is_empty() || payload.summary_ids.len() > MAX_SYNTHESIS_IDS {
        return Err(AppError::Validation(format!(
            "summary_ids must contain 1-{MAX_SYNTHESIS_IDS} ids"
        )));
    }
    Ok(())
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CitationResponse {
    pub summary_id: Uuid,
    pub title: String,
    pub excerpt: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SynthesisResponse {
    pub consensus: String,
    pub disagreements: Vec<String>,
    pub sources: Vec<Uuid>,
    pub citations: Vec<CitationResponse>,
}

impl From<Synthesis> for SynthesisResponse {
    fn from(s: Synthesis) -> Self {
        Self {
            consensus: s.consensus,
            disagreements: s.disagreements,
            sources: s.sources,
            citations: s
                .citations
                .into_iter()
                .map(|c| CitationResponse {
                    summary_id: c.summary_id,
                    title: c.title,
                    excerpt: c.excerpt,
                })
                .collect(),
        }
    }
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct SynthesisExportRequest {
    pub consensus: String,
    #[serde(default)]
    pub format: ExportFormat,
}
