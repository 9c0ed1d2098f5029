use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use store::entity::evidence;
use uuid::Uuid;

use super::shared::{double_option, validate_non_empty};
use crate::error::AppError;

#[derive(Serialize, utoipa::ToSchema)]
pub struct EvidenceResponse {
    pub id: Uuid,
    #[schema(example = "Attention alone suffices for translation")]
    pub claim: String,
    /// Supporting quote from the source.
    pub excerpt: String,
    #[schema(example = "sentence 4")]
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<evidence::Model> for EvidenceResponse {
    fn from(e: evidence::Model) -> Self {
        Self {
            id: e.id,
            claim: e.claim,
            excerpt: e.excerpt,
            location: e.location,
            created_at: e.created_at,
        }
    }
}

/// Every evidence item of a summary, oldest first.
#[derive(Serialize, utoipa::ToSchema)]
pub struct EvidenceListResponse {
    pub summary_id: Uuid,
    pub items: Vec<EvidenceResponse>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateEvidenceRequest {
    pub claim: String,
    pub excerpt: String,
    pub location: Option<String>,
}

pub fn validate_create_evidence(payload: &CreateEvidenceRequest) -> Result<(), AppError> {
    validate_non_empty(&payload.claim, "claim")?;
    validate_non_empty(&payload.excerpt, "excerpt")
}

/// Absent fields are left unchanged; `location: null` clears the location.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateEvidenceRequest {
    pub claim: Option<String>,
    pub excerpt: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub location: Option<Option<String>>,
}

pub fn validate_update_evidence(payload: &UpdateEvidenceRequest) -> Result<(), AppError> {
    if let Some(claim) = &payload.claim {
        validate_non_empty(claim, "claim")?;
    }
    if let Some(excerpt) = &payload.excerpt {
        validate_non_empty(excerpt, "excerpt")?;
    }
    Ok(())
}
