use std::collections::BTreeMap;

use common::config::SummarizerConfig;
use serde::{Deserialize, Serialize};
use store::entity::user_settings;
use store::stats::Analytics;
use store::summaries::ClearedData;
use store::users::SettingsUpdate;
use summarizer::{ModelInfo, SummarizerRegistry};

use crate::error::AppError;

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct SettingsBody {
    #[schema(example = "extractive")]
    pub default_model: String,
    #[schema(example = "local")]
    pub default_provider: String,
    /// Default sentence count for new summaries.
    #[schema(example = 5)]
    pub summary_length: i32,
    /// `keep` or `remove`.
    #[schema(example = "remove")]
    pub citation_handling: String,
    pub auto_save: bool,
}

impl SettingsBody {
    /// Settings for a user who never saved any.
    pub fn defaults(config: &SummarizerConfig) -> Self {
        Self {
            default_model: config.default_model.clone(),
            default_provider: config.default_provider.clone(),
            summary_length: config.default_num_sentences as i32,
            citation_handling: "remove".into(),
            auto_save: true,
        }
    }
}

impl From<user_settings::Model> for SettingsBody {
    fn from(s: user_settings::Model) -> Self {
        Self {
            default_model: s.default_model,
            default_provider: s.default_provider,
            summary_length: s.summary_length,
            citation_handling: s.citation_handling,
            auto_save: s.auto_save,
        }
    }
}

impl From<SettingsBody> for SettingsUpdate {
    fn from(b: SettingsBody) -> Self {
        Self {
            default_model: b.default_model,
            default_provider: b.default_provider,
            summary_length: b.summary_length,
            citation_handling: b.citation_handling,
            auto_save: b.auto_save,
        }
    }
}

pub fn validate_settings(
    payload: &SettingsBody,
    config: &SummarizerConfig,
    registry: &SummarizerRegistry,
) -> Result<(), AppError> {
    let in_range = u32::try_from(payload.summary_length)
        .is_ok_and(|n| (config.min_sentences..=config.max_sentences).contains(&n));
    if !in_range {
        return Err(AppError::Validation(format!(
            "summary_length must be between {} and {}",
            config.min_sentences, config.max_sentences
        )));
    }
    if !matches!(payload.citation_handling.as_str(), "keep" | "remove") {
        return Err(AppError::Validation(
            "citation_handling must be keep or remove".into(),
        ));
    }
    registry.resolve(&payload.default_provider, &payload.default_model)?;
    Ok(())
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct StorageResponse {
    pub used_bytes: i64,
    pub limit_bytes: i64,
    /// 0-100.
    pub used_percent: u8,
    pub summary_count: i64,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct AnalyticsResponse {
    pub total_summaries: i64,
    /// Summaries per model.
    pub model_usage: BTreeMap<String, i64>,
    /// Summaries per requested sentence count.
    pub length_distribution: BTreeMap<i32, i64>,
    /// Mean requested sentence count.
    pub average_length: f64,
    pub unique_models: usize,
    /// Summaries per day (`YYYY-MM-DD`) over the last 30 days.
    pub daily_activity: BTreeMap<String, i64>,
}

impl From<Analytics> for AnalyticsResponse {
    fn from(a: Analytics) -> Self {
        Self {
            total_summaries: a.total_summaries,
            model_usage: a.model_usage,
            length_distribution: a.length_distribution,
            average_length: a.average_length,
            unique_models: a.unique_models,
            daily_activity: a.daily_activity,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ClearDataResponse {
    pub summaries: u64,
    pub evidence: u64,
    pub jobs: u64,
}

impl From<ClearedData> for ClearDataResponse {
    fn from(c: ClearedData) -> Self {
        Self {
            summaries: c.summaries,
            evidence: c.evidence,
            jobs: c.jobs,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ModelResponse {
    #[schema(example = "extractive")]
    pub name: String,
    #[schema(example = "local")]
    pub provider: String,
}

impl From<ModelInfo> for ModelResponse {
    fn from(m: ModelInfo) -> Self {
        Self {
            name: m.name,
            provider: m.provider,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ModelsResponse {
    pub models: Vec<ModelResponse>,
    pub default_model: String,
    pub default_provider: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: &'static str,
    /// Whether the database answered a ping.
    pub database: bool,
}
