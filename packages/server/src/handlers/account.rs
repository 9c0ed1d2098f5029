use axum::{Json, extract::State};
use chrono::Utc;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::account::*;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/settings",
    tag = "Account",
    operation_id = "getSettings",
    summary = "Get your preferences",
    description = "Server defaults are returned until preferences are saved.",
    responses(
        (status = 200, description = "Preferences", body = SettingsBody),
        (status = 401, description = "Unauthenticated (UNAUTHENTICATED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn get_settings(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<SettingsBody>, AppError> {
    let body = match store::users::get_settings(&state.db, auth_user.user_id).await? {
        Some(settings) => settings.into(),
        None => SettingsBody::defaults(&state.config.summarizer),
    };
    Ok(Json(body))
}

#[utoipa::path(
    put,
    path = "/settings",
    tag = "Account",
    operation_id = "putSettings",
    summary = "Save your preferences",
    description = "Replaces all preferences. They become the defaults for new jobs.",
    request_body = SettingsBody,
    responses(
        (status = 200, description = "Preferences saved", body = SettingsBody),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthenticated (UNAUTHENTICATED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = %auth_user.user_id))]
pub async fn put_settings(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<SettingsBody>,
) -> Result<Json<SettingsBody>, AppError> {
    validate_settings(&payload, &state.config.summarizer, &state.registry)?;

    let saved = store::users::upsert_settings(&state.db, auth_user.user_id, payload.into()).await?;
    Ok(Json(saved.into()))
}

#[utoipa::path(
    get,
    path = "/storage",
    tag = "Account",
    operation_id = "getStorage",
    summary = "Storage usage",
    responses(
        (status = 200, description = "Bytes of summary text stored against the quota", body = StorageResponse),
        (status = 401, description = "Unauthenticated (UNAUTHENTICATED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn get_storage(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<StorageResponse>, AppError> {
    let usage = store::stats::storage_usage(&state.db, auth_user.user_id).await?;
    let limit_bytes = state.config.storage.limit_bytes;

    Ok(Json(StorageResponse {
        used_bytes: usage.used_bytes,
        limit_bytes,
        used_percent: store::stats::used_percent(usage.used_bytes, limit_bytes),
        summary_count: usage.summary_count,
    }))
}

#[utoipa::path(
    get,
    path = "/analytics",
    tag = "Account",
    operation_id = "getAnalytics",
    summary = "Usage analytics",
    responses(
        (status = 200, description = "Aggregates over your summaries", body = AnalyticsResponse),
        (status = 401, description = "Unauthenticated (UNAUTHENTICATED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn get_analytics(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<AnalyticsResponse>, AppError> {
    let analytics = store::stats::analytics(&state.db, auth_user.user_id, Utc::now()).await?;
    Ok(Json(analytics.into()))
}

#[utoipa::path(
    post,
    path = "/clear-data",
    tag = "Account",
    operation_id = "clearData",
    summary = "Delete all your data",
    description = "Removes every summary, evidence item and job you own in one transaction. The account and preferences remain.",
    responses(
        (status = 200, description = "Rows removed", body = ClearDataResponse),
        (status = 401, description = "Unauthenticated (UNAUTHENTICATED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn clear_data(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ClearDataResponse>, AppError> {
    let cleared = store::summaries::clear_user_data(&state.db, auth_user.user_id).await?;
    tracing::warn!(
        summaries = cleared.summaries,
        evidence = cleared.evidence,
        jobs = cleared.jobs,
        "Cleared user data"
    );
    Ok(Json(cleared.into()))
}

#[utoipa::path(
    get,
    path = "/models",
    tag = "Account",
    operation_id = "listModels",
    summary = "Available models",
    responses(
        (status = 200, description = "Configured model and provider pairs", body = ModelsResponse),
        (status = 401, description = "Unauthenticated (UNAUTHENTICATED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user))]
pub async fn list_models(
    _auth_user: AuthUser,
    State(state): State<AppState>,
) -> Json<ModelsResponse> {
    Json(ModelsResponse {
        models: state
            .registry
            .models()
            .into_iter()
            .map(ModelResponse::from)
            .collect(),
        default_model: state.config.summarizer.default_model.clone(),
        default_provider: state.config.summarizer.default_provider.clone(),
    })
}
