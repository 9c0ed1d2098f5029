use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use store::summaries::NewEvidence;
use tracing::instrument;
use uuid::Uuid;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::evidence::*;
use crate::state::AppState;
use crate::utils::evidence::generate;

async fn evidence_list(
    state: &AppState,
    user_id: Uuid,
    summary_id: Uuid,
) -> Result<EvidenceListResponse, AppError> {
    let items = store::summaries::list_evidence(&state.db, user_id, summary_id).await?;
    Ok(EvidenceListResponse {
        summary_id,
        items: items.into_iter().map(EvidenceResponse::from).collect(),
    })
}

#[utoipa::path(
    get,
    path = "/{id}/evidence",
    tag = "Evidence",
    operation_id = "listEvidence",
    summary = "List a summary's evidence",
    params(("id" = Uuid, Path, description = "Summary ID")),
    responses(
        (status = 200, description = "Evidence items", body = EvidenceListResponse),
        (status = 401, description = "Unauthenticated (UNAUTHENTICATED)", body = ErrorBody),
        (status = 404, description = "Summary not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn list_evidence(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<EvidenceListResponse>, AppError> {
    evidence_list(&state, auth_user.user_id, id).await.map(Json)
}

#[utoipa::path(
    post,
    path = "/{id}/evidence",
    tag = "Evidence",
    operation_id = "createEvidence",
    summary = "Add an evidence item",
    description = "Links a claim to a supporting excerpt. Returns the summary's full evidence list.",
    params(("id" = Uuid, Path, description = "Summary ID")),
    request_body = CreateEvidenceRequest,
    responses(
        (status = 201, description = "Evidence added", body = EvidenceListResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthenticated (UNAUTHENTICATED)", body = ErrorBody),
        (status = 404, description = "Summary not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = %auth_user.user_id))]
pub async fn create_evidence(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<CreateEvidenceRequest>,
) -> Result<(StatusCode, Json<EvidenceListResponse>), AppError> {
    validate_create_evidence(&payload)?;

    let item = NewEvidence {
        claim: payload.claim.trim().to_string(),
        excerpt: payload.excerpt.trim().to_string(),
        location: payload.location.filter(|l| !l.trim().is_empty()),
    };
    store::summaries::add_evidence(&state.db, auth_user.user_id, id, vec![item]).await?;

    let list = evidence_list(&state, auth_user.user_id, id).await?;
    Ok((StatusCode::CREATED, Json(list)))
}

#[utoipa::path(
    patch,
    path = "/{id}/evidence/{evidence_id}",
    tag = "Evidence",
    operation_id = "updateEvidence",
    summary = "Edit an evidence item",
    description = "Absent fields are left unchanged; `location: null` clears the location. Returns the summary's full evidence list.",
    params(
        ("id" = Uuid, Path, description = "Summary ID"),
        ("evidence_id" = Uuid, Path, description = "Evidence ID"),
    ),
    request_body = UpdateEvidenceRequest,
    responses(
        (status = 200, description = "Evidence updated", body = EvidenceListResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthenticated (UNAUTHENTICATED)", body = ErrorBody),
        (status = 404, description = "Summary or evidence not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = %auth_user.user_id))]
pub async fn update_evidence(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((id, evidence_id)): Path<(Uuid, Uuid)>,
    AppJson(payload): AppJson<UpdateEvidenceRequest>,
) -> Result<Json<EvidenceListResponse>, AppError> {
    validate_update_evidence(&payload)?;

    store::summaries::update_evidence(
        &state.db,
        auth_user.user_id,
        id,
        evidence_id,
        payload.claim.map(|c| c.trim().to_string()),
        payload.excerpt.map(|e| e.trim().to_string()),
        payload.location,
    )
    .await?;

    evidence_list(&state, auth_user.user_id, id).await.map(Json)
}

#[utoipa::path(
    delete,
    path = "/{id}/evidence/{evidence_id}",
    tag = "Evidence",
    operation_id = "deleteEvidence",
    summary = "Delete an evidence item",
    params(
        ("id" = Uuid, Path, description = "Summary ID"),
        ("evidence_id" = Uuid, Path, description = "Evidence ID"),
    ),
    responses(
        (status = 204, description = "Evidence deleted"),
        (status = 401, description = "Unauthenticated (UNAUTHENTICATED)", body = ErrorBody),
        (status = 404, description = "Summary or evidence not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn delete_evidence(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((id, evidence_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    store::summaries::delete_evidence(&state.db, auth_user.user_id, id, evidence_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/{id}/evidence/generate",
    tag = "Evidence",
    operation_id = "generateEvidence",
    summary = "Generate evidence",
    description = "Pairs the first three sentences of the summary with the best matching sentences of its source text. Summaries without stored source text get placeholder excerpts.",
    params(("id" = Uuid, Path, description = "Summary ID")),
    responses(
        (status = 201, description = "Evidence generated", body = EvidenceListResponse),
        (status = 401, description = "Unauthenticated (UNAUTHENTICATED)", body = ErrorBody),
        (status = 404, description = "Summary not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn generate_evidence(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<EvidenceListResponse>), AppError> {
    let summary = store::summaries::find_owned(&state.db, auth_user.user_id, id).await?;
    let source = store::summaries::source_text(&state.db, auth_user.user_id, id).await?;

    let items = generate(&summary.content, source.as_deref());
    tracing::info!(summary_id = %id, count = items.len(), "Generated evidence");
    store::summaries::add_evidence(&state.db, auth_user.user_id, id, items).await?;

    let list = evidence_list(&state, auth_user.user_id, id).await?;
    Ok((StatusCode::CREATED, Json(list)))
}
