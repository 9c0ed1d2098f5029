use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::SourceType;
use store::jobs::NewSummary;
use tracing::instrument;
use uuid::Uuid;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::{AppJson, AppQuery};
use crate::models::shared::{PageQuery, Pagination};
use crate::models::summary::*;
use crate::state::AppState;
use crate::utils::export::{self, ExportFormat};
use crate::utils::synthesis::{self, SynthesisInput};

const IMPORTED_TITLE: &str = "Imported summary";

#[utoipa::path(
    get,
    path = "/",
    tag = "Summaries",
    operation_id = "listSummaries",
    summary = "List your summaries",
    description = "Newest first. `limit` 1-200, default 50.",
    params(PageQuery),
    responses(
        (status = 200, description = "A page of summaries", body = SummaryListResponse),
        (status = 400, description = "Invalid paging (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthenticated (UNAUTHENTICATED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(user_id = %auth_user.user_id))]
pub async fn list_summaries(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<PageQuery>,
) -> Result<Json<SummaryListResponse>, AppError> {
    let (limit, offset) = query.resolve(50, 200)?;
    page(&state, auth_user.user_id, limit, offset).await.map(Json)
}

#[utoipa::path(
    get,
    path = "/export",
    tag = "Summaries",
    operation_id = "exportSummaries",
    summary = "Export your summaries as JSON",
    description = "Full records, newest first. `limit` 1-5000, default 1000.",
    params(PageQuery),
    responses(
        (status = 200, description = "A page of full records", body = SummaryListResponse),
        (status = 400, description = "Invalid paging (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthenticated (UNAUTHENTICATED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(user_id = %auth_user.user_id))]
pub async fn export_summaries(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<PageQuery>,
) -> Result<Json<SummaryListResponse>, AppError> {
    let (limit, offset) = query.resolve(1000, 5000)?;
    page(&state, auth_user.user_id, limit, offset).await.map(Json)
}

async fn page(
    state: &AppState,
    user_id: Uuid,
    limit: u64,
    offset: u64,
) -> Result<SummaryListResponse, AppError> {
    let (rows, total) = store::summaries::list_owned(&state.db, user_id, limit, offset).await?;
    Ok(SummaryListResponse {
        data: rows.into_iter().map(SummaryResponse::from).collect(),
        pagination: Pagination {
            limit,
            offset,
            total,
        },
    })
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Summaries",
    operation_id = "getSummary",
    summary = "Get a summary",
    params(("id" = Uuid, Path, description = "Summary ID")),
    responses(
        (status = 200, description = "The summary", body = SummaryResponse),
        (status = 401, description = "Unauthenticated (UNAUTHENTICATED)", body = ErrorBody),
        (status = 404, description = "Summary not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn get_summary(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SummaryResponse>, AppError> {
    let summary = store::summaries::find_owned(&state.db, auth_user.user_id, id).await?;
    Ok(Json(summary.into()))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Summaries",
    operation_id = "updateSummary",
    summary = "Edit a summary",
    description = "Changes the title and/or the text. Absent fields are left unchanged.",
    params(("id" = Uuid, Path, description = "Summary ID")),
    request_body = UpdateSummaryRequest,
    responses(
        (status = 200, description = "Summary updated", body = SummaryResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthenticated (UNAUTHENTICATED)", body = ErrorBody),
        (status = 404, description = "Summary not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = %auth_user.user_id))]
pub async fn update_summary(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UpdateSummaryRequest>,
) -> Result<Json<SummaryResponse>, AppError> {
    validate_update_summary(&payload)?;

    let summary = store::summaries::update_owned(
        &state.db,
        auth_user.user_id,
        id,
        payload.title.map(|t| t.trim().to_string()),
        payload.content,
    )
    .await?;
    Ok(Json(summary.into()))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Summaries",
    operation_id = "deleteSummary",
    summary = "Delete a summary",
    description = "Removes the summary together with its evidence and the jobs that produced it.",
    params(("id" = Uuid, Path, description = "Summary ID")),
    responses(
        (status = 204, description = "Summary deleted"),
        (status = 401, description = "Unauthenticated (UNAUTHENTICATED)", body = ErrorBody),
        (status = 404, description = "Summary not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn delete_summary(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    store::summaries::delete_owned(&state.db, auth_user.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/{id}/export",
    tag = "Summaries",
    operation_id = "exportSummary",
    summary = "Download a summary",
    description = "Plain text, or markdown that also lists the summary's evidence.",
    params(("id" = Uuid, Path, description = "Summary ID"), ExportQuery),
    responses(
        (status = 200, description = "The summary as a file", content_type = "text/plain"),
        (status = 401, description = "Unauthenticated (UNAUTHENTICATED)", body = ErrorBody),
        (status = 404, description = "Summary not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(user_id = %auth_user.user_id))]
pub async fn export_summary(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppQuery(query): AppQuery<ExportQuery>,
) -> Result<Response, AppError> {
    let format = query.format.unwrap_or_default();
    let summary = store::summaries::find_owned(&state.db, auth_user.user_id, id).await?;

    let evidence = match format {
        ExportFormat::Md => store::summaries::list_evidence(&state.db, auth_user.user_id, id).await?,
        ExportFormat::Txt => Vec::new(),
    };
    let pairs: Vec<(&str, &str)> = evidence
        .iter()
        .map(|e| (e.claim.as_str(), e.excerpt.as_str()))
        .collect();

    let body = export::render_summary(&summary.content, &pairs, format);
    Ok(export::attachment(body, &format!("summary-{id}"), format))
}

#[utoipa::path(
    post,
    path = "/import",
    tag = "Summaries",
    operation_id = "importSummaries",
    summary = "Import summaries",
    description = "Stores up to 1000 summaries in one transaction. Items without content are skipped and counted.",
    request_body = ImportRequest,
    responses(
        (status = 201, description = "Summaries imported", body = ImportResponse),
        (status = 400, description = "Too many items (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthenticated (UNAUTHENTICATED)", body = ErrorBody),
        (status = 413, description = "Body too large (PAYLOAD_TOO_LARGE)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = %auth_user.user_id, items = payload.summaries.len()))]
pub async fn import_summaries(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<ImportRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.summaries.len() > MAX_IMPORT_ITEMS {
        return Err(AppError::Validation(format!(
            "At most {MAX_IMPORT_ITEMS} summaries per import"
        )));
    }

    let defaults = &state.config.summarizer;
    let total = payload.summaries.len();
    let items: Vec<NewSummary> = payload
        .summaries
        .into_iter()
        .filter_map(|item| {
            let content = item.content.filter(|c| !c.trim().is_empty())?;
            let title = item
                .title
                .map(|t| t.trim().chars().take(256).collect::<String>())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| IMPORTED_TITLE.to_string());
            Some(NewSummary {
                title,
                source_type: SourceType::Import,
                source_value: item.source_value.unwrap_or_default(),
                content,
                model: item.model.unwrap_or_else(|| defaults.default_model.clone()),
                provider: item
                    .provider
                    .unwrap_or_else(|| defaults.default_provider.clone()),
                num_sentences: item
                    .num_sentences
                    .unwrap_or(defaults.default_num_sentences as i32),
            })
        })
        .collect();

    let imported = store::summaries::import(&state.db, auth_user.user_id, items).await?;
    Ok((
        StatusCode::CREATED,
        Json(ImportResponse {
            imported,
            skipped: total - imported,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/synthesize",
    tag = "Summaries",
    operation_id = "synthesizeSummaries",
    summary = "Synthesize several summaries",
    description = "Groups the selected summaries by their dominant keyword and reports where they agree and diverge. Ids you do not own are ignored.",
    request_body = SynthesizeRequest,
    responses(
        (status = 200, description = "Synthesis", body = SynthesisResponse),
        (status = 400, description = "No usable summaries (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthenticated (UNAUTHENTICATED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = %auth_user.user_id))]
pub async fn synthesize(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<SynthesizeRequest>,
) -> Result<Json<SynthesisResponse>, AppError> {
    validate_synthesize_request(&payload)?;

    let summaries =
        store::summaries::find_many_owned(&state.db, auth_user.user_id, &payload.summary_ids)
            .await?;
    if summaries.is_empty() {
        return Err(AppError::Validation(
            "None of the requested summaries were found".into(),
        ));
    }

    let inputs: Vec<SynthesisInput<'_>> = summaries
        .iter()
        .map(|s| SynthesisInput {
            id: s.id,
            title: &s.title,
            content: &s.content,
        })
        .collect();
    Ok(Json(synthesis::synthesize(&inputs).into()))
}

#[utoipa::path(
    post,
    path = "/synthesize/export",
    tag = "Summaries",
    operation_id = "exportSynthesis",
    summary = "Download a synthesis",
    request_body = SynthesisExportRequest,
    responses(
        (status = 200, description = "The synthesis as a file", content_type = "text/plain"),
        (status = 400, description = "Empty consensus (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthenticated (UNAUTHENTICATED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(auth_user, payload), fields(user_id = %auth_user.user_id))]
pub async fn export_synthesis(
    auth_user: AuthUser,
    AppJson(payload): AppJson<SynthesisExportRequest>,
) -> Result<Response, AppError> {
    crate::models::shared::validate_non_empty(&payload.consensus, "consensus")?;
    let body = export::render_synthesis(&payload.consensus, payload.format);
    Ok(export::attachment(body, "synthesis", payload.format))
}
