use axum::Json;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::config::SummarizerConfig;
use common::{JobInput, SourceInput};
use sea_orm::DatabaseConnection;
use summarizer::fetch::validate_url;
use summarizer::upload::decode_upload;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::dispatcher::DispatchMode;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::{AppJson, AppQuery};
use crate::models::job::*;
use crate::models::shared::{PageQuery, Pagination};
use crate::models::summary::SummaryResponse;
use crate::state::AppState;

/// Multipart overhead allowed on top of the file bytes.
const MULTIPART_SLACK: usize = 64 * 1024;

/// Body limit layer for single-file uploads.
pub fn upload_body_limit(config: &SummarizerConfig) -> DefaultBodyLimit {
    DefaultBodyLimit::max(config.max_upload_bytes + MULTIPART_SLACK)
}

/// Body limit layer for batch uploads.
pub fn batch_body_limit(config: &SummarizerConfig) -> DefaultBodyLimit {
    DefaultBodyLimit::max(config.max_upload_bytes * MAX_BATCH_FILES + MULTIPART_SLACK)
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Jobs",
    operation_id = "createJob",
    summary = "Submit text or a URL for summarization",
    description = "Validates the input and options, records a job and starts it. With a working queue the job is queued (202) and must be polled; otherwise it runs within the request (200) and the response carries its terminal state and summary.",
    request_body = CreateJobRequest,
    responses(
        (status = 200, description = "Job ran inline", body = JobResponse),
        (status = 202, description = "Job queued", body = JobResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthenticated (UNAUTHENTICATED)", body = ErrorBody),
        (status = 413, description = "Text too large (PAYLOAD_TOO_LARGE)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = %auth_user.user_id, source_type = ?payload.source_type))]
pub async fn create_job(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateJobRequest>,
) -> Result<impl IntoResponse, AppError> {
    let source = match payload.source_type {
        RequestSource::Text => {
            let text = payload
                .text
                .ok_or_else(|| AppError::Validation("text is required".into()))?;
            validate_text(&text, &state.config.summarizer)?;
            SourceInput::Text { text }
        }
        RequestSource::Url => {
            let url = payload
                .url
                .ok_or_else(|| AppError::Validation("url is required".into()))?;
            SourceInput::Url {
                url: validate_url(&url)?.to_string(),
            }
        }
    };

    let options = resolve_options(&state, auth_user.user_id, &payload.options).await?;
    submit(&state, auth_user.user_id, JobInput { source, options }).await
}

#[utoipa::path(
    post,
    path = "/upload",
    tag = "Jobs",
    operation_id = "uploadJob",
    summary = "Submit a text file for summarization",
    description = "Multipart form with one `file` field (txt, md or rst, UTF-8) and optional `num_sentences`, `model`, `provider` and `keep_citations` fields. Dispatched like a JSON submission.",
    request_body(content_type = "multipart/form-data", description = "File and options"),
    responses(
        (status = 200, description = "Job ran inline", body = JobResponse),
        (status = 202, description = "Job queued", body = JobResponse),
        (status = 400, description = "Invalid file or options (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthenticated (UNAUTHENTICATED)", body = ErrorBody),
        (status = 413, description = "File too large (PAYLOAD_TOO_LARGE)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart), fields(user_id = %auth_user.user_id))]
pub async fn upload_job(
    auth_user: AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let form = read_form(multipart).await?;
    let (filename, bytes) = match form.files.into_iter().next() {
        Some(file) => file,
        None => return Err(AppError::Validation("file is required".into())),
    };

    let (filename, text) = decode_upload(filename.as_deref(), &bytes, &state.config.summarizer)?;
    validate_text(&text, &state.config.summarizer)?;
    let options = resolve_options(&state, auth_user.user_id, &form.options).await?;

    submit(
        &state,
        auth_user.user_id,
        JobInput {
            source: SourceInput::File { filename, text },
            options,
        },
    )
    .await
}

#[utoipa::path(
    post,
    path = "/batch",
    tag = "Jobs",
    operation_id = "batchJobs",
    summary = "Submit several files at once",
    description = "Multipart form with up to 20 `file` fields and shared option fields. Each valid file becomes its own job; invalid files are reported in `skipped`.",
    request_body(content_type = "multipart/form-data", description = "Files and options"),
    responses(
        (status = 200, description = "All jobs ran inline", body = BatchJobResponse),
        (status = 202, description = "At least one job queued", body = BatchJobResponse),
        (status = 400, description = "No valid files or invalid options (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthenticated (UNAUTHENTICATED)", body = ErrorBody),
        (status = 413, description = "Request too large (PAYLOAD_TOO_LARGE)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart), fields(user_id = %auth_user.user_id))]
pub async fn batch_jobs(
    auth_user: AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let form = read_form(multipart).await?;
    if form.files.is_empty() {
        return Err(AppError::Validation("At least one file is required".into()));
    }
    if form.files.len() > MAX_BATCH_FILES {
        return Err(AppError::Validation(format!(
            "At most {MAX_BATCH_FILES} files per batch"
        )));
    }
    let options = resolve_options(&state, auth_user.user_id, &form.options).await?;

    let mut inputs = Vec::new();
    let mut skipped = Vec::new();
    for (filename, bytes) in form.files {
        let decoded = decode_upload(filename.as_deref(), &bytes, &state.config.summarizer)
            .map_err(AppError::from)
            .and_then(|(name, text)| {
                validate_text(&text, &state.config.summarizer)?;
                Ok((name, text))
            });
        match decoded {
            Ok((filename, text)) => inputs.push(JobInput {
                source: SourceInput::File { filename, text },
                options: options.clone(),
            }),
            Err(e) => {
                let reason = match e {
                    AppError::Validation(msg) | AppError::PayloadTooLarge(msg) => msg,
                    other => return Err(other),
                };
                skipped.push(SkippedFile { filename, reason });
            }
        }
    }
    if inputs.is_empty() {
        return Err(AppError::Validation("No valid files were uploaded".into()));
    }

    let mut jobs = Vec::with_capacity(inputs.len());
    for input in inputs {
        let (_, Json(job)) = submit(&state, auth_user.user_id, input).await?;
        jobs.push(job);
    }
    let status = if jobs.iter().any(|j| j.mode == Some(DispatchMode::Queued)) {
        StatusCode::ACCEPTED
    } else {
        StatusCode::OK
    };

    Ok((status, Json(BatchJobResponse { jobs, skipped })))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Jobs",
    operation_id = "listJobs",
    summary = "List your jobs",
    description = "Newest first. `limit` 1-200, default 50.",
    params(PageQuery),
    responses(
        (status = 200, description = "A page of jobs", body = JobListResponse),
        (status = 400, description = "Invalid paging (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthenticated (UNAUTHENTICATED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(user_id = %auth_user.user_id))]
pub async fn list_jobs(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<PageQuery>,
) -> Result<Json<JobListResponse>, AppError> {
    let (limit, offset) = query.resolve(50, 200)?;
    let (jobs, total) = store::jobs::list_owned(&state.db, auth_user.user_id, limit, offset).await?;

    Ok(Json(JobListResponse {
        data: jobs.into_iter().map(JobResponse::from).collect(),
        pagination: Pagination {
            limit,
            offset,
            total,
        },
    }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Jobs",
    operation_id = "getJob",
    summary = "Poll a job",
    description = "Status, error and timestamps of one of your jobs, with the summary once it has succeeded.",
    params(("id" = Uuid, Path, description = "Job ID")),
    responses(
        (status = 200, description = "The job", body = JobResponse),
        (status = 401, description = "Unauthenticated (UNAUTHENTICATED)", body = ErrorBody),
        (status = 404, description = "Job not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn get_job(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobResponse>, AppError> {
    let job = store::jobs::find_owned(&state.db, auth_user.user_id, id).await?;
    let response = with_summary(&state.db, auth_user.user_id, JobResponse::from(job)).await?;
    Ok(Json(response))
}

async fn resolve_options(
    state: &AppState,
    user_id: Uuid,
    overrides: &OptionOverrides,
) -> Result<common::SummaryOptions, AppError> {
    let settings = store::users::get_settings(&state.db, user_id).await?;
    overrides.resolve(settings.as_ref(), &state.config.summarizer, &state.registry)
}

async fn submit(
    state: &AppState,
    user_id: Uuid,
    input: JobInput,
) -> Result<(StatusCode, Json<JobResponse>), AppError> {
    let dispatched = state.dispatcher.submit(user_id, &input).await?;
    let status = match dispatched.mode {
        DispatchMode::Queued => StatusCode::ACCEPTED,
        DispatchMode::Inline => StatusCode::OK,
    };
    let response = with_summary(&state.db, user_id, JobResponse::from(dispatched)).await?;
    Ok((status, Json(response)))
}

async fn with_summary(
    db: &DatabaseConnection,
    user_id: Uuid,
    mut response: JobResponse,
) -> Result<JobResponse, AppError> {
    if let Some(summary_id) = response.result_summary_id {
        let summary = store::summaries::find_owned(db, user_id, summary_id).await?;
        response.summary = Some(SummaryResponse::from(summary));
    }
    Ok(response)
}

fn validate_text(text: &str, config: &SummarizerConfig) -> Result<(), AppError> {
    if text.trim().is_empty() {
        return Err(AppError::Validation("text must not be empty".into()));
    }
    if text.len() > config.max_input_bytes {
        return Err(AppError::PayloadTooLarge(format!(
            "Text exceeds {} bytes",
            config.max_input_bytes
        )));
    }
    Ok(())
}

/// Files and option fields of a job upload form.
struct UploadForm {
    files: Vec<(Option<String>, Vec<u8>)>,
    options: OptionOverrides,
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut form = UploadForm {
        files: Vec::new(),
        options: OptionOverrides::default(),
    };

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().map(str::to_string);
                let data = field.bytes().await.map_err(multipart_error)?;
                form.files.push((filename, data.to_vec()));
            }
            "num_sentences" => {
                let value = field.text().await.map_err(multipart_error)?;
                let parsed = value.trim().parse().map_err(|_| {
                    AppError::Validation("num_sentences must be a positive integer".into())
                })?;
                form.options.num_sentences = Some(parsed);
            }
            "model" => form.options.model = Some(field.text().await.map_err(multipart_error)?),
            "provider" => {
                form.options.provider = Some(field.text().await.map_err(multipart_error)?)
            }
            "keep_citations" => {
                let value = field.text().await.map_err(multipart_error)?;
                form.options.keep_citations = Some(parse_bool(&value)?);
            }
            other => warn!(field = other, "Ignoring unknown multipart field"),
        }
    }
    Ok(form)
}

fn parse_bool(value: &str) -> Result<bool, AppError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Ok(true),
        "false" | "0" | "off" | "no" | "" => Ok(false),
        _ => Err(AppError::Validation(
            "keep_citations must be true or false".into(),
        )),
    }
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("Upload is too large".into())
    } else {
        AppError::Validation(format!("Multipart error: {e}"))
    }
}
