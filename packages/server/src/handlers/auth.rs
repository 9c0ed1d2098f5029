use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::auth::{
    CredentialsRequest, TokenResponse, UserResponse, validate_login_request,
    validate_register_request,
};
use crate::state::AppState;
use crate::utils::{hash, jwt};

fn issue_token(state: &AppState, user: store::entity::user::Model) -> Result<TokenResponse, AppError> {
    let issued = jwt::sign(
        user.id,
        &state.config.auth.jwt_secret,
        state.config.auth.token_ttl_minutes,
    )
    .map_err(|e| AppError::Internal(format!("JWT sign error: {}", e)))?;

    Ok(TokenResponse {
        token: issued.token,
        token_type: "Bearer",
        expires_at: issued.expires_at,
        user: UserResponse::from(user),
    })
}

#[utoipa::path(
    post,
    path = "/register",
    tag = "Auth",
    operation_id = "register",
    summary = "Create an account",
    description = "Registers a new account and returns a bearer token for it.",
    request_body = CredentialsRequest,
    responses(
        (status = 201, description = "Account created", body = TokenResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 409, description = "Email already registered (CONFLICT)", body = ErrorBody),
        (status = 429, description = "Rate limited (RATE_LIMITED)", body = ErrorBody),
        (status = 503, description = "Rate limiter unavailable (SERVICE_UNAVAILABLE)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CredentialsRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_register_request(&payload)?;

    let hash = hash::hash_password(&payload.password)
        .map_err(|e| AppError::Internal(format!("Password hash error: {}", e)))?;
    let user = store::users::create_user(&state.db, &payload.normalized_email(), hash).await?;
    tracing::info!(user_id = %user.id, "Registered user");

    Ok((StatusCode::CREATED, Json(issue_token(&state, user)?)))
}

#[utoipa::path(
    post,
    path = "/login",
    tag = "Auth",
    operation_id = "login",
    summary = "Log in",
    description = "Exchanges email and password for a bearer token.",
    request_body = CredentialsRequest,
    responses(
        (status = 200, description = "Logged in", body = TokenResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Wrong email or password (INVALID_CREDENTIALS)", body = ErrorBody),
        (status = 429, description = "Rate limited (RATE_LIMITED)", body = ErrorBody),
        (status = 503, description = "Rate limiter unavailable (SERVICE_UNAVAILABLE)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CredentialsRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    validate_login_request(&payload)?;

    let user = store::users::find_user_by_email(&state.db, &payload.normalized_email())
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let is_valid = hash::verify_password(&payload.password, &user.password_hash)
        .map_err(|e| AppError::Internal(format!("Password verify error: {}", e)))?;
    if !is_valid {
        return Err(AppError::InvalidCredentials);
    }

    Ok(Json(issue_token(&state, user)?))
}

#[utoipa::path(
    post,
    path = "/logout",
    tag = "Auth",
    operation_id = "logout",
    summary = "Revoke the current token",
    description = "Revokes the presented token. Later requests with it are rejected as unauthenticated.",
    responses(
        (status = 204, description = "Token revoked"),
        (status = 401, description = "Unauthenticated (UNAUTHENTICATED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn logout(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    store::users::revoke_token(
        &state.db,
        auth_user.jti,
        auth_user.user_id,
        auth_user.expires_at,
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/me",
    tag = "Auth",
    operation_id = "me",
    summary = "Current account",
    responses(
        (status = 200, description = "The authenticated account", body = UserResponse),
        (status = 401, description = "Unauthenticated (UNAUTHENTICATED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn me(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UserResponse>, AppError> {
    let user = store::users::find_user(&state.db, auth_user.user_id)
        .await?
        .ok_or(AppError::Unauthenticated)?;
    Ok(Json(UserResponse::from(user)))
}
