use axum::{extract::FromRequestParts, http::request::Parts};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;
use crate::utils::jwt;

/// Authenticated user extracted from the `Authorization: Bearer <token>` header.
///
/// Add this as a handler parameter to require authentication. Every failure,
/// whether the header is missing, the token malformed, expired or revoked,
/// becomes the same `Unauthenticated` error.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    /// Token id, used to revoke this token on logout.
    pub jti: Uuid,
    pub expires_at: DateTime<Utc>,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(AppError::Unauthenticated)?;

        let claims = jwt::verify(token, &state.config.auth.jwt_secret).map_err(|e| {
            tracing::debug!(error = %e, "Rejected bearer token");
            AppError::Unauthenticated
        })?;
        let expires_at = claims.expires_at().ok_or(AppError::Unauthenticated)?;

        if store::users::is_token_revoked(&state.db, claims.jti).await? {
            tracing::debug!(jti = %claims.jti, "Rejected revoked token");
            return Err(AppError::Unauthenticated);
        }

        Ok(AuthUser {
            user_id: claims.sub,
            jti: claims.jti,
            expires_at,
        })
    }
}
