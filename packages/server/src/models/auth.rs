use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Request body for registration and login.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CredentialsRequest {
    /// Account email address.
    #[schema(example = "alice@example.com")]
    pub email: String,
    /// Password (8-128 characters).
    #[schema(example = "s3cure_P@ss!")]
    pub password: String,
}

impl CredentialsRequest {
    /// Email trimmed and lowercased, the form stored in the database.
    pub fn normalized_email(&self) -> String {
        self.email.trim().to_lowercase()
    }
}

pub fn validate_register_request(payload: &CredentialsRequest) -> Result<(), AppError> {
    let email = payload.normalized_email();
    let valid_email = email.len() <= 254
        && email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid_email {
        return Err(AppError::Validation("A valid email address is required".into()));
    }
    let len = payload.password.chars().count();
    if !(8..=128).contains(&len) {
        return Err(AppError::Validation(
            "Password must be 8-128 characters".into(),
        ));
    }
    Ok(())
}

pub fn validate_login_request(payload: &CredentialsRequest) -> Result<(), AppError> {
    if payload.email.trim().is_empty() {
        return Err(AppError::Validation("Email must not be empty".into()));
    }
    if payload.password.is_empty() {
        return Err(AppError::Validation("Password must not be empty".into()));
    }
    Ok(())
}

/// Public view of an account.
#[derive(Serialize, utoipa::ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    #[schema(example = "alice@example.com")]
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<store::entity::user::Model> for UserResponse {
    fn from(user: store::entity::user::Model) -> Self {
        Self {
            id: user.id,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

/// Issued bearer token.
#[derive(Serialize, utoipa::ToSchema)]
pub struct TokenResponse {
    #[schema(example = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...")]
    pub token: String,
    #[schema(example = "Bearer")]
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
    pub user: UserResponse,
}
