use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT Claims structure.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid, // User ID
    pub jti: Uuid, // Token ID, the revocation key
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

/// A signed token and its expiry.
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Sign a new HS256 token for a user.
pub fn sign(user_id: Uuid, secret: &str, ttl_minutes: i64) -> Result<IssuedToken> {
    let now = Utc::now();
    let expires_at = now
        .checked_add_signed(Duration::minutes(ttl_minutes))
        .context("token expiry out of range")?;

    let claims = Claims {
        sub: user_id,
        jti: Uuid::new_v4(),
        iat: now.timestamp(),
        exp: expires_at.timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(IssuedToken { token, expires_at })
}

/// Verify signature and expiry, then decode the claims.
pub fn verify(token: &str, secret: &str) -> Result<Claims> {
    let mut validation = Validation::default();
    validation.leeway = 0;
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;
    Ok(token_data.claims)
}
