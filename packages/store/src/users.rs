use chrono::{DateTime, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set, SqlErr,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::entity::{revoked_token, user, user_settings};
use crate::error::StoreError;

/// Insert a user. A duplicate email is [`StoreError::Conflict`].
pub async fn create_user<C: ConnectionTrait>(
    db: &C,
    email: &str,
    password_hash: String,
) -> Result<user::Model, StoreError> {
    let new_user = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        password_hash: Set(password_hash),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    new_user.insert(db).await.map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            StoreError::Conflict("Email already registered".into())
        }
        _ => StoreError::Db(e),
    })
}

pub async fn find_user_by_email<C: ConnectionTrait>(
    db: &C,
    email: &str,
) -> Result<Option<user::Model>, StoreError> {
    Ok(user::Entity::find()
        .filter(user::Column::Email.eq(email))
        .one(db)
        .await?)
}

pub async fn find_user<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
) -> Result<Option<user::Model>, StoreError> {
    Ok(user::Entity::find_by_id(user_id).one(db).await?)
}

/// Record a token id as revoked. Revoking twice is not an error.
pub async fn revoke_token<C: ConnectionTrait>(
    db: &C,
    jti: Uuid,
    user_id: Uuid,
    expires_at: DateTime<Utc>,
) -> Result<(), StoreError> {
    let row = revoked_token::ActiveModel {
        jti: Set(jti),
        user_id: Set(user_id),
        expires_at: Set(expires_at),
        revoked_at: Set(Utc::now()),
        ..Default::default()
    };

    let result = revoked_token::Entity::insert(row)
        .on_conflict(
            OnConflict::column(revoked_token::Column::Jti)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await;

    match result {
        Ok(_) | Err(DbErr::RecordNotInserted) => {
            debug!(jti = %jti, user_id = %user_id, "Revoked token");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn is_token_revoked<C: ConnectionTrait>(db: &C, jti: Uuid) -> Result<bool, StoreError> {
    Ok(revoked_token::Entity::find_by_id(jti)
        .one(db)
        .await?
        .is_some())
}

/// Drop revocation rows for tokens that have expired on their own.
pub async fn purge_expired_revocations<C: ConnectionTrait>(
    db: &C,
    now: DateTime<Utc>,
) -> Result<u64, StoreError> {
    let removed = revoked_token::Entity::delete_many()
        .filter(revoked_token::Column::ExpiresAt.lt(now))
        .exec(db)
        .await?
        .rows_affected;
    if removed > 0 {
        info!(removed, "Purged expired token revocations");
    }
    Ok(removed)
}

/// Stored preferences; `None` until the user saves them once.
pub async fn get_settings<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
) -> Result<Option<user_settings::Model>, StoreError> {
    Ok(user_settings::Entity::find_by_id(user_id).one(db).await?)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsUpdate {
    pub default_model: String,
    pub default_provider: String,
    pub summary_length: i32,
    pub citation_handling: String,
    pub auto_save: bool,
}

/// Insert or replace the user's preferences.
pub async fn upsert_settings<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    update: SettingsUpdate,
) -> Result<user_settings::Model, StoreError> {
    let row = user_settings::ActiveModel {
        user_id: Set(user_id),
        default_model: Set(update.default_model),
        default_provider: Set(update.default_provider),
        summary_length: Set(update.summary_length),
        citation_handling: Set(update.citation_handling),
        auto_save: Set(update.auto_save),
        updated_at: Set(Utc::now()),
        ..Default::default()
    };

    user_settings::Entity::insert(row)
        .on_conflict(
            OnConflict::column(user_settings::Column::UserId)
                .update_columns([
                    user_settings::Column::DefaultModel,
                    user_settings::Column::DefaultProvider,
                    user_settings::Column::SummaryLength,
                    user_settings::Column::CitationHandling,
                    user_settings::Column::AutoSave,
                    user_settings::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    user_settings::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| StoreError::Corrupt("settings missing after upsert".into()))
}
