use common::JobStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "job")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(indexed)]
    pub user_id: Uuid,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    #[sea_orm(indexed)]
    pub status: JobStatus,
    /// Serialized `common::JobInput`.
    #[sea_orm(column_type = "Json")]
    pub input: Json,

    /// Set exactly when `status` is succeeded.
    #[sea_orm(indexed)]
    pub result_summary_id: Option<Uuid>,
    /// User-facing failure message, set exactly when `status` is failed.
    #[sea_orm(column_type = "Text", nullable)]
    pub error: Option<String>,

    /// Number of successful claims, including reclaims after lease expiry.
    #[sea_orm(default_value = 0)]
    pub attempts: i32,
    pub worker_id: Option<String>,
    pub lease_expires_at: Option<DateTimeUtc>,
    /// Last time the reaper handed this job back to a consumer. Cleared by a claim.
    pub redelivered_at: Option<DateTimeUtc>,

    pub created_at: DateTimeUtc,
    pub started_at: Option<DateTimeUtc>,
    pub completed_at: Option<DateTimeUtc>,
}

impl ActiveModelBehavior for ActiveModel {}
