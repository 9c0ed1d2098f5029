use common::SourceType;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "summary")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(indexed)]
    pub user_id: Uuid,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    pub title: String,
    pub source_type: SourceType,
    /// URL, filename, or a preview of pasted text.
    #[sea_orm(column_type = "Text")]
    pub source_value: String,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub model: String,
    pub provider: String,
    pub num_sentences: i32,

    #[sea_orm(has_many)]
    pub evidence: HasMany<super::evidence::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
