use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A claim from a summary paired with the excerpt supporting it.
/// Owned through its summary.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "evidence")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(indexed)]
    pub summary_id: Uuid,
    #[sea_orm(belongs_to, from = "summary_id", to = "id")]
    pub summary: HasOne<super::summary::Entity>,

    #[sea_orm(column_type = "Text")]
    pub claim: String,
    #[sea_orm(column_type = "Text")]
    pub excerpt: String,
    /// e.g. "sentence 4". NULL when unknown.
    pub location: Option<String>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
