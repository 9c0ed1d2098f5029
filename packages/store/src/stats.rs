//! Per-user aggregates. Everything is computed by the database; no summary
//! rows are loaded into memory.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbBackend, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};
use uuid::Uuid;

use crate::entity::summary;
use crate::error::StoreError;

/// Days covered by [`Analytics::daily_activity`].
pub const ACTIVITY_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageUsage {
    pub used_bytes: i64,
    pub summary_count: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Analytics {
    pub total_summaries: i64,
    pub model_usage: BTreeMap<String, i64>,
    /// Summary count per requested sentence count.
    pub length_distribution: BTreeMap<i32, i64>,
    /// Mean requested sentence count.
    pub average_length: f64,
    pub unique_models: usize,
    /// Summary count per `YYYY-MM-DD`, last [`ACTIVITY_WINDOW_DAYS`] days.
    pub daily_activity: BTreeMap<String, i64>,
}

/// Bytes of summary text the user stores, and how many summaries.
pub async fn storage_usage<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
) -> Result<StorageUsage, StoreError> {
    let byte_len = match db.get_database_backend() {
        DbBackend::Sqlite => "COALESCE(SUM(LENGTH(CAST(content AS BLOB))), 0)",
        _ => "COALESCE(SUM(OCTET_LENGTH(content)), 0)",
    };

    let row: Option<(i64, i64)> = summary::Entity::find()
        .select_only()
        .column_as(Expr::cust(byte_len), "used_bytes")
        .column_as(Expr::cust("COUNT(*)"), "summary_count")
        .filter(summary::Column::UserId.eq(user_id))
        .into_tuple()
        .one(db)
        .await?;

    let (used_bytes, summary_count) = row.unwrap_or((0, 0));
    Ok(StorageUsage {
        used_bytes,
        summary_count,
    })
}

/// Integer percentage of `limit` used, capped at 100.
pub fn used_percent(used: i64, limit: i64) -> u8 {
    if limit <= 0 {
        return 0;
    }
    ((used.max(0) as f64 / limit as f64) * 100.0).min(100.0) as u8
}

pub async fn analytics<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Analytics, StoreError> {
    let owned = summary::Entity::find().filter(summary::Column::UserId.eq(user_id));

    let model_usage: BTreeMap<String, i64> = owned
        .clone()
        .select_only()
        .column(summary::Column::Model)
        .column_as(Expr::cust("COUNT(*)"), "count")
        .group_by(summary::Column::Model)
        .into_tuple::<(String, i64)>()
        .all(db)
        .await?
        .into_iter()
        .collect();

    let length_distribution: BTreeMap<i32, i64> = owned
        .clone()
        .select_only()
        .column(summary::Column::NumSentences)
        .column_as(Expr::cust("COUNT(*)"), "count")
        .group_by(summary::Column::NumSentences)
        .into_tuple::<(i32, i64)>()
        .all(db)
        .await?
        .into_iter()
        .collect();

    let average_length: Option<f64> = owned
        .clone()
        .select_only()
        .column_as(
            Expr::cust("CAST(AVG(num_sentences) AS DOUBLE PRECISION)"),
            "average",
        )
        .into_tuple::<Option<f64>>()
        .one(db)
        .await?
        .flatten();

    let day = "SUBSTR(CAST(created_at AS TEXT), 1, 10)";
    let daily_activity: BTreeMap<String, i64> = owned
        .filter(summary::Column::CreatedAt.gte(now - Duration::days(ACTIVITY_WINDOW_DAYS)))
        .select_only()
        .column_as(Expr::cust(day), "day")
        .column_as(Expr::cust("COUNT(*)"), "count")
        .group_by(Expr::cust(day))
        .order_by_asc(Expr::cust(day))
        .into_tuple::<(String, i64)>()
        .all(db)
        .await?
        .into_iter()
        .collect();

    Ok(Analytics {
        total_summaries: model_usage.values().sum(),
        unique_models: model_usage.len(),
        model_usage,
        length_distribution,
        average_length: average_length.unwrap_or(0.0),
        daily_activity,
    })
}
