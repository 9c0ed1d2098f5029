use chrono::Utc;
use sea_orm::sea_query::Query;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionSession, TransactionTrait,
};
use tracing::info;
use uuid::Uuid;

use crate::entity::{evidence, job, summary};
use crate::error::StoreError;
use crate::jobs::{NewSummary, decode_input};

/// Find a summary owned by `user_id`.
pub async fn find_owned<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    summary_id: Uuid,
) -> Result<summary::Model, StoreError> {
    summary::Entity::find_by_id(summary_id)
        .filter(summary::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or(StoreError::NotFound("Summary"))
}

/// A page of the owner's summaries, newest first, with the total count.
pub async fn list_owned<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    limit: u64,
    offset: u64,
) -> Result<(Vec<summary::Model>, u64), StoreError> {
    let query = summary::Entity::find().filter(summary::Column::UserId.eq(user_id));
    let total = query.clone().count(db).await?;
    let rows = query
        .order_by_desc(summary::Column::CreatedAt)
        .order_by_desc(summary::Column::Id)
        .limit(limit)
        .offset(offset)
        .all(db)
        .await?;
    Ok((rows, total))
}

/// Owned summaries among `ids`. Ids the caller does not own are dropped.
pub async fn find_many_owned<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    ids: &[Uuid],
) -> Result<Vec<summary::Model>, StoreError> {
    Ok(summary::Entity::find()
        .filter(summary::Column::UserId.eq(user_id))
        .filter(summary::Column::Id.is_in(ids.iter().copied()))
        .order_by_asc(summary::Column::CreatedAt)
        .all(db)
        .await?)
}

/// Edit the title and/or content of an owned summary.
pub async fn update_owned<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    summary_id: Uuid,
    title: Option<String>,
    content: Option<String>,
) -> Result<summary::Model, StoreError> {
    let existing = find_owned(db, user_id, summary_id).await?;
    let mut active: summary::ActiveModel = existing.into();
    if let Some(title) = title {
        active.title = Set(title);
    }
    if let Some(content) = content {
        active.content = Set(content);
    }
    active.updated_at = Set(Utc::now());
    Ok(active.update(db).await?)
}

/// Delete an owned summary with its evidence and the jobs that produced it.
///
/// Jobs go too so that no `succeeded` job is left pointing at nothing.
pub async fn delete_owned<C: ConnectionTrait + TransactionTrait>(
    db: &C,
    user_id: Uuid,
    summary_id: Uuid,
) -> Result<(), StoreError> {
    let txn = db.begin().await?;
    find_owned(&txn, user_id, summary_id).await?;

    evidence::Entity::delete_many()
        .filter(evidence::Column::SummaryId.eq(summary_id))
        .exec(&txn)
        .await?;
    job::Entity::delete_many()
        .filter(job::Column::UserId.eq(user_id))
        .filter(job::Column::ResultSummaryId.eq(summary_id))
        .exec(&txn)
        .await?;
    summary::Entity::delete_by_id(summary_id).exec(&txn).await?;

    txn.commit().await?;
    info!(summary_id = %summary_id, user_id = %user_id, "Deleted summary");
    Ok(())
}

/// Insert summaries created outside the job pipeline, all or nothing.
pub async fn import<C: ConnectionTrait + TransactionTrait>(
    db: &C,
    user_id: Uuid,
    items: Vec<NewSummary>,
) -> Result<usize, StoreError> {
    if items.is_empty() {
        return Ok(0);
    }
    let count = items.len();
    let now = Utc::now();
    let txn = db.begin().await?;
    for item in items {
        summary::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            title: Set(item.title),
            source_type: Set(item.source_type),
            source_value: Set(item.source_value),
            content: Set(item.content),
            model: Set(item.model),
            provider: Set(item.provider),
            num_sentences: Set(item.num_sentences),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }
    txn.commit().await?;
    info!(user_id = %user_id, count, "Imported summaries");
    Ok(count)
}

/// The text a summary was generated from, when it is still available.
///
/// Only pasted and uploaded sources keep their text on the job; URL sources
/// would need a refetch and return `None`.
pub async fn source_text<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    summary_id: Uuid,
) -> Result<Option<String>, StoreError> {
    let Some(job) = job::Entity::find()
        .filter(job::Column::UserId.eq(user_id))
        .filter(job::Column::ResultSummaryId.eq(summary_id))
        .one(db)
        .await?
    else {
        return Ok(None);
    };
    let input = decode_input(&job)?;
    Ok(input.source.inline_text().map(str::to_string))
}

/// Evidence of an owned summary, oldest first.
pub async fn list_evidence<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    summary_id: Uuid,
) -> Result<Vec<evidence::Model>, StoreError> {
    find_owned(db, user_id, summary_id).await?;
    Ok(evidence::Entity::find()
        .filter(evidence::Column::SummaryId.eq(summary_id))
        .order_by_asc(evidence::Column::CreatedAt)
        .all(db)
        .await?)
}

/// Evidence fields supplied by the owner or the generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvidence {
    pub claim: String,
    pub excerpt: String,
    pub location: Option<String>,
}

pub async fn add_evidence<C: ConnectionTrait + TransactionTrait>(
    db: &C,
    user_id: Uuid,
    summary_id: Uuid,
    items: Vec<NewEvidence>,
) -> Result<Vec<evidence::Model>, StoreError> {
    let txn = db.begin().await?;
    find_owned(&txn, user_id, summary_id).await?;

    let mut created = Vec::with_capacity(items.len());
    for item in items {
        let row = evidence::ActiveModel {
            id: Set(Uuid::new_v4()),
            summary_id: Set(summary_id),
            claim: Set(item.claim),
            excerpt: Set(item.excerpt),
            location: Set(item.location),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        created.push(row);
    }
    txn.commit().await?;
    Ok(created)
}

async fn find_owned_evidence<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    summary_id: Uuid,
    evidence_id: Uuid,
) -> Result<evidence::Model, StoreError> {
    find_owned(db, user_id, summary_id).await?;
    evidence::Entity::find_by_id(evidence_id)
        .filter(evidence::Column::SummaryId.eq(summary_id))
        .one(db)
        .await?
        .ok_or(StoreError::NotFound("Evidence"))
}

/// Partial update; `location: Some(None)` clears the location.
pub async fn update_evidence<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    summary_id: Uuid,
    evidence_id: Uuid,
    claim: Option<String>,
    excerpt: Option<String>,
    location: Option<Option<String>>,
) -> Result<evidence::Model, StoreError> {
    let existing = find_owned_evidence(db, user_id, summary_id, evidence_id).await?;
    let mut active: evidence::ActiveModel = existing.into();
    if let Some(claim) = claim {
        active.claim = Set(claim);
    }
    if let Some(excerpt) = excerpt {
        active.excerpt = Set(excerpt);
    }
    if let Some(location) = location {
        active.location = Set(location);
    }
    Ok(active.update(db).await?)
}

pub async fn delete_evidence<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    summary_id: Uuid,
    evidence_id: Uuid,
) -> Result<(), StoreError> {
    find_owned_evidence(db, user_id, summary_id, evidence_id).await?;
    evidence::Entity::delete_by_id(evidence_id).exec(db).await?;
    Ok(())
}

/// Row counts removed by [`clear_user_data`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearedData {
    pub summaries: u64,
    pub evidence: u64,
    pub jobs: u64,
}

/// Delete every summary, evidence item and job the user owns.
pub async fn clear_user_data<C: ConnectionTrait + TransactionTrait>(
    db: &C,
    user_id: Uuid,
) -> Result<ClearedData, StoreError> {
    let txn = db.begin().await?;

    let evidence = evidence::Entity::delete_many()
        .filter(
            evidence::Column::SummaryId.in_subquery(
                Query::select()
                    .column(summary::Column::Id)
                    .from(summary::Entity)
                    .and_where(summary::Column::UserId.eq(user_id))
                    .to_owned(),
            ),
        )
        .exec(&txn)
        .await?
        .rows_affected;
    let jobs = job::Entity::delete_many()
        .filter(job::Column::UserId.eq(user_id))
        .exec(&txn)
        .await?
        .rows_affected;
    let summaries = summary::Entity::delete_many()
        .filter(summary::Column::UserId.eq(user_id))
        .exec(&txn)
        .await?
        .rows_affected;

    txn.commit().await?;
    info!(user_id = %user_id, summaries, evidence, jobs, "Cleared user data");
    Ok(ClearedData {
        summaries,
        evidence,
        jobs,
    })
}
