use std::time::Duration;

use sea_orm::sea_query::{Index, IndexCreateStatement, PostgresQueryBuilder, SqliteQueryBuilder};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend, DbErr};
use tracing::{info, warn};

use crate::entity::{job, summary};

/// Open a connection pool without touching the schema.
pub async fn connect(db_url: &str, max_connections: u32) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(db_url.to_owned());

    if db_url.contains(":memory:") || db_url.contains("mode=memory") {
        // Every pooled connection would otherwise see its own empty database.
        opt.max_connections(1).min_connections(1);
    } else {
        opt.max_connections(max_connections)
            .min_connections(1)
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(1800));
    }
    opt.connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .sqlx_logging(true);

    Database::connect(opt).await
}

/// Connect and bring the schema up to date.
pub async fn init_db(db_url: &str, max_connections: u32) -> Result<DatabaseConnection, DbErr> {
    let db = connect(db_url, max_connections).await?;
    db.get_schema_registry("store::entity::*").sync(&db).await?;
    ensure_indexes(&db).await?;
    Ok(db)
}

/// Composite indexes the entity attributes cannot express.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    let indexes = [
        // Owner-scoped listings ordered by recency.
        (
            "idx_summary_user_created",
            Index::create()
                .if_not_exists()
                .name("idx_summary_user_created")
                .table(summary::Entity)
                .col(summary::Column::UserId)
                .col(summary::Column::CreatedAt)
                .to_owned(),
        ),
        (
            "idx_job_user_created",
            Index::create()
                .if_not_exists()
                .name("idx_job_user_created")
                .table(job::Entity)
                .col(job::Column::UserId)
                .col(job::Column::CreatedAt)
                .to_owned(),
        ),
        // Reaper scans: running jobs past their lease.
        (
            "idx_job_status_lease",
            Index::create()
                .if_not_exists()
                .name("idx_job_status_lease")
                .table(job::Entity)
                .col(job::Column::Status)
                .col(job::Column::LeaseExpiresAt)
                .to_owned(),
        ),
    ];

    for (name, index) in indexes {
        match db
            .execute_unprepared(&render(db.get_database_backend(), &index))
            .await
        {
            Ok(_) => info!(index = name, "Ensured index exists"),
            Err(e) => warn!(index = name, error = %e, "Failed to create index"),
        }
    }
    Ok(())
}

fn render(backend: DbBackend, index: &IndexCreateStatement) -> String {
    match backend {
        DbBackend::Sqlite => index.to_string(SqliteQueryBuilder),
        _ => index.to_string(PostgresQueryBuilder),
    }
}
