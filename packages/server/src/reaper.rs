use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use common::config::JobsConfig;
use sea_orm::DatabaseConnection;
use store::jobs::{self, ClaimOutcome, JobOutcome};
use store::users;
use tracing::{debug, error, info, warn};

use crate::dispatcher::Dispatcher;

/// Holder name recorded when the reaper takes a job to fail it.
const REAPER_ID: &str = "reaper";

pub const ATTEMPTS_EXHAUSTED: &str = "Job exceeded the maximum number of attempts";

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReapReport {
    pub failed: usize,
    pub redelivered: usize,
    pub purged_revocations: u64,
}

/// One recovery pass over abandoned jobs.
///
/// Running jobs past their lease are failed once they have used up their
/// attempts and redelivered otherwise. Queued jobs older than
/// `stale_queued_secs` are redelivered, covering messages the queue lost.
/// A job that was redelivered and not yet claimed is skipped until
/// `redelivery_backoff_secs` have passed.
pub async fn reap_once(
    db: &DatabaseConnection,
    dispatcher: &Dispatcher,
    config: &JobsConfig,
    now: DateTime<Utc>,
) -> Result<ReapReport, store::StoreError> {
    let mut report = ReapReport::default();
    let backoff_cutoff = now - chrono::Duration::seconds(config.redelivery_backoff_secs as i64);

    for (job_id, attempts) in jobs::expired_leases(db, now).await? {
        if attempts < config.max_attempts {
            if jobs::mark_redelivered(db, job_id, now, backoff_cutoff).await? {
                info!(job_id = %job_id, attempts, "Lease expired, redelivering job");
                dispatcher.redeliver(job_id).await;
                report.redelivered += 1;
            }
            continue;
        }

        // Taking the lease makes the previous holder's next renewal fail.
        let lease = chrono::Duration::seconds(60);
        match jobs::claim(db, job_id, REAPER_ID, lease).await? {
            ClaimOutcome::Claimed(_) => {
                warn!(job_id = %job_id, attempts, "Failing job after its final attempt");
                jobs::complete(
                    db,
                    job_id,
                    JobOutcome::Failed {
                        error: ATTEMPTS_EXHAUSTED.into(),
                    },
                )
                .await?;
                report.failed += 1;
            }
            ClaimOutcome::NotClaimable(status) => {
                debug!(job_id = %job_id, %status, "Job moved on before it could be failed");
            }
        }
    }

    let stale_cutoff = now - chrono::Duration::seconds(config.stale_queued_secs as i64);
    for job_id in jobs::stale_queued(db, stale_cutoff).await? {
        if jobs::mark_redelivered(db, job_id, now, backoff_cutoff).await? {
            info!(job_id = %job_id, "Job still queued, redelivering");
            dispatcher.redeliver(job_id).await;
            report.redelivered += 1;
        }
    }

    report.purged_revocations = users::purge_expired_revocations(db, now).await?;
    Ok(report)
}

/// Run [`reap_once`] every `reaper_interval_secs` until the task is aborted.
pub async fn run_reaper(db: DatabaseConnection, dispatcher: Arc<Dispatcher>, config: JobsConfig) {
    let mut interval = tokio::time::interval(Duration::from_secs(config.reaper_interval_secs.max(1)));
    info!(interval_secs = config.reaper_interval_secs, "Starting lease reaper");

    loop {
        interval.tick().await;
        match reap_once(&db, &dispatcher, &config, Utc::now()).await {
            Ok(report) if report != ReapReport::default() => {
                info!(
                    failed = report.failed,
                    redelivered = report.redelivered,
                    purged_revocations = report.purged_revocations,
                    "Reaper pass finished"
                );
            }
            Ok(_) => {}
            Err(e) => error!(error = %e, "Reaper pass failed"),
        }
    }
}
