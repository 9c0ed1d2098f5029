use std::sync::Arc;

use chrono::{Duration, Utc};
use common::{JobInput, SourceInput, SummaryOptions};
use mq::{MemoryQueue, MemoryReceiver};
use serde_json::json;
use server::dispatcher::Dispatcher;
use server::reaper::{ATTEMPTS_EXHAUSTED, ReapReport, reap_once};
use store::jobs::{ClaimOutcome, claim};
use uuid::Uuid;

use crate::support::{PAPER, TestApp, routes};

async fn user_id(app: &TestApp, token: &str) -> Uuid {
    app.get_with_token(routes::ME, token).await.id().parse().unwrap()
}

async fn queued_job(app: &TestApp, user_id: Uuid) -> Uuid {
    let input = JobInput {
        source: SourceInput::Text { text: PAPER.into() },
        options: SummaryOptions {
            num_sentences: 2,
            keep_citations: false,
            model: "extractive".into(),
            provider: "local".into(),
        },
    };
    store::jobs::create(&app.db, user_id, &input).await.unwrap().id
}

/// Claim as a worker that then disappears, leaving an expired lease.
async fn abandon(app: &TestApp, job_id: Uuid) {
    let outcome = claim(&app.db, job_id, "ghost", Duration::seconds(-1))
        .await
        .unwrap();
    assert!(matches!(outcome, ClaimOutcome::Claimed(_)));
}

/// A dispatcher publishing to a queue nobody consumes, so every
/// redelivery stays countable.
fn unconsumed_dispatcher(app: &TestApp) -> (Dispatcher, MemoryReceiver) {
    let (queue, receiver) = MemoryQueue::new();
    let dispatcher = Dispatcher::new(
        app.db.clone(),
        Some(Arc::new(queue)),
        Arc::clone(app.dispatcher.runner()),
    );
    (dispatcher, receiver)
}

fn drain(receiver: &mut MemoryReceiver) -> usize {
    std::iter::from_fn(|| receiver.try_recv()).count()
}

#[tokio::test]
async fn expired_lease_with_attempts_left_is_redelivered_and_finishes() {
    let app = TestApp::spawn().await;
    let token = app.create_authenticated_user("alice@example.com").await;
    let job_id = queued_job(&app, user_id(&app, &token).await).await;
    abandon(&app, job_id).await;

    let report = reap_once(&app.db, &app.dispatcher, &app.jobs, Utc::now())
        .await
        .unwrap();
    assert_eq!(report.redelivered, 1);
    assert_eq!(report.failed, 0);

    let done = app.wait_for_job(&token, &job_id.to_string()).await;
    assert_eq!(done.body["status"], "succeeded", "{}", done.text);
    assert_eq!(done.body["attempts"], 2);
}

#[tokio::test]
async fn expired_lease_on_the_last_attempt_fails_the_job() {
    let app = TestApp::spawn().await;
    let token = app.create_authenticated_user("alice@example.com").await;
    let job_id = queued_job(&app, user_id(&app, &token).await).await;
    for _ in 0..app.jobs.max_attempts {
        abandon(&app, job_id).await;
    }

    let report = reap_once(&app.db, &app.dispatcher, &app.jobs, Utc::now())
        .await
        .unwrap();
    assert_eq!(report.failed, 1);
    assert_eq!(report.redelivered, 0);

    let res = app.get_with_token(&routes::job(&job_id.to_string()), &token).await;
    assert_eq!(res.body["status"], "failed");
    assert_eq!(res.body["error"], ATTEMPTS_EXHAUSTED);
    assert!(res.body["result_summary_id"].is_null());
}

#[tokio::test]
async fn stale_queued_job_is_redelivered() {
    let app = TestApp::spawn().await;
    let token = app.create_authenticated_user("alice@example.com").await;
    let job_id = queued_job(&app, user_id(&app, &token).await).await;

    let fresh = reap_once(&app.db, &app.dispatcher, &app.jobs, Utc::now())
        .await
        .unwrap();
    assert_eq!(fresh, ReapReport::default());

    let later = Utc::now() + Duration::seconds(app.jobs.stale_queued_secs as i64 + 1);
    let report = reap_once(&app.db, &app.dispatcher, &app.jobs, later)
        .await
        .unwrap();
    assert_eq!(report.redelivered, 1);

    let done = app.wait_for_job(&token, &job_id.to_string()).await;
    assert_eq!(done.body["status"], "succeeded", "{}", done.text);
}

#[tokio::test]
async fn expired_revocations_are_purged() {
    let app = TestApp::spawn().await;
    let token = app.create_authenticated_user("alice@example.com").await;
    app.post_with_token(routes::LOGOUT, &json!({}), &token).await;

    let now = reap_once(&app.db, &app.dispatcher, &app.jobs, Utc::now())
        .await
        .unwrap();
    assert_eq!(now.purged_revocations, 0);

    let after_expiry = Utc::now() + Duration::hours(2);
    let report = reap_once(&app.db, &app.dispatcher, &app.jobs, after_expiry)
        .await
        .unwrap();
    assert_eq!(report.purged_revocations, 1);
}

#[tokio::test]
async fn repeated_passes_redeliver_a_stale_job_once_per_backoff() {
    let app = TestApp::spawn().await;
    let token = app.create_authenticated_user("alice@example.com").await;
    queued_job(&app, user_id(&app, &token).await).await;
    let (dispatcher, mut receiver) = unconsumed_dispatcher(&app);

    let start = Utc::now() + Duration::seconds(app.jobs.stale_queued_secs as i64 + 1);
    let mut redelivered = 0;
    for pass in 0..5 {
        let now = start + Duration::seconds(pass * app.jobs.reaper_interval_secs as i64);
        redelivered += reap_once(&app.db, &dispatcher, &app.jobs, now)
            .await
            .unwrap()
            .redelivered;
    }
    assert_eq!(redelivered, 1);
    assert_eq!(drain(&mut receiver), 1);

    let after_backoff = start + Duration::seconds(app.jobs.redelivery_backoff_secs as i64 + 1);
    let report = reap_once(&app.db, &dispatcher, &app.jobs, after_backoff)
        .await
        .unwrap();
    assert_eq!(report.redelivered, 1);
    assert_eq!(drain(&mut receiver), 1);
}

#[tokio::test]
async fn expired_lease_is_redelivered_once_until_claimed_again() {
    let app = TestApp::spawn().await;
    let token = app.create_authenticated_user("alice@example.com").await;
    let job_id = queued_job(&app, user_id(&app, &token).await).await;
    let (dispatcher, mut receiver) = unconsumed_dispatcher(&app);
    abandon(&app, job_id).await;

    for _ in 0..3 {
        reap_once(&app.db, &dispatcher, &app.jobs, Utc::now())
            .await
            .unwrap();
    }
    assert_eq!(drain(&mut receiver), 1);

    // A consumer picks it up and dies again: the new expiry is a new incident.
    abandon(&app, job_id).await;
    let report = reap_once(&app.db, &dispatcher, &app.jobs, Utc::now())
        .await
        .unwrap();
    assert_eq!(report.redelivered, 1);
    assert_eq!(drain(&mut receiver), 1);
}
