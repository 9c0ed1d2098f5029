use serde_json::json;
use server::config::RateLimitBackend;

use crate::support::{TestApp, routes};

#[tokio::test]
async fn auth_endpoints_return_429_with_retry_after() {
    let app = TestApp::spawn_with(|config| config.rate_limit.auth.requests = 2).await;
    let body = json!({"email": "nobody@example.com", "password": "whatever-pass"});

    for _ in 0..2 {
        let res = app.post_without_token(routes::LOGIN, &body).await;
        assert_eq!(res.status, 401, "{}", res.text);
    }
    let res = app.post_without_token(routes::LOGIN, &body).await;

    assert_eq!(res.status, 429);
    assert_eq!(res.body["code"], "RATE_LIMITED");
    let retry_after: u64 = res.header("retry-after").unwrap().parse().unwrap();
    assert!((1..=60).contains(&retry_after));
}

#[tokio::test]
async fn auth_and_api_classes_are_counted_separately() {
    let app = TestApp::spawn_with(|config| config.rate_limit.auth.requests = 1).await;
    let token = app.create_authenticated_user("alice@example.com").await;

    let res = app
        .post_without_token(
            routes::LOGIN,
            &json!({"email": "alice@example.com", "password": "correct-horse"}),
        )
        .await;
    assert_eq!(res.status, 429);

    for _ in 0..5 {
        let res = app.get_with_token(routes::ME, &token).await;
        assert_eq!(res.status, 200, "{}", res.text);
    }
}

#[tokio::test]
async fn disabled_class_is_not_limited() {
    let app = TestApp::spawn_with(|config| {
        config.rate_limit.auth.requests = 1;
        config.rate_limit.auth.enabled = false;
    })
    .await;
    let body = json!({"email": "nobody@example.com", "password": "whatever-pass"});

    for _ in 0..3 {
        let res = app.post_without_token(routes::LOGIN, &body).await;
        assert_eq!(res.status, 401);
    }
}

#[tokio::test]
async fn unreachable_redis_fails_auth_closed_and_api_open() {
    let app = TestApp::spawn_with(|config| {
        config.rate_limit.backend = RateLimitBackend::Redis;
        config.rate_limit.redis_url = "redis://127.0.0.1:1".into();
    })
    .await;

    let res = app
        .post_without_token(
            routes::REGISTER,
            &json!({"email": "alice@example.com", "password": "correct-horse"}),
        )
        .await;
    assert_eq!(res.status, 503, "{}", res.text);
    assert_eq!(res.body["code"], "SERVICE_UNAVAILABLE");

    // Without a token the api class still lets the request through to auth.
    let res = app.get_without_token(routes::ME).await;
    assert_eq!(res.status, 401);
    assert_eq!(res.body["code"], "UNAUTHENTICATED");

    let res = app.get_without_token(routes::HEALTH).await;
    assert_eq!(res.status, 200);
}
