use serde_json::json;

use crate::support::{PAPER, TestApp, routes};

mod settings {
    use super::*;

    #[tokio::test]
    async fn defaults_come_from_config_until_saved() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice@example.com").await;

        let res = app.get_with_token(routes::SETTINGS, &token).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["default_model"], "extractive");
        assert_eq!(res.body["summary_length"], 5);
        assert_eq!(res.body["citation_handling"], "remove");
        assert_eq!(res.body["auto_save"], true);
    }

    #[tokio::test]
    async fn saved_settings_drive_new_jobs() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice@example.com").await;
        let body = json!({
            "default_model": "extractive",
            "default_provider": "local",
            "summary_length": 1,
            "citation_handling": "keep",
            "auto_save": false,
        });

        let res = app.put_with_token(routes::SETTINGS, &body, &token).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(
            app.get_with_token(routes::SETTINGS, &token).await.body,
            body
        );

        let job = app
            .post_with_token(routes::JOBS, &json!({"source_type": "text", "text": PAPER}), &token)
            .await;
        assert_eq!(job.body["summary"]["num_sentences"], 1, "{}", job.text);
    }

    #[tokio::test]
    async fn invalid_settings_are_rejected() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice@example.com").await;
        let valid = json!({
            "default_model": "extractive",
            "default_provider": "local",
            "summary_length": 5,
            "citation_handling": "remove",
            "auto_save": true,
        });

        for (field, value) in [
            ("summary_length", json!(0)),
            ("citation_handling", json!("strip")),
            ("default_model", json!("gpt-nothing")),
        ] {
            let mut body = valid.clone();
            body[field] = value;
            let res = app.put_with_token(routes::SETTINGS, &body, &token).await;
            assert_eq!(res.status, 400, "accepted {field}: {}", res.text);
        }
    }
}

mod usage {
    use super::*;

    #[tokio::test]
    async fn storage_counts_only_own_summaries() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice@example.com").await;
        let bob = app.create_authenticated_user("bob@example.com").await;
        app.create_summary(&alice).await;

        let res = app.get_with_token(routes::STORAGE, &alice).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["summary_count"], 1);
        assert!(res.body["used_bytes"].as_i64().unwrap() > 0);
        assert_eq!(res.body["limit_bytes"], 100 * 1024 * 1024);

        let res = app.get_with_token(routes::STORAGE, &bob).await;
        assert_eq!(res.body["summary_count"], 0);
        assert_eq!(res.body["used_bytes"], 0);
        assert_eq!(res.body["used_percent"], 0);
    }

    #[tokio::test]
    async fn analytics_aggregate_by_model_and_length() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice@example.com").await;
        app.create_summary(&token).await;
        app.create_summary(&token).await;

        let res = app.get_with_token(routes::ANALYTICS, &token).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["total_summaries"], 2);
        assert_eq!(res.body["model_usage"]["extractive"], 2);
        assert_eq!(res.body["length_distribution"]["2"], 2);
        assert_eq!(res.body["average_length"], 2.0);
        assert_eq!(res.body["unique_models"], 1);
        let daily: i64 = res.body["daily_activity"]
            .as_object()
            .unwrap()
            .values()
            .map(|v| v.as_i64().unwrap())
            .sum();
        assert_eq!(daily, 2);
    }

    #[tokio::test]
    async fn clear_data_removes_everything_owned_but_keeps_the_account() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice@example.com").await;
        let bob = app.create_authenticated_user("bob@example.com").await;
        let id = app.create_summary(&alice).await;
        app.post_with_token(&routes::evidence_generate(&id), &json!({}), &alice)
            .await;
        app.create_summary(&bob).await;

        let res = app.post_with_token(routes::CLEAR_DATA, &json!({}), &alice).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["summaries"], 1);
        assert_eq!(res.body["jobs"], 1);
        assert!(res.body["evidence"].as_u64().unwrap() >= 1);

        assert_eq!(
            app.get_with_token(routes::SUMMARIES, &alice).await.body["pagination"]["total"],
            0
        );
        assert_eq!(
            app.get_with_token(routes::JOBS, &alice).await.body["pagination"]["total"],
            0
        );
        assert_eq!(app.get_with_token(routes::ME, &alice).await.status, 200);
        assert_eq!(
            app.get_with_token(routes::SUMMARIES, &bob).await.body["pagination"]["total"],
            1
        );
    }
}

mod meta {
    use super::*;

    #[tokio::test]
    async fn models_lists_the_local_extractive_model() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice@example.com").await;

        let res = app.get_with_token(routes::MODELS, &token).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["default_provider"], "local");
        assert!(
            res.body["models"]
                .as_array()
                .unwrap()
                .contains(&json!({"name": "extractive", "provider": "local"}))
        );
    }

    #[tokio::test]
    async fn health_needs_no_token_and_carries_security_headers() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(routes::HEALTH).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["status"], "ok");
        assert_eq!(res.body["database"], true);
        assert_eq!(res.header("x-content-type-options"), Some("nosniff"));
        assert_eq!(res.header("x-frame-options"), Some("DENY"));
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token("/api-docs/openapi.json").await;

        assert_eq!(res.status, 200);
        assert!(res.body["paths"]["/api/v1/jobs/{id}"].is_object());
    }
}
