use serde_json::json;

use crate::support::{PAPER, TestApp, routes};

mod crud {
    use super::*;

    #[tokio::test]
    async fn owner_can_read_edit_and_delete_a_summary() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice@example.com").await;
        let id = app.create_summary(&token).await;

        let res = app.get_with_token(&routes::summary(&id), &token).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["id"], id.as_str());

        let res = app
            .patch_with_token(
                &routes::summary(&id),
                &json!({"title": "  Attention  ", "content": "Edited."}),
                &token,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["title"], "Attention");
        assert_eq!(res.body["content"], "Edited.");

        let res = app.delete_with_token(&routes::summary(&id), &token).await;
        assert_eq!(res.status, 204);

        let res = app.get_with_token(&routes::summary(&id), &token).await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn empty_patch_and_blank_title_are_rejected() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice@example.com").await;
        let id = app.create_summary(&token).await;

        let empty = app
            .patch_with_token(&routes::summary(&id), &json!({}), &token)
            .await;
        assert_eq!(empty.status, 400);

        let blank = app
            .patch_with_token(&routes::summary(&id), &json!({"title": "  "}), &token)
            .await;
        assert_eq!(blank.status, 400);
    }

    #[tokio::test]
    async fn deleting_a_summary_removes_the_job_that_produced_it() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice@example.com").await;
        let job = app.submit_text(&token, PAPER).await;
        let summary_id = job.body["result_summary_id"].as_str().unwrap().to_string();

        app.delete_with_token(&routes::summary(&summary_id), &token)
            .await;

        let res = app.get_with_token(&routes::job(&job.id()), &token).await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn list_is_paginated_newest_first() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice@example.com").await;
        app.create_summary(&token).await;
        let newest = app.create_summary(&token).await;

        let res = app
            .get_with_token(&format!("{}?limit=1", routes::SUMMARIES), &token)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["pagination"]["total"], 2);
        assert_eq!(res.body["pagination"]["limit"], 1);
        assert_eq!(res.body["data"][0]["id"], newest.as_str());
    }
}

mod isolation {
    use super::*;

    #[tokio::test]
    async fn another_user_cannot_delete_a_summary() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice@example.com").await;
        let bob = app.create_authenticated_user("bob@example.com").await;
        let id = app.create_summary(&alice).await;

        let res = app.delete_with_token(&routes::summary(&id), &bob).await;
        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");

        let still_there = app.get_with_token(&routes::summary(&id), &alice).await;
        assert_eq!(still_there.status, 200);
    }

    #[tokio::test]
    async fn foreign_and_missing_summaries_get_identical_errors() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice@example.com").await;
        let bob = app.create_authenticated_user("bob@example.com").await;
        let id = app.create_summary(&alice).await;
        let missing = uuid::Uuid::new_v4().to_string();

        let paths = |id: &str| {
            [
                routes::summary(id),
                routes::summary_export(id, "md"),
                routes::evidence(id),
            ]
        };
        for (foreign_path, missing_path) in paths(&id).iter().zip(paths(&missing).iter()) {
            let foreign = app.get_with_token(foreign_path, &bob).await;
            let absent = app.get_with_token(missing_path, &bob).await;
            assert_eq!(foreign.status, 404, "{foreign_path}");
            assert_eq!(foreign.text, absent.text, "{foreign_path}");
        }

        let patch = app
            .patch_with_token(&routes::summary(&id), &json!({"title": "Mine"}), &bob)
            .await;
        assert_eq!(patch.status, 404);
    }

    #[tokio::test]
    async fn listing_only_shows_own_summaries() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice@example.com").await;
        let bob = app.create_authenticated_user("bob@example.com").await;
        app.create_summary(&alice).await;

        let res = app.get_with_token(routes::SUMMARIES, &bob).await;

        assert_eq!(res.body["pagination"]["total"], 0);
        assert!(res.body["data"].as_array().unwrap().is_empty());
    }
}

mod export_import {
    use super::*;

    #[tokio::test]
    async fn single_export_is_an_attachment() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice@example.com").await;
        let id = app.create_summary(&token).await;

        let txt = app
            .get_with_token(&routes::summary_export(&id, "txt"), &token)
            .await;
        assert_eq!(txt.status, 200);
        assert!(txt.header("content-type").unwrap().starts_with("text/plain"));
        assert!(
            txt.header("content-disposition")
                .unwrap()
                .contains(&format!("summary-{id}.txt"))
        );

        let md = app
            .get_with_token(&routes::summary_export(&id, "md"), &token)
            .await;
        assert_eq!(md.status, 200);
        assert!(md.text.starts_with("# Summary"));
        assert!(md.text.contains("No evidence items."));
    }

    #[tokio::test]
    async fn unknown_export_format_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice@example.com").await;
        let id = app.create_summary(&token).await;

        let res = app
            .get_with_token(&routes::summary_export(&id, "pdf"), &token)
            .await;

        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn import_skips_items_without_content_and_export_returns_them() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice@example.com").await;

        let res = app
            .post_with_token(
                routes::SUMMARIES_IMPORT,
                &json!({"summaries": [
                    {"title": "From elsewhere", "content": "Imported text."},
                    {"title": "Blank", "content": "   "},
                    {"title": "Nothing"},
                ]}),
                &token,
            )
            .await;
        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["imported"], 1);
        assert_eq!(res.body["skipped"], 2);

        let export = app.get_with_token(routes::SUMMARIES_EXPORT, &token).await;
        assert_eq!(export.status, 200);
        assert_eq!(export.body["pagination"]["limit"], 1000);
        assert_eq!(export.body["data"][0]["title"], "From elsewhere");
        assert_eq!(export.body["data"][0]["source_type"], "import");
    }

    #[tokio::test]
    async fn import_over_the_item_limit_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice@example.com").await;
        let items: Vec<_> = (0..1001).map(|_| json!({"content": "x"})).collect();

        let res = app
            .post_with_token(routes::SUMMARIES_IMPORT, &json!({"summaries": items}), &token)
            .await;

        assert_eq!(res.status, 400, "{}", res.text);
        assert_eq!(
            app.get_with_token(routes::SUMMARIES, &token).await.body["pagination"]["total"],
            0
        );
    }

    #[tokio::test]
    async fn bulk_export_limit_is_bounded() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice@example.com").await;

        let res = app
            .get_with_token(&format!("{}?limit=5001", routes::SUMMARIES_EXPORT), &token)
            .await;

        assert_eq!(res.status, 400);
    }
}

mod synthesis {
    use super::*;

    #[tokio::test]
    async fn synthesizes_owned_summaries_and_ignores_foreign_ids() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice@example.com").await;
        let bob = app.create_authenticated_user("bob@example.com").await;
        let first = app.create_summary(&alice).await;
        let second = app.create_summary(&alice).await;
        let foreign = app.create_summary(&bob).await;

        let res = app
            .post_with_token(
                routes::SYNTHESIZE,
                &json!({"summary_ids": [first, second, foreign]}),
                &alice,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        let sources = res.body["sources"].as_array().unwrap();
        assert_eq!(sources.len(), 2);
        assert!(!sources.contains(&json!(foreign)));
        assert!(!res.body["consensus"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn only_foreign_ids_is_a_validation_error() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice@example.com").await;
        let bob = app.create_authenticated_user("bob@example.com").await;
        let foreign = app.create_summary(&bob).await;

        let res = app
            .post_with_token(routes::SYNTHESIZE, &json!({"summary_ids": [foreign]}), &alice)
            .await;
        assert_eq!(res.status, 400);

        let empty = app
            .post_with_token(routes::SYNTHESIZE, &json!({"summary_ids": []}), &alice)
            .await;
        assert_eq!(empty.status, 400);
    }

    #[tokio::test]
    async fn synthesis_export_is_markdown_when_asked() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice@example.com").await;

        let res = app
            .post_with_token(
                routes::SYNTHESIZE_EXPORT,
                &json!({"consensus": "Attention wins.", "format": "md"}),
                &token,
            )
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.text, "# Synthesis Output\n\nAttention wins.");
        assert!(
            res.header("content-disposition")
                .unwrap()
                .contains("synthesis.md")
        );
    }
}
