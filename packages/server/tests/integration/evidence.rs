use serde_json::json;

use crate::support::{TestApp, routes};

mod manual {
    use super::*;

    #[tokio::test]
    async fn evidence_can_be_added_edited_and_removed() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice@example.com").await;
        let id = app.create_summary(&token).await;

        let res = app
            .post_with_token(
                &routes::evidence(&id),
                &json!({"claim": "Attention suffices", "excerpt": "Transformers replace recurrence.", "location": "p. 1"}),
                &token,
            )
            .await;
        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["summary_id"], id.as_str());
        let items = res.body["items"].as_array().unwrap();
        assert_eq!(items.len(), 1);
        let evidence_id = items[0]["id"].as_str().unwrap().to_string();

        let res = app
            .patch_with_token(
                &routes::evidence_item(&id, &evidence_id),
                &json!({"claim": "Attention is enough", "location": null}),
                &token,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["items"][0]["claim"], "Attention is enough");
        assert!(res.body["items"][0]["location"].is_null());
        assert_eq!(res.body["items"][0]["excerpt"], "Transformers replace recurrence.");

        let res = app
            .delete_with_token(&routes::evidence_item(&id, &evidence_id), &token)
            .await;
        assert_eq!(res.status, 204);

        let res = app.get_with_token(&routes::evidence(&id), &token).await;
        assert!(res.body["items"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn blank_claims_are_rejected() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice@example.com").await;
        let id = app.create_summary(&token).await;

        let res = app
            .post_with_token(
                &routes::evidence(&id),
                &json!({"claim": " ", "excerpt": "Quote."}),
                &token,
            )
            .await;

        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn evidence_must_belong_to_the_summary_in_the_path() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice@example.com").await;
        let first = app.create_summary(&token).await;
        let second = app.create_summary(&token).await;

        let res = app
            .post_with_token(
                &routes::evidence(&first),
                &json!({"claim": "Claim", "excerpt": "Quote."}),
                &token,
            )
            .await;
        let evidence_id = res.body["items"][0]["id"].as_str().unwrap().to_string();

        let res = app
            .delete_with_token(&routes::evidence_item(&second, &evidence_id), &token)
            .await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn another_user_cannot_touch_evidence() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice@example.com").await;
        let bob = app.create_authenticated_user("bob@example.com").await;
        let id = app.create_summary(&alice).await;

        let res = app
            .post_with_token(
                &routes::evidence(&id),
                &json!({"claim": "Claim", "excerpt": "Quote."}),
                &bob,
            )
            .await;
        assert_eq!(res.status, 404);

        let res = app.get_with_token(&routes::evidence(&id), &alice).await;
        assert!(res.body["items"].as_array().unwrap().is_empty());
    }
}

mod generation {
    use super::*;

    #[tokio::test]
    async fn text_summaries_are_linked_to_source_sentences() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice@example.com").await;
        let id = app.create_summary(&token).await;

        let res = app
            .post_with_token(&routes::evidence_generate(&id), &json!({}), &token)
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        let items = res.body["items"].as_array().unwrap();
        assert!(!items.is_empty() && items.len() <= 3);
        assert!(
            items[0]["location"]
                .as_str()
                .unwrap()
                .starts_with("sentence ")
        );
    }

    #[tokio::test]
    async fn imported_summaries_get_placeholders() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice@example.com").await;
        app.post_with_token(
            routes::SUMMARIES_IMPORT,
            &json!({"summaries": [{"content": "Imported claim one. Imported claim two."}]}),
            &token,
        )
        .await;
        let id = app.get_with_token(routes::SUMMARIES, &token).await.body["data"][0]["id"]
            .as_str()
            .unwrap()
            .to_string();

        let res = app
            .post_with_token(&routes::evidence_generate(&id), &json!({}), &token)
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        let items = res.body["items"].as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|item| item["location"].is_null()));
    }
}
