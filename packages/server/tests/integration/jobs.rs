use serde_json::json;

use crate::support::{PAPER, TestApp, routes};

mod submission {
    use super::*;

    #[tokio::test]
    async fn queued_text_job_is_picked_up_and_succeeds() {
        let app = TestApp::spawn_with_memory_queue().await;
        let token = app.create_authenticated_user("alice@example.com").await;

        let res = app.submit_text(&token, PAPER).await;
        assert_eq!(res.status, 202, "{}", res.text);
        assert_eq!(res.body["mode"], "queued");

        let done = app.wait_for_job(&token, &res.id()).await;
        assert_eq!(done.body["status"], "succeeded", "{}", done.text);
        assert_eq!(done.body["attempts"], 1);
        assert_eq!(done.body["summary"]["source_type"], "text");
        assert!(
            !done.body["summary"]["content"]
                .as_str()
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn jobs_run_inline_when_queueing_is_disabled() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice@example.com").await;

        let res = app.submit_text(&token, PAPER).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["mode"], "inline");
        assert_eq!(res.body["status"], "succeeded");
        assert_eq!(
            res.body["summary"]["id"], res.body["result_summary_id"],
            "inline response should embed its summary"
        );
    }

    #[tokio::test]
    async fn jobs_run_inline_when_the_queue_cannot_accept_them() {
        let app = TestApp::spawn_with_dead_queue().await;
        let token = app.create_authenticated_user("alice@example.com").await;

        let res = app.submit_text(&token, PAPER).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["mode"], "inline");
        assert_eq!(res.body["status"], "succeeded");
    }

    #[tokio::test]
    async fn invalid_input_is_rejected_before_a_job_exists() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice@example.com").await;

        let cases = [
            json!({"source_type": "text", "text": "   "}),
            json!({"source_type": "text"}),
            json!({"source_type": "text", "text": PAPER, "num_sentences": 0}),
            json!({"source_type": "text", "text": PAPER, "num_sentences": 21}),
            json!({"source_type": "text", "text": PAPER, "model": "no-such-model"}),
            json!({"source_type": "text", "text": PAPER, "provider": "nowhere"}),
            json!({"source_type": "url", "url": "ftp://example.com/paper.pdf"}),
            json!({"source_type": "url", "url": "http://localhost/admin"}),
            json!({"source_type": "url", "url": "http://example.com:8080/paper"}),
            json!({"source_type": "url"}),
            json!({"source_type": "pdf", "text": PAPER}),
        ];
        for body in cases {
            let res = app.post_with_token(routes::JOBS, &body, &token).await;
            assert_eq!(res.status, 400, "accepted {body}: {}", res.text);
            assert_eq!(res.body["code"], "VALIDATION_ERROR");
        }

        let list = app.get_with_token(routes::JOBS, &token).await;
        assert_eq!(list.body["pagination"]["total"], 0);
    }

    #[tokio::test]
    async fn oversized_text_is_payload_too_large() {
        let app = TestApp::spawn_with(|config| config.summarizer.max_input_bytes = 64).await;
        let token = app.create_authenticated_user("alice@example.com").await;

        let res = app.submit_text(&token, PAPER).await;

        assert_eq!(res.status, 413);
        assert_eq!(res.body["code"], "PAYLOAD_TOO_LARGE");
    }

    #[tokio::test]
    async fn disabled_local_provider_is_rejected() {
        let app = TestApp::spawn_with(|config| config.summarizer.local_enabled = false).await;
        let token = app.create_authenticated_user("alice@example.com").await;

        let res = app.submit_text(&token, PAPER).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn requires_authentication() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(routes::JOBS, &json!({"source_type": "text", "text": PAPER}))
            .await;

        assert_eq!(res.status, 401);
    }
}

mod uploads {
    use super::*;

    #[tokio::test]
    async fn text_file_becomes_a_file_summary() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice@example.com").await;

        let res = app
            .upload_with_token(
                routes::JOBS_UPLOAD,
                vec![("attention.md", PAPER.as_bytes().to_vec())],
                &[("num_sentences", "2"), ("keep_citations", "false")],
                &token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["status"], "succeeded");
        assert_eq!(res.body["summary"]["source_type"], "file");
        assert_eq!(res.body["summary"]["source_value"], "attention.md");
        assert_eq!(res.body["summary"]["num_sentences"], 2);
    }

    #[tokio::test]
    async fn disallowed_extension_and_binary_content_are_rejected() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice@example.com").await;

        let pdf = app
            .upload_with_token(
                routes::JOBS_UPLOAD,
                vec![("paper.pdf", PAPER.as_bytes().to_vec())],
                &[],
                &token,
            )
            .await;
        assert_eq!(pdf.status, 400, "{}", pdf.text);

        let binary = app
            .upload_with_token(
                routes::JOBS_UPLOAD,
                vec![("paper.txt", vec![0xff, 0xfe, 0x00, 0x80])],
                &[],
                &token,
            )
            .await;
        assert_eq!(binary.status, 400, "{}", binary.text);

        let missing = app
            .upload_with_token(routes::JOBS_UPLOAD, vec![], &[("num_sentences", "2")], &token)
            .await;
        assert_eq!(missing.status, 400, "{}", missing.text);
    }

    #[tokio::test]
    async fn oversized_upload_is_payload_too_large() {
        let app = TestApp::spawn_with(|config| config.summarizer.max_upload_bytes = 128).await;
        let token = app.create_authenticated_user("alice@example.com").await;

        let res = app
            .upload_with_token(
                routes::JOBS_UPLOAD,
                vec![("paper.txt", PAPER.repeat(4).into_bytes())],
                &[],
                &token,
            )
            .await;

        assert_eq!(res.status, 413, "{}", res.text);
        assert_eq!(res.body["code"], "PAYLOAD_TOO_LARGE");
    }

    #[tokio::test]
    async fn batch_creates_one_job_per_valid_file_and_reports_the_rest() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice@example.com").await;

        let res = app
            .upload_with_token(
                routes::JOBS_BATCH,
                vec![
                    ("one.txt", PAPER.as_bytes().to_vec()),
                    ("two.rst", PAPER.as_bytes().to_vec()),
                    ("three.docx", PAPER.as_bytes().to_vec()),
                ],
                &[("num_sentences", "1")],
                &token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["jobs"].as_array().unwrap().len(), 2);
        let skipped = res.body["skipped"].as_array().unwrap();
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0]["filename"], "three.docx");
    }

    #[tokio::test]
    async fn batch_without_valid_files_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice@example.com").await;

        let res = app
            .upload_with_token(
                routes::JOBS_BATCH,
                vec![("a.pdf", b"x".to_vec()), ("b.exe", b"y".to_vec())],
                &[],
                &token,
            )
            .await;

        assert_eq!(res.status, 400, "{}", res.text);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        assert_eq!(
            app.get_with_token(routes::JOBS, &token).await.body["pagination"]["total"],
            0
        );
    }

    #[tokio::test]
    async fn batch_over_the_file_limit_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice@example.com").await;
        let files = (0..21)
            .map(|_| ("paper.txt", PAPER.as_bytes().to_vec()))
            .collect();

        let res = app
            .upload_with_token(routes::JOBS_BATCH, files, &[], &token)
            .await;

        assert_eq!(res.status, 400, "{}", res.text);
    }
}

mod polling {
    use super::*;

    #[tokio::test]
    async fn jobs_are_listed_newest_first_with_a_total() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice@example.com").await;
        let first = app.submit_text(&token, PAPER).await.id();
        let second = app.submit_text(&token, PAPER).await.id();

        let res = app
            .get_with_token(&format!("{}?limit=1", routes::JOBS), &token)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["pagination"]["total"], 2);
        assert_eq!(res.body["data"].as_array().unwrap().len(), 1);
        assert_eq!(res.body["data"][0]["id"], second);

        let page_two = app
            .get_with_token(&format!("{}?limit=1&offset=1", routes::JOBS), &token)
            .await;
        assert_eq!(page_two.body["data"][0]["id"], first);
    }

    #[tokio::test]
    async fn out_of_range_limit_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice@example.com").await;

        let res = app
            .get_with_token(&format!("{}?limit=500", routes::JOBS), &token)
            .await;

        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn another_users_job_is_indistinguishable_from_a_missing_one() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice@example.com").await;
        let bob = app.create_authenticated_user("bob@example.com").await;
        let job_id = app.submit_text(&alice, PAPER).await.id();

        let foreign = app.get_with_token(&routes::job(&job_id), &bob).await;
        let missing = app
            .get_with_token(&routes::job(&uuid::Uuid::new_v4().to_string()), &bob)
            .await;

        assert_eq!(foreign.status, 404);
        assert_eq!(foreign.body["code"], "NOT_FOUND");
        assert_eq!(foreign.text, missing.text);
        assert_eq!(
            app.get_with_token(routes::JOBS, &bob).await.body["pagination"]["total"],
            0
        );
    }
}
