#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use common::config::{JobsConfig, MqBackend};
use reqwest::Client;
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};
use server::config::AppConfig;
use server::dispatcher::Dispatcher;
use server::startup::build_state;
use worker::consumer::consume_memory;

pub const JWT_SECRET: &str = "test-secret-for-integration-tests";

pub const PAPER: &str = "Transformers replace recurrence entirely with attention mechanisms. \
    Attention lets every token attend to every other token in the sequence. \
    The resulting model trains considerably faster than recurrent networks. \
    Translation benchmarks improve by more than two BLEU points. \
    Attention heads learn interpretable syntactic structure.";

pub mod routes {
    pub const REGISTER: &str = "/api/v1/auth/register";
    pub const LOGIN: &str = "/api/v1/auth/login";
    pub const LOGOUT: &str = "/api/v1/auth/logout";
    pub const ME: &str = "/api/v1/auth/me";
    pub const JOBS: &str = "/api/v1/jobs";
    pub const JOBS_UPLOAD: &str = "/api/v1/jobs/upload";
    pub const JOBS_BATCH: &str = "/api/v1/jobs/batch";
    pub const SUMMARIES: &str = "/api/v1/summaries";
    pub const SUMMARIES_EXPORT: &str = "/api/v1/summaries/export";
    pub const SUMMARIES_IMPORT: &str = "/api/v1/summaries/import";
    pub const SYNTHESIZE: &str = "/api/v1/summaries/synthesize";
    pub const SYNTHESIZE_EXPORT: &str = "/api/v1/summaries/synthesize/export";
    pub const SETTINGS: &str = "/api/v1/settings";
    pub const STORAGE: &str = "/api/v1/storage";
    pub const ANALYTICS: &str = "/api/v1/analytics";
    pub const CLEAR_DATA: &str = "/api/v1/clear-data";
    pub const MODELS: &str = "/api/v1/models";
    pub const HEALTH: &str = "/health";

    pub fn job(id: &str) -> String {
        format!("/api/v1/jobs/{id}")
    }

    pub fn summary(id: &str) -> String {
        format!("/api/v1/summaries/{id}")
    }

    pub fn summary_export(id: &str, format: &str) -> String {
        format!("/api/v1/summaries/{id}/export?format={format}")
    }

    pub fn evidence(summary_id: &str) -> String {
        format!("/api/v1/summaries/{summary_id}/evidence")
    }

    pub fn evidence_item(summary_id: &str, evidence_id: &str) -> String {
        format!("/api/v1/summaries/{summary_id}/evidence/{evidence_id}")
    }

    pub fn evidence_generate(summary_id: &str) -> String {
        format!("/api/v1/summaries/{summary_id}/evidence/generate")
    }
}

/// A running test server.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub db: DatabaseConnection,
    pub dispatcher: Arc<Dispatcher>,
    pub jobs: JobsConfig,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    /// Raw response body as text.
    pub text: String,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
    pub headers: reqwest::header::HeaderMap,
}

/// Configuration every test starts from: queueing off, generous limits.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.auth.jwt_secret = JWT_SECRET.into();
    config.mq.enabled = false;
    config.rate_limit.auth.requests = 1000;
    config.rate_limit.api.requests = 10_000;
    config
}

impl TestApp {
    /// Server with queueing disabled; every job runs inline.
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    pub async fn spawn_with(configure: impl FnOnce(&mut AppConfig)) -> Self {
        Self::start(configure, true).await
    }

    /// Server with the in-process queue whose consumer is never started.
    /// Publishing fails, so jobs fall back to inline execution.
    pub async fn spawn_with_dead_queue() -> Self {
        Self::start(
            |config| {
                config.mq.enabled = true;
                config.mq.backend = MqBackend::Memory;
            },
            false,
        )
        .await
    }

    /// Server with the in-process queue and its consumer running.
    pub async fn spawn_with_memory_queue() -> Self {
        Self::spawn_with(|config| {
            config.mq.enabled = true;
            config.mq.backend = MqBackend::Memory;
        })
        .await
    }

    async fn start(configure: impl FnOnce(&mut AppConfig), run_consumer: bool) -> Self {
        let mut config = test_config();
        configure(&mut config);
        let jobs = config.jobs.clone();

        let db = store::init_db("sqlite::memory:", 1)
            .await
            .expect("Failed to initialize test database");
        let started = build_state(config, db.clone())
            .await
            .expect("Failed to build application state");

        if let Some(receiver) = started.memory_receiver {
            if run_consumer {
                tokio::spawn(consume_memory(
                    receiver,
                    Arc::clone(&started.runner),
                    jobs.concurrency,
                ));
            }
        }
        let dispatcher = Arc::clone(&started.state.dispatcher);
        let app = server::build_router(started.state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            db,
            dispatcher,
            jobs,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn post_with_token(&self, path: &str, body: &Value, token: &str) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn post_without_token(&self, path: &str, body: &Value) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn get_with_token(&self, path: &str, token: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn get_without_token(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn patch_with_token(&self, path: &str, body: &Value, token: &str) -> TestResponse {
        let res = self
            .client
            .patch(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .json(body)
            .send()
            .await
            .expect("Failed to send PATCH request");

        TestResponse::from_response(res).await
    }

    pub async fn put_with_token(&self, path: &str, body: &Value, token: &str) -> TestResponse {
        let res = self
            .client
            .put(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .json(body)
            .send()
            .await
            .expect("Failed to send PUT request");

        TestResponse::from_response(res).await
    }

    pub async fn delete_with_token(&self, path: &str, token: &str) -> TestResponse {
        let res = self
            .client
            .delete(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .expect("Failed to send DELETE request");

        TestResponse::from_response(res).await
    }

    /// POST a multipart form of `file` parts plus text fields.
    pub async fn upload_with_token(
        &self,
        path: &str,
        files: Vec<(&str, Vec<u8>)>,
        fields: &[(&str, &str)],
        token: &str,
    ) -> TestResponse {
        let mut form = reqwest::multipart::Form::new();
        for (file_name, bytes) in files {
            let part = reqwest::multipart::Part::bytes(bytes)
                .file_name(file_name.to_string())
                .mime_str("text/plain")
                .expect("Failed to set MIME type");
            form = form.part("file", part);
        }
        for (name, value) in fields {
            form = form.text(name.to_string(), value.to_string());
        }

        let res = self
            .client
            .post(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .multipart(form)
            .send()
            .await
            .expect("Failed to send multipart upload request");

        TestResponse::from_response(res).await
    }

    /// Register a user, returning the token from the registration response.
    pub async fn create_authenticated_user(&self, email: &str) -> String {
        let body = json!({
            "email": email,
            "password": "correct-horse",
        });

        let reg = self.post_without_token(routes::REGISTER, &body).await;
        assert_eq!(reg.status, 201, "Registration failed: {}", reg.text);

        reg.body["token"]
            .as_str()
            .expect("Registration response should contain a token")
            .to_string()
    }

    /// Submit pasted text and return the response.
    pub async fn submit_text(&self, token: &str, text: &str) -> TestResponse {
        self.post_with_token(
            routes::JOBS,
            &json!({"source_type": "text", "text": text, "num_sentences": 2}),
            token,
        )
        .await
    }

    /// Summarize [`PAPER`] inline and return the new summary's id.
    pub async fn create_summary(&self, token: &str) -> String {
        let res = self.submit_text(token, PAPER).await;
        assert_eq!(res.status, 200, "create_summary failed: {}", res.text);
        assert_eq!(res.body["status"], "succeeded", "job failed: {}", res.text);
        res.body["result_summary_id"]
            .as_str()
            .expect("succeeded job should have a summary")
            .to_string()
    }

    /// Poll a job until it reaches a terminal status.
    pub async fn wait_for_job(&self, token: &str, job_id: &str) -> TestResponse {
        for _ in 0..100 {
            let res = self.get_with_token(&routes::job(job_id), token).await;
            assert_eq!(res.status, 200, "poll failed: {}", res.text);
            if matches!(res.body["status"].as_str(), Some("succeeded" | "failed")) {
                return res;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("job {job_id} did not finish in time");
    }
}

impl TestResponse {
    pub async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let headers = res.headers().clone();
        let text = res.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self {
            status,
            text,
            body,
            headers,
        }
    }

    pub fn id(&self) -> String {
        self.body["id"]
            .as_str()
            .expect("response body should contain 'id'")
            .to_string()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}
