use std::time::Duration;

use async_trait::async_trait;
use common::config::RemoteProviderConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{SummarizeError, Summarizer, SummaryRequest};

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

const SYSTEM_PROMPT: &str = "You summarize academic papers. Reply with the summary only.";

/// Hosted summarizer speaking the OpenAI-compatible chat completions API
/// (Together AI and similar).
pub struct ChatCompletionSummarizer {
    client: reqwest::Client,
    config: RemoteProviderConfig,
}

impl ChatCompletionSummarizer {
    pub fn new(config: RemoteProviderConfig, timeout: Duration) -> Result<Self, SummarizeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SummarizeError::Upstream(format!("Failed to build client: {e}")))?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl Summarizer for ChatCompletionSummarizer {
    fn provider(&self) -> &str {
        &self.config.name
    }

    fn models(&self) -> Vec<String> {
        self.config.models.clone()
    }

    async fn summarize(&self, req: &SummaryRequest) -> Result<String, SummarizeError> {
        if req.text.trim().is_empty() {
            return Err(SummarizeError::EmptyInput);
        }

        let prompt = format!(
            "Summarize the following text in at most {} sentences.\n\n{}\n\nSummary:",
            req.num_sentences, req.text
        );
        let body = ChatCompletionRequest {
            model: &req.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            temperature: 0.3,
            max_tokens: 60 * req.num_sentences.max(1),
        };

        debug!(
            provider = %self.config.name,
            model = %req.model,
            prompt_len = prompt.len(),
            "Requesting chat completion"
        );

        let mut request = self.client.post(self.endpoint()).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SummarizeError::Upstream(format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!(provider = %self.config.name, %status, "Provider returned an error");
            return Err(SummarizeError::Upstream(format!(
                "{} returned {}: {}",
                self.config.name, status, detail
            )));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| SummarizeError::Upstream(format!("Failed to parse response: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .unwrap_or_default();

        if content.is_empty() {
            return Err(SummarizeError::Upstream("Empty completion".into()));
        }
        Ok(content)
    }
}
