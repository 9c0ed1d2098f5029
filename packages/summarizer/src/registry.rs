use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use common::config::SummarizerConfig;
use tracing::info;

use crate::citations::strip_citations;
use crate::extractive::{ExtractiveSummarizer, LOCAL_PROVIDER};
use crate::remote::ChatCompletionSummarizer;
use crate::{SummarizeError, Summarizer, SummaryRequest};

/// A model a client may request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    pub name: String,
    pub provider: String,
}

/// Provider name to backend lookup, built once at startup.
pub struct SummarizerRegistry {
    backends: BTreeMap<String, Arc<dyn Summarizer>>,
    local_enabled: bool,
}

impl SummarizerRegistry {
    pub fn new(local_enabled: bool) -> Self {
        Self {
            backends: BTreeMap::new(),
            local_enabled,
        }
    }

    /// Register the local extractive backend and every configured remote provider.
    pub fn from_config(config: &SummarizerConfig) -> Result<Self, SummarizeError> {
        let mut registry = Self::new(config.local_enabled);
        registry.register(Arc::new(ExtractiveSummarizer::new()));

        let timeout = Duration::from_secs(config.request_timeout_secs);
        for remote in &config.remote {
            info!(provider = %remote.name, models = remote.models.len(), "Registering remote provider");
            registry.register(Arc::new(ChatCompletionSummarizer::new(
                remote.clone(),
                timeout,
            )?));
        }
        Ok(registry)
    }

    /// Add or replace the backend for its provider name.
    pub fn register(&mut self, backend: Arc<dyn Summarizer>) {
        self.backends.insert(backend.provider().to_string(), backend);
    }

    /// Find the backend serving `model` from `provider`.
    pub fn resolve(&self, provider: &str, model: &str) -> Result<Arc<dyn Summarizer>, SummarizeError> {
        if provider == LOCAL_PROVIDER && !self.local_enabled {
            return Err(SummarizeError::LocalDisabled);
        }
        let backend = self
            .backends
            .get(provider)
            .ok_or_else(|| SummarizeError::UnknownProvider(provider.to_string()))?;
        if !backend.models().iter().any(|m| m == model) {
            return Err(SummarizeError::UnknownModel {
                provider: provider.to_string(),
                model: model.to_string(),
            });
        }
        Ok(Arc::clone(backend))
    }

    /// Run one summarization call, stripping citations first when asked to.
    pub async fn summarize(
        &self,
        provider: &str,
        req: &SummaryRequest,
    ) -> Result<String, SummarizeError> {
        let backend = self.resolve(provider, &req.model)?;
        if req.text.trim().is_empty() {
            return Err(SummarizeError::EmptyInput);
        }

        if req.keep_citations {
            return backend.summarize(req).await;
        }

        let stripped = SummaryRequest {
            text: strip_citations(&req.text),
            ..req.clone()
        };
        backend.summarize(&stripped).await
    }

    /// Every model clients may request, local ones omitted when disabled.
    pub fn models(&self) -> Vec<ModelInfo> {
        self.backends
            .iter()
            .filter(|(provider, _)| self.local_enabled || provider.as_str() != LOCAL_PROVIDER)
            .flat_map(|(provider, backend)| {
                backend.models().into_iter().map(|name| ModelInfo {
                    name,
                    provider: provider.clone(),
                })
            })
            .collect()
    }
}
