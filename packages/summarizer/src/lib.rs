//! Summarization providers and the adapters that turn a job's source into
//! plain text: citation stripping, SSRF-guarded URL fetching and upload
//! validation.

pub mod citations;
pub mod error;
pub mod extractive;
pub mod fetch;
pub mod registry;
pub mod remote;
pub mod text;
pub mod upload;

use async_trait::async_trait;

pub use error::{FetchError, SummarizeError, UploadError};
pub use extractive::ExtractiveSummarizer;
pub use fetch::UrlFetcher;
pub use registry::{ModelInfo, SummarizerRegistry};
pub use remote::ChatCompletionSummarizer;

/// Longest error message shown to users.
pub const MAX_ERROR_MESSAGE_LEN: usize = 500;

/// Input to a single summarization call.
#[derive(Debug, Clone)]
pub struct SummaryRequest {
    pub text: String,
    pub num_sentences: u32,
    pub keep_citations: bool,
    pub model: String,
}

/// A summarization backend. Implementations own their transport and are
/// shared across jobs.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Provider name requests select this backend by.
    fn provider(&self) -> &str;

    /// Models this backend accepts.
    fn models(&self) -> Vec<String>;

    async fn summarize(&self, req: &SummaryRequest) -> Result<String, SummarizeError>;
}
