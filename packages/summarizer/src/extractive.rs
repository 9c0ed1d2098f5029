use std::collections::HashMap;

use async_trait::async_trait;

use crate::text::{content_words, split_sentences};
use crate::{SummarizeError, Summarizer, SummaryRequest};

pub const LOCAL_PROVIDER: &str = "local";
pub const EXTRACTIVE_MODEL: &str = "extractive";

/// In-process frequency-based extractive summarizer.
///
/// Each sentence is scored by the mean corpus frequency of its content words;
/// the top `num_sentences` are returned in their original order.
#[derive(Debug, Default, Clone)]
pub struct ExtractiveSummarizer;

impl ExtractiveSummarizer {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, text: &str, num_sentences: usize) -> Vec<String> {
        let sentences = split_sentences(text);
        if sentences.len() <= num_sentences {
            return sentences;
        }

        let mut frequencies: HashMap<String, usize> = HashMap::new();
        for word in content_words(text) {
            *frequencies.entry(word).or_default() += 1;
        }

        let mut scored: Vec<(usize, f64)> = sentences
            .iter()
            .enumerate()
            .map(|(index, sentence)| {
                let words = content_words(sentence);
                let score = if words.is_empty() {
                    0.0
                } else {
                    let total: usize = words
                        .iter()
                        .map(|w| frequencies.get(w).copied().unwrap_or(0))
                        .sum();
                    total as f64 / words.len() as f64
                };
                (index, score)
            })
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        let mut chosen: Vec<usize> = scored
            .into_iter()
            .take(num_sentences)
            .map(|(index, _)| index)
            .collect();
        chosen.sort_unstable();

        chosen.into_iter().map(|i| sentences[i].clone()).collect()
    }
}

#[async_trait]
impl Summarizer for ExtractiveSummarizer {
    fn provider(&self) -> &str {
        LOCAL_PROVIDER
    }

    fn models(&self) -> Vec<String> {
        vec![EXTRACTIVE_MODEL.to_string()]
    }

    async fn summarize(&self, req: &SummaryRequest) -> Result<String, SummarizeError> {
        let picked = self.extract(&req.text, req.num_sentences as usize);
        if picked.is_empty() {
            return Err(SummarizeError::EmptyInput);
        }
        Ok(picked.join(" "))
    }
}
