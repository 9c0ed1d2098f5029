use std::collections::HashSet;

use store::summaries::NewEvidence;
use summarizer::text::{content_words, split_sentences};

/// Claims taken from the start of a summary.
pub const MAX_GENERATED_CLAIMS: usize = 3;

/// Excerpt used when no source text is available to quote.
pub const PLACEHOLDER_EXCERPT: &str = "Evidence placeholder: link this claim to a quote.";

/// Pair the summary's leading sentences with the source sentences that share
/// the most content words with them.
///
/// Without source text, or when nothing overlaps, the claim gets the
/// placeholder excerpt and no location.
pub fn generate(summary: &str, source: Option<&str>) -> Vec<NewEvidence> {
    let source_sentences = source.map(split_sentences).unwrap_or_default();
    let source_words: Vec<HashSet<String>> = source_sentences
        .iter()
        .map(|s| content_words(s).into_iter().collect())
        .collect();

    split_sentences(summary)
        .into_iter()
        .take(MAX_GENERATED_CLAIMS)
        .map(|claim| {
            let claim_words: HashSet<String> = content_words(&claim).into_iter().collect();
            let best = source_words
                .iter()
                .enumerate()
                .map(|(i, words)| (i, words.intersection(&claim_words).count()))
                .filter(|(_, overlap)| *overlap > 0)
                .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)));

            match best {
                Some((index, _)) => NewEvidence {
                    claim,
                    excerpt: source_sentences[index].clone(),
                    location: Some(format!("sentence {}", index + 1)),
                },
                None => NewEvidence {
                    claim,
                    excerpt: PLACEHOLDER_EXCERPT.to_string(),
                    location: None,
                },
            }
        })
        .collect()
}
