use std::collections::HashMap;

/// Words ignored when scoring sentences and picking keywords.
pub const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "that", "this", "from", "are", "was", "were", "have", "has",
    "had", "into", "over", "under", "between", "using", "use", "used", "study", "paper",
    "results", "method", "methods", "model", "models", "data", "dataset", "we", "our", "their",
    "they", "these", "those", "shows", "show", "based", "analysis", "which", "also", "been",
    "such", "than", "then", "there", "its", "not", "but", "can", "may", "more", "most",
];

/// Split text into sentences on `.`, `!` or `?` followed by whitespace.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') && chars.peek().is_none_or(|n| n.is_whitespace()) {
            push_sentence(&mut sentences, &current);
            current.clear();
        }
    }
    push_sentence(&mut sentences, &current);
    sentences
}

fn push_sentence(sentences: &mut Vec<String>, raw: &str) {
    let normalized = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if !normalized.is_empty() {
        sentences.push(normalized);
    }
}

/// Lowercased alphanumeric tokens, stopwords and short words removed.
pub fn content_words(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| {
            w.chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(char::to_lowercase)
                .collect::<String>()
        })
        .filter(|w| w.chars().count() > 3 && !STOPWORDS.contains(&w.as_str()))
        .collect()
}

/// The `limit` most frequent content words, ties broken by first appearance.
pub fn keywords(text: &str, limit: usize) -> Vec<String> {
    let words = content_words(text);
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (position, word) in words.iter().enumerate() {
        counts.entry(word).or_insert((0, position)).0 += 1;
    }

    let mut ranked: Vec<_> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.0.cmp(&a.1.0).then(a.1.1.cmp(&b.1.1)));
    ranked
        .into_iter()
        .take(limit)
        .map(|(word, _)| word.to_string())
        .collect()
}
