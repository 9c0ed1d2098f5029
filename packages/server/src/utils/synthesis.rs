use summarizer::text::keywords;
use uuid::Uuid;

/// Cluster key for summaries without a usable keyword.
const MISC_THEME: &str = "misc";

/// A summary as seen by the synthesizer.
pub struct SynthesisInput<'a> {
    pub id: Uuid,
    pub title: &'a str,
    pub content: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    pub summary_id: Uuid,
    pub title: String,
    pub excerpt: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Synthesis {
    pub consensus: String,
    pub disagreements: Vec<String>,
    pub sources: Vec<Uuid>,
    pub citations: Vec<Citation>,
}

/// Group summaries by their top keyword and render one section per theme.
///
/// Themes appear in the order their first summary was given.
pub fn synthesize(inputs: &[SynthesisInput<'_>]) -> Synthesis {
    let mut clusters: Vec<(String, Vec<&SynthesisInput<'_>>)> = Vec::new();
    for input in inputs {
        let key = keywords(input.content, 1)
            .into_iter()
            .next()
            .unwrap_or_else(|| MISC_THEME.to_string());
        match clusters.iter_mut().find(|(k, _)| *k == key) {
            Some((_, items)) => items.push(input),
            None => clusters.push((key, vec![input])),
        }
    }

    let mut citations = Vec::new();
    let sections: Vec<String> = clusters
        .iter()
        .map(|(key, items)| {
            let mut section = format!("Theme: {key} ({} summaries)", items.len());
            for item in items {
                let first = first_sentence(item.content);
                if first.is_empty() {
                    continue;
                }
                section.push_str(&format!("\n- {first} [{}]", short_id(item.id)));
                citations.push(Citation {
                    summary_id: item.id,
                    title: item.title.to_string(),
                    excerpt: first.to_string(),
                });
            }
            section
        })
        .collect();

    let mut disagreements = Vec::new();
    if clusters.len() > 1 {
        let mut keys: Vec<&str> = clusters.iter().map(|(k, _)| k.as_str()).collect();
        keys.sort_unstable();
        disagreements.push(format!(
            "Themes diverge across clusters: {}",
            keys.join(", ")
        ));
    }

    Synthesis {
        consensus: format!("Consensus Snapshot:\n\n{}", sections.join("\n\n")),
        disagreements,
        sources: inputs.iter().map(|i| i.id).collect(),
        citations,
    }
}

fn first_sentence(content: &str) -> &str {
    content.split('.').next().unwrap_or_default().trim()
}

fn short_id(id: Uuid) -> String {
    id.simple().to_string()[..8].to_string()
}
