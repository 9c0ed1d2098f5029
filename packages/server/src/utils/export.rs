use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

/// Download format for single-document exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Txt,
    Md,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Txt => "txt",
            Self::Md => "md",
        }
    }

    fn content_type(&self) -> &'static str {
        match self {
            Self::Txt => "text/plain; charset=utf-8",
            Self::Md => "text/markdown; charset=utf-8",
        }
    }
}

/// Render a summary for download. Markdown carries its `(claim, excerpt)` list.
pub fn render_summary(content: &str, evidence: &[(&str, &str)], format: ExportFormat) -> String {
    match format {
        ExportFormat::Txt => content.to_string(),
        ExportFormat::Md => {
            let mut out = format!("# Summary\n\n{content}\n\n## Evidence\n");
            if evidence.is_empty() {
                out.push_str("No evidence items.");
            } else {
                let items: Vec<String> = evidence
                    .iter()
                    .map(|(claim, excerpt)| format!("- **{claim}**: {excerpt}"))
                    .collect();
                out.push_str(&items.join("\n"));
            }
            out
        }
    }
}

pub fn render_synthesis(consensus: &str, format: ExportFormat) -> String {
    match format {
        ExportFormat::Txt => consensus.to_string(),
        ExportFormat::Md => format!("# Synthesis Output\n\n{consensus}"),
    }
}

/// Build a text response served as a file download.
pub fn attachment(body: String, stem: &str, format: ExportFormat) -> Response {
    let disposition = format!("attachment; filename=\"{stem}.{}\"", format.extension());
    (
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response()
}
