use std::path::Path;

use common::config::SummarizerConfig;

use crate::UploadError;

/// Check an uploaded file and decode it to text.
///
/// Returns the sanitized base filename alongside the content.
pub fn decode_upload(
    filename: Option<&str>,
    bytes: &[u8],
    config: &SummarizerConfig,
) -> Result<(String, String), UploadError> {
    let filename = filename
        .map(sanitize_filename)
        .filter(|f| !f.is_empty())
        .ok_or(UploadError::MissingFilename)?;

    let extension = Path::new(&filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !config.allowed_extensions.iter().any(|a| *a == extension) {
        return Err(UploadError::Extension(config.allowed_extensions.join(", ")));
    }

    if bytes.len() > config.max_upload_bytes {
        return Err(UploadError::TooLarge(config.max_upload_bytes));
    }

    let text = std::str::from_utf8(bytes).map_err(|_| UploadError::NotUtf8)?;
    let text = text.trim_start_matches('\u{feff}');
    if text.trim().is_empty() {
        return Err(UploadError::Empty);
    }
    Ok((filename, text.to_string()))
}

/// Keep only the final path component of a client-supplied filename.
fn sanitize_filename(raw: &str) -> String {
    raw.rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}
