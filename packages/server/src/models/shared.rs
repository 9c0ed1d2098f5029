use serde::{Deserialize, Deserializer, Serialize};

use crate::error::AppError;

/// Pagination metadata included in list responses.
#[derive(Serialize, utoipa::ToSchema)]
pub struct Pagination {
    /// Maximum number of items returned.
    #[schema(example = 50)]
    pub limit: u64,
    /// Number of items skipped.
    #[schema(example = 0)]
    pub offset: u64,
    /// Total number of matching items across all pages.
    #[schema(example = 47)]
    pub total: u64,
}

/// `limit`/`offset` query parameters.
#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// Items per page.
    pub limit: Option<u64>,
    /// Items to skip.
    pub offset: Option<u64>,
}

impl PageQuery {
    /// Resolve against a default and an inclusive maximum for `limit`.
    pub fn resolve(&self, default_limit: u64, max_limit: u64) -> Result<(u64, u64), AppError> {
        let limit = self.limit.unwrap_or(default_limit);
        if !(1..=max_limit).contains(&limit) {
            return Err(AppError::Validation(format!(
                "limit must be between 1 and {max_limit}"
            )));
        }
        Ok((limit, self.offset.unwrap_or(0)))
    }
}

/// Serde helper for PATCH semantics on nullable fields.
///
/// * JSON field absent  => `None`          (don't update)
/// * JSON field = null  => `Some(None)`    (set to NULL)
/// * JSON field = value => `Some(Some(v))` (set to value)
pub fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Some(Option::deserialize(deserializer)?))
}

/// Validate a trimmed title (1-256 Unicode characters).
pub fn validate_title(title: &str) -> Result<(), AppError> {
    let title = title.trim();
    if title.is_empty() || title.chars().count() > 256 {
        return Err(AppError::Validation(
            "Title must be 1-256 characters".into(),
        ));
    }
    Ok(())
}

/// Validate a required free-text field.
pub fn validate_non_empty(value: &str, name: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{name} must not be empty")));
    }
    Ok(())
}
