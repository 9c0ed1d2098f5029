#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the text behind a summary came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "text"))]
    Text,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "url"))]
    Url,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "file"))]
    File,
    /// Created through the bulk import endpoint rather than a job.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "import"))]
    Import,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Url => "url",
            Self::File => "file",
            Self::Import => "import",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
