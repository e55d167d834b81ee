use std::fmt;

use async_trait::async_trait;
use reelmatch_model::MovieMetadata;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Not found")]
    NotFound,

    #[error("Rate limited")]
    RateLimited,

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Missing API key")]
    MissingApiKey,

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// One row of a provider title search, in provider ranking order.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchCandidate {
    pub external_id: String,
    pub title: String,
    pub year: Option<u16>,
    pub poster_url: Option<String>,
}

impl SearchCandidate {
    pub fn new(
        external_id: impl Into<String>,
        title: impl Into<String>,
        year: Option<u16>,
    ) -> Self {
        Self {
            external_id: external_id.into(),
            title: title.into(),
            year,
            poster_url: None,
        }
    }
}

/// Read-only access to the external movie database.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetadataProvider: Send + Sync + fmt::Debug {
    /// Title search, optionally filtered by release year.
    async fn search(
        &self,
        query: &str,
        year: Option<u16>,
    ) -> Result<Vec<SearchCandidate>, ProviderError>;

    /// Full metadata for one external id.
    async fn fetch(
        &self,
        external_id: &str,
    ) -> Result<MovieMetadata, ProviderError>;
}
