use reelmatch_model::MovieKey;
use thiserror::Error;

use crate::ledger::LedgerError;
use crate::providers::ProviderError;
use crate::store::StoreError;

/// Per-candidate and batch-level enrichment failures.
#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("provider error: {0}")]
    Provider(ProviderError),

    #[error("no confident match for {key}: {reason}")]
    NoConfidentMatch { key: MovieKey, reason: String },

    #[error("invalid entity state for {key}: {reason}")]
    InvalidEntityState { key: MovieKey, reason: String },

    /// Durable write failed; the batch cannot continue.
    #[error("store write failed: {0}")]
    StoreWrite(String),

    #[error(transparent)]
    Store(StoreError),

    #[error("configuration error: {0}")]
    Config(String),
}

impl EnrichError {
    /// Failures that belong in the ledger rather than the error list.
    pub fn is_content_failure(&self) -> bool {
        matches!(
            self,
            EnrichError::NoConfidentMatch { .. }
                | EnrichError::InvalidEntityState { .. }
        )
    }

    /// Failures that stop the batch.
    pub fn is_fatal(&self) -> bool {
        matches!(self, EnrichError::StoreWrite(_) | EnrichError::Config(_))
    }

    /// Ledger reason for content failures.
    pub fn content_reason(&self) -> Option<&str> {
        match self {
            EnrichError::NoConfidentMatch { reason, .. }
            | EnrichError::InvalidEntityState { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

/// A rejected or missing key fails every later request the same way, so it
/// is reported as configuration rather than per candidate.
impl From<ProviderError> for EnrichError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::InvalidApiKey | ProviderError::MissingApiKey => {
                EnrichError::Config(err.to_string())
            }
            other => EnrichError::Provider(other),
        }
    }
}

fn chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

impl From<StoreError> for EnrichError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Write(_) | StoreError::Load(_) => {
                EnrichError::StoreWrite(chain(&err))
            }
            StoreError::SourceConflict { .. } | StoreError::InvalidEntity { .. } => {
                EnrichError::Store(err)
            }
            StoreError::NotFound(_) => EnrichError::Store(err),
        }
    }
}

impl From<LedgerError> for EnrichError {
    fn from(err: LedgerError) -> Self {
        EnrichError::StoreWrite(chain(&err))
    }
}

pub type Result<T> = std::result::Result<T, EnrichError>;
