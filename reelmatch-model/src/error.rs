use std::fmt::{self, Display};

use crate::source::SourceRef;

/// Errors produced by model constructors and validation routines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    EmptyKey,
    DuplicateSource(SourceRef),
}

impl Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::EmptyKey => write!(f, "movie key cannot be empty"),
            ModelError::DuplicateSource(source) => {
                write!(f, "duplicate source {source}")
            }
        }
    }
}

impl std::error::Error for ModelError {}

pub type Result<T> = std::result::Result<T, ModelError>;
