//! Core data model definitions shared across Reelmatch crates.
#![allow(missing_docs)]

pub use ::chrono;

pub mod entity;
pub mod error;
pub mod failure;
pub mod key;
pub mod progress;
pub mod source;

// Intentionally curated re-exports for downstream consumers.
pub use entity::{AiHint, MovieEntity, MovieMetadata};
pub use error::{ModelError, Result as ModelResult};
pub use failure::{FailedMatchRecord, FailureDiagnostics, MatchAttempt};
pub use key::{KeyKind, MovieKey};
pub use progress::{ProgressEvent, ProgressStatus, ProgressTopic};
pub use source::{
    ArchiveSource, Source, SourceKind, SourceRef, VideoChannelSource,
};
