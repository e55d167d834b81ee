//! Reelmatch core library.
//!
//! Resolves scraped movie uploads to canonical identities: titles are
//! cleaned by [`matching::normalize`], scored against an external metadata
//! provider by [`matching::CandidateMatcher`], and accepted matches are
//! re-keyed in the [`store::CanonicalStore`], merging any entity that
//! already holds the canonical key. Misses are kept in the
//! [`ledger::FailureLedger`] so later batches can skip or retry them.
//!
//! [`orchestration::EnrichmentOrchestrator`] drives a batch over all of the
//! above as the single writer of both documents.

pub mod config;
pub mod error;
pub mod ledger;
pub mod matching;
pub mod orchestration;
pub mod persistence;
pub mod providers;
pub mod store;

pub use config::EnrichConfig;
pub use error::{EnrichError, Result};
pub use ledger::{FailureLedger, LedgerDocument, LedgerError, NewFailure};
pub use matching::{CandidateMatcher, Confidence, MatchResult, MatchThresholds};
pub use orchestration::{
    BatchOutcome, EnrichOptions, EnrichmentOrchestrator, EnrichmentResult,
    ProgressReporter,
};
pub use persistence::{JsonFileStorage, MemoryStorage, SnapshotError, SnapshotStorage};
pub use providers::{MetadataProvider, OmdbApiProvider, ProviderError, SearchCandidate};
pub use store::{CanonicalStore, MigrateOutcome, StoreDocument, StoreError};

pub use reelmatch_model as model;
