//! Sequential enrichment batches over the canonical store.

pub mod options;
pub mod orchestrator;
pub mod progress;

pub use options::{BatchOutcome, EnrichOptions, EnrichmentResult};
pub use orchestrator::EnrichmentOrchestrator;
pub use progress::{
    ChannelProgress, FnProgress, NoopProgress, ProgressReporter, TracingProgress,
};
