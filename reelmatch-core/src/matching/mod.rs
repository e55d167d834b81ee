//! Title normalization, candidate scoring, and provider matching.

pub mod matcher;
pub mod normalizer;
pub mod scoring;

pub use matcher::{CandidateMatcher, MatchResult};
pub use normalizer::{extract_year, normalize};
pub use scoring::{Confidence, MatchThresholds, title_similarity};
