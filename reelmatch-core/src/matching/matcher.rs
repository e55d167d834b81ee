use std::sync::Arc;

use reelmatch_model::MovieMetadata;
use tracing::debug;

use super::scoring::{Confidence, MatchThresholds, pick_best};
use crate::providers::{MetadataProvider, ProviderError};

/// Outcome of matching one name against the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub confidence: Confidence,
    pub external_id: Option<String>,
    pub title: Option<String>,
    pub year: Option<u16>,
    /// Present only for `medium`/`high` results.
    pub metadata: Option<MovieMetadata>,
    pub similarity: f64,
}

impl MatchResult {
    pub fn none() -> Self {
        Self {
            confidence: Confidence::None,
            external_id: None,
            title: None,
            year: None,
            metadata: None,
            similarity: 0.0,
        }
    }

    pub fn is_acceptable(&self) -> bool {
        self.confidence.is_acceptable() && self.external_id.is_some()
    }
}

/// Scores provider search results and resolves the winner's metadata.
#[derive(Debug, Clone)]
pub struct CandidateMatcher {
    provider: Arc<dyn MetadataProvider>,
    thresholds: MatchThresholds,
}

impl CandidateMatcher {
    pub fn new(provider: Arc<dyn MetadataProvider>) -> Self {
        Self {
            provider,
            thresholds: MatchThresholds::default(),
        }
    }

    pub fn with_thresholds(mut self, thresholds: MatchThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn thresholds(&self) -> &MatchThresholds {
        &self.thresholds
    }

    /// Finds the best provider match for `name`.
    ///
    /// A `none` result is a valid outcome; only transport and provider
    /// failures are errors.
    pub async fn find_match(
        &self,
        name: &str,
        year_hint: Option<u16>,
    ) -> Result<MatchResult, ProviderError> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(MatchResult::none());
        }

        let mut candidates = self.provider.search(name, year_hint).await?;
        if candidates.is_empty() && year_hint.is_some() {
            // Year filters are exact on the provider side; retry unfiltered
            // so off-by-one source years can still score.
            debug!(name, ?year_hint, "no year-filtered results, retrying");
            candidates = self.provider.search(name, None).await?;
        }

        let Some(best) =
            pick_best(name, year_hint, &candidates, &self.thresholds)
        else {
            debug!(name, ?year_hint, "provider returned no candidates");
            return Ok(MatchResult::none());
        };

        debug!(
            name,
            ?year_hint,
            external_id = %best.candidate.external_id,
            candidate = %best.candidate.title,
            similarity = best.similarity,
            confidence = %best.confidence,
            "scored best candidate"
        );

        let mut result = MatchResult {
            confidence: best.confidence,
            external_id: Some(best.candidate.external_id.clone()),
            title: Some(best.candidate.title.clone()),
            year: best.candidate.year,
            metadata: None,
            similarity: best.similarity,
        };

        if best.confidence.is_acceptable() {
            let metadata =
                self.provider.fetch(&best.candidate.external_id).await?;
            if let Some(title) = metadata.title.clone() {
                result.title = Some(title);
            }
            result.year = metadata.year.or(result.year);
            result.metadata = Some(metadata);
        }

        Ok(result)
    }
}
