use std::time::Duration;

use crate::matching::MatchThresholds;

pub const DEFAULT_REQUEST_INTERVAL: Duration = Duration::from_millis(250);
pub const DEFAULT_MAX_REPORTED_ERRORS: usize = 50;

/// Tunables for an enrichment batch.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichConfig {
    pub thresholds: MatchThresholds,
    /// Pause between provider-backed candidates; zero disables pacing.
    pub request_interval: Duration,
    /// Cap on error strings kept in a batch result.
    pub max_reported_errors: usize,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            thresholds: MatchThresholds::default(),
            request_interval: DEFAULT_REQUEST_INTERVAL,
            max_reported_errors: DEFAULT_MAX_REPORTED_ERRORS,
        }
    }
}

impl EnrichConfig {
    pub fn with_request_interval(mut self, interval: Duration) -> Self {
        self.request_interval = interval;
        self
    }

    pub fn with_thresholds(mut self, thresholds: MatchThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_max_reported_errors(mut self, max: usize) -> Self {
        self.max_reported_errors = max;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EnrichConfig::default();
        assert_eq!(config.request_interval, Duration::from_millis(250));
        assert_eq!(config.max_reported_errors, 50);
        assert_eq!(config.thresholds.strict_similarity, 0.90);
    }
}
