use serde::Serialize;

/// Operator controls for one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichOptions {
    /// Process at most this many eligible entities.
    pub limit: Option<usize>,
    /// Skip entities that already carry metadata.
    pub only_unmatched: bool,
    /// Clear the whole failure ledger before selecting candidates.
    pub force_retry_failed: bool,
}

impl EnrichOptions {
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn only_unmatched(mut self) -> Self {
        self.only_unmatched = true;
        self
    }

    pub fn force_retry_failed(mut self) -> Self {
        self.force_retry_failed = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchOutcome {
    Completed,
    /// A durable write failed; counts reflect work done before the abort.
    Aborted { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichmentResult {
    pub processed: usize,
    pub matched: usize,
    pub failed: usize,
    pub errors: Vec<String>,
    /// Errors dropped once `errors` reached its cap.
    pub suppressed_errors: usize,
    pub outcome: BatchOutcome,
}

impl EnrichmentResult {
    pub(crate) fn new() -> Self {
        Self {
            processed: 0,
            matched: 0,
            failed: 0,
            errors: Vec::new(),
            suppressed_errors: 0,
            outcome: BatchOutcome::Completed,
        }
    }

    pub(crate) fn push_error(&mut self, error: String, cap: usize) {
        if self.errors.len() < cap {
            self.errors.push(error);
        } else {
            self.suppressed_errors += 1;
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self.outcome, BatchOutcome::Aborted { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_list_is_bounded() {
        let mut result = EnrichmentResult::new();
        for i in 0..5 {
            result.push_error(format!("error {i}"), 3);
        }
        assert_eq!(result.errors.len(), 3);
        assert_eq!(result.suppressed_errors, 2);
        assert_eq!(result.errors[2], "error 2");
    }
}
