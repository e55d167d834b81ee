//! Durable record of identifiers that failed to match.
//!
//! Every mutation rewrites the whole backing document before returning. A
//! failed write rolls the mutation back, so the in-memory view never runs
//! ahead of what is on disk.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use reelmatch_model::{FailedMatchRecord, FailureDiagnostics, MatchAttempt};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::persistence::{SnapshotError, SnapshotStorage};

const LEDGER_DOCUMENT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("failed to load failure ledger")]
    Load(#[source] SnapshotError),
    #[error("failed to write failure ledger")]
    Write(#[source] SnapshotError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerDocument {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub failures: BTreeMap<String, FailedMatchRecord>,
}

fn default_version() -> u32 {
    LEDGER_DOCUMENT_VERSION
}

impl Default for LedgerDocument {
    fn default() -> Self {
        Self {
            version: LEDGER_DOCUMENT_VERSION,
            failures: BTreeMap::new(),
        }
    }
}

/// Input for [`FailureLedger::record`].
#[derive(Debug, Clone)]
pub struct NewFailure {
    pub identifier: String,
    pub original_title: String,
    pub reason: String,
    pub attempts: Vec<MatchAttempt>,
    pub year: Option<u16>,
    pub diagnostics: Option<FailureDiagnostics>,
}

impl NewFailure {
    pub fn new(
        identifier: impl Into<String>,
        original_title: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            original_title: original_title.into(),
            reason: reason.into(),
            attempts: Vec::new(),
            year: None,
            diagnostics: None,
        }
    }

    pub fn with_attempts(mut self, attempts: Vec<MatchAttempt>) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn with_year(mut self, year: Option<u16>) -> Self {
        self.year = year;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: FailureDiagnostics) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }
}

pub struct FailureLedger {
    document: LedgerDocument,
    storage: Arc<dyn SnapshotStorage<LedgerDocument>>,
}

impl fmt::Debug for FailureLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailureLedger")
            .field("failures", &self.document.failures.len())
            .field("storage", &self.storage)
            .finish()
    }
}

impl FailureLedger {
    pub async fn load(
        storage: Arc<dyn SnapshotStorage<LedgerDocument>>,
    ) -> Result<Self, LedgerError> {
        let document = storage
            .read_all()
            .await
            .map_err(LedgerError::Load)?
            .unwrap_or_default();
        debug!(failures = document.failures.len(), "failure ledger loaded");
        Ok(Self { document, storage })
    }

    pub fn has(&self, identifier: &str) -> bool {
        self.document.failures.contains_key(identifier)
    }

    pub fn get(&self, identifier: &str) -> Option<&FailedMatchRecord> {
        self.document.failures.get(identifier)
    }

    /// Records in identifier order.
    pub fn list(&self) -> impl Iterator<Item = &FailedMatchRecord> {
        self.document.failures.values()
    }

    pub fn len(&self) -> usize {
        self.document.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.document.failures.is_empty()
    }

    /// Inserts a record or folds a repeat failure into the existing one.
    ///
    /// Repeats only append attempts not already present, refresh
    /// `last_attempt` and `reason`, and keep the original `failed_at`.
    pub async fn record(
        &mut self,
        failure: NewFailure,
    ) -> Result<&FailedMatchRecord, LedgerError> {
        let now = Utc::now();
        let NewFailure {
            identifier,
            original_title,
            reason,
            attempts,
            year,
            diagnostics,
        } = failure;

        let previous = self.document.failures.get(&identifier).cloned();
        let record = self
            .document
            .failures
            .entry(identifier.clone())
            .and_modify(|existing| {
                existing.last_attempt = now;
                existing.reason = reason.clone();
                if existing.year.is_none() {
                    existing.year = year;
                }
            })
            .or_insert_with(|| {
                let mut record = FailedMatchRecord::new(
                    identifier.clone(),
                    original_title,
                    reason,
                    now,
                );
                record.year = year;
                record
            });
        let added = record.extend_attempts(attempts);
        if let Some(diagnostics) = diagnostics {
            record.diagnostics = diagnostics;
        }
        debug!(identifier = %identifier, added, "recorded match failure");

        if let Err(err) = self.flush().await {
            match previous {
                Some(previous) => {
                    self.document.failures.insert(identifier, previous);
                }
                None => {
                    self.document.failures.remove(&identifier);
                }
            }
            return Err(err);
        }
        self.document
            .failures
            .get(&identifier)
            .ok_or_else(|| {
                LedgerError::Write(SnapshotError::Unavailable(format!(
                    "record {identifier} vanished after write"
                )))
            })
    }

    /// Removes one record; `false` (and no write) when none existed.
    pub async fn clear(&mut self, identifier: &str) -> Result<bool, LedgerError> {
        let Some(removed) = self.document.failures.remove(identifier) else {
            return Ok(false);
        };
        if let Err(err) = self.flush().await {
            self.document.failures.insert(identifier.to_string(), removed);
            return Err(err);
        }
        debug!(identifier, "cleared match failure");
        Ok(true)
    }

    /// Removes every record and returns how many there were.
    pub async fn clear_all(&mut self) -> Result<usize, LedgerError> {
        let cleared = self.document.failures.len();
        if cleared == 0 {
            return Ok(0);
        }
        let removed = std::mem::take(&mut self.document.failures);
        if let Err(err) = self.flush().await {
            self.document.failures = removed;
            return Err(err);
        }
        info!(cleared, "cleared failure ledger");
        Ok(cleared)
    }

    async fn flush(&self) -> Result<(), LedgerError> {
        self.storage
            .write_all(&self.document)
            .await
            .map_err(LedgerError::Write)
    }
}
