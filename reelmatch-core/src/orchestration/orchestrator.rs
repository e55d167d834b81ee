use std::sync::Arc;
use std::time::{Duration, Instant};

use reelmatch_model::{
    FailureDiagnostics, MatchAttempt, MovieEntity, MovieKey, ProgressEvent,
    ProgressStatus, ProgressTopic,
};
use tracing::{debug, info, warn};

use super::options::{BatchOutcome, EnrichOptions, EnrichmentResult};
use super::progress::{NoopProgress, ProgressReporter};
use crate::config::EnrichConfig;
use crate::error::{EnrichError, Result};
use crate::ledger::{FailureLedger, NewFailure};
use crate::matching::{
    CandidateMatcher, Confidence, MatchResult, extract_year, normalize,
};
use crate::store::{CanonicalStore, StoreError};

/// Where an accepted candidate landed.
#[derive(Debug)]
struct Matched {
    key: MovieKey,
    confidence: Confidence,
}

/// Single writer over the canonical store and failure ledger.
#[derive(Debug)]
pub struct EnrichmentOrchestrator {
    store: CanonicalStore,
    ledger: FailureLedger,
    matcher: Option<CandidateMatcher>,
    progress: Arc<dyn ProgressReporter>,
    config: EnrichConfig,
}

impl EnrichmentOrchestrator {
    pub fn new(
        store: CanonicalStore,
        ledger: FailureLedger,
        matcher: CandidateMatcher,
        config: EnrichConfig,
    ) -> Self {
        let matcher = matcher.with_thresholds(config.thresholds);
        Self {
            store,
            ledger,
            matcher: Some(matcher),
            progress: Arc::new(NoopProgress),
            config,
        }
    }

    /// Owner for demote and ledger maintenance; [`Self::run`] aborts
    /// without a matcher.
    pub fn for_maintenance(
        store: CanonicalStore,
        ledger: FailureLedger,
        config: EnrichConfig,
    ) -> Self {
        Self {
            store,
            ledger,
            matcher: None,
            progress: Arc::new(NoopProgress),
            config,
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn store(&self) -> &CanonicalStore {
        &self.store
    }

    pub fn ledger(&self) -> &FailureLedger {
        &self.ledger
    }

    pub fn into_parts(self) -> (CanonicalStore, FailureLedger) {
        (self.store, self.ledger)
    }

    /// Runs one batch to completion.
    ///
    /// Content failures land in the ledger and provider errors in
    /// `errors`; only a failed durable write stops the batch early, which is
    /// reported through `outcome` rather than as an `Err`.
    pub async fn run(&mut self, options: EnrichOptions) -> EnrichmentResult {
        let started = Instant::now();
        let mut result = EnrichmentResult::new();

        if self.matcher.is_none() {
            let err = EnrichError::Config("no metadata provider configured".into());
            self.abort(&mut result, err, 0);
            return result;
        }

        if options.force_retry_failed {
            if let Err(err) = self.ledger.clear_all().await {
                self.abort(&mut result, EnrichError::from(err), 0);
                return result;
            }
        }

        let candidates = self.select_candidates(&options);
        let total = candidates.len();
        info!(
            total,
            limit = ?options.limit,
            only_unmatched = options.only_unmatched,
            force_retry_failed = options.force_retry_failed,
            "starting enrichment batch"
        );
        self.emit(
            ProgressStatus::Starting,
            0,
            total,
            format!("Enriching {total} movies"),
        );

        for (index, key) in candidates.iter().enumerate() {
            let current = index + 1;
            result.processed += 1;

            match self.enrich_one(key).await {
                Ok(Matched {
                    key: canonical,
                    confidence,
                }) => {
                    result.matched += 1;
                    self.emit(
                        ProgressStatus::InProgress,
                        current,
                        total,
                        format!("Matched {key} -> {canonical} ({confidence})"),
                    );
                }
                Err(err) if err.is_fatal() => {
                    self.abort(&mut result, err, total);
                    return result;
                }
                Err(err) if err.is_content_failure() => {
                    result.failed += 1;
                    self.emit(
                        ProgressStatus::InProgress,
                        current,
                        total,
                        format!(
                            "No match for {key}: {}",
                            err.content_reason().unwrap_or_default()
                        ),
                    );
                }
                Err(err) => {
                    warn!(key = %key, error = %err, "enrichment failed");
                    result.failed += 1;
                    result.push_error(
                        format!("{key}: {err}"),
                        self.config.max_reported_errors,
                    );
                    self.emit(
                        ProgressStatus::Error,
                        current,
                        total,
                        format!("Error enriching {key}: {err}"),
                    );
                }
            }

            if current < total && !self.config.request_interval.is_zero() {
                tokio::time::sleep(self.config.request_interval).await;
            }
        }

        let elapsed = Duration::from_millis(started.elapsed().as_millis() as u64);
        info!(
            processed = result.processed,
            matched = result.matched,
            failed = result.failed,
            errors = result.errors.len() + result.suppressed_errors,
            elapsed = %humantime::format_duration(elapsed),
            "enrichment batch completed"
        );
        self.emit(
            ProgressStatus::Completed,
            result.processed,
            total,
            format!(
                "Matched {} of {} ({} failed)",
                result.matched, result.processed, result.failed
            ),
        );
        result
    }

    /// Strips a match and moves the entity back to its provisional key.
    pub async fn demote(&mut self, key: &MovieKey) -> Result<MovieKey> {
        let target = self.store.demote(key)?;
        self.store.persist().await?;
        Ok(target)
    }

    pub async fn clear_failure(&mut self, identifier: &str) -> Result<bool> {
        Ok(self.ledger.clear(identifier).await?)
    }

    pub async fn clear_failures(&mut self) -> Result<usize> {
        Ok(self.ledger.clear_all().await?)
    }

    fn matcher(&self) -> Result<&CandidateMatcher> {
        self.matcher
            .as_ref()
            .ok_or_else(|| EnrichError::Config("no metadata provider configured".into()))
    }

    fn select_candidates(&self, options: &EnrichOptions) -> Vec<MovieKey> {
        let eligible = self
            .store
            .iter()
            .filter(|entity| !options.only_unmatched || !entity.is_matched())
            .filter(|entity| !self.ledger.has(entity.key.as_str()))
            .map(|entity| entity.key.clone());

        match options.limit {
            Some(limit) => eligible.take(limit).collect(),
            None => eligible.collect(),
        }
    }

    /// Content failures are recorded in the ledger before they are returned.
    async fn enrich_one(&mut self, key: &MovieKey) -> Result<Matched> {
        let entity = self
            .store
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.clone()))?;

        let Some(raw_title) = entity.display_title().map(str::to_string) else {
            let err = EnrichError::InvalidEntityState {
                key: key.clone(),
                reason: "missing title".into(),
            };
            let failure = NewFailure::new(key.as_str(), "", "missing title")
                .with_year(entity.year);
            return Err(self.reject(err, failure).await);
        };

        let name = normalize(&raw_title);
        let year = entity
            .year
            .or_else(|| entity.source_year())
            .or_else(|| extract_year(&raw_title));
        debug!(key = %key, raw = %raw_title, name = %name, ?year, "matching");

        let mut attempts = vec![MatchAttempt::new(name.clone(), year)];
        let mut diagnostics = FailureDiagnostics {
            ai_hint_available: entity.ai_hint.is_some(),
            ai_hint_tried: false,
        };

        let mut found = self.matcher()?.find_match(&name, year).await?;
        if !found.is_acceptable() {
            if let Some(hint) = &entity.ai_hint {
                let hint_name = normalize(&hint.title);
                let hint_year = hint.year.or(year);
                if !hint_name.is_empty() {
                    debug!(key = %key, hint = %hint_name, ?hint_year, "retrying with AI hint");
                    attempts.push(MatchAttempt::new(hint_name.clone(), hint_year));
                    diagnostics.ai_hint_tried = true;
                    found = self.matcher()?.find_match(&hint_name, hint_year).await?;
                }
            }
        }

        let canonical = if found.is_acceptable() {
            found
                .external_id
                .as_deref()
                .and_then(|id| MovieKey::new(id).ok())
                .ok_or_else(|| "provider returned an empty external id".to_string())
        } else {
            Err(unmatched_reason(&found))
        };
        let canonical = match canonical {
            Ok(canonical) => canonical,
            Err(reason) => {
                let failure = NewFailure::new(key.as_str(), raw_title, reason.clone())
                    .with_attempts(attempts)
                    .with_year(year)
                    .with_diagnostics(diagnostics);
                let err = EnrichError::NoConfidentMatch {
                    key: key.clone(),
                    reason,
                };
                return Err(self.reject(err, failure).await);
            }
        };

        let confidence = found.confidence;

        let enriched = apply_match(entity, found);
        self.store.put(key.clone(), enriched)?;
        let outcome = self.store.migrate(key, &canonical)?;
        self.store.persist().await?;
        debug!(from = %key, to = %canonical, ?outcome, "stored match");

        if self.ledger.has(key.as_str()) {
            self.ledger.clear(key.as_str()).await?;
        }

        Ok(Matched {
            key: canonical,
            confidence,
        })
    }

    /// Records a content failure; a failed ledger write replaces it.
    async fn reject(&mut self, err: EnrichError, failure: NewFailure) -> EnrichError {
        match self.ledger.record(failure).await {
            Ok(record) => {
                debug!(
                    identifier = %record.identifier,
                    attempts = record.attempts.len(),
                    reason = %record.reason,
                    "recorded failed match"
                );
                err
            }
            Err(write) => EnrichError::from(write),
        }
    }

    fn abort(
        &self,
        result: &mut EnrichmentResult,
        err: EnrichError,
        total: usize,
    ) {
        let reason = err.to_string();
        warn!(
            processed = result.processed,
            matched = result.matched,
            failed = result.failed,
            reason = %reason,
            "enrichment batch aborted"
        );
        self.emit(
            ProgressStatus::Error,
            result.processed,
            total,
            format!("Enrichment aborted: {reason}"),
        );
        result.outcome = BatchOutcome::Aborted { reason };
    }

    fn emit(
        &self,
        status: ProgressStatus,
        current: usize,
        total: usize,
        message: String,
    ) {
        self.progress.report(ProgressEvent::new(
            ProgressTopic::Enrichment,
            status,
            current,
            total,
            message,
        ));
    }
}

fn unmatched_reason(found: &MatchResult) -> String {
    match (&found.external_id, &found.title) {
        (Some(id), Some(title)) => format!(
            "best candidate {title} ({id}) scored {} confidence",
            found.confidence
        ),
        _ => "no search results".to_string(),
    }
}

/// Folds an accepted match into the entity; `verified` only for `high`.
fn apply_match(mut entity: MovieEntity, found: MatchResult) -> MovieEntity {
    if let Some(title) = found.title.filter(|t| !t.trim().is_empty()) {
        entity.title = Some(title);
    }
    if found.year.is_some() {
        entity.year = found.year;
    }
    entity.metadata = found.metadata;
    entity.verified = found.confidence == Confidence::High;
    entity.touch();
    entity
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::LedgerDocument;
    use crate::persistence::MemoryStorage;
    use crate::providers::{ProviderError, SearchCandidate};
    use crate::providers::traits::MockMetadataProvider;
    use crate::store::StoreDocument;
    use reelmatch_model::{MovieMetadata, Source, VideoChannelSource};

    fn video(id: &str, title: &str) -> MovieEntity {
        let mut source = VideoChannelSource::new(id, format!("https://youtu.be/{id}"));
        source.title = Some(title.to_string());
        MovieEntity::from_source(Source::VideoChannel(source))
    }

    async fn orchestrator(
        provider: MockMetadataProvider,
        entities: Vec<MovieEntity>,
    ) -> EnrichmentOrchestrator {
        let mut store = CanonicalStore::new(Arc::new(MemoryStorage::<StoreDocument>::new()));
        for entity in entities {
            store.put(entity.key.clone(), entity).unwrap();
        }
        let ledger = FailureLedger::load(Arc::new(MemoryStorage::<LedgerDocument>::new()))
            .await
            .unwrap();
        EnrichmentOrchestrator::new(
            store,
            ledger,
            CandidateMatcher::new(Arc::new(provider)),
            EnrichConfig::default().with_request_interval(Duration::ZERO),
        )
    }

    #[tokio::test]
    async fn ai_hint_is_tried_once_after_a_miss() {
        let mut provider = MockMetadataProvider::new();
        provider
            .expect_search()
            .withf(|query, _| query == "Untitled Upload")
            .returning(|_, _| Ok(Vec::new()));
        provider
            .expect_search()
            .withf(|query, year| query == "Detour" && *year == Some(1945))
            .times(1)
            .returning(|_, _| {
                Ok(vec![SearchCandidate::new("tt0037638", "Detour", Some(1945))])
            });
        provider.expect_fetch().returning(|id| {
            Ok(MovieMetadata {
                external_id: id.to_string(),
                title: Some("Detour".into()),
                year: Some(1945),
                ..MovieMetadata::default()
            })
        });

        let entity =
            video("abc", "Untitled Upload").with_ai_hint("Detour", Some(1945));
        let mut orchestrator = orchestrator(provider, vec![entity]).await;

        let result = orchestrator.run(EnrichOptions::default()).await;

        assert_eq!(result.matched, 1);
        let key = MovieKey::new("tt0037638").unwrap();
        let matched = orchestrator.store().get(&key).unwrap();
        assert!(matched.verified);
        assert_eq!(matched.title.as_deref(), Some("Detour"));
    }

    #[tokio::test]
    async fn missing_titles_are_recorded_without_provider_calls() {
        let mut provider = MockMetadataProvider::new();
        provider.expect_search().never();

        let mut entity = video("abc", "placeholder");
        entity.title = Some("  ".into());
        let mut orchestrator = orchestrator(provider, vec![entity]).await;

        let result = orchestrator.run(EnrichOptions::default()).await;

        assert_eq!(result.failed, 1);
        assert!(result.errors.is_empty());
        let record = orchestrator.ledger().get("youtube-abc").unwrap();
        assert_eq!(record.reason, "missing title");
    }

    #[tokio::test]
    async fn medium_matches_are_not_verified() {
        let mut provider = MockMetadataProvider::new();
        provider.expect_search().returning(|_, _| {
            Ok(vec![SearchCandidate::new("tt0032599", "His Girl Friday", Some(1940))])
        });
        provider.expect_fetch().returning(|id| {
            Ok(MovieMetadata {
                external_id: id.to_string(),
                year: Some(1940),
                ..MovieMetadata::default()
            })
        });

        let entity = video("abc", "His Girl Friday").with_year(1941);
        let mut orchestrator = orchestrator(provider, vec![entity]).await;
        let result = orchestrator.run(EnrichOptions::default()).await;

        assert_eq!(result.matched, 1);
        let key = MovieKey::new("tt0032599").unwrap();
        let matched = orchestrator.store().get(&key).unwrap();
        assert!(!matched.verified);
        assert_eq!(matched.year, Some(1940));
    }

    #[tokio::test]
    async fn maintenance_owner_demotes_but_never_runs() {
        let mut store = CanonicalStore::new(Arc::new(MemoryStorage::<StoreDocument>::new()));
        let entity = video("abc", "The Matrix");
        store.put(entity.key.clone(), entity).unwrap();
        let canonical = MovieKey::new("tt0133093").unwrap();
        store.migrate(&MovieKey::new("youtube-abc").unwrap(), &canonical).unwrap();
        let ledger = FailureLedger::load(Arc::new(MemoryStorage::<LedgerDocument>::new()))
            .await
            .unwrap();
        let mut orchestrator =
            EnrichmentOrchestrator::for_maintenance(store, ledger, EnrichConfig::default());

        let result = orchestrator.run(EnrichOptions::default()).await;
        assert!(result.is_aborted());
        assert_eq!(result.processed, 0);

        let target = orchestrator.demote(&canonical).await.unwrap();
        assert_eq!(target.as_str(), "youtube-abc");
        assert_eq!(orchestrator.clear_failures().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn rejected_api_key_stops_the_batch() {
        let mut provider = MockMetadataProvider::new();
        provider
            .expect_search()
            .times(1)
            .returning(|_, _| Err(ProviderError::InvalidApiKey));

        let entities = vec![video("abc", "Detour"), video("def", "Charade")];
        let mut orchestrator = orchestrator(provider, entities).await;
        let result = orchestrator.run(EnrichOptions::default()).await;

        assert!(result.is_aborted());
        assert_eq!(result.processed, 1);
        assert!(orchestrator.ledger().is_empty());
    }

    #[tokio::test]
    async fn no_confident_match_is_recorded_with_its_reason() {
        let mut provider = MockMetadataProvider::new();
        provider.expect_search().returning(|_, _| {
            Ok(vec![SearchCandidate::new("tt9999999", "Something Else Entirely", Some(1980))])
        });
        provider.expect_fetch().never();

        let mut orchestrator = orchestrator(provider, vec![video("abc", "Detour")]).await;
        let result = orchestrator.run(EnrichOptions::default()).await;

        assert_eq!(result.failed, 1);
        assert!(result.errors.is_empty());
        let record = orchestrator.ledger().get("youtube-abc").unwrap();
        assert!(record.reason.starts_with("best candidate Something Else Entirely"));
    }

    #[test]
    fn unmatched_reason_names_the_best_candidate() {
        let mut found = MatchResult::none();
        assert_eq!(unmatched_reason(&found), "no search results");

        found.confidence = Confidence::Low;
        found.external_id = Some("tt1".into());
        found.title = Some("Detour".into());
        assert_eq!(
            unmatched_reason(&found),
            "best candidate Detour (tt1) scored low confidence"
        );
    }
}
