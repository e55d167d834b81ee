//! Shared fixtures for the enrichment integration suites.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reelmatch_core::persistence::MemoryStorage;
use reelmatch_core::providers::{MetadataProvider, ProviderError, SearchCandidate};
use reelmatch_core::{
    CandidateMatcher, CanonicalStore, EnrichConfig, EnrichmentOrchestrator,
    FailureLedger, LedgerDocument, ProgressReporter, StoreDocument,
};
use reelmatch_model::{
    ArchiveSource, MovieEntity, MovieMetadata, ProgressEvent, Source,
    VideoChannelSource,
};

/// In-memory provider answering from a fixed catalog.
///
/// Search matches on case-insensitive title equality and honors the year
/// filter strictly, like the real API. Queries listed in `failing` return a
/// rate-limit error instead.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    catalog: Vec<MovieMetadata>,
    failing: Vec<String>,
    searches: Mutex<Vec<(String, Option<u16>)>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_movie(mut self, id: &str, title: &str, year: u16) -> Self {
        self.catalog.push(MovieMetadata {
            external_id: id.to_string(),
            title: Some(title.to_string()),
            year: Some(year),
            plot: Some(format!("Plot of {title}")),
            ..MovieMetadata::default()
        });
        self
    }

    pub fn failing_on(mut self, query: &str) -> Self {
        self.failing.push(query.to_string());
        self
    }

    pub fn searches(&self) -> Vec<(String, Option<u16>)> {
        self.searches.lock().expect("search log").clone()
    }
}

#[async_trait]
impl MetadataProvider for ScriptedProvider {
    async fn search(
        &self,
        query: &str,
        year: Option<u16>,
    ) -> Result<Vec<SearchCandidate>, ProviderError> {
        self.searches
            .lock()
            .expect("search log")
            .push((query.to_string(), year));
        if self.failing.iter().any(|q| q == query) {
            return Err(ProviderError::RateLimited);
        }
        Ok(self
            .catalog
            .iter()
            .filter(|movie| {
                movie
                    .title
                    .as_deref()
                    .is_some_and(|title| title.eq_ignore_ascii_case(query))
            })
            .filter(|movie| year.is_none() || movie.year == year)
            .map(|movie| {
                SearchCandidate::new(
                    movie.external_id.clone(),
                    movie.title.clone().unwrap_or_default(),
                    movie.year,
                )
            })
            .collect())
    }

    async fn fetch(&self, external_id: &str) -> Result<MovieMetadata, ProviderError> {
        self.catalog
            .iter()
            .find(|movie| movie.external_id == external_id)
            .cloned()
            .ok_or(ProviderError::NotFound)
    }
}

/// Collects every progress event in arrival order.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgress {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().expect("progress log").clone()
    }
}

impl ProgressReporter for RecordingProgress {
    fn report(&self, event: ProgressEvent) {
        self.events.lock().expect("progress log").push(event);
    }
}

pub fn video(id: &str, title: &str) -> MovieEntity {
    let mut source = VideoChannelSource::new(id, format!("https://youtu.be/{id}"));
    source.title = Some(title.to_string());
    MovieEntity::from_source(Source::VideoChannel(source))
}

pub fn archive(id: &str, title: &str, year: Option<u16>) -> MovieEntity {
    let mut source =
        ArchiveSource::new(id, format!("https://archive.org/details/{id}"));
    source.title = Some(title.to_string());
    source.year = year;
    MovieEntity::from_source(Source::Archive(source))
}

/// Orchestrator wired to in-memory storage, with handles for inspection.
pub struct Harness {
    pub orchestrator: EnrichmentOrchestrator,
    pub provider: Arc<ScriptedProvider>,
    pub progress: Arc<RecordingProgress>,
    pub store_storage: Arc<MemoryStorage<StoreDocument>>,
    pub ledger_storage: Arc<MemoryStorage<LedgerDocument>>,
}

pub async fn harness(provider: ScriptedProvider, entities: Vec<MovieEntity>) -> Harness {
    let store_storage = Arc::new(MemoryStorage::<StoreDocument>::new());
    let ledger_storage = Arc::new(MemoryStorage::<LedgerDocument>::new());

    let mut store = CanonicalStore::new(store_storage.clone());
    for entity in entities {
        store.ingest(entity).expect("seed entity");
    }
    let ledger = FailureLedger::load(ledger_storage.clone())
        .await
        .expect("load ledger");

    let provider = Arc::new(provider);
    let progress = Arc::new(RecordingProgress::default());
    let orchestrator = EnrichmentOrchestrator::new(
        store,
        ledger,
        CandidateMatcher::new(provider.clone()),
        EnrichConfig::default().with_request_interval(Duration::ZERO),
    )
    .with_progress(progress.clone());

    Harness {
        orchestrator,
        provider,
        progress,
        store_storage,
        ledger_storage,
    }
}

pub fn searched_queries(provider: &ScriptedProvider) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for (query, _) in provider.searches() {
        *counts.entry(query).or_insert(0) += 1;
    }
    counts
}
