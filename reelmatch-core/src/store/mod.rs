//! Canonical movie store with merge-on-collision re-keying.
//!
//! The store keeps the full snapshot in memory and rewrites it wholesale on
//! [`CanonicalStore::persist`]. Mutating methods take `&mut self`, so the
//! owner of the store is its single writer.

pub mod merge;

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use reelmatch_model::{MovieEntity, MovieKey, SourceRef};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::persistence::{SnapshotError, SnapshotStorage};

pub use merge::{dedupe_sources, fold_into};

const STORE_DOCUMENT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("movie {0} not found")]
    NotFound(MovieKey),
    #[error("source {source_ref} already belongs to {owner}")]
    SourceConflict {
        source_ref: SourceRef,
        owner: MovieKey,
    },
    #[error("invalid entity {key}: {reason}")]
    InvalidEntity { key: MovieKey, reason: String },
    #[error("failed to write canonical store")]
    Write(#[source] SnapshotError),
    #[error("failed to load canonical store")]
    Load(#[source] SnapshotError),
}

/// Serialized form of the whole store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreDocument {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub movies: BTreeMap<MovieKey, MovieEntity>,
}

fn default_version() -> u32 {
    STORE_DOCUMENT_VERSION
}

impl Default for StoreDocument {
    fn default() -> Self {
        Self {
            version: STORE_DOCUMENT_VERSION,
            movies: BTreeMap::new(),
        }
    }
}

/// What [`CanonicalStore::migrate`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrateOutcome {
    /// Entity moved to a free key.
    Rekeyed,
    /// Entity folded into an existing one; `added_sources` were new to it.
    Merged { added_sources: usize },
    /// Nothing to move (`old == new`, or `old` was already migrated); the
    /// target's timestamp was refreshed.
    Refreshed,
}

pub struct CanonicalStore {
    document: StoreDocument,
    owners: HashMap<SourceRef, MovieKey>,
    storage: Arc<dyn SnapshotStorage<StoreDocument>>,
}

impl fmt::Debug for CanonicalStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CanonicalStore")
            .field("movies", &self.document.movies.len())
            .field("sources", &self.owners.len())
            .field("storage", &self.storage)
            .finish()
    }
}

impl CanonicalStore {
    /// Empty store backed by `storage`; nothing is read.
    pub fn new(storage: Arc<dyn SnapshotStorage<StoreDocument>>) -> Self {
        Self {
            document: StoreDocument::default(),
            owners: HashMap::new(),
            storage,
        }
    }

    /// Loads the persisted snapshot, repairing entries that break the
    /// one-owner-per-source invariant by merging them, canonical keys first.
    pub async fn load(
        storage: Arc<dyn SnapshotStorage<StoreDocument>>,
    ) -> Result<Self, StoreError> {
        let document = storage
            .read_all()
            .await
            .map_err(StoreError::Load)?
            .unwrap_or_default();

        let loaded = document.movies.len();
        let mut store = Self::new(storage);
        for (key, mut entity) in document.movies {
            if entity.key != key {
                warn!(key = %key, embedded = %entity.key, "entity key mismatch, using map key");
                entity.key = key.clone();
            }
            let landed = store.absorb(entity, false)?;
            if landed != key {
                debug!(key = %key, into = %landed, "folded entity sharing sources");
            }
        }

        let repaired = loaded - store.len();
        if repaired > 0 {
            warn!(repaired, "merged entities that shared sources on load");
        }
        info!(
            movies = store.len(),
            sources = store.owners.len(),
            repaired,
            "canonical store loaded"
        );
        Ok(store)
    }

    pub fn get(&self, key: &MovieKey) -> Option<&MovieEntity> {
        self.document.movies.get(key)
    }

    pub fn contains(&self, key: &MovieKey) -> bool {
        self.document.movies.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.document.movies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.document.movies.is_empty()
    }

    /// Entities in key order.
    pub fn iter(&self) -> impl Iterator<Item = &MovieEntity> {
        self.document.movies.values()
    }

    /// Key currently owning `source_ref`.
    pub fn owner_of(&self, source_ref: &SourceRef) -> Option<&MovieKey> {
        self.owners.get(source_ref)
    }

    /// Inserts or replaces the entity at `key`.
    ///
    /// Rejects entities with repeated sources and entities whose sources
    /// already belong to a different key; use [`CanonicalStore::ingest`] to
    /// merge instead.
    pub fn put(
        &mut self,
        key: MovieKey,
        mut entity: MovieEntity,
    ) -> Result<(), StoreError> {
        entity.key = key.clone();
        entity
            .validate_sources()
            .map_err(|err| StoreError::InvalidEntity {
                key: key.clone(),
                reason: err.to_string(),
            })?;

        for source_ref in entity.source_refs() {
            if let Some(owner) = self.owners.get(&source_ref) {
                if owner != &key {
                    return Err(StoreError::SourceConflict {
                        source_ref,
                        owner: owner.clone(),
                    });
                }
            }
        }

        if let Some(previous) = self.document.movies.remove(&key) {
            self.unindex(&previous);
        }
        entity.touch();
        self.index(&entity);
        self.document.movies.insert(key, entity);
        Ok(())
    }

    /// Put-or-merge entry point for ingestion.
    ///
    /// When the entity's key or any of its sources is already live, it is
    /// folded into that entity (canonical owners preferred) and every other
    /// overlapping owner is merged in as well. Returns the key it landed on.
    pub fn ingest(&mut self, entity: MovieEntity) -> Result<MovieKey, StoreError> {
        self.absorb(entity, true)
    }

    /// Shared body of [`CanonicalStore::ingest`] and load repair. With
    /// `touch_new` unset an entity landing on a free key keeps its
    /// `last_updated`; merges always refresh it.
    fn absorb(
        &mut self,
        mut entity: MovieEntity,
        touch_new: bool,
    ) -> Result<MovieKey, StoreError> {
        let dropped = dedupe_sources(&mut entity);
        if dropped > 0 {
            warn!(key = %entity.key, dropped, "dropped duplicate sources");
        }

        let mut owners: Vec<MovieKey> = entity
            .source_refs()
            .filter_map(|source_ref| self.owners.get(&source_ref).cloned())
            .collect();
        owners.push(entity.key.clone());
        // Canonical keys first, then keys already live, then key order.
        owners.sort_by_key(|key| {
            (!key.is_canonical(), !self.contains(key), key.clone())
        });
        owners.dedup();
        let target = owners[0].clone();

        if self.contains(&target) {
            let mut survivor = self.take(&target)?;
            fold_into(&mut survivor, entity);
            survivor.key = target.clone();
            self.index(&survivor);
            self.document.movies.insert(target.clone(), survivor);
        } else {
            entity.key = target.clone();
            if touch_new {
                entity.touch();
            }
            self.index(&entity);
            self.document.movies.insert(target.clone(), entity);
        }

        for other in owners.iter().skip(1) {
            if self.contains(other) {
                self.migrate(other, &target)?;
            }
        }
        Ok(target)
    }

    /// Re-keys `old` to `new`, merging when `new` is already live.
    pub fn migrate(
        &mut self,
        old: &MovieKey,
        new: &MovieKey,
    ) -> Result<MigrateOutcome, StoreError> {
        if old == new || !self.contains(old) {
            return match self.document.movies.get_mut(new) {
                Some(existing) => {
                    existing.touch();
                    Ok(MigrateOutcome::Refreshed)
                }
                None => Err(StoreError::NotFound(old.clone())),
            };
        }

        let mut moving = self.take(old)?;

        match self.document.movies.remove(new) {
            None => {
                moving.key = new.clone();
                moving.touch();
                self.index(&moving);
                self.document.movies.insert(new.clone(), moving);
                debug!(from = %old, to = %new, "re-keyed movie");
                Ok(MigrateOutcome::Rekeyed)
            }
            Some(mut survivor) => {
                let added_sources = fold_into(&mut survivor, moving);
                self.index(&survivor);
                self.document.movies.insert(new.clone(), survivor);
                info!(from = %old, into = %new, added_sources, "merged movie");
                Ok(MigrateOutcome::Merged { added_sources })
            }
        }
    }

    /// Rolls a match back: strips metadata and verification, then moves the
    /// entity to the provisional key of its primary source.
    pub fn demote(&mut self, key: &MovieKey) -> Result<MovieKey, StoreError> {
        let entity = self
            .document
            .movies
            .get_mut(key)
            .ok_or_else(|| StoreError::NotFound(key.clone()))?;

        let Some(target) = entity.primary_source().map(MovieKey::provisional)
        else {
            return Err(StoreError::InvalidEntity {
                key: key.clone(),
                reason: "no sources to derive a provisional key from".into(),
            });
        };

        entity.metadata = None;
        entity.verified = false;
        entity.touch();

        if &target != key {
            self.migrate(key, &target)?;
        }
        info!(from = %key, to = %target, "demoted movie");
        Ok(target)
    }

    /// Rewrites the whole snapshot to durable storage.
    pub async fn persist(&self) -> Result<(), StoreError> {
        self.storage
            .write_all(&self.document)
            .await
            .map_err(StoreError::Write)
    }

    fn take(&mut self, key: &MovieKey) -> Result<MovieEntity, StoreError> {
        let entity = self
            .document
            .movies
            .remove(key)
            .ok_or_else(|| StoreError::NotFound(key.clone()))?;
        self.unindex(&entity);
        Ok(entity)
    }

    fn index(&mut self, entity: &MovieEntity) {
        for source_ref in entity.source_refs() {
            self.owners.insert(source_ref, entity.key.clone());
        }
    }

    /// Only releases sources still attributed to `entity`; a merge may
    /// already have handed them to another key.
    fn unindex(&mut self, entity: &MovieEntity) {
        for source_ref in entity.source_refs() {
            if self.owners.get(&source_ref) == Some(&entity.key) {
                self.owners.remove(&source_ref);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStorage;
    use reelmatch_model::{ArchiveSource, MovieMetadata, Source, VideoChannelSource};

    fn key(value: &str) -> MovieKey {
        MovieKey::new(value).unwrap()
    }

    fn video(id: &str) -> Source {
        Source::VideoChannel(VideoChannelSource::new(id, format!("https://youtu.be/{id}")))
    }

    fn archive(id: &str) -> Source {
        Source::Archive(ArchiveSource::new(id, format!("https://archive.org/details/{id}")))
    }

    fn store() -> CanonicalStore {
        CanonicalStore::new(Arc::new(MemoryStorage::<StoreDocument>::new()))
    }

    fn assert_invariant(store: &CanonicalStore) {
        let mut seen = HashMap::new();
        for entity in store.iter() {
            entity.validate_sources().expect("no duplicate sources");
            for source_ref in entity.source_refs() {
                let previous = seen.insert(source_ref.clone(), entity.key.clone());
                assert!(previous.is_none(), "{source_ref} owned twice");
                assert_eq!(store.owner_of(&source_ref), Some(&entity.key));
            }
        }
        assert_eq!(seen.len(), store.owners.len());
    }

    #[test]
    fn migrate_rekeys_into_free_key() {
        let mut store = store();
        let entity = MovieEntity::from_source(video("abc"));
        store.put(entity.key.clone(), entity).unwrap();

        let outcome = store.migrate(&key("youtube-abc"), &key("tt0133093")).unwrap();

        assert_eq!(outcome, MigrateOutcome::Rekeyed);
        assert!(store.get(&key("youtube-abc")).is_none());
        assert_eq!(store.get(&key("tt0133093")).unwrap().key, key("tt0133093"));
        assert_eq!(store.owner_of(&video("abc").identity()), Some(&key("tt0133093")));
        assert_invariant(&store);
    }

    #[test]
    fn migrate_merges_on_collision() {
        let mut store = store();
        for source in [video("abc"), archive("xyz")] {
            let entity = MovieEntity::from_source(source);
            store.put(entity.key.clone(), entity).unwrap();
        }

        store.migrate(&key("youtube-abc"), &key("tt0000001")).unwrap();
        let outcome = store.migrate(&key("archive-xyz"), &key("tt0000001")).unwrap();

        assert_eq!(outcome, MigrateOutcome::Merged { added_sources: 1 });
        assert_eq!(store.len(), 1);
        let merged = store.get(&key("tt0000001")).unwrap();
        assert!(merged.has_source(&video("abc").identity()));
        assert!(merged.has_source(&archive("xyz").identity()));
        assert_invariant(&store);
    }

    #[test]
    fn repeated_migration_is_a_refresh() {
        let mut store = store();
        let entity = MovieEntity::from_source(video("abc"));
        store.put(entity.key.clone(), entity).unwrap();
        store.migrate(&key("youtube-abc"), &key("tt0133093")).unwrap();
        let before = store.get(&key("tt0133093")).unwrap().clone();

        let outcome = store.migrate(&key("youtube-abc"), &key("tt0133093")).unwrap();

        assert_eq!(outcome, MigrateOutcome::Refreshed);
        let after = store.get(&key("tt0133093")).unwrap();
        assert_eq!(after.sources, before.sources);
        assert!(after.last_updated >= before.last_updated);
    }

    #[test]
    fn migrate_of_unknown_keys_fails() {
        let mut store = store();
        let err = store.migrate(&key("youtube-nope"), &key("tt0133093")).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn put_rejects_sources_owned_elsewhere() {
        let mut store = store();
        let entity = MovieEntity::from_source(video("abc"));
        store.put(entity.key.clone(), entity).unwrap();

        let mut thief = MovieEntity::from_source(archive("xyz"));
        thief.add_source(video("abc"));
        let err = store.put(thief.key.clone(), thief).unwrap_err();

        assert!(matches!(err, StoreError::SourceConflict { .. }));
        assert!(store.get(&key("archive-xyz")).is_none());
        assert_invariant(&store);
    }

    #[test]
    fn put_rejects_internal_duplicates() {
        let mut store = store();
        let mut entity = MovieEntity::from_source(video("abc"));
        entity.sources.push(video("abc"));
        let err = store.put(entity.key.clone(), entity).unwrap_err();
        assert!(matches!(err, StoreError::InvalidEntity { .. }));
    }

    #[test]
    fn put_replacing_an_entity_releases_dropped_sources() {
        let mut store = store();
        let mut entity = MovieEntity::from_source(video("abc"));
        entity.add_source(archive("xyz"));
        store.put(entity.key.clone(), entity.clone()).unwrap();

        entity.sources.truncate(1);
        store.put(entity.key.clone(), entity).unwrap();

        assert_eq!(store.owner_of(&archive("xyz").identity()), None);
        assert_invariant(&store);
    }

    #[test]
    fn ingest_merges_into_existing_owner() {
        let mut store = store();
        let entity = MovieEntity::from_source(video("abc"));
        store.put(entity.key.clone(), entity).unwrap();
        store.migrate(&key("youtube-abc"), &key("tt0133093")).unwrap();

        let mut rescraped = MovieEntity::from_source(video("abc"));
        rescraped.add_source(archive("xyz"));
        let landed = store.ingest(rescraped).unwrap();

        assert_eq!(landed, key("tt0133093"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&landed).unwrap().sources.len(), 2);
        assert_invariant(&store);
    }

    #[test]
    fn ingest_collapses_every_overlapping_owner() {
        let mut store = store();
        for source in [video("abc"), archive("xyz")] {
            let entity = MovieEntity::from_source(source);
            store.put(entity.key.clone(), entity).unwrap();
        }

        let mut bridge = MovieEntity::from_source(video("abc"));
        bridge.add_source(archive("xyz"));
        let landed = store.ingest(bridge).unwrap();

        assert_eq!(landed, key("archive-xyz"));
        assert_eq!(store.len(), 1);
        assert_invariant(&store);
    }

    #[test]
    fn demote_moves_back_to_provisional_key() {
        let mut store = store();
        let entity = MovieEntity::from_source(video("abc"));
        store.put(entity.key.clone(), entity).unwrap();
        store.migrate(&key("youtube-abc"), &key("tt0133093")).unwrap();

        let mut matched = store.get(&key("tt0133093")).unwrap().clone();
        matched.metadata = Some(MovieMetadata {
            external_id: "tt0133093".into(),
            ..MovieMetadata::default()
        });
        matched.verified = true;
        store.put(key("tt0133093"), matched).unwrap();

        let target = store.demote(&key("tt0133093")).unwrap();

        assert_eq!(target, key("youtube-abc"));
        assert!(store.get(&key("tt0133093")).is_none());
        let demoted = store.get(&target).unwrap();
        assert!(demoted.metadata.is_none());
        assert!(!demoted.verified);
        assert_invariant(&store);
    }

    #[tokio::test]
    async fn load_repairs_shared_sources() {
        let mut document = StoreDocument::default();
        let first = MovieEntity::from_source(video("abc"));
        let mut second = MovieEntity::new(key("tt0000001"), Some("Dup".into()));
        second.add_source(video("abc"));
        second.add_source(archive("xyz"));
        document.movies.insert(first.key.clone(), first);
        document.movies.insert(second.key.clone(), second);

        let storage = Arc::new(MemoryStorage::with_document(document));
        let store = CanonicalStore::load(storage).await.unwrap();

        assert_eq!(store.len(), 1);
        let survivor = store.get(&key("tt0000001")).unwrap();
        assert_eq!(survivor.sources.len(), 2);
        assert_invariant(&store);
    }

    #[tokio::test]
    async fn load_keeps_last_updated_of_untouched_entities() {
        let stamp = chrono::DateTime::parse_from_rfc3339("2020-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc);
        let mut entity = MovieEntity::from_source(video("abc"));
        entity.last_updated = stamp;
        let mut document = StoreDocument::default();
        document.movies.insert(entity.key.clone(), entity);

        let storage = Arc::new(MemoryStorage::with_document(document));
        let store = CanonicalStore::load(storage).await.unwrap();

        assert_eq!(store.get(&key("youtube-abc")).unwrap().last_updated, stamp);
    }

    #[tokio::test]
    async fn persist_writes_the_whole_snapshot() {
        let storage = Arc::new(MemoryStorage::<StoreDocument>::new());
        let mut store = CanonicalStore::new(storage.clone());
        let entity = MovieEntity::from_source(video("abc"));
        store.put(entity.key.clone(), entity).unwrap();

        store.persist().await.unwrap();

        let written = storage.snapshot().unwrap();
        assert_eq!(written.movies.len(), 1);
        assert!(written.movies.contains_key(&key("youtube-abc")));
    }
}
