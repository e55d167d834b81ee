use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::error::{ModelError, Result};
use crate::key::MovieKey;
use crate::source::{Source, SourceRef};

/// Authoritative fields returned by the external metadata provider.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MovieMetadata {
    pub external_id: String,
    pub title: Option<String>,
    pub year: Option<u16>,
    pub rated: Option<String>,
    pub released: Option<String>,
    pub runtime: Option<String>,
    pub genre: Option<String>,
    pub director: Option<String>,
    pub writer: Option<String>,
    pub actors: Option<String>,
    pub plot: Option<String>,
    pub language: Option<String>,
    pub country: Option<String>,
    pub awards: Option<String>,
    pub poster_url: Option<String>,
    pub rating: Option<f32>,
    pub votes: Option<u64>,
}

/// Machine-suggested alternate title tried when the primary title fails.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AiHint {
    pub title: String,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub year: Option<u16>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MovieEntity {
    pub key: MovieKey,
    #[cfg_attr(feature = "serde", serde(default))]
    pub title: Option<String>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub year: Option<u16>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub sources: Vec<Source>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub metadata: Option<MovieMetadata>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub ai_hint: Option<AiHint>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub verified: bool,
    pub last_updated: DateTime<Utc>,
}

impl MovieEntity {
    pub fn new(key: MovieKey, title: Option<String>) -> Self {
        Self {
            key,
            title,
            year: None,
            sources: Vec::new(),
            metadata: None,
            ai_hint: None,
            verified: false,
            last_updated: Utc::now(),
        }
    }

    /// Provisional entity for a freshly scraped source.
    pub fn from_source(source: Source) -> Self {
        let key = MovieKey::provisional(&source);
        let title = source.title().map(str::to_string);
        let year = source.year();
        let mut entity = Self::new(key, title);
        entity.year = year;
        entity.sources.push(source);
        entity
    }

    pub fn with_year(mut self, year: u16) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_ai_hint(mut self, title: impl Into<String>, year: Option<u16>) -> Self {
        self.ai_hint = Some(AiHint {
            title: title.into(),
            year,
        });
        self
    }

    /// Title usable for matching, `None` when absent or blank.
    pub fn display_title(&self) -> Option<&str> {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|title| !title.is_empty())
    }

    pub fn is_matched(&self) -> bool {
        self.metadata.is_some()
    }

    pub fn has_source(&self, identity: &SourceRef) -> bool {
        self.sources.iter().any(|s| &s.identity() == identity)
    }

    pub fn source_refs(&self) -> impl Iterator<Item = SourceRef> + '_ {
        self.sources.iter().map(Source::identity)
    }

    /// First-ingested source; provisional keys are derived from it.
    pub fn primary_source(&self) -> Option<&Source> {
        self.sources.first()
    }

    /// Appends `source` unless one with the same identity is present.
    pub fn add_source(&mut self, source: Source) -> bool {
        if self.has_source(&source.identity()) {
            return false;
        }
        self.sources.push(source);
        true
    }

    /// Year carried by any source payload, in source order.
    pub fn source_year(&self) -> Option<u16> {
        self.sources.iter().find_map(Source::year)
    }

    pub fn validate_sources(&self) -> Result<()> {
        let mut seen = HashSet::with_capacity(self.sources.len());
        for identity in self.source_refs() {
            if !seen.insert(identity.clone()) {
                return Err(ModelError::DuplicateSource(identity));
            }
        }
        Ok(())
    }

    pub fn touch(&mut self) {
        self.last_updated = Utc::now();
    }
}
