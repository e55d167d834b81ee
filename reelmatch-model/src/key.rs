use std::fmt;

use crate::error::{ModelError, Result};
use crate::source::Source;

/// Which keyspace a [`MovieKey`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    /// Externally recognized identifier (`tt0133093`).
    Canonical,
    /// Placeholder derived from a single source (`youtube-<videoId>`).
    Provisional,
}

/// Identity of a movie entity in the canonical store.
///
/// This is intentionally a thin wrapper around `String` so:
/// - call sites can't accidentally pass an arbitrary string without opting in
/// - serialization remains compact (the key doubles as the document map key)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct MovieKey(String);

impl MovieKey {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ModelError::EmptyKey);
        }
        if trimmed.len() != value.len() {
            return Ok(Self(trimmed.to_string()));
        }
        Ok(Self(value))
    }

    /// Deterministic placeholder key for an entity first seen through
    /// `source`.
    pub fn provisional(source: &Source) -> Self {
        Self(format!(
            "{}-{}",
            source.kind().key_prefix(),
            source.source_id()
        ))
    }

    pub fn kind(&self) -> KeyKind {
        if is_external_id(&self.0) {
            KeyKind::Canonical
        } else {
            KeyKind::Provisional
        }
    }

    pub fn is_canonical(&self) -> bool {
        self.kind() == KeyKind::Canonical
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// `tt` followed by at least seven digits.
fn is_external_id(value: &str) -> bool {
    value
        .strip_prefix("tt")
        .is_some_and(|digits| {
            digits.len() >= 7 && digits.bytes().all(|b| b.is_ascii_digit())
        })
}

impl fmt::Display for MovieKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for MovieKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
