//! Whole-document snapshot storage for the canonical store and ledger.

pub mod json_file;
pub mod memory;

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

pub use json_file::JsonFileStorage;
pub use memory::MemoryStorage;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to read snapshot {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write snapshot {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("snapshot {path} is not valid JSON")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize snapshot: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("snapshot storage unavailable: {0}")]
    Unavailable(String),
}

/// `readAll`/`writeAll` access to one durable document.
///
/// `write_all` replaces the whole document; a crash mid-write must leave the
/// previous document intact.
#[async_trait]
pub trait SnapshotStorage<T>: Send + Sync + fmt::Debug
where
    T: Send + Sync,
{
    /// `Ok(None)` when the document has never been written.
    async fn read_all(&self) -> Result<Option<T>, SnapshotError>;

    async fn write_all(&self, document: &T) -> Result<(), SnapshotError>;
}
