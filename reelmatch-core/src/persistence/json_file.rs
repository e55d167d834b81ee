use std::fmt;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

use super::{SnapshotError, SnapshotStorage};

/// Pretty-printed JSON document on local disk.
///
/// Writes go to a sibling temp file that is fsynced and then renamed over
/// the target, so readers only ever see a complete document.
pub struct JsonFileStorage<T> {
    path: PathBuf,
    _document: PhantomData<fn() -> T>,
}

impl<T> JsonFileStorage<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _document: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "snapshot".to_string());
        self.path
            .with_file_name(format!(".{file_name}.tmp-{}", Uuid::new_v4().simple()))
    }

    fn write_error(&self, source: std::io::Error) -> SnapshotError {
        SnapshotError::Write {
            path: self.path.clone(),
            source,
        }
    }

    async fn write_bytes(&self, bytes: &[u8], tmp: &Path) -> Result<(), SnapshotError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty())
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| self.write_error(err))?;
        }

        let mut file = tokio::fs::File::create(tmp)
            .await
            .map_err(|err| self.write_error(err))?;
        file.write_all(bytes)
            .await
            .map_err(|err| self.write_error(err))?;
        file.flush().await.map_err(|err| self.write_error(err))?;
        file.sync_all().await.map_err(|err| self.write_error(err))?;
        drop(file);

        tokio::fs::rename(tmp, &self.path)
            .await
            .map_err(|err| self.write_error(err))
    }
}

impl<T> fmt::Debug for JsonFileStorage<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonFileStorage")
            .field("path", &self.path)
            .finish()
    }
}

#[async_trait]
impl<T> SnapshotStorage<T> for JsonFileStorage<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    async fn read_all(&self) -> Result<Option<T>, SnapshotError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(SnapshotError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        serde_json::from_slice(&bytes).map(Some).map_err(|source| {
            SnapshotError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })
    }

    async fn write_all(&self, document: &T) -> Result<(), SnapshotError> {
        let bytes = serde_json::to_vec_pretty(document)?;
        let tmp = self.temp_path();

        if let Err(err) = self.write_bytes(&bytes, &tmp).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(err);
        }

        debug!(path = %self.path.display(), bytes = bytes.len(), "snapshot written");
        Ok(())
    }
}
