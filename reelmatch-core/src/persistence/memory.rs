use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{SnapshotError, SnapshotStorage};

/// In-process snapshot holder for dry runs and tests.
///
/// Write failures can be injected with [`MemoryStorage::fail_writes`].
pub struct MemoryStorage<T> {
    document: Mutex<Option<T>>,
    writes: AtomicUsize,
    fail_writes: AtomicBool,
}

impl<T> MemoryStorage<T> {
    pub fn new() -> Self {
        Self {
            document: Mutex::new(None),
            writes: AtomicUsize::new(0),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn with_document(document: T) -> Self {
        Self {
            document: Mutex::new(Some(document)),
            ..Self::new()
        }
    }

    /// Number of successful `write_all` calls.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl<T: Clone> MemoryStorage<T> {
    /// Last successfully written document.
    pub fn snapshot(&self) -> Option<T> {
        self.document.lock().ok().and_then(|guard| guard.clone())
    }
}

impl<T> Default for MemoryStorage<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for MemoryStorage<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStorage")
            .field("writes", &self.write_count())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<T> SnapshotStorage<T> for MemoryStorage<T>
where
    T: Clone + Send + Sync,
{
    async fn read_all(&self) -> Result<Option<T>, SnapshotError> {
        let guard = self.document.lock().map_err(|_| {
            SnapshotError::Unavailable("memory snapshot lock poisoned".into())
        })?;
        Ok(guard.clone())
    }

    async fn write_all(&self, document: &T) -> Result<(), SnapshotError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(SnapshotError::Unavailable(
                "injected write failure".into(),
            ));
        }
        let mut guard = self.document.lock().map_err(|_| {
            SnapshotError::Unavailable("memory snapshot lock poisoned".into())
        })?;
        *guard = Some(document.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
