use std::path::PathBuf;
use std::sync::Arc;

use crate::error::StorageError;
use crate::file::{FileTaskStore, FileUserStore, JsonDocument};
use crate::memory::{MemoryTaskStore, MemoryUserStore};
use crate::traits::{TaskStore, UserStore};
use crate::types::RecordSet;

/// Supported storage backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// Volatile maps, lost on exit.
    Memory,
    /// A single JSON document holding tasks and users.
    JsonFile(PathBuf),
}

impl StorageBackend {
    /// Memory when `path` is `None`, the JSON file otherwise.
    #[must_use]
    pub fn from_path(path: Option<PathBuf>) -> Self {
        path.map_or(Self::Memory, Self::JsonFile)
    }
}

/// The task and user stores selected for one server instance.
#[derive(Clone)]
pub struct Stores {
    pub tasks: Arc<dyn TaskStore>,
    pub users: Arc<dyn UserStore>,
}

impl Stores {
    /// Returns every task and user currently held by the stores.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn snapshot(&self) -> Result<RecordSet, StorageError> {
        Ok(RecordSet {
            tasks: self.tasks.list().await?,
            users: self.users.list().await?,
        })
    }
}

/// Builds the stores for `backend`.
///
/// Both file stores share one [`JsonDocument`] so their writes are
/// serialized against each other.
///
/// # Errors
///
/// Returns `StorageError::Io` if the JSON file cannot be created.
pub async fn create_stores(backend: &StorageBackend) -> Result<Stores, StorageError> {
    match backend {
        StorageBackend::Memory => Ok(Stores {
            tasks: Arc::new(MemoryTaskStore::new()),
            users: Arc::new(MemoryUserStore::new()),
        }),
        StorageBackend::JsonFile(path) => {
            let doc = JsonDocument::open(path.clone()).await?;
            Ok(Stores {
                tasks: Arc::new(FileTaskStore::with_document(doc.clone())),
                users: Arc::new(FileUserStore::with_document(doc)),
            })
        }
    }
}
