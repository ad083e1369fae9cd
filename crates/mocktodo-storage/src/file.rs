//! JSON-file backed stores.
//!
//! Tasks and users live together in one [`RecordSet`] document. Every
//! operation re-reads the whole file, applies its change in memory and writes
//! the whole file back. Unreadable or unparseable content is logged and
//! treated as an empty record set.
//!
//! A [`FileTaskStore`] and a [`FileUserStore`] opened from the same
//! [`JsonDocument`] share its lock, so a task write can never overwrite a
//! concurrent user write (or the other way around). Nothing coordinates with
//! other processes touching the file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::error::StorageError;
use crate::traits::{TaskStore, UserStore};
use crate::types::{NewTask, NewUser, RecordSet, Task, User};

#[derive(Debug)]
struct Counters {
    next_task_id: i64,
    next_user_id: i64,
}

/// Handle to a JSON data file shared by the file-backed stores.
#[derive(Debug)]
pub struct JsonDocument {
    path: PathBuf,
    counters: RwLock<Counters>,
}

impl JsonDocument {
    /// Opens (and creates, if missing) the data file at `path`.
    ///
    /// The next task and user ids are recovered as `max(existing) + 1`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if a missing file cannot be created.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Arc<Self>, StorageError> {
        let path = path.into();
        ensure_exists(&path).await?;
        let records = read_records(&path).await;

        tracing::info!(
            path = %path.display(),
            tasks = records.tasks.len(),
            users = records.users.len(),
            "Opened JSON data file"
        );

        Ok(Arc::new(Self {
            counters: RwLock::new(Counters {
                next_task_id: records.next_task_id(),
                next_user_id: records.next_user_id(),
            }),
            path,
        }))
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the current record set under the shared lock.
    pub async fn snapshot(&self) -> RecordSet {
        let _guard = self.counters.read().await;
        self.load().await
    }

    async fn load(&self) -> RecordSet {
        if let Err(err) = ensure_exists(&self.path).await {
            tracing::warn!(error = %err, "Data file unavailable, using empty record set");
            return RecordSet::empty();
        }
        read_records(&self.path).await
    }

    async fn save(&self, records: &RecordSet) -> Result<(), StorageError> {
        write_records(&self.path, records).await
    }
}

async fn ensure_exists(path: &Path) -> Result<(), StorageError> {
    match tokio::fs::metadata(path).await {
        Ok(_) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| StorageError::io(parent.display().to_string(), e.to_string()))?;
            }
            write_records(path, &RecordSet::empty()).await
        }
        Err(err) => Err(StorageError::io(path.display().to_string(), err.to_string())),
    }
}

async fn read_records(path: &Path) -> RecordSet {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "Failed to read data file, using empty record set"
            );
            return RecordSet::empty();
        }
    };

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return RecordSet::empty();
    }

    serde_json::from_slice(&bytes).unwrap_or_else(|err| {
        tracing::warn!(
            path = %path.display(),
            error = %err,
            "Data file is not a valid record set, using empty record set"
        );
        RecordSet::empty()
    })
}

async fn write_records(path: &Path, records: &RecordSet) -> Result<(), StorageError> {
    let body = serde_json::to_vec_pretty(records)
        .map_err(|e| StorageError::serialization(e.to_string()))?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, body)
        .await
        .map_err(|e| StorageError::io(tmp.display().to_string(), e.to_string()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| StorageError::io(path.display().to_string(), e.to_string()))
}

/// [`TaskStore`] persisted to a [`JsonDocument`].
#[derive(Debug, Clone)]
pub struct FileTaskStore {
    doc: Arc<JsonDocument>,
}

impl FileTaskStore {
    /// Opens a task store on its own document handle.
    ///
    /// # Errors
    ///
    /// See [`JsonDocument::open`].
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        Ok(Self::with_document(JsonDocument::open(path).await?))
    }

    /// Creates a task store that shares an already opened document.
    #[must_use]
    pub fn with_document(doc: Arc<JsonDocument>) -> Self {
        Self { doc }
    }
}

#[async_trait]
impl TaskStore for FileTaskStore {
    async fn create(&self, task: NewTask) -> Result<Task, StorageError> {
        let mut counters = self.doc.counters.write().await;
        let mut records = self.doc.load().await;

        let id = counters.next_task_id.max(records.next_task_id());
        let created = Task {
            id,
            title: task.title,
            owner_user_id: task.owner_user_id,
            created_at: OffsetDateTime::now_utc(),
        };
        records.tasks.push(created.clone());
        self.doc.save(&records).await?;

        counters.next_task_id = id + 1;
        Ok(created)
    }

    async fn get(&self, id: i64) -> Result<Option<Task>, StorageError> {
        let _guard = self.doc.counters.read().await;
        Ok(self.doc.load().await.tasks.into_iter().find(|t| t.id == id))
    }

    async fn update(&self, id: i64, task: NewTask) -> Result<Task, StorageError> {
        let _guard = self.doc.counters.write().await;
        let mut records = self.doc.load().await;

        let existing = records
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| StorageError::not_found("Task", id.to_string()))?;
        existing.title = task.title;
        existing.owner_user_id = task.owner_user_id;
        let updated = existing.clone();

        self.doc.save(&records).await?;
        Ok(updated)
    }

    async fn delete(&self, id: i64) -> Result<(), StorageError> {
        let _guard = self.doc.counters.write().await;
        let mut records = self.doc.load().await;

        let before = records.tasks.len();
        records.tasks.retain(|t| t.id != id);
        if records.tasks.len() == before {
            return Err(StorageError::not_found("Task", id.to_string()));
        }
        self.doc.save(&records).await
    }

    async fn list(&self) -> Result<Vec<Task>, StorageError> {
        let mut tasks = self.doc.snapshot().await.tasks;
        tasks.sort_by_key(|t| t.id);
        Ok(tasks)
    }
}

/// [`UserStore`] persisted to a [`JsonDocument`].
#[derive(Debug, Clone)]
pub struct FileUserStore {
    doc: Arc<JsonDocument>,
}

impl FileUserStore {
    /// Opens a user store on its own document handle.
    ///
    /// # Errors
    ///
    /// See [`JsonDocument::open`].
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        Ok(Self::with_document(JsonDocument::open(path).await?))
    }

    /// Creates a user store that shares an already opened document.
    #[must_use]
    pub fn with_document(doc: Arc<JsonDocument>) -> Self {
        Self { doc }
    }
}

#[async_trait]
impl UserStore for FileUserStore {
    async fn create(&self, user: NewUser) -> Result<User, StorageError> {
        let mut counters = self.doc.counters.write().await;
        let mut records = self.doc.load().await;

        if records.users.iter().any(|u| u.username == user.username) {
            return Err(StorageError::already_exists("User", user.username));
        }

        let id = counters.next_user_id.max(records.next_user_id());
        let created = User {
            id,
            username: user.username,
            hashed_password: user.hashed_password,
            created_at: OffsetDateTime::now_utc(),
        };
        records.users.push(created.clone());
        self.doc.save(&records).await?;

        counters.next_user_id = id + 1;
        Ok(created)
    }

    async fn get(&self, id: i64) -> Result<Option<User>, StorageError> {
        let _guard = self.doc.counters.read().await;
        Ok(self.doc.load().await.users.into_iter().find(|u| u.id == id))
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, StorageError> {
        let _guard = self.doc.counters.read().await;
        Ok(self
            .doc
            .load()
            .await
            .users
            .into_iter()
            .find(|u| u.username == username))
    }

    async fn update(&self, id: i64, user: NewUser) -> Result<User, StorageError> {
        let _guard = self.doc.counters.write().await;
        let mut records = self.doc.load().await;

        if records
            .users
            .iter()
            .any(|u| u.username == user.username && u.id != id)
        {
            return Err(StorageError::already_exists("User", user.username));
        }

        let existing = records
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| StorageError::not_found("User", id.to_string()))?;
        existing.username = user.username;
        existing.hashed_password = user.hashed_password;
        let updated = existing.clone();

        self.doc.save(&records).await?;
        Ok(updated)
    }

    async fn delete(&self, id: i64) -> Result<(), StorageError> {
        let _guard = self.doc.counters.write().await;
        let mut records = self.doc.load().await;

        let before = records.users.len();
        records.users.retain(|u| u.id != id);
        if records.users.len() == before {
            return Err(StorageError::not_found("User", id.to_string()));
        }
        self.doc.save(&records).await
    }

    async fn list(&self) -> Result<Vec<User>, StorageError> {
        let mut users = self.doc.snapshot().await.users;
        users.sort_by_key(|u| u.id);
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn data_path(dir: &TempDir) -> PathBuf {
        dir.path().join("data.json")
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_same_username_creates_one_user() {
        let dir = TempDir::new().unwrap();
        let path = data_path(&dir);
        let users = Arc::new(FileUserStore::open(&path).await.unwrap());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let users = users.clone();
                tokio::spawn(async move { users.create(NewUser::new("alice", format!("h{i}"))).await })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(e) => assert!(e.is_already_exists(), "unexpected error: {e}"),
            }
        }
        assert_eq!(created, 1);

        let raw = std::fs::read_to_string(&path).unwrap();
        let parsed: RecordSet = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.users.len(), 1);
    }

    #[tokio::test]
    async fn test_open_creates_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("data.json");

        let store = FileTaskStore::open(&path).await.unwrap();
        assert!(path.exists());
        assert!(store.list().await.unwrap().is_empty());

        let raw = std::fs::read_to_string(&path).unwrap();
        let parsed: RecordSet = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, RecordSet::empty());
    }

    #[tokio::test]
    async fn test_ids_continue_after_reopen() {
        let dir = TempDir::new().unwrap();
        let path = data_path(&dir);

        {
            let tasks = FileTaskStore::open(&path).await.unwrap();
            for title in ["a", "b", "c"] {
                tasks.create(NewTask::new(title, 1)).await.unwrap();
            }
            tasks.delete(1).await.unwrap();

            let users = FileUserStore::open(&path).await.unwrap();
            users.create(NewUser::new("alice", "h")).await.unwrap();
        }

        let tasks = FileTaskStore::open(&path).await.unwrap();
        let next = tasks.create(NewTask::new("d", 1)).await.unwrap();
        assert_eq!(next.id, 4);

        let users = FileUserStore::open(&path).await.unwrap();
        let bob = users.create(NewUser::new("bob", "h")).await.unwrap();
        assert_eq!(bob.id, 2);
    }

    #[tokio::test]
    async fn test_corrupt_file_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let path = data_path(&dir);
        std::fs::write(&path, "{ not json").unwrap();

        let store = FileTaskStore::open(&path).await.unwrap();
        assert!(store.list().await.unwrap().is_empty());

        let created = store.create(NewTask::new("fresh", 0)).await.unwrap();
        assert_eq!(created.id, 1);
    }

    #[tokio::test]
    async fn test_empty_file_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let path = data_path(&dir);
        std::fs::write(&path, "").unwrap();

        let users = FileUserStore::open(&path).await.unwrap();
        assert!(users.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_shared_document_keeps_both_sections() {
        let dir = TempDir::new().unwrap();
        let doc = JsonDocument::open(data_path(&dir)).await.unwrap();
        let tasks = Arc::new(FileTaskStore::with_document(doc.clone()));
        let users = Arc::new(FileUserStore::with_document(doc.clone()));

        let mut handles = Vec::new();
        for i in 0..8 {
            let tasks = tasks.clone();
            let users = users.clone();
            handles.push(tokio::spawn(async move {
                tasks
                    .create(NewTask::new(format!("t{i}"), 1))
                    .await
                    .unwrap();
                users
                    .create(NewUser::new(format!("user{i}"), "h"))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let snapshot = doc.snapshot().await;
        assert_eq!(snapshot.tasks.len(), 8);
        assert_eq!(snapshot.users.len(), 8);
    }

    #[tokio::test]
    async fn test_update_and_delete_persist() {
        let dir = TempDir::new().unwrap();
        let path = data_path(&dir);
        let store = FileTaskStore::open(&path).await.unwrap();

        let task = store.create(NewTask::new("draft", 2)).await.unwrap();
        let updated = store
            .update(task.id, NewTask::new("final", 2))
            .await
            .unwrap();
        assert_eq!(updated.created_at, task.created_at);

        let reopened = FileTaskStore::open(&path).await.unwrap();
        assert_eq!(reopened.get(task.id).await.unwrap(), Some(updated));

        reopened.delete(task.id).await.unwrap();
        assert!(store.get(task.id).await.unwrap().is_none());
        assert!(store.delete(task.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_users_written_with_password_hash() {
        let dir = TempDir::new().unwrap();
        let path = data_path(&dir);
        let users = FileUserStore::open(&path).await.unwrap();
        users.create(NewUser::new("carol", "$argon2id$x")).await.unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"hashed_password\": \"$argon2id$x\""));

        let err = users
            .create(NewUser::new("carol", "other"))
            .await
            .unwrap_err();
        assert!(err.is_already_exists());
        assert_eq!(
            users.get_by_username("carol").await.unwrap().unwrap().id,
            1
        );
    }
}
