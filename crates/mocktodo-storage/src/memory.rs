//! Volatile in-memory stores.
//!
//! Each store owns one `RwLock` around an ordered map and its id counter.
//! Reads share the lock, writes take it exclusively.

use std::collections::BTreeMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::error::StorageError;
use crate::traits::{TaskStore, UserStore};
use crate::types::{NewTask, NewUser, Task, User};

#[derive(Debug)]
struct Table<T> {
    rows: BTreeMap<i64, T>,
    next_id: i64,
}

impl<T> Table<T> {
    fn new() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }

    fn allocate_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

/// In-memory [`TaskStore`].
#[derive(Debug)]
pub struct MemoryTaskStore {
    table: RwLock<Table<Task>>,
}

impl MemoryTaskStore {
    /// Creates an empty store whose first id is 1.
    pub fn new() -> Self {
        Self {
            table: RwLock::new(Table::new()),
        }
    }
}

impl Default for MemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn create(&self, task: NewTask) -> Result<Task, StorageError> {
        let mut table = self.table.write().await;
        let id = table.allocate_id();
        let created = Task {
            id,
            title: task.title,
            owner_user_id: task.owner_user_id,
            created_at: OffsetDateTime::now_utc(),
        };
        table.rows.insert(id, created.clone());
        Ok(created)
    }

    async fn get(&self, id: i64) -> Result<Option<Task>, StorageError> {
        Ok(self.table.read().await.rows.get(&id).cloned())
    }

    async fn update(&self, id: i64, task: NewTask) -> Result<Task, StorageError> {
        let mut table = self.table.write().await;
        let existing = table
            .rows
            .get_mut(&id)
            .ok_or_else(|| StorageError::not_found("Task", id.to_string()))?;
        existing.title = task.title;
        existing.owner_user_id = task.owner_user_id;
        Ok(existing.clone())
    }

    async fn delete(&self, id: i64) -> Result<(), StorageError> {
        self.table
            .write()
            .await
            .rows
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StorageError::not_found("Task", id.to_string()))
    }

    async fn list(&self) -> Result<Vec<Task>, StorageError> {
        Ok(self.table.read().await.rows.values().cloned().collect())
    }

    async fn list_by_owner(&self, owner_user_id: i64) -> Result<Vec<Task>, StorageError> {
        Ok(self
            .table
            .read()
            .await
            .rows
            .values()
            .filter(|t| t.is_owned_by(owner_user_id))
            .cloned()
            .collect())
    }
}

/// In-memory [`UserStore`].
#[derive(Debug)]
pub struct MemoryUserStore {
    table: RwLock<Table<User>>,
}

impl MemoryUserStore {
    /// Creates an empty store whose first id is 1.
    pub fn new() -> Self {
        Self {
            table: RwLock::new(Table::new()),
        }
    }
}

impl Default for MemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

fn username_taken(rows: &BTreeMap<i64, User>, username: &str, except: Option<i64>) -> bool {
    rows.values()
        .any(|u| u.username == username && Some(u.id) != except)
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, user: NewUser) -> Result<User, StorageError> {
        let mut table = self.table.write().await;
        if username_taken(&table.rows, &user.username, None) {
            return Err(StorageError::already_exists("User", user.username));
        }
        let id = table.allocate_id();
        let created = User {
            id,
            username: user.username,
            hashed_password: user.hashed_password,
            created_at: OffsetDateTime::now_utc(),
        };
        table.rows.insert(id, created.clone());
        Ok(created)
    }

    async fn get(&self, id: i64) -> Result<Option<User>, StorageError> {
        Ok(self.table.read().await.rows.get(&id).cloned())
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, StorageError> {
        Ok(self
            .table
            .read()
            .await
            .rows
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn update(&self, id: i64, user: NewUser) -> Result<User, StorageError> {
        let mut table = self.table.write().await;
        if username_taken(&table.rows, &user.username, Some(id)) {
            return Err(StorageError::already_exists("User", user.username));
        }
        let existing = table
            .rows
            .get_mut(&id)
            .ok_or_else(|| StorageError::not_found("User", id.to_string()))?;
        existing.username = user.username;
        existing.hashed_password = user.hashed_password;
        Ok(existing.clone())
    }

    async fn delete(&self, id: i64) -> Result<(), StorageError> {
        self.table
            .write()
            .await
            .rows
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StorageError::not_found("User", id.to_string()))
    }

    async fn list(&self) -> Result<Vec<User>, StorageError> {
        Ok(self.table.read().await.rows.values().cloned().collect())
    }
}
