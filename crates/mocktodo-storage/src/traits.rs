//! Repository traits for tasks and users.
//!
//! Both traits are object safe and implemented by the memory and JSON-file
//! backends. The server holds them as `Arc<dyn TaskStore>` /
//! `Arc<dyn UserStore>` chosen once at startup.

use async_trait::async_trait;

use crate::error::StorageError;
use crate::types::{NewTask, NewUser, Task, User};

/// Task repository.
///
/// Implementations must be thread-safe (`Send + Sync`) and serialize writes
/// so that concurrent callers never observe a partially applied change.
///
/// # Example
///
/// ```ignore
/// use mocktodo_storage::{StorageError, Task, TaskStore};
///
/// async fn load(store: &dyn TaskStore, id: i64) -> Result<Task, StorageError> {
///     store
///         .get(id)
///         .await?
///         .ok_or_else(|| StorageError::not_found("Task", id.to_string()))
/// }
/// ```
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Creates a task, assigning the next id and the creation timestamp.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the backend fails to persist the change.
    async fn create(&self, task: NewTask) -> Result<Task, StorageError>;

    /// Reads a task by id. Returns `None` if it does not exist.
    async fn get(&self, id: i64) -> Result<Option<Task>, StorageError>;

    /// Replaces the title and owner of an existing task.
    ///
    /// The id and creation timestamp are preserved.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the task does not exist.
    async fn update(&self, id: i64, task: NewTask) -> Result<Task, StorageError>;

    /// Deletes a task by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the task does not exist.
    async fn delete(&self, id: i64) -> Result<(), StorageError>;

    /// Lists all tasks ordered by id.
    async fn list(&self) -> Result<Vec<Task>, StorageError>;

    /// Lists the tasks owned by `owner_user_id`, ordered by id.
    async fn list_by_owner(&self, owner_user_id: i64) -> Result<Vec<Task>, StorageError> {
        let mut tasks = self.list().await?;
        tasks.retain(|t| t.is_owned_by(owner_user_id));
        Ok(tasks)
    }
}

/// User repository.
///
/// Usernames are unique. The uniqueness check happens inside the store's
/// write lock, so two concurrent registrations of the same name cannot both
/// succeed.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Creates a user, assigning the next id and the creation timestamp.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::AlreadyExists` if the username is taken.
    async fn create(&self, user: NewUser) -> Result<User, StorageError>;

    /// Reads a user by id.
    async fn get(&self, id: i64) -> Result<Option<User>, StorageError>;

    /// Reads a user by exact username.
    async fn get_by_username(&self, username: &str) -> Result<Option<User>, StorageError>;

    /// Replaces the username and password hash of an existing user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the user does not exist and
    /// `StorageError::AlreadyExists` if the new username belongs to another user.
    async fn update(&self, id: i64, user: NewUser) -> Result<User, StorageError>;

    /// Deletes a user by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the user does not exist.
    async fn delete(&self, id: i64) -> Result<(), StorageError>;

    /// Lists all users ordered by id.
    async fn list(&self) -> Result<Vec<User>, StorageError>;
}
