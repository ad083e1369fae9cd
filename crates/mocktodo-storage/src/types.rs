//! Entity types shared by the task and user stores.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Owner id recorded on tasks created while authentication is disabled.
pub const ANONYMOUS_USER_ID: i64 = 0;

/// A task as stored in a [`TaskStore`](crate::TaskStore).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Store-assigned identifier.
    pub id: i64,
    /// Task title.
    pub title: String,
    /// Id of the owning user, or [`ANONYMOUS_USER_ID`].
    #[serde(rename = "user_id")]
    pub owner_user_id: i64,
    /// When the task was first created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Task {
    /// Returns `true` if the task belongs to the given user.
    #[must_use]
    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.owner_user_id == user_id
    }
}

/// Fields supplied when creating or replacing a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub owner_user_id: i64,
}

impl NewTask {
    #[must_use]
    pub fn new(title: impl Into<String>, owner_user_id: i64) -> Self {
        Self {
            title: title.into(),
            owner_user_id,
        }
    }
}

/// A user record, including the password hash.
///
/// This is the persisted form. API responses use [`UserProfile`] so the
/// hash never leaves the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Store-assigned identifier.
    pub id: i64,
    /// Unique login name.
    pub username: String,
    /// PHC-formatted password hash.
    pub hashed_password: String,
    /// When the user registered.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl User {
    /// Returns the public view of this user.
    #[must_use]
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            username: self.username.clone(),
            created_at: self.created_at,
        }
    }
}

/// Fields supplied when creating or replacing a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub hashed_password: String,
}

impl NewUser {
    #[must_use]
    pub fn new(username: impl Into<String>, hashed_password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            hashed_password: hashed_password.into(),
        }
    }
}

/// User as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// The full task and user record set.
///
/// This is the document layout of the JSON data file, and the payload of the
/// memory-state introspection endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordSet {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub users: Vec<User>,
}

impl RecordSet {
    /// Creates an empty record set.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the next free task id (`max + 1`, or 1 when empty).
    #[must_use]
    pub fn next_task_id(&self) -> i64 {
        self.tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1
    }

    /// Returns the next free user id (`max + 1`, or 1 when empty).
    #[must_use]
    pub fn next_user_id(&self) -> i64 {
        self.users.iter().map(|u| u.id).max().unwrap_or(0) + 1
    }
}
