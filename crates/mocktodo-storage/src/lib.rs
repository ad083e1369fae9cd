//! # mocktodo-storage
//!
//! Task and user repositories for the mocktodo server.
//!
//! The crate defines the [`TaskStore`] and [`UserStore`] traits and two
//! backends for each:
//!
//! - [`memory`]: ordered maps behind a per-store `RwLock`
//! - [`file`]: one JSON document read and rewritten on every operation
//!
//! ## Example
//!
//! ```ignore
//! use mocktodo_storage::{NewTask, StorageBackend, create_stores};
//!
//! let stores = create_stores(&StorageBackend::Memory).await?;
//! let task = stores.tasks.create(NewTask::new("buy milk", 1)).await?;
//! assert_eq!(task.id, 1);
//! ```

mod error;
pub mod factory;
pub mod file;
pub mod memory;
mod traits;
mod types;

pub use error::{ErrorCategory, StorageError};
pub use factory::{StorageBackend, Stores, create_stores};
pub use file::{FileTaskStore, FileUserStore, JsonDocument};
pub use memory::{MemoryTaskStore, MemoryUserStore};
pub use traits::{TaskStore, UserStore};
pub use types::{ANONYMOUS_USER_ID, NewTask, NewUser, RecordSet, Task, User, UserProfile};

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Shared task store handle.
pub type DynTaskStore = std::sync::Arc<dyn TaskStore>;

/// Shared user store handle.
pub type DynUserStore = std::sync::Arc<dyn UserStore>;
