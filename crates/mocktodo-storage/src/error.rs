//! Storage error types for the task and user repositories.

use std::fmt;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested entity was not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity that was not found.
        entity: String,
        /// The ID (or unique key) that was looked up.
        id: String,
    },

    /// Attempted to create an entity whose unique key is already taken.
    #[error("{entity} already exists: {key}")]
    AlreadyExists {
        /// The kind of entity that already exists.
        entity: String,
        /// The conflicting unique key.
        key: String,
    },

    /// Reading or writing the backing file failed.
    #[error("I/O error on {path}: {message}")]
    Io {
        /// Path of the backing file.
        path: String,
        /// Description of the I/O failure.
        message: String,
    },

    /// The record set could not be serialized.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Description of the serialization failure.
        message: String,
    },
}

impl StorageError {
    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a new `AlreadyExists` error.
    #[must_use]
    pub fn already_exists(entity: impl Into<String>, key: impl Into<String>) -> Self {
        Self::AlreadyExists {
            entity: entity.into(),
            key: key.into(),
        }
    }

    /// Creates a new `Io` error.
    #[must_use]
    pub fn io(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Io {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `Serialization` error.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a not found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if this is an already exists error.
    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    /// Returns the error category for logging purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::AlreadyExists { .. } => ErrorCategory::Conflict,
            Self::Io { .. } => ErrorCategory::Infrastructure,
            Self::Serialization { .. } => ErrorCategory::Internal,
        }
    }
}

/// Categories of storage errors for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Entity not found.
    NotFound,
    /// Unique key conflict.
    Conflict,
    /// File system failure.
    Infrastructure,
    /// Internal error.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::Conflict => write!(f, "conflict"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StorageError::not_found("Task", "42");
        assert_eq!(err.to_string(), "Task not found: 42");

        let err = StorageError::already_exists("User", "alice");
        assert_eq!(err.to_string(), "User already exists: alice");

        let err = StorageError::io("/tmp/data.json", "permission denied");
        assert_eq!(
            err.to_string(),
            "I/O error on /tmp/data.json: permission denied"
        );
    }

    #[test]
    fn test_error_predicates() {
        let err = StorageError::not_found("Task", "1");
        assert!(err.is_not_found());
        assert!(!err.is_already_exists());

        let err = StorageError::already_exists("User", "bob");
        assert!(err.is_already_exists());
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_error_category() {
        assert_eq!(
            StorageError::not_found("Task", "1").category(),
            ErrorCategory::NotFound
        );
        assert_eq!(
            StorageError::already_exists("User", "bob").category(),
            ErrorCategory::Conflict
        );
        assert_eq!(
            StorageError::io("data.json", "disk full").category(),
            ErrorCategory::Infrastructure
        );
        assert_eq!(ErrorCategory::Conflict.to_string(), "conflict");
    }
}
