pub mod config;
pub mod error;
pub mod handlers;
pub mod observability;
pub mod server;

pub use config::{AppConfig, ConfigOverrides, LoggingConfig, ServerConfig, StorageConfig};
pub use error::{ApiError, ServerError};
pub use observability::{apply_logging_level, init_tracing};
pub use server::{AppState, MockTodoServer, ServerBuilder, ServerHandle, build_app};
