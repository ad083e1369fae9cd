//! Log output for the server binary.
//!
//! Our own crates and the HTTP trace layer log at the configured level;
//! everything else is held at `warn`. `RUST_LOG`, when set, replaces the
//! startup filter but not levels applied later from configuration.

use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

const APP_TARGETS: [&str; 4] = [
    "mocktodo_server",
    "mocktodo_auth",
    "mocktodo_storage",
    "tower_http",
];

static FILTER_HANDLE: OnceLock<reload::Handle<EnvFilter, Registry>> = OnceLock::new();

/// Filter directives that apply `level` to the application targets.
pub fn directives(level: &str) -> String {
    let mut out = String::from("warn");
    for target in APP_TARGETS {
        out.push_str(&format!(",{target}={level}"));
    }
    out
}

/// Installs the global subscriber at `info`. Calling it twice is a no-op.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives("info")));
    let (filter, handle) = reload::Layer::new(filter);

    if tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init()
        .is_ok()
    {
        let _ = FILTER_HANDLE.set(handle);
    }
}

/// Switches the application targets to `level`.
pub fn apply_logging_level(level: &str) {
    let Some(handle) = FILTER_HANDLE.get() else {
        return;
    };
    if let Err(e) = handle.modify(|f| *f = EnvFilter::new(directives(level))) {
        tracing::warn!(error = %e, level, "could not change log level");
    }
}
