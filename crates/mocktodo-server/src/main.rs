use std::{env, path::PathBuf, time::Duration};

use clap::Parser;
use mocktodo_server::config::loader::{DEFAULT_CONFIG_FILE, load_config_with_overrides};
use mocktodo_server::{ConfigOverrides, ServerBuilder};

/// How the configuration path was determined.
#[derive(Debug, Clone, Copy)]
enum ConfigSource {
    /// From --config CLI argument
    CliArgument,
    /// From MOCKTODO_CONFIG environment variable
    EnvironmentVariable,
    /// Default path (mocktodo.toml), read only if present
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CliArgument => write!(f, "CLI argument (--config)"),
            Self::EnvironmentVariable => write!(f, "environment variable (MOCKTODO_CONFIG)"),
            Self::Default => write!(f, "default"),
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "mocktodo-server")]
#[command(about = "Mock task-tracking API server for testing client integrations")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to run the server on
    #[arg(short, long)]
    port: Option<u16>,

    /// Public base URL used in the discovery document
    #[arg(long)]
    base_url: Option<String>,

    /// JSON file used as the data source; memory stores when omitted
    #[arg(short = 'f', long)]
    json_file_path: Option<PathBuf>,

    /// JWT key mode: secret or rsa
    #[arg(long)]
    jwt_key_mode: Option<String>,

    /// JWT secret (used when the key mode is secret)
    #[arg(long, env = "MOCKTODO_JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,

    /// Require authentication for the task endpoints
    #[arg(short = 'a', long)]
    auth_required: Option<bool>,

    /// Authentication mode: jwt, session, both or oidc
    #[arg(long)]
    auth_mode: Option<String>,

    /// Session lifetime, e.g. "30m" or "24h"
    #[arg(long, value_parser = humantime_duration)]
    session_ttl: Option<Duration>,

    /// OIDC client configuration (JSON); required with --auth-mode oidc
    #[arg(long)]
    oidc_config_path: Option<PathBuf>,

    /// Log level
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            host: self.host.clone(),
            port: self.port,
            base_url: self.base_url.clone(),
            json_file_path: self.json_file_path.clone(),
            auth_mode: self.auth_mode.clone(),
            key_mode: self.jwt_key_mode.clone(),
            secret: self.jwt_secret.clone(),
            auth_required: self.auth_required,
            session_ttl: self.session_ttl,
            oidc_config: self.oidc_config_path.clone(),
            log_level: self.log_level.clone(),
        }
    }
}

fn humantime_duration(raw: &str) -> Result<Duration, String> {
    humantime_serde::re::humantime::parse_duration(raw).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before anything else)
    if let Err(e) = dotenvy::dotenv()
        && !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
    {
        eprintln!("Warning: Failed to load .env file: {e}");
    }

    let cli = Cli::parse();

    // Initialize tracing early with the default level
    mocktodo_server::init_tracing();

    let (config_path, source) = resolve_config_path(&cli);
    let cfg = match load_config_with_overrides(config_path.as_deref(), &cli.overrides()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    tracing::info!(
        path = config_path.as_deref().unwrap_or(DEFAULT_CONFIG_FILE),
        source = %source,
        "Configuration loaded"
    );
    mocktodo_server::apply_logging_level(&cfg.logging.level);

    let server = match ServerBuilder::new().with_config(cfg).build().await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Server initialization failed: {e}");
            std::process::exit(2);
        }
    };

    server.run().await?;
    Ok(())
}

/// Resolve the configuration file path.
///
/// Priority order:
/// 1. CLI argument: --config <path>
/// 2. Environment variable: MOCKTODO_CONFIG
/// 3. Default: mocktodo.toml, if it exists
fn resolve_config_path(cli: &Cli) -> (Option<String>, ConfigSource) {
    if let Some(path) = &cli.config {
        return (
            Some(path.to_string_lossy().into_owned()),
            ConfigSource::CliArgument,
        );
    }

    if let Ok(path) = env::var("MOCKTODO_CONFIG")
        && !path.is_empty()
    {
        return (Some(path), ConfigSource::EnvironmentVariable);
    }

    (None, ConfigSource::Default)
}
