use mocktodo_auth::config::{AuthConfig, AuthMode, KeyModeKind};
use mocktodo_storage::StorageBackend;
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    /// Authentication configuration
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        // Server validations
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        if self.server.shutdown_grace.is_zero() {
            return Err("server.shutdown_grace must be > 0".into());
        }
        // Logging validation
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        // Storage validation
        if let Some(ref path) = self.storage.json_file_path
            && path.as_os_str().is_empty()
        {
            return Err("storage.json_file_path must not be empty".into());
        }
        // Auth validation
        self.auth
            .validate()
            .map_err(|e| format!("auth config error: {e}"))?;
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }

    /// Returns the base URL for the server.
    /// If `base_url` is configured, returns that; otherwise computes from host:port.
    pub fn base_url(&self) -> String {
        self.server
            .base_url
            .clone()
            .unwrap_or_else(|| format!("http://{}:{}", self.server.host, self.server.port))
    }

    pub fn storage_backend(&self) -> StorageBackend {
        StorageBackend::from_path(self.storage.json_file_path.clone())
    }

    /// Applies command-line overrides on top of the file and environment layers.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) -> Result<(), String> {
        if let Some(ref host) = overrides.host {
            self.server.host = host.clone();
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(ref base_url) = overrides.base_url {
            self.server.base_url = Some(base_url.clone());
        }
        if let Some(ref path) = overrides.json_file_path {
            self.storage.json_file_path = Some(path.clone());
        }
        if let Some(ref mode) = overrides.auth_mode {
            self.auth.mode = mode.parse::<AuthMode>().map_err(|e| e.to_string())?;
        }
        if let Some(ref key_mode) = overrides.key_mode {
            self.auth.key_mode = key_mode.parse::<KeyModeKind>().map_err(|e| e.to_string())?;
        }
        if let Some(ref secret) = overrides.secret {
            self.auth.secret = secret.clone();
        }
        if let Some(required) = overrides.auth_required {
            self.auth.required = required;
        }
        if let Some(ttl) = overrides.session_ttl {
            self.auth.session_ttl = ttl;
        }
        if let Some(ref path) = overrides.oidc_config {
            self.auth.oidc_config = Some(path.clone());
        }
        if let Some(ref level) = overrides.log_level {
            self.logging.level = level.clone();
        }
        Ok(())
    }
}

/// Values given on the command line. `None` leaves the loaded value alone.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub base_url: Option<String>,
    pub json_file_path: Option<PathBuf>,
    pub auth_mode: Option<String>,
    pub key_mode: Option<String>,
    pub secret: Option<String>,
    pub auth_required: Option<bool>,
    pub session_ttl: Option<Duration>,
    pub oidc_config: Option<PathBuf>,
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Base URL for the server, used in the non-OIDC discovery document.
    /// If not set, defaults to http://{host}:{port}
    #[serde(default)]
    pub base_url: Option<String>,
    /// How long in-flight requests may run after shutdown starts.
    #[serde(default = "default_shutdown_grace", with = "humantime_serde")]
    pub shutdown_grace: Duration,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}
fn default_shutdown_grace() -> Duration {
    Duration::from_secs(5)
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            base_url: None,
            shutdown_grace: default_shutdown_grace(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// JSON data file. Memory stores are used when unset.
    #[serde(default)]
    pub json_file_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}
fn default_log_level() -> String {
    "info".into()
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub mod loader {
    use super::{AppConfig, ConfigOverrides};
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    /// Default configuration file, read when no path is given and it exists.
    pub const DEFAULT_CONFIG_FILE: &str = "mocktodo.toml";

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        load_config_with_overrides(path, &ConfigOverrides::default())
    }

    /// Loads file, then `MOCKTODO__*` environment, then `overrides`, and validates the result.
    pub fn load_config_with_overrides(
        path: Option<&str>,
        overrides: &ConfigOverrides,
    ) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        match path {
            Some(p) => {
                let pathbuf = PathBuf::from(p);
                if pathbuf.exists() {
                    builder = builder.add_source(File::from(pathbuf));
                } else {
                    return Err(format!("config file not found: {p}"));
                }
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    builder = builder.add_source(File::from(default_path));
                }
            }
        }
        // Environment variable overrides, e.g., MOCKTODO__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("MOCKTODO")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let mut merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.apply_overrides(overrides)?;
        merged.validate()?;
        Ok(merged)
    }
}
