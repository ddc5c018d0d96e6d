//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The admin password is loaded from ADMIN_PASSWORD or password_file,
//! never stored in the TOML directly to avoid leaking secrets.

use admin_client::{ClientConfig, RefreshPolicy};
use common::Secret;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// Admin API connection settings
#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Session and credential settings
#[derive(Debug, Default, Deserialize)]
pub struct SessionConfig {
    /// Where the access token is kept between invocations
    #[serde(default)]
    pub token_path: Option<PathBuf>,
    /// Where the refresh cookie is kept; defaults to a sibling of the token file
    #[serde(default)]
    pub cookie_path: Option<PathBuf>,
    #[serde(default)]
    pub refresh_policy: RefreshPolicy,
    /// Default username for `login`
    #[serde(default)]
    pub username: Option<String>,
    /// File containing the admin password (alternative to ADMIN_PASSWORD)
    #[serde(default)]
    pub password_file: Option<PathBuf>,
    #[serde(skip)]
    pub password: Option<Secret<String>>,
}

fn default_timeout() -> u64 {
    30
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// Password resolution order:
    /// 1. ADMIN_PASSWORD env var
    /// 2. password_file path from config
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if let Ok(url) = std::env::var("ADMIN_API_BASE_URL") {
            config.api.base_url = url;
        }

        if !config.api.base_url.starts_with("http://")
            && !config.api.base_url.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                config.api.base_url
            )));
        }

        if config.api.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if let Ok(password) = std::env::var("ADMIN_PASSWORD") {
            config.session.password = Some(Secret::new(password));
        } else if let Some(ref password_file) = config.session.password_file {
            let password = std::fs::read_to_string(password_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read password_file {}: {e}",
                    password_file.display()
                ))
            })?;
            let password = password.trim_end_matches(['\r', '\n']).to_owned();
            if !password.is_empty() {
                config.session.password = Some(Secret::new(password));
            }
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("interview-admin.toml")
    }

    /// Settings for the authenticated client.
    pub fn client_config(&self) -> ClientConfig {
        let mut client = ClientConfig::new(self.api.base_url.clone());
        client.timeout = Duration::from_secs(self.api.timeout_secs);
        client.refresh_policy = self.session.refresh_policy;
        client
    }

    /// Token file location: configured path, else `$HOME/.interview-admin/token.json`.
    ///
    /// A leading `~/` in the configured path expands to `$HOME`.
    pub fn token_path(&self) -> PathBuf {
        if let Some(ref path) = self.session.token_path {
            return expand_home(path);
        }
        match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home)
                .join(".interview-admin")
                .join("token.json"),
            None => PathBuf::from(".interview-admin-token.json"),
        }
    }

    /// Cookie jar location: configured path, else the token path with a
    /// `.cookies.json` extension (`token.json` -> `token.cookies.json`).
    pub fn cookie_path(&self) -> PathBuf {
        if let Some(ref path) = self.session.cookie_path {
            return expand_home(path);
        }
        let mut path = self.token_path();
        path.set_extension("cookies.json");
        path
    }
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), std::env::var_os("HOME")) {
        (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => path.to_path_buf(),
    }
}
