//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The OAuth client id may come from `PLAYLIST_GALLERY_CLIENT_ID` so the
//! same file can be shared between registered applications.

use pkce_auth::OAuthClientConfig;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub oauth: OAuthClientConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Local listener. Must match the host/port of `oauth.redirect_uri`.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

/// Resource API settings
#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
}

/// Where the PKCE verifier is kept across the redirect.
#[derive(Debug, Default, Deserialize)]
pub struct StorageConfig {
    /// JSON file store. In-memory when unset, which loses the verifier
    /// if the process restarts while the user is at the consent screen.
    #[serde(default)]
    pub verifier_file: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            max_connections: default_max_connections(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            max_pages: default_max_pages(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 5173))
}

fn default_max_connections() -> usize {
    64
}

fn default_base_url() -> String {
    "https://api.spotify.com/v1".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_max_pages() -> usize {
    paging::DEFAULT_MAX_PAGES
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if let Ok(client_id) = std::env::var("PLAYLIST_GALLERY_CLIENT_ID") {
            let client_id = client_id.trim();
            if !client_id.is_empty() {
                config.oauth.client_id = client_id.to_owned();
            }
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> common::Result<()> {
        self.oauth
            .validate()
            .map_err(|e| common::Error::Config(format!("[oauth] {e}")))?;

        let base = reqwest::Url::parse(&self.api.base_url).map_err(|e| {
            common::Error::Config(format!("api.base_url {:?}: {e}", self.api.base_url))
        })?;
        if !matches!(base.scheme(), "http" | "https") || base.host_str().is_none() {
            return Err(common::Error::Config(format!(
                "api.base_url must be an http or https URL with a host, got: {}",
                self.api.base_url
            )));
        }
        // Resource paths are appended as `{base_url}/me`
        if self.api.base_url.ends_with('/') {
            return Err(common::Error::Config(format!(
                "api.base_url must not end with '/', got: {}",
                self.api.base_url
            )));
        }

        if self.api.timeout_secs == 0 {
            return Err(common::Error::Config(
                "api.timeout_secs must be greater than 0".into(),
            ));
        }

        if self.api.max_pages == 0 {
            return Err(common::Error::Config(
                "api.max_pages must be greater than 0".into(),
            ));
        }

        if self.server.max_connections == 0 {
            return Err(common::Error::Config(
                "server.max_connections must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("playlist-gallery.toml")
    }
}
