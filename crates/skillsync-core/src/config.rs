//! Application configuration management.
//!
//! Configuration is stored at `~/.config/skillsync/config.json` and covers
//! the backend URL, request timeout, where the session is persisted and
//! where logs go. Environment variables override the file:
//!
//! - `SKILLSYNC_API_BASE_URL`
//! - `SKILLSYNC_STORE` (`file`, `keyring` or `memory`)
//! - `SKILLSYNC_STORE_PASSPHRASE` (seals the session file; never saved)

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::HttpClient;
use crate::store::{FileBackend, KeyringBackend, Sealer, TokenStore};

/// Application name used for config/data directory paths
const APP_NAME: &str = "skillsync";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Subdirectory of the data dir holding one session file per backend origin
const SESSIONS_DIR: &str = "sessions";

pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000";

/// HTTP request timeout in seconds.
/// Also bounds the startup "who am I" check, which is never retried.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

pub const ENV_API_BASE_URL: &str = "SKILLSYNC_API_BASE_URL";
pub const ENV_STORE: &str = "SKILLSYNC_STORE";
pub const ENV_STORE_PASSPHRASE: &str = "SKILLSYNC_STORE_PASSPHRASE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    File,
    Keyring,
    Memory,
}

impl StoreKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Some(StoreKind::File),
            "keyring" => Some(StoreKind::Keyring),
            "memory" => Some(StoreKind::Memory),
            _ => None,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub store: StoreKind,
    /// Overrides the per-origin session file location
    pub store_path: Option<PathBuf>,
    /// Write logs to daily rolling files here instead of stderr
    pub log_dir: Option<PathBuf>,
    pub last_email: Option<String>,
    #[serde(skip)]
    pub store_passphrase: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            store: StoreKind::default(),
            store_path: None,
            log_dir: None,
            last_email: None,
            store_passphrase: None,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_base_url", &self.api_base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("store", &self.store)
            .field("store_path", &self.store_path)
            .field("log_dir", &self.log_dir)
            .field("last_email", &self.last_email)
            .field("sealed", &self.store_passphrase.is_some())
            .finish()
    }
}

impl Config {
    /// Load from the default location and apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// production)
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_API_BASE_URL).filter(|u| !u.trim().is_empty()) {
            self.api_base_url = url.trim().to_string();
        }
        if let Some(kind) = lookup(ENV_STORE).as_deref().and_then(StoreKind::from_str) {
            self.store = kind;
        }
        if let Some(passphrase) = lookup(ENV_STORE_PASSPHRASE).filter(|p| !p.is_empty()) {
            self.store_passphrase = Some(passphrase);
        }
    }

    /// Record the email of the last successful login. Only the file's own
    /// settings are written back; environment overrides stay out of it.
    pub fn remember_email(email: &str) -> Result<()> {
        let path = Self::config_path()?;
        let mut on_disk = Self::load_from(&path)?;
        on_disk.last_email = Some(email.to_string());
        on_disk.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Backend origin as a file-name-safe string, scheme included so that
    /// http and https backends never share a session, e.g.
    /// `http://127.0.0.1:8000` becomes `http_127.0.0.1_8000`
    pub fn origin_slug(&self) -> String {
        let origin = self.api_base_url.trim().trim_end_matches('/');
        let origin = match origin.split_once("://") {
            Some((scheme, rest)) => format!("{}_{}", scheme.to_ascii_lowercase(), rest),
            None => origin.to_string(),
        };
        origin
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
            .collect()
    }

    /// Session file for the configured origin
    pub fn session_path(&self) -> Result<PathBuf> {
        if let Some(ref path) = self.store_path {
            return Ok(path.clone());
        }
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir
            .join(APP_NAME)
            .join(SESSIONS_DIR)
            .join(format!("{}.json", self.origin_slug())))
    }

    /// Build the token store selected by this configuration
    pub fn token_store(&self) -> Result<TokenStore> {
        let store = match self.store {
            StoreKind::Memory => TokenStore::in_memory(),
            StoreKind::Keyring => TokenStore::new(KeyringBackend::new(self.api_base_url.trim_end_matches('/'))),
            StoreKind::File => {
                let path = self.session_path()?;
                match self.store_passphrase {
                    Some(ref passphrase) => TokenStore::new(FileBackend::sealed(path, Sealer::new(passphrase.clone()))),
                    None => TokenStore::new(FileBackend::new(path)),
                }
            }
        };
        Ok(store)
    }

    pub fn http_client(&self, store: TokenStore) -> Result<HttpClient> {
        HttpClient::with_timeout(&self.api_base_url, store, self.request_timeout())
            .context("Failed to build HTTP client")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.store, StoreKind::File);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"api_base_url": "https://api.skillsync.dev", "store": "keyring"}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.api_base_url, "https://api.skillsync.dev");
        assert_eq!(config.store, StoreKind::Keyring);
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_overrides(|key| match key {
            ENV_API_BASE_URL => Some("https://example.test".into()),
            ENV_STORE => Some("Memory".into()),
            ENV_STORE_PASSPHRASE => Some("pw".into()),
            _ => None,
        });
        assert_eq!(config.api_base_url, "https://example.test");
        assert_eq!(config.store, StoreKind::Memory);
        assert_eq!(config.store_passphrase.as_deref(), Some("pw"));
    }

    #[test]
    fn test_passphrase_is_never_saved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = Config {
            store_passphrase: Some("secret".into()),
            ..Config::default()
        };
        config.save_to(&path).unwrap();
        assert!(!std::fs::read_to_string(&path).unwrap().contains("secret"));
    }

    #[test]
    fn test_origin_slug() {
        let config = Config {
            api_base_url: "https://api.skillsync.dev:8443/".into(),
            ..Config::default()
        };
        assert_eq!(config.origin_slug(), "https_api.skillsync.dev_8443");
    }

    #[test]
    fn test_http_and_https_sessions_are_separate() {
        let secure = Config {
            api_base_url: "https://api.skillsync.dev".into(),
            ..Config::default()
        };
        let plain = Config {
            api_base_url: "http://api.skillsync.dev".into(),
            ..Config::default()
        };
        assert_ne!(secure.origin_slug(), plain.origin_slug());
        if dirs::data_dir().is_some() {
            assert_ne!(secure.session_path().unwrap(), plain.session_path().unwrap());
        }
    }
}
