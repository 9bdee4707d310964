// Configuration: everything comes from the environment (a `.env` file is
// honored in development). The API key may also come from a file saved by
// the interactive flow, or be overridden per request by the UI form.

use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use dotenvy::dotenv;
use tracing::debug;

use crate::error::{FindocError, Result};

pub const API_KEY_VAR: &str = "LANDINGAI_API_KEY";
pub const BASE_URL_VAR: &str = "LANDINGAI_BASE_URL";
pub const MODEL_VAR: &str = "LANDINGAI_MODEL";
pub const ADDR_VAR: &str = "FINDOC_ADDR";
pub const TIMEOUT_VAR: &str = "FINDOC_TIMEOUT_SECS";

pub const DEFAULT_BASE_URL: &str = "https://api.va.landing.ai";
pub const DEFAULT_MODEL: &str = "dpt-2-latest";
pub const DEFAULT_ADDR: &str = "127.0.0.1:8501";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

const SAVED_KEY_FILE: &str = ".findoc_api_key";

/// Runtime settings shared by the CLI, the interactive menu and the web UI.
#[derive(Clone)]
pub struct Settings {
    api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub addr: SocketAddr,
    pub timeout: Duration,
}

impl Settings {
    /// Load settings from the process environment, reading `.env` first if
    /// present. Falls back to the saved key file when no key is exported.
    pub fn from_env() -> Result<Self> {
        let _ = dotenv();

        let mut settings = Self::from_lookup(|name| env::var(name).ok())?;
        if settings.api_key.is_none() {
            settings.api_key = load_saved_api_key();
            if settings.api_key.is_some() {
                debug!("Using API key from {}", saved_key_path().display());
            }
        }
        Ok(settings)
    }

    /// Build settings from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).and_then(non_empty);

        let addr_raw = get(ADDR_VAR).unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let addr = addr_raw.parse().map_err(|_| {
            FindocError::Config(format!("{ADDR_VAR} must be a socket address, got {addr_raw:?}"))
        })?;

        let timeout_secs = match get(TIMEOUT_VAR) {
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                FindocError::Config(format!("{TIMEOUT_VAR} must be a number of seconds, got {raw:?}"))
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let base_url = get(BASE_URL_VAR).unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            api_key: get(API_KEY_VAR),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: get(MODEL_VAR).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            addr,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Override the configured key. Blank overrides keep the configured key.
    pub fn with_api_key(mut self, key: Option<&str>) -> Self {
        if let Some(key) = key.and_then(|k| non_empty(k.to_string())) {
            self.api_key = Some(key);
        }
        self
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// The key, or `MissingApiKey` if none was configured anywhere.
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key().ok_or(FindocError::MissingApiKey)
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("addr", &self.addr)
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Location of the remembered API key in the user's home directory.
pub fn saved_key_path() -> PathBuf {
    let dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    dir.join(SAVED_KEY_FILE)
}

/// Persist the key so later runs can pick it up without the env var.
pub fn save_api_key(key: &str) -> Result<PathBuf> {
    let path = saved_key_path();
    write_key_file(&path, key)?;
    Ok(path)
}

/// Write the key readable by the owner only.
fn write_key_file(path: &Path, key: &str) -> Result<()> {
    std::fs::write(path, key.trim())?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}

/// Read the remembered key, if any.
pub fn load_saved_api_key() -> Option<String> {
    let data = std::fs::read_to_string(saved_key_path()).ok()?;
    non_empty(data)
}
