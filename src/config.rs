//! Client configuration loaded from `vizzle.toml`.
//!
//! [`VizzleConfig`] holds every tunable. Keys missing from the file use
//! sensible defaults. The `VIZZLE_API_BASE_URL` environment variable takes
//! precedence over the file for the backend URL.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::api::ApiClient;
use crate::error::VizzleError;

pub const DEFAULT_BASE_URL: &str = "https://vizzle-backend-vvc6.onrender.com";
pub const BASE_URL_ENV: &str = "VIZZLE_API_BASE_URL";
pub const CONFIG_FILE: &str = "vizzle.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct VizzleConfig {
    /// Backend root URL, without a trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Per-request ceiling. Must outlast the backend's long-poll on the
    /// `wait` endpoints.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Period of the advisory video progress poller.
    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,

    /// JSON file holding results handed from one run to the next.
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,

    /// Namespace for handoff keys.
    #[serde(default = "default_user_id")]
    pub user_id: String,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

// Long enough for a video job's server-side wait.
fn default_request_timeout_secs() -> u64 {
    300
}

fn default_progress_interval_ms() -> u64 {
    2000
}

fn default_state_file() -> PathBuf {
    PathBuf::from(".vizzle/session.json")
}

fn default_user_id() -> String {
    "anonymous".to_string()
}

impl Default for VizzleConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            progress_interval_ms: default_progress_interval_ms(),
            state_file: default_state_file(),
            user_id: default_user_id(),
        }
    }
}

impl VizzleConfig {
    /// Load `vizzle.toml` from the current directory, then apply the
    /// environment override.
    pub fn load() -> Result<Self, VizzleError> {
        let mut config = Self::load_from(Path::new(CONFIG_FILE))?;
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            config.apply_base_url(&url)?;
        }
        Ok(config)
    }

    /// Load a specific file, falling back to defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, VizzleError> {
        let config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<VizzleConfig>(&contents)?
        } else {
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Replace the base URL unless `url` is blank. The result is validated
    /// again; on error the previous URL is kept.
    pub fn apply_base_url(&mut self, url: &str) -> Result<(), VizzleError> {
        let url = url.trim();
        if url.is_empty() {
            return Ok(());
        }
        let previous = std::mem::replace(&mut self.base_url, url.trim_end_matches('/').to_string());
        if let Err(e) = self.validate() {
            self.base_url = previous;
            return Err(e);
        }
        Ok(())
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    pub fn client(&self) -> Result<ApiClient, VizzleError> {
        Ok(ApiClient::new(
            self.base_url.clone(),
            Duration::from_secs(self.connect_timeout_secs),
            Duration::from_secs(self.request_timeout_secs),
        )?)
    }

    fn validate(&self) -> Result<(), VizzleError> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(VizzleError::Config(format!(
                "base_url must be an http(s) URL, got {:?}",
                self.base_url
            )));
        }
        if self.progress_interval_ms == 0 {
            return Err(VizzleError::Config(
                "progress_interval_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
