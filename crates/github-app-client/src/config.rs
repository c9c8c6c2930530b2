//! Process configuration for the GitHub App client.
//!
//! Values come from an optional TOML file overlaid with `GITHUB_APP_*`
//! environment variables. Credentials are optional at load time; their
//! absence is reported by the first call that needs them.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::auth::InstallationId;
use crate::client::ClientConfig;
use crate::error::ConfigError;

/// Prefix for environment variables, e.g. `GITHUB_APP_APP_ID`.
pub const ENV_PREFIX: &str = "GITHUB_APP";

/// Default GitHub REST API base.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// GitHub App settings.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// App id used as the assertion issuer
    pub app_id: Option<String>,

    /// PEM-encoded private key text
    pub private_key: Option<String>,

    /// Path to a PEM file, used when `private_key` is not set
    pub private_key_path: Option<PathBuf>,

    /// Installation used for installation-scoped calls
    pub installation_id: Option<u64>,

    /// REST API base URL (GitHub Enterprise Server uses `https://host/api/v3`)
    pub api_url: String,

    /// User-Agent sent on every request
    pub user_agent: String,

    /// Per-request timeout
    pub timeout_seconds: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            app_id: None,
            private_key: None,
            private_key_path: None,
            installation_id: None,
            api_url: DEFAULT_API_URL.to_string(),
            user_agent: concat!("github-app-client/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_seconds: 30,
        }
    }
}

impl AppSettings {
    /// Load settings from an optional file and the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the file cannot be read or a value
    /// has the wrong type.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(file, None)
    }

    /// Load settings using `env` in place of the process environment.
    pub fn load_with_env(
        file: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(config::Environment::with_prefix(ENV_PREFIX).source(env));

        builder
            .build()
            .and_then(|c| c.try_deserialize::<AppSettings>())
            .map_err(|e| ConfigError::Invalid {
                key: "settings".to_string(),
                message: e.to_string(),
            })
    }

    /// Configured installation, if any.
    pub fn installation_id(&self) -> Option<InstallationId> {
        self.installation_id.map(InstallationId::new)
    }

    /// HTTP client settings derived from these settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `api_url` is not an absolute http(s) URL.
    pub fn client_config(&self) -> Result<ClientConfig, ConfigError> {
        let parsed = url::Url::parse(&self.api_url).map_err(|e| ConfigError::Invalid {
            key: "api_url".to_string(),
            message: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid {
                key: "api_url".to_string(),
                message: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        Ok(ClientConfig::default()
            .with_github_api_url(self.api_url.trim_end_matches('/'))
            .with_user_agent(self.user_agent.clone())
            .with_timeout(Duration::from_secs(self.timeout_seconds)))
    }
}

// Security: Don't expose key material in debug output
impl std::fmt::Debug for AppSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppSettings")
            .field("app_id", &self.app_id)
            .field("private_key", &self.private_key.as_ref().map(|_| "<REDACTED>"))
            .field("private_key_path", &self.private_key_path)
            .field("installation_id", &self.installation_id)
            .field("api_url", &self.api_url)
            .field("user_agent", &self.user_agent)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
