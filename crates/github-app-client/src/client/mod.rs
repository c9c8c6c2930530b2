//! GitHub API client for authenticated operations.
//!
//! This module provides the main `GitHubClient` for making authenticated API calls
//! to GitHub as a GitHub App. It supports both app-level operations (using a
//! freshly minted assertion) and installation-level operations (using cached
//! installation tokens through [`InstallationClient`]).
//!
//! Every response is returned together with the rate-limit snapshot parsed from
//! its headers. Nothing in this module retries; retry policy belongs to the
//! caller.

mod aggregation;
mod app;
mod installation;
mod issue;
mod pull_request;
mod rate_limit;
mod repository;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::auth::{
    AssertionSigner, Clock, HttpTokenExchanger, InstallationId, InstallationTokenCache,
    RS256AssertionSigner, SystemClock, TokenExchanger,
};
use crate::config::{AppSettings, DEFAULT_API_URL};
use crate::error::ApiError;

pub use aggregation::{
    merge_newest_first, state_sequence, Aggregated, AggregationQuery, FailedSubQuery,
    SubQueryKind, Timeline, AGGREGATION_PAGE_SIZE,
};
pub use app::{Account, Installation};
pub use installation::InstallationClient;
pub use issue::{CreateIssueRequest, Issue, IssueState, Label, StateFilter, UpdateIssueRequest, User};
pub use pull_request::PullRequest;
pub use rate_limit::{parse_rate_limit_from_headers, RateLimitSnapshot};
pub use repository::Repository;

/// Media type requested on every call.
pub const GITHUB_ACCEPT: &str = "application/vnd.github+json";

/// REST API version pinned on every call.
pub const GITHUB_API_VERSION: &str = "2022-11-28";

/// Configuration for GitHub API client behavior.
///
/// # Examples
///
/// ```
/// use github_app_client::client::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::default()
///     .with_timeout(Duration::from_secs(60))
///     .with_github_api_url("https://ghe.example.com/api/v3");
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// User agent string for API requests (required by GitHub)
    pub user_agent: String,
    /// Request timeout duration
    pub timeout: Duration,
    /// GitHub API base URL, without a trailing slash
    pub github_api_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("github-app-client/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(30),
            github_api_url: DEFAULT_API_URL.to_string(),
        }
    }
}

impl ClientConfig {
    /// Set the user agent string.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the GitHub API base URL.
    pub fn with_github_api_url(mut self, url: impl Into<String>) -> Self {
        self.github_api_url = url.into();
        self
    }

    /// Build a reqwest client carrying the timeout and user agent.
    pub(crate) fn build_http_client(&self) -> Result<reqwest::Client, ApiError> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .build()
            .map_err(|e| ApiError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })
    }
}

/// Response payload together with the rate-limit state reported for it.
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub data: T,
    pub rate_limit: RateLimitSnapshot,
}

impl<T> ApiResponse<T> {
    /// Discard the rate-limit snapshot.
    pub fn into_data(self) -> T {
        self.data
    }

    /// Transform the payload, keeping the snapshot.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResponse<U> {
        ApiResponse {
            data: f(self.data),
            rate_limit: self.rate_limit,
        }
    }
}

/// GitHub API client acting as a GitHub App.
///
/// Cloning is cheap; clones share the HTTP connection pool and the token cache.
///
/// # Examples
///
/// ```no_run
/// # use github_app_client::client::GitHubClient;
/// # use github_app_client::config::AppSettings;
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let settings = AppSettings::load(None)?;
/// let client = GitHubClient::from_settings(&settings)?;
///
/// let issues = client
///     .configured_installation()
///     .list_repository_issues("octocat", "Hello-World", Default::default(), 1, 30)
///     .await?;
/// println!("{} issues, {} calls left", issues.data.len(), issues.rate_limit.remaining);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct GitHubClient {
    http_client: reqwest::Client,
    config: ClientConfig,
    tokens: Arc<InstallationTokenCache>,
    default_installation: Option<InstallationId>,
}

impl GitHubClient {
    /// Create a new builder around an assertion signer.
    pub fn builder(signer: Arc<dyn AssertionSigner>) -> GitHubClientBuilder {
        GitHubClientBuilder::new(signer)
    }

    /// Build a client from loaded settings.
    ///
    /// Missing credentials are not an error here; they fail the first call
    /// that needs to sign.
    ///
    /// # Errors
    ///
    /// Returns an error if `api_url` is invalid or the HTTP client cannot be built.
    pub fn from_settings(settings: &AppSettings) -> Result<Self, ApiError> {
        let config = settings.client_config()?;
        let signer = Arc::new(RS256AssertionSigner::from_settings(settings));

        let mut builder = Self::builder(signer).config(config);
        if let Some(installation_id) = settings.installation_id() {
            builder = builder.installation_id(installation_id);
        }
        builder.build()
    }

    /// Get the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get the installation token cache.
    pub fn token_cache(&self) -> &Arc<InstallationTokenCache> {
        &self.tokens
    }

    /// Installation-scoped client for `installation_id`.
    pub fn installation(&self, installation_id: InstallationId) -> InstallationClient {
        InstallationClient::new(self.clone(), Some(installation_id))
    }

    /// Installation-scoped client for the configured installation.
    ///
    /// Without a configured installation id every call on the returned client
    /// fails with `ConfigError::MissingInstallationId`.
    pub fn configured_installation(&self) -> InstallationClient {
        InstallationClient::new(self.clone(), self.default_installation)
    }

    /// Make an App-level request, authenticated with a freshly minted assertion.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Auth` if the assertion cannot be minted and
    /// `ApiError::HttpError` for non-2xx responses.
    pub async fn app_request<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<ApiResponse<T>, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let assertion = self.tokens.signer().mint_assertion().await?;
        self.send(method, path, assertion.token(), body).await
    }

    /// Issue one authenticated request and decode the response.
    pub(crate) async fn send<T, B>(
        &self,
        method: Method,
        path: &str,
        bearer: &str,
        body: Option<&B>,
    ) -> Result<ApiResponse<T>, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        // Normalize path - remove leading slash if present for consistent URL building
        let normalized_path = path.strip_prefix('/').unwrap_or(path);
        let url = format!("{}/{}", self.config.github_api_url, normalized_path);
        debug!(method = %method, path = normalized_path, "GitHub API request");

        let mut request = self
            .http_client
            .request(method, &url)
            .header("Authorization", format!("Bearer {}", bearer))
            .header("Accept", GITHUB_ACCEPT)
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let rate_limit = parse_rate_limit_from_headers(response.headers());

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());
            return Err(ApiError::HttpError {
                status: status.as_u16(),
                message: error_message(status.as_u16(), &body),
                body,
            });
        }

        let bytes = response.bytes().await?;
        let data = if bytes.is_empty() {
            serde_json::from_slice(b"null")?
        } else {
            serde_json::from_slice(&bytes)?
        };

        Ok(ApiResponse { data, rate_limit })
    }
}

/// GitHub's `message` field from an error body, or a generic status message.
pub(crate) fn error_message(status: u16, body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message")?.as_str().map(str::to_string))
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("GitHub API error: {}", status))
}

/// Append URL-encoded query parameters to `path`.
pub(crate) fn with_query(path: &str, params: &[(&str, String)]) -> String {
    if params.is_empty() {
        return path.to_string();
    }
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in params {
        query.append_pair(key, value);
    }
    format!("{}?{}", path, query.finish())
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("config", &self.config)
            .field("default_installation", &self.default_installation)
            .field("tokens", &"<InstallationTokenCache>")
            .finish()
    }
}

/// Builder for constructing `GitHubClient` instances.
pub struct GitHubClientBuilder {
    signer: Arc<dyn AssertionSigner>,
    config: Option<ClientConfig>,
    exchanger: Option<Arc<dyn TokenExchanger>>,
    clock: Option<Arc<dyn Clock>>,
    installation_id: Option<InstallationId>,
}

impl GitHubClientBuilder {
    fn new(signer: Arc<dyn AssertionSigner>) -> Self {
        Self {
            signer,
            config: None,
            exchanger: None,
            clock: None,
            installation_id: None,
        }
    }

    /// Set the client configuration.
    ///
    /// If not set, uses `ClientConfig::default()`.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Replace the token exchanger (defaults to HTTP against the configured API).
    pub fn token_exchanger(mut self, exchanger: Arc<dyn TokenExchanger>) -> Self {
        self.exchanger = Some(exchanger);
        self
    }

    /// Replace the clock used by the token cache.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Set the installation used by `configured_installation()`.
    pub fn installation_id(mut self, installation_id: InstallationId) -> Self {
        self.installation_id = Some(installation_id);
        self
    }

    /// Build the GitHub client.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Configuration` if the HTTP client cannot be created.
    pub fn build(self) -> Result<GitHubClient, ApiError> {
        let config = self.config.unwrap_or_default();
        let http_client = config.build_http_client()?;

        let exchanger = self.exchanger.unwrap_or_else(|| {
            Arc::new(HttpTokenExchanger::with_http_client(
                http_client.clone(),
                config.github_api_url.clone(),
            ))
        });
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let tokens = InstallationTokenCache::new(self.signer, exchanger).with_clock(clock);

        Ok(GitHubClient {
            http_client,
            config,
            tokens: Arc::new(tokens),
            default_installation: self.installation_id,
        })
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
