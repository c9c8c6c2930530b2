//! # GitHub App Client
//!
//! Client for acting as a GitHub App installation: signs App assertions,
//! exchanges them for cached installation tokens, and builds per-user views
//! of a repository's issues and pull requests.
//!
//! This crate provides:
//! - RS256 App assertions from PKCS#1 or PKCS#8 PEM keys
//! - Installation tokens cached per installation with a one-minute safety margin
//! - Authenticated REST calls that report GitHub's rate-limit state
//! - Issue and pull request aggregation for a single user
//!
//! # Examples
//!
//! ## Listing a user's issues
//!
//! ```rust,no_run
//! use github_app_client::{AggregationQuery, AppSettings, GitHubClient, StateFilter};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // GITHUB_APP_APP_ID, GITHUB_APP_PRIVATE_KEY and GITHUB_APP_INSTALLATION_ID
//! let settings = AppSettings::load(None)?;
//! let client = GitHubClient::from_settings(&settings)?;
//!
//! let query = AggregationQuery::new("octocat", "Hello-World", "octocat")
//!     .with_state(StateFilter::All)
//!     .prioritize_open(true);
//! let issues = client.configured_installation().get_user_issues(&query).await?;
//!
//! for issue in &issues.items {
//!     println!("#{} {}", issue.number, issue.title);
//! }
//! if issues.is_partial() {
//!     eprintln!("some queries failed: {:?}", issues.failed_queries);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Finding an installation
//!
//! ```rust,no_run
//! # use github_app_client::{AppSettings, GitHubClient};
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = GitHubClient::from_settings(&AppSettings::load(None)?)?;
//!
//! if let Some(id) = client.find_installation_by_username("Octocat").await? {
//!     let repos = client.installation(id).list_accessible_repositories().await?;
//!     println!("{} repositories", repos.data.len());
//! }
//! # Ok(())
//! # }
//! ```

// Public modules
pub mod auth;
pub mod client;
pub mod config;
pub mod error;

#[cfg(test)]
pub(crate) mod test_fixtures;

// Re-export commonly used types at crate root for convenience
pub use error::{ApiError, AuthError, ConfigError, SigningError};

pub use auth::{
    AppId, AssertionSigner, Clock, HttpTokenExchanger, InstallationId, InstallationToken,
    InstallationTokenCache, PrivateKey, RS256AssertionSigner, SystemClock, TokenExchanger,
};

pub use client::{
    Aggregated, AggregationQuery, ApiResponse, ClientConfig, GitHubClient, InstallationClient,
    Issue, IssueState, PullRequest, RateLimitSnapshot, Repository, StateFilter,
};

pub use config::AppSettings;
