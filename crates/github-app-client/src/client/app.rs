//! App-level operations.
//!
//! These calls authenticate with the App assertion itself rather than an
//! installation token, and are the only way to discover installations.

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::InstallationId;
use crate::client::{with_query, ApiResponse, GitHubClient};
use crate::error::ApiError;

/// Account (user or organization) an installation belongs to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Account {
    /// Account login name
    pub login: String,

    /// Account ID
    pub id: u64,

    /// "User" or "Organization"
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub account_type: Option<String>,
}

/// Installation of the App on an account.
///
/// # Examples
///
/// ```no_run
/// # use github_app_client::client::GitHubClient;
/// # async fn example(client: &GitHubClient) -> Result<(), Box<dyn std::error::Error>> {
/// for installation in client.list_installations().await?.data {
///     println!("{} -> {}", installation.account.login, installation.id);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Installation {
    /// Installation identifier
    pub id: InstallationId,

    /// Account the App is installed on
    pub account: Account,

    /// "all" or "selected"
    #[serde(default)]
    pub repository_selection: Option<String>,

    /// When the installation was created
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    /// When the installation was suspended, if it is
    #[serde(default)]
    pub suspended_at: Option<DateTime<Utc>>,
}

impl GitHubClient {
    /// List the App's installations (first page, up to 100).
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Auth` if the assertion cannot be minted and
    /// `ApiError::HttpError` if GitHub rejects it.
    pub async fn list_installations(&self) -> Result<ApiResponse<Vec<Installation>>, ApiError> {
        let path = with_query("/app/installations", &[("per_page", "100".to_string())]);
        self.app_request(Method::GET, &path, None::<&()>).await
    }

    /// Find the installation on the account with `login`.
    ///
    /// The login is compared case-insensitively. Returns `None` when the App
    /// is not installed on that account.
    pub async fn find_installation_by_username(
        &self,
        login: &str,
    ) -> Result<Option<InstallationId>, ApiError> {
        let installations = self.list_installations().await?.data;
        let found = installations
            .into_iter()
            .find(|i| i.account.login.eq_ignore_ascii_case(login))
            .map(|i| i.id);

        debug!(login, found = found.is_some(), "Installation lookup by account");
        Ok(found)
    }
}

#[cfg(test)]
#[path = "app_tests.rs"]
mod tests;
