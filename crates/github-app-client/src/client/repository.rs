//! Repository Operations

use crate::client::{with_query, ApiResponse, InstallationClient, User};
use crate::error::ApiError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "repository_tests.rs"]
mod tests;

/// GitHub repository with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub owner: User,
    pub description: Option<String>,
    pub private: bool,
    pub default_branch: Option<String>,
    pub html_url: String,
    #[serde(default)]
    pub open_issues_count: u64,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct InstallationRepositories {
    repositories: Vec<Repository>,
}

impl InstallationClient {
    /// Get repository metadata.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::HttpError` with status 404 if the repository does
    /// not exist or is not visible to the installation.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use github_app_client::client::InstallationClient;
    /// # async fn example(client: &InstallationClient) -> Result<(), Box<dyn std::error::Error>> {
    /// let repo = client.get_repository("octocat", "Hello-World").await?.data;
    /// println!("Repository: {}", repo.full_name);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get_repository(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<ApiResponse<Repository>, ApiError> {
        let path = format!("/repos/{}/{}", owner, repo);
        self.get(&path).await
    }

    /// List the repositories the installation can access.
    ///
    /// Returns the first page of `GET /installation/repositories` (up to 100).
    pub async fn list_accessible_repositories(
        &self,
    ) -> Result<ApiResponse<Vec<Repository>>, ApiError> {
        let path = with_query("/installation/repositories", &[("per_page", "100".to_string())]);
        let response: ApiResponse<InstallationRepositories> = self.get(&path).await?;
        Ok(response.map(|body| body.repositories))
    }
}
