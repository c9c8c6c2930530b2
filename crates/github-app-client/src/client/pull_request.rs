// Pull request listing for GitHub API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::{with_query, ApiResponse, InstallationClient, IssueState, StateFilter, User};
use crate::error::ApiError;

/// GitHub pull request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    /// Unique pull request identifier
    pub id: u64,

    /// Pull request number (repository-specific)
    pub number: u64,

    /// Pull request title
    pub title: String,

    /// Pull request body content (Markdown)
    pub body: Option<String>,

    /// Pull request state
    pub state: IssueState,

    /// User who opened the pull request
    pub user: Option<User>,

    /// Assigned users
    #[serde(default)]
    pub assignees: Vec<User>,

    /// Users whose review is still requested
    #[serde(default)]
    pub requested_reviewers: Vec<User>,

    /// Whether the pull request is a draft
    #[serde(default)]
    pub draft: bool,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,

    /// Close timestamp
    pub closed_at: Option<DateTime<Utc>>,

    /// Merge timestamp
    pub merged_at: Option<DateTime<Utc>>,

    /// Pull request URL
    pub html_url: String,
}

impl PullRequest {
    /// True if `login` authored, is assigned to, or is a requested reviewer of
    /// this pull request. Logins compare case-insensitively.
    pub fn involves(&self, login: &str) -> bool {
        let matches = |user: &User| user.login.eq_ignore_ascii_case(login);

        self.user.as_ref().is_some_and(matches)
            || self.assignees.iter().any(matches)
            || self.requested_reviewers.iter().any(matches)
    }
}

impl InstallationClient {
    /// List the first page of pull requests in a repository, newest update first.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::HttpError` if the repository is not accessible.
    pub async fn list_pull_requests(
        &self,
        owner: &str,
        repo: &str,
        state: StateFilter,
        per_page: u32,
    ) -> Result<ApiResponse<Vec<PullRequest>>, ApiError> {
        let path = with_query(
            &format!("/repos/{}/{}/pulls", owner, repo),
            &[
                ("state", state.as_str().to_string()),
                ("sort", "updated".to_string()),
                ("direction", "desc".to_string()),
                ("per_page", per_page.to_string()),
            ],
        );
        self.get(&path).await
    }
}

#[cfg(test)]
#[path = "pull_request_tests.rs"]
mod tests;
