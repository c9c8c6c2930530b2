// Issue operations for GitHub API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::client::{with_query, ApiResponse, InstallationClient};
use crate::error::{ApiError, ConfigError};

/// GitHub issue.
///
/// The issues endpoints also return pull requests; those carry a
/// `pull_request` marker and are filtered out by every listing here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    /// Unique issue identifier
    pub id: u64,

    /// Issue number (repository-specific)
    pub number: u64,

    /// Issue title
    pub title: String,

    /// Issue body content (Markdown)
    pub body: Option<String>,

    /// Issue state
    pub state: IssueState,

    /// User who created the issue (absent for deleted accounts)
    pub user: Option<User>,

    /// Assigned users
    #[serde(default)]
    pub assignees: Vec<User>,

    /// Applied labels
    #[serde(default)]
    pub labels: Vec<Label>,

    /// Number of comments
    #[serde(default)]
    pub comments: u64,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,

    /// Close timestamp
    pub closed_at: Option<DateTime<Utc>>,

    /// Issue URL
    pub html_url: String,

    /// Present when this entry is really a pull request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_request: Option<serde_json::Value>,
}

impl Issue {
    /// True if GitHub marked this entry as a pull request.
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }

    /// Login of the author, if known.
    pub fn author_login(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.login.as_str())
    }

    /// Logins of all assignees.
    pub fn assignee_logins(&self) -> impl Iterator<Item = &str> {
        self.assignees.iter().map(|u| u.login.as_str())
    }
}

/// GitHub user as embedded in issues, pull requests and repositories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User login name
    pub login: String,

    /// User ID
    pub id: u64,

    /// "User", "Organization" or "Bot"
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub user_type: Option<String>,
}

/// GitHub label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Label {
    /// Label name
    pub name: String,

    /// Label color (6-digit hex code without #)
    #[serde(default)]
    pub color: String,

    /// Label description
    #[serde(default)]
    pub description: Option<String>,
}

/// State of a single issue or pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    Open,
    Closed,
}

/// State filter for list queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateFilter {
    #[default]
    Open,
    Closed,
    All,
}

impl StateFilter {
    /// Query-string value.
    pub fn as_str(&self) -> &'static str {
        match self {
            StateFilter::Open => "open",
            StateFilter::Closed => "closed",
            StateFilter::All => "all",
        }
    }
}

impl fmt::Display for StateFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StateFilter {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(StateFilter::Open),
            "closed" => Ok(StateFilter::Closed),
            "all" => Ok(StateFilter::All),
            other => Err(ConfigError::Invalid {
                key: "state".to_string(),
                message: format!("expected open, closed or all, got '{}'", other),
            }),
        }
    }
}

impl From<IssueState> for StateFilter {
    fn from(state: IssueState) -> Self {
        match state {
            IssueState::Open => StateFilter::Open,
            IssueState::Closed => StateFilter::Closed,
        }
    }
}

/// Request to create a new issue.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateIssueRequest {
    /// Issue title
    pub title: String,

    /// Issue body content (Markdown)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    /// Logins to assign
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignees: Option<Vec<String>>,

    /// Label names to apply
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
}

/// Request to update an existing issue.
///
/// Only the fields that are set are sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateIssueRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<IssueState>,

    /// Replaces the full assignee set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignees: Option<Vec<String>>,

    /// Replaces the full label set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
}

/// Filters for one page of `GET /repos/{owner}/{repo}/issues`.
#[derive(Debug, Clone, Default)]
pub(crate) struct IssueListParams<'a> {
    pub state: StateFilter,
    pub assignee: Option<&'a str>,
    pub creator: Option<&'a str>,
    pub page: u32,
    pub per_page: u32,
}

impl InstallationClient {
    /// List one page of issues in a repository, newest update first.
    ///
    /// Entries that are pull requests are removed, so a page may hold fewer
    /// than `per_page` items.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::HttpError` if the repository is not accessible.
    pub async fn list_repository_issues(
        &self,
        owner: &str,
        repo: &str,
        state: StateFilter,
        page: u32,
        per_page: u32,
    ) -> Result<ApiResponse<Vec<Issue>>, ApiError> {
        self.list_issues_page(
            owner,
            repo,
            &IssueListParams {
                state,
                page,
                per_page,
                ..Default::default()
            },
        )
        .await
    }

    pub(crate) async fn list_issues_page(
        &self,
        owner: &str,
        repo: &str,
        params: &IssueListParams<'_>,
    ) -> Result<ApiResponse<Vec<Issue>>, ApiError> {
        let mut query = vec![("state", params.state.as_str().to_string())];
        if let Some(assignee) = params.assignee {
            query.push(("assignee", assignee.to_string()));
        }
        if let Some(creator) = params.creator {
            query.push(("creator", creator.to_string()));
        }
        query.push(("sort", "updated".to_string()));
        query.push(("direction", "desc".to_string()));
        query.push(("per_page", params.per_page.to_string()));
        query.push(("page", params.page.max(1).to_string()));

        let path = with_query(&format!("/repos/{}/{}/issues", owner, repo), &query);
        let response: ApiResponse<Vec<Issue>> = self.get(&path).await?;
        Ok(response.map(|issues| issues.into_iter().filter(|i| !i.is_pull_request()).collect()))
    }

    /// Create a new issue.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::HttpError` if the App lacks write access or the
    /// request is rejected.
    pub async fn create_issue(
        &self,
        owner: &str,
        repo: &str,
        request: &CreateIssueRequest,
    ) -> Result<ApiResponse<Issue>, ApiError> {
        let path = format!("/repos/{}/{}/issues", owner, repo);
        self.post(&path, request).await
    }

    /// Update an existing issue.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::HttpError` if the issue does not exist or the
    /// request is rejected.
    pub async fn update_issue(
        &self,
        owner: &str,
        repo: &str,
        issue_number: u64,
        request: &UpdateIssueRequest,
    ) -> Result<ApiResponse<Issue>, ApiError> {
        let path = format!("/repos/{}/{}/issues/{}", owner, repo, issue_number);
        self.patch(&path, request).await
    }
}

#[cfg(test)]
#[path = "issue_tests.rs"]
mod tests;
