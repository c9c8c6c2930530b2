//! Per-user views of a repository's issues and pull requests.
//!
//! Each view is assembled from several first-page list queries. A query that
//! fails with an API or transport error contributes nothing and is recorded
//! in [`Aggregated::failed_queries`]; the remaining queries still count. A
//! failure to obtain a token is not a query failure and aborts the whole call.
//!
//! Results are deduplicated by id (first occurrence wins) and ordered by
//! `updated_at`, newest first. Only the first page of each query is read.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use tracing::{info, warn};

use crate::client::issue::IssueListParams;
use crate::client::{
    ApiResponse, InstallationClient, Issue, PullRequest, RateLimitSnapshot, StateFilter,
};
use crate::error::ApiError;

/// Page size of every aggregation sub-query.
pub const AGGREGATION_PAGE_SIZE: u32 = 100;

/// Which repository and user to aggregate for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationQuery {
    pub owner: String,
    pub repo: String,
    pub login: String,
    pub state: StateFilter,
    /// With `state == All`, query open items before closed ones
    pub prioritize_open: bool,
}

impl AggregationQuery {
    /// Open items for `login` in `owner/repo`.
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, login: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            login: login.into(),
            state: StateFilter::Open,
            prioritize_open: false,
        }
    }

    pub fn with_state(mut self, state: StateFilter) -> Self {
        self.state = state;
        self
    }

    pub fn prioritize_open(mut self, prioritize_open: bool) -> Self {
        self.prioritize_open = prioritize_open;
        self
    }
}

/// States to query, in order.
///
/// `All` with `prioritize_open` splits into open then closed; anything else
/// is queried as given.
///
/// # Examples
///
/// ```
/// use github_app_client::client::{state_sequence, StateFilter};
///
/// assert_eq!(state_sequence(StateFilter::All, true), vec![StateFilter::Open, StateFilter::Closed]);
/// assert_eq!(state_sequence(StateFilter::All, false), vec![StateFilter::All]);
/// ```
pub fn state_sequence(state: StateFilter, prioritize_open: bool) -> Vec<StateFilter> {
    match state {
        StateFilter::All if prioritize_open => vec![StateFilter::Open, StateFilter::Closed],
        other => vec![other],
    }
}

/// Kind of list query feeding an aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubQueryKind {
    /// Issues assigned to the user
    Assigned,
    /// Issues created by the user
    Created,
    /// All pull requests, filtered locally
    PullRequests,
}

impl SubQueryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubQueryKind::Assigned => "assigned",
            SubQueryKind::Created => "created",
            SubQueryKind::PullRequests => "pull_requests",
        }
    }
}

impl fmt::Display for SubQueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sub-query that failed and contributed no items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedSubQuery {
    pub state: StateFilter,
    pub kind: SubQueryKind,
    /// HTTP status, when GitHub answered
    pub status: Option<u16>,
    pub message: String,
}

/// Result of an aggregation.
#[derive(Debug, Clone, Serialize)]
pub struct Aggregated<T> {
    /// Deduplicated items, newest update first
    pub items: Vec<T>,
    /// Sub-queries that failed; empty when the result is complete
    pub failed_queries: Vec<FailedSubQuery>,
    /// Snapshot from the last successful sub-query
    pub rate_limit: Option<RateLimitSnapshot>,
}

impl<T> Aggregated<T> {
    /// True when at least one sub-query failed.
    pub fn is_partial(&self) -> bool {
        !self.failed_queries.is_empty()
    }
}

/// Items that can be merged into a timeline.
pub trait Timeline {
    fn id(&self) -> u64;
    fn updated_at(&self) -> DateTime<Utc>;
}

impl Timeline for Issue {
    fn id(&self) -> u64 {
        self.id
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl Timeline for PullRequest {
    fn id(&self) -> u64 {
        self.id
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// Drop repeated ids (first occurrence wins) and sort by `updated_at` descending.
///
/// The sort is stable, so items with equal timestamps keep their input order.
pub fn merge_newest_first<T: Timeline>(items: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::new();
    let mut merged: Vec<T> = items.into_iter().filter(|item| seen.insert(item.id())).collect();
    merged.sort_by(|a, b| b.updated_at().cmp(&a.updated_at()));
    merged
}

struct Collector<'q, T> {
    query: &'q AggregationQuery,
    items: Vec<T>,
    failed: Vec<FailedSubQuery>,
    rate_limit: Option<RateLimitSnapshot>,
}

impl<'q, T: Timeline> Collector<'q, T> {
    fn new(query: &'q AggregationQuery) -> Self {
        Self {
            query,
            items: Vec::new(),
            failed: Vec::new(),
            rate_limit: None,
        }
    }

    /// Take a sub-query result. Token failures are returned; API failures are recorded.
    fn absorb(
        &mut self,
        state: StateFilter,
        kind: SubQueryKind,
        result: Result<ApiResponse<Vec<T>>, ApiError>,
    ) -> Result<(), ApiError> {
        match result {
            Ok(response) => {
                self.rate_limit = Some(response.rate_limit);
                self.items.extend(response.data);
                Ok(())
            }
            Err(err @ ApiError::Auth(_)) => Err(err),
            Err(err) => {
                warn!(
                    owner = %self.query.owner,
                    repo = %self.query.repo,
                    state = %state,
                    query = %kind,
                    status = ?err.status(),
                    error = %err,
                    "Aggregation sub-query failed; continuing without its results"
                );
                self.failed.push(FailedSubQuery {
                    state,
                    kind,
                    status: err.status(),
                    message: err.to_string(),
                });
                Ok(())
            }
        }
    }

    fn finish(self) -> Aggregated<T> {
        let items = merge_newest_first(self.items);
        info!(
            owner = %self.query.owner,
            repo = %self.query.repo,
            login = %self.query.login,
            count = items.len(),
            failed_queries = self.failed.len(),
            "Aggregation complete"
        );
        Aggregated {
            items,
            failed_queries: self.failed,
            rate_limit: self.rate_limit,
        }
    }
}

impl InstallationClient {
    /// Issues assigned to or created by `query.login`.
    ///
    /// For each state, the assigned and created queries run concurrently.
    /// Pull requests returned by the issues endpoint are excluded.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Auth` when no installation token can be obtained.
    /// Individual query failures are reported in the result instead.
    pub async fn get_user_issues(
        &self,
        query: &AggregationQuery,
    ) -> Result<Aggregated<Issue>, ApiError> {
        let mut collector = Collector::new(query);

        for state in state_sequence(query.state, query.prioritize_open) {
            let assigned = IssueListParams {
                state,
                assignee: Some(query.login.as_str()),
                page: 1,
                per_page: AGGREGATION_PAGE_SIZE,
                ..Default::default()
            };
            let created = IssueListParams {
                state,
                creator: Some(query.login.as_str()),
                page: 1,
                per_page: AGGREGATION_PAGE_SIZE,
                ..Default::default()
            };

            let (assigned_result, created_result) = tokio::join!(
                self.list_issues_page(&query.owner, &query.repo, &assigned),
                self.list_issues_page(&query.owner, &query.repo, &created),
            );

            collector.absorb(state, SubQueryKind::Assigned, assigned_result)?;
            collector.absorb(state, SubQueryKind::Created, created_result)?;
        }

        Ok(collector.finish())
    }

    /// Pull requests that `query.login` authored, is assigned to, or is asked to review.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Auth` when no installation token can be obtained.
    /// Individual query failures are reported in the result instead.
    pub async fn get_user_pull_requests(
        &self,
        query: &AggregationQuery,
    ) -> Result<Aggregated<PullRequest>, ApiError> {
        let mut collector = Collector::new(query);

        for state in state_sequence(query.state, query.prioritize_open) {
            let result = self
                .list_pull_requests(&query.owner, &query.repo, state, AGGREGATION_PAGE_SIZE)
                .await
                .map(|response| {
                    response.map(|pulls| {
                        pulls
                            .into_iter()
                            .filter(|pr| pr.involves(&query.login))
                            .collect()
                    })
                });
            collector.absorb(state, SubQueryKind::PullRequests, result)?;
        }

        Ok(collector.finish())
    }
}

#[cfg(test)]
#[path = "aggregation_tests.rs"]
mod tests;
