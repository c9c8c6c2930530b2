//! Rate limit state reported by GitHub.
//!
//! Every response carries rate limit headers:
//! - `X-RateLimit-Limit`: Maximum requests allowed per hour
//! - `X-RateLimit-Remaining`: Requests remaining in current window
//! - `X-RateLimit-Reset`: Unix timestamp when the rate limit resets
//!
//! A missing or unparseable header is reported as 0. The snapshot is
//! informational; nothing here throttles or delays requests.

use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::client::{ApiResponse, InstallationClient};
use crate::error::ApiError;

/// Rate limit state at the time of a response.
///
/// # Examples
///
/// ```
/// use github_app_client::client::RateLimitSnapshot;
///
/// let snapshot = RateLimitSnapshot { limit: 5000, remaining: 400, reset: 1_700_000_000 };
///
/// assert!(!snapshot.is_exhausted());
/// assert!(snapshot.is_near_exhaustion(0.1));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitSnapshot {
    /// Maximum requests allowed in the window
    pub limit: u64,
    /// Requests remaining in the window
    pub remaining: u64,
    /// Unix timestamp (seconds) when the window resets
    pub reset: u64,
}

impl RateLimitSnapshot {
    /// True when GitHub reported a limit and no requests remain.
    pub fn is_exhausted(&self) -> bool {
        self.limit > 0 && self.remaining == 0
    }

    /// Check if remaining requests are at or below `margin` (0.0 to 1.0) of the limit.
    pub fn is_near_exhaustion(&self, margin: f64) -> bool {
        let threshold = (self.limit as f64 * margin.clamp(0.0, 1.0)) as u64;
        self.limit > 0 && self.remaining <= threshold
    }

    /// Reset instant, or `None` when no reset time was reported.
    pub fn reset_at(&self) -> Option<DateTime<Utc>> {
        if self.reset == 0 {
            return None;
        }
        i64::try_from(self.reset)
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    }
}

/// Parse rate limit information from HTTP response headers.
///
/// Absent or malformed headers read as 0.
pub fn parse_rate_limit_from_headers(headers: &HeaderMap) -> RateLimitSnapshot {
    let read = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(0)
    };

    RateLimitSnapshot {
        limit: read("x-ratelimit-limit"),
        remaining: read("x-ratelimit-remaining"),
        reset: read("x-ratelimit-reset"),
    }
}

#[derive(Debug, Deserialize)]
struct RateLimitResources {
    core: RateLimitSnapshot,
}

#[derive(Debug, Deserialize)]
struct RateLimitBody {
    resources: RateLimitResources,
}

impl InstallationClient {
    /// Fetch the installation's core rate limit from `GET /rate_limit`.
    ///
    /// This call does not count against the limit. The returned data is the
    /// `resources.core` entry of the body; the attached snapshot comes from
    /// the headers as usual.
    pub async fn get_rate_limit(&self) -> Result<ApiResponse<RateLimitSnapshot>, ApiError> {
        let response: ApiResponse<RateLimitBody> =
            self.request(Method::GET, "/rate_limit", None::<&()>).await?;
        Ok(response.map(|body| body.resources.core))
    }
}

#[cfg(test)]
#[path = "rate_limit_tests.rs"]
mod tests;
