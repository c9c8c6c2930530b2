//! Installation-scoped access to the GitHub API.
//!
//! An `InstallationClient` authenticates every call with the installation
//! token held by the shared [`InstallationTokenCache`](crate::auth::InstallationTokenCache),
//! exchanging a new one only when the cached token is stale.

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::auth::{InstallationId, InstallationToken};
use crate::client::{ApiResponse, GitHubClient};
use crate::error::{ApiError, ConfigError};

/// Installation-scoped GitHub API client.
///
/// Holds a clone of the parent `GitHubClient`, so the HTTP connection pool and
/// token cache are shared with every other client created from it.
#[derive(Debug, Clone)]
pub struct InstallationClient {
    client: GitHubClient,
    installation_id: Option<InstallationId>,
}

impl InstallationClient {
    /// Create a new installation client.
    ///
    /// With `installation_id` unset every call fails with
    /// `ConfigError::MissingInstallationId`.
    pub fn new(client: GitHubClient, installation_id: Option<InstallationId>) -> Self {
        Self {
            client,
            installation_id,
        }
    }

    /// Get the installation ID this client is bound to.
    pub fn installation_id(&self) -> Option<InstallationId> {
        self.installation_id
    }

    /// Current installation token, exchanging a new one if needed.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingInstallationId` when unbound, otherwise any
    /// failure from the token cache.
    pub async fn token(&self) -> Result<InstallationToken, ApiError> {
        let installation_id = self
            .installation_id
            .ok_or(ConfigError::MissingInstallationId)?;
        Ok(self
            .client
            .token_cache()
            .get_valid_token(installation_id)
            .await?)
    }

    /// Make an authenticated request and decode the JSON response.
    ///
    /// # Arguments
    ///
    /// * `method` - HTTP method
    /// * `path` - API path, with or without a leading slash; may carry a query string
    /// * `body` - Optional request body, serialized as JSON
    ///
    /// # Errors
    ///
    /// - `ApiError::Auth` if no token can be obtained
    /// - `ApiError::HttpError` for non-2xx responses, with GitHub's `message`
    ///   field or `GitHub API error: <status>` as the message
    /// - `ApiError::Network` / `ApiError::JsonError` for transport and decode failures
    pub async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<ApiResponse<T>, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let token = self.token().await?;
        self.client.send(method, path, token.token(), body).await
    }

    /// Make an authenticated GET request.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<ApiResponse<T>, ApiError> {
        self.request(Method::GET, path, None::<&()>).await
    }

    /// Make an authenticated POST request with a JSON body.
    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<ApiResponse<T>, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(Method::POST, path, Some(body)).await
    }

    /// Make an authenticated PATCH request with a JSON body.
    pub async fn patch<T, B>(&self, path: &str, body: &B) -> Result<ApiResponse<T>, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(Method::PATCH, path, Some(body)).await
    }
}

#[cfg(test)]
#[path = "installation_tests.rs"]
mod tests;
