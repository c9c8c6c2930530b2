//! Installation token exchange over HTTP.
//!
//! `POST /app/installations/{id}/access_tokens`, authenticated with the App
//! assertion. Failures are classified so callers can tell a wrong
//! installation id (404) from wrong App credentials (401).

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{InstallationId, IssuedToken, SignedAssertion, TokenExchanger};
use crate::client::{ClientConfig, GITHUB_ACCEPT, GITHUB_API_VERSION};
use crate::error::{ApiError, AuthError};

/// Token exchanger that calls the GitHub REST API.
#[derive(Debug, Clone)]
pub struct HttpTokenExchanger {
    http_client: reqwest::Client,
    api_url: String,
}

impl HttpTokenExchanger {
    /// Create an exchanger with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Configuration` if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        Ok(Self::with_http_client(
            config.build_http_client()?,
            config.github_api_url.clone(),
        ))
    }

    /// Create an exchanger that shares an existing HTTP client.
    pub fn with_http_client(http_client: reqwest::Client, api_url: impl Into<String>) -> Self {
        Self {
            http_client,
            api_url: api_url.into(),
        }
    }
}

#[async_trait]
impl TokenExchanger for HttpTokenExchanger {
    async fn exchange(
        &self,
        installation_id: InstallationId,
        assertion: &SignedAssertion,
    ) -> Result<IssuedToken, AuthError> {
        let url = format!(
            "{}/app/installations/{}/access_tokens",
            self.api_url,
            installation_id.as_u64()
        );
        debug!(installation_id = %installation_id, "Exchanging App assertion for installation token");

        let response = self
            .http_client
            .post(&url)
            .header("Authorization", format!("Bearer {}", assertion.token()))
            .header("Accept", GITHUB_ACCEPT)
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());
            warn!(
                installation_id = %installation_id,
                status = status.as_u16(),
                "Installation token exchange failed"
            );
            return Err(match status.as_u16() {
                404 => AuthError::InstallationNotFound { installation_id },
                401 => AuthError::InvalidCredentials {
                    app_id: assertion.issuer().clone(),
                },
                code => AuthError::ExchangeFailed { status: code, body },
            });
        }

        response
            .json::<IssuedToken>()
            .await
            .map_err(|e| AuthError::InvalidResponse {
                message: format!("Failed to parse access token response: {}", e),
            })
    }
}

#[cfg(test)]
#[path = "exchange_tests.rs"]
mod tests;
