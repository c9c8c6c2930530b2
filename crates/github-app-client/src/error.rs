//! Error types for GitHub App client operations.
//!
//! Errors are split by layer: static configuration, assertion signing,
//! installation token exchange and general API calls. Each layer wraps the one
//! below it so callers can match on the precise failure while still using `?`.

use thiserror::Error;

use crate::auth::{AppId, InstallationId};

/// Missing or invalid static configuration.
///
/// Configuration problems are never retried. They surface on the first call
/// that needs the missing value, not when the client is constructed.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required configuration value was not supplied.
    #[error("Missing required configuration value: {key}")]
    Missing { key: String },

    /// A configuration value is present but cannot be used.
    #[error("Invalid configuration value for {key}: {message}")]
    Invalid { key: String, message: String },

    /// An installation-scoped call was made without an installation id.
    #[error("No installation id configured; installation-scoped calls are unavailable")]
    MissingInstallationId,
}

/// Errors while minting an App-level assertion.
#[derive(Debug, Error)]
pub enum SigningError {
    /// The private key is malformed or is not an RSA key.
    #[error("Invalid private key: {message}")]
    InvalidKey { message: String },

    /// Encoding or signing the assertion failed.
    #[error("Assertion encoding failed: {message}")]
    EncodingFailed { message: String },
}

/// Errors while obtaining an installation token.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Configuration needed for authentication is missing or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The App assertion could not be minted.
    #[error("Failed to sign App assertion: {0}")]
    Signing(#[from] SigningError),

    /// The token endpoint returned 404 for this installation.
    #[error(
        "Installation {installation_id} not found. Verify the installation id is correct \
         and that the GitHub App is installed on the target account or organization"
    )]
    InstallationNotFound { installation_id: InstallationId },

    /// The token endpoint rejected the App assertion (401).
    #[error(
        "GitHub rejected the credentials for App {app_id}. Verify the App id and that the \
         private key is correctly formatted and belongs to this App"
    )]
    InvalidCredentials { app_id: AppId },

    /// Any other non-2xx response from the token endpoint.
    #[error("Installation token exchange failed with status {status}: {body}")]
    ExchangeFailed { status: u16, body: String },

    /// Transport failure while talking to the token endpoint.
    #[error("Network error during token exchange: {0}")]
    Network(String),

    /// The token endpoint answered 2xx but the body was unusable.
    #[error("Invalid token exchange response: {message}")]
    InvalidResponse { message: String },
}

impl AuthError {
    /// Check if this error represents a transient condition that may succeed if
    /// the caller retries the whole operation.
    ///
    /// Configuration, signing and credential problems are permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Config(_) => false,
            Self::Signing(_) => false,
            Self::InstallationNotFound { .. } => false,
            Self::InvalidCredentials { .. } => false,
            Self::ExchangeFailed { status, .. } => *status >= 500 || *status == 429,
            Self::Network(_) => true,
            Self::InvalidResponse { .. } => false,
        }
    }
}

/// Errors during GitHub API operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Non-2xx response from the GitHub API.
    ///
    /// `message` is GitHub's own `message` field when the body carries one,
    /// otherwise `"GitHub API error: <status>"`.
    #[error("{message}")]
    HttpError {
        status: u16,
        message: String,
        body: String,
    },

    /// No usable token could be obtained for the call.
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// Transport error (connection, TLS, timeout).
    #[error("HTTP client error: {0}")]
    Network(#[from] reqwest::Error),

    /// The response body did not match the expected shape.
    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// The client itself could not be built.
    #[error("Client configuration error: {message}")]
    Configuration { message: String },
}

impl ApiError {
    /// HTTP status of the failed response, if the failure came from GitHub.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpError { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Check if this error represents a transient condition.
    ///
    /// Transient conditions include server errors (5xx), rate limiting (429)
    /// and transport failures.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::HttpError { status, .. } => *status >= 500 || *status == 429,
            Self::Auth(e) => e.is_transient(),
            Self::Network(_) => true,
            Self::JsonError(_) => false,
            Self::Configuration { .. } => false,
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        Self::Auth(AuthError::Config(err))
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
