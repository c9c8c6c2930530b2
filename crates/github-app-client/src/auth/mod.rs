//! GitHub App authentication types and interfaces.
//!
//! Authentication is two-tier:
//! - an App-level [`SignedAssertion`] (RS256 JWT) proves the caller is the App,
//! - an installation-level [`InstallationToken`] is obtained by exchanging that
//!   assertion and is used for every data-access call.
//!
//! The traits in this module are the seams between the tiers so each piece can
//! be swapped for a fake in tests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use zeroize::ZeroizeOnDrop;

use crate::error::{AuthError, ConfigError};

pub mod cache;
pub mod exchange;
pub mod jwt;

pub use cache::{InstallationTokenCache, TOKEN_SAFETY_MARGIN_SECS};
pub use exchange::HttpTokenExchanger;
pub use jwt::RS256AssertionSigner;

// ============================================================================
// Core ID Types
// ============================================================================

/// GitHub App identifier used as the `iss` claim of App assertions.
///
/// GitHub accepts either the numeric App id or the App's client id as the
/// issuer, so the value is kept as an opaque string.
///
/// # Examples
///
/// ```
/// use github_app_client::auth::AppId;
///
/// let app_id = AppId::new("123456");
/// assert_eq!(app_id.as_str(), "123456");
/// assert_eq!(app_id.to_string(), "123456");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AppId(String);

impl AppId {
    /// Create a new App id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AppId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// GitHub App installation identifier.
///
/// When a GitHub App is installed on an organization or user account, GitHub
/// assigns an installation id. Installation tokens are scoped to one id.
///
/// # Examples
///
/// ```
/// use github_app_client::auth::InstallationId;
///
/// let installation = InstallationId::new(98765);
/// assert_eq!(installation.as_u64(), 98765);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstallationId(u64);

impl InstallationId {
    /// Create a new installation ID.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw u64 value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for InstallationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for InstallationId {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s.trim().parse::<u64>().map_err(|_| ConfigError::Invalid {
            key: "installation_id".to_string(),
            message: "must be a positive integer".to_string(),
        })?;
        Ok(Self::new(id))
    }
}

// ============================================================================
// Token Types
// ============================================================================

/// Claims carried by an App-level assertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssertionClaims {
    /// Issuer (GitHub App id)
    pub iss: String,
    /// Issued at (Unix timestamp, backdated for clock skew)
    pub iat: i64,
    /// Expiration (Unix timestamp, at most 10 minutes after signing)
    pub exp: i64,
}

/// Signed App-level assertion (RS256 JWT).
///
/// Assertions are minted fresh for every exchange and never cached. The
/// encoded string is never exposed in Debug output.
#[derive(Clone)]
pub struct SignedAssertion {
    token: String,
    issuer: AppId,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl SignedAssertion {
    /// Create a new assertion from an encoded JWT and its claim times.
    pub fn new(
        token: String,
        issuer: AppId,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            token,
            issuer,
            issued_at,
            expires_at,
        }
    }

    /// Get the encoded assertion for the `Authorization: Bearer` header.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Get the App id in the `iss` claim.
    pub fn issuer(&self) -> &AppId {
        &self.issuer
    }

    /// Get the `iat` claim.
    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// Get the `exp` claim.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

impl std::fmt::Debug for SignedAssertion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignedAssertion")
            .field("issuer", &self.issuer)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .field("token", &"<REDACTED>")
            .finish()
    }
}

/// Token as returned by `POST /app/installations/{id}/access_tokens`.
///
/// `expires_at` is GitHub's reported expiry, before any safety margin.
#[derive(Clone, Deserialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedToken")
            .field("expires_at", &self.expires_at)
            .field("token", &"<REDACTED>")
            .finish()
    }
}

/// Installation-scoped access token held by the token cache.
///
/// `expires_at` already has the cache's safety margin subtracted, so a token
/// is usable while `now < expires_at`.
///
/// # Examples
///
/// ```
/// use github_app_client::auth::{InstallationId, InstallationToken};
/// use chrono::{Duration, Utc};
///
/// let now = Utc::now();
/// let token = InstallationToken::new(
///     "ghs_token".to_string(),
///     InstallationId::new(456),
///     now + Duration::minutes(59),
/// );
///
/// assert!(token.is_valid_at(now));
/// assert!(!token.is_valid_at(now + Duration::hours(1)));
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct InstallationToken {
    token: String,
    installation_id: InstallationId,
    expires_at: DateTime<Utc>,
}

impl InstallationToken {
    /// Create a new installation token.
    pub fn new(token: String, installation_id: InstallationId, expires_at: DateTime<Utc>) -> Self {
        Self {
            token,
            installation_id,
            expires_at,
        }
    }

    /// Get the token string for the `Authorization: Bearer` header.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Get the installation this token is scoped to.
    pub fn installation_id(&self) -> InstallationId {
        self.installation_id
    }

    /// Get the effective expiry (server expiry minus the safety margin).
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Check whether the token may still be used at `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

// Security: Redact token in debug output
impl std::fmt::Debug for InstallationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallationToken")
            .field("installation_id", &self.installation_id)
            .field("expires_at", &self.expires_at)
            .field("token", &"<REDACTED>")
            .finish()
    }
}

/// RSA private key used to sign App assertions.
///
/// Holds PEM bytes. The bytes are wiped on drop and never shown in Debug
/// output.
#[derive(Clone, ZeroizeOnDrop)]
pub struct PrivateKey {
    key_data: Vec<u8>,
}

impl PrivateKey {
    /// Get the PEM bytes.
    pub fn key_data(&self) -> &[u8] {
        &self.key_data
    }
}

// Security: Don't expose key data in debug output
impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateKey")
            .field("key_data", &"<REDACTED>")
            .finish()
    }
}

// ============================================================================
// Time Source
// ============================================================================

/// Source of the current time for expiry decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// ============================================================================
// Trait Definitions
// ============================================================================

/// Mints App-level assertions.
#[async_trait::async_trait]
pub trait AssertionSigner: Send + Sync {
    /// Sign a fresh assertion identifying the App.
    ///
    /// # Errors
    ///
    /// - `AuthError::Config` when the App id or private key is not configured
    /// - `AuthError::Signing` when the key material cannot be used
    async fn mint_assertion(&self) -> Result<SignedAssertion, AuthError>;

    /// The App id placed in the `iss` claim, if configured.
    fn app_id(&self) -> Option<&AppId>;
}

/// Exchanges an App assertion for an installation token.
#[async_trait::async_trait]
pub trait TokenExchanger: Send + Sync {
    /// Perform one exchange. Implementations never retry.
    async fn exchange(
        &self,
        installation_id: InstallationId,
        assertion: &SignedAssertion,
    ) -> Result<IssuedToken, AuthError>;
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
