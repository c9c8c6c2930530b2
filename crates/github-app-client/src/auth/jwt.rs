//! App assertion (JWT) minting for GitHub App authentication.
//!
//! # GitHub Requirements
//!
//! - Assertions must use RS256 (RSA Signature with SHA-256)
//! - Maximum lifetime is 10 minutes
//! - Claims must include `iss` (App id), `iat` (issued at) and `exp`
//!
//! `iat` is backdated by [`CLOCK_SKEW_ALLOWANCE_SECS`] so a verifier whose clock runs
//! slightly behind ours does not reject the assertion as issued in the future.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::RsaPrivateKey;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::auth::{
    AppId, AssertionClaims, AssertionSigner, Clock, PrivateKey, SignedAssertion, SystemClock,
};
use crate::config::AppSettings;
use crate::error::{AuthError, ConfigError, SigningError};

/// How far `iat` is set in the past, in seconds.
pub const CLOCK_SKEW_ALLOWANCE_SECS: i64 = 60;

/// Assertion lifetime measured from signing time, in seconds (GitHub's maximum).
pub const ASSERTION_LIFETIME_SECS: i64 = 600;

impl PrivateKey {
    /// Create a private key from PEM text.
    ///
    /// Accepts PKCS#1 (`BEGIN RSA PRIVATE KEY`, the format GitHub issues) and
    /// PKCS#8 (`BEGIN PRIVATE KEY`). Literal `\n` sequences, as commonly found
    /// in keys stored in single-line environment variables, are turned into
    /// real newlines first.
    ///
    /// # Errors
    ///
    /// Returns `SigningError::InvalidKey` if the text is empty, lacks PEM
    /// markers or does not contain an RSA private key.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use github_app_client::auth::PrivateKey;
    /// let pem = std::fs::read_to_string("app.private-key.pem").unwrap();
    /// let key = PrivateKey::from_pem(&pem).expect("Invalid PEM");
    /// ```
    pub fn from_pem(pem: &str) -> Result<Self, SigningError> {
        let normalized = pem.replace("\\n", "\n");
        let pem = normalized.trim();

        if pem.is_empty() {
            return Err(SigningError::InvalidKey {
                message: "PEM string cannot be empty".to_string(),
            });
        }

        if !pem.contains("-----BEGIN") || !pem.contains("-----END") {
            return Err(SigningError::InvalidKey {
                message: "Invalid PEM format: missing BEGIN/END markers".to_string(),
            });
        }

        let parsed = RsaPrivateKey::from_pkcs1_pem(pem)
            .map(|_| ())
            .or_else(|_| RsaPrivateKey::from_pkcs8_pem(pem).map(|_| ()));
        if let Err(e) = parsed {
            return Err(SigningError::InvalidKey {
                message: format!("Failed to parse RSA private key: {}", e),
            });
        }

        Ok(Self {
            key_data: pem.as_bytes().to_vec(),
        })
    }
}

/// Where the signer's key material stands.
///
/// Problems are recorded rather than raised so that a process without App
/// credentials can start and only fails on the first call that signs.
#[derive(Clone)]
enum KeyMaterial {
    Missing,
    Loaded(PrivateKey),
    Unreadable { path: PathBuf, message: String },
    Unusable(String),
}

/// RS256 assertion signer backed by an RSA private key.
///
/// # Examples
///
/// ```no_run
/// # use github_app_client::auth::{AppId, AssertionSigner, PrivateKey, RS256AssertionSigner};
/// # async fn example(pem: &str) -> Result<(), Box<dyn std::error::Error>> {
/// let signer = RS256AssertionSigner::new(AppId::new("123456"), PrivateKey::from_pem(pem)?);
/// let assertion = signer.mint_assertion().await?;
/// println!("expires at {}", assertion.expires_at());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RS256AssertionSigner {
    app_id: Option<AppId>,
    key: KeyMaterial,
    clock: Arc<dyn Clock>,
}

impl RS256AssertionSigner {
    /// Create a signer from an App id and a validated key.
    pub fn new(app_id: AppId, private_key: PrivateKey) -> Self {
        Self {
            app_id: Some(app_id),
            key: KeyMaterial::Loaded(private_key),
            clock: Arc::new(SystemClock),
        }
    }

    /// Create a signer from settings without failing on missing or bad values.
    ///
    /// Inline PEM text takes precedence over `private_key_path`.
    pub fn from_settings(settings: &AppSettings) -> Self {
        let key = match (&settings.private_key, &settings.private_key_path) {
            (Some(pem), _) => key_from_pem(pem),
            (None, Some(path)) => key_from_file(path),
            (None, None) => KeyMaterial::Missing,
        };

        Self {
            app_id: settings
                .app_id
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(AppId::new),
            key,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Build claims for an assertion signed at `now`.
    fn build_claims(&self, app_id: &AppId, now: DateTime<Utc>) -> AssertionClaims {
        AssertionClaims {
            iss: app_id.as_str().to_string(),
            iat: (now - Duration::seconds(CLOCK_SKEW_ALLOWANCE_SECS)).timestamp(),
            exp: (now + Duration::seconds(ASSERTION_LIFETIME_SECS)).timestamp(),
        }
    }
}

fn key_from_pem(pem: &str) -> KeyMaterial {
    match PrivateKey::from_pem(pem) {
        Ok(key) => KeyMaterial::Loaded(key),
        Err(SigningError::InvalidKey { message } | SigningError::EncodingFailed { message }) => {
            KeyMaterial::Unusable(message)
        }
    }
}

fn key_from_file(path: &Path) -> KeyMaterial {
    match std::fs::read_to_string(path) {
        Ok(pem) => key_from_pem(&pem),
        Err(e) => KeyMaterial::Unreadable {
            path: path.to_path_buf(),
            message: e.to_string(),
        },
    }
}

#[async_trait]
impl AssertionSigner for RS256AssertionSigner {
    async fn mint_assertion(&self) -> Result<SignedAssertion, AuthError> {
        let app_id = self.app_id.as_ref().ok_or_else(|| ConfigError::Missing {
            key: "app_id".to_string(),
        })?;

        let private_key = match &self.key {
            KeyMaterial::Loaded(key) => key,
            KeyMaterial::Missing => {
                return Err(ConfigError::Missing {
                    key: "private_key".to_string(),
                }
                .into())
            }
            KeyMaterial::Unreadable { path, message } => {
                return Err(ConfigError::Invalid {
                    key: "private_key_path".to_string(),
                    message: format!("cannot read {}: {}", path.display(), message),
                }
                .into())
            }
            KeyMaterial::Unusable(message) => {
                return Err(SigningError::InvalidKey {
                    message: message.clone(),
                }
                .into())
            }
        };

        let now = self.clock.now();
        let claims = self.build_claims(app_id, now);

        let encoding_key = EncodingKey::from_rsa_pem(private_key.key_data()).map_err(|e| {
            SigningError::InvalidKey {
                message: format!("Failed to create encoding key: {}", e),
            }
        })?;

        let token = encode(&Header::new(Algorithm::RS256), &claims, &encoding_key).map_err(|e| {
            SigningError::EncodingFailed {
                message: format!("Failed to encode JWT: {}", e),
            }
        })?;

        debug!(app_id = %app_id, exp = claims.exp, "Minted App assertion");

        Ok(SignedAssertion::new(
            token,
            app_id.clone(),
            now - Duration::seconds(CLOCK_SKEW_ALLOWANCE_SECS),
            now + Duration::seconds(ASSERTION_LIFETIME_SECS),
        ))
    }

    fn app_id(&self) -> Option<&AppId> {
        self.app_id.as_ref()
    }
}

#[cfg(test)]
#[path = "jwt_tests.rs"]
mod tests;
