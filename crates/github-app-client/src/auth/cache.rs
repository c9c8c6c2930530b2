//! Installation token cache.
//!
//! Holds at most one token per installation id and refreshes it only when it
//! has gone stale. Refreshes are serialized per installation id: concurrent
//! callers for the same installation wait on one exchange instead of each
//! performing their own. Calls for different installations never block each
//! other.

use chrono::Duration;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info};

use super::{
    AssertionSigner, Clock, InstallationId, InstallationToken, SystemClock, TokenExchanger,
};
use crate::error::AuthError;

/// Seconds subtracted from GitHub's reported expiry before a token is stored.
pub const TOKEN_SAFETY_MARGIN_SECS: i64 = 60;

type Slot = Arc<AsyncMutex<Option<InstallationToken>>>;

/// Per-installation token cache.
///
/// # Examples
///
/// ```no_run
/// # use std::sync::Arc;
/// # use github_app_client::auth::{AppId, HttpTokenExchanger, InstallationId, InstallationTokenCache, PrivateKey, RS256AssertionSigner};
/// # use github_app_client::client::ClientConfig;
/// # async fn example(pem: &str) -> Result<(), Box<dyn std::error::Error>> {
/// let signer = RS256AssertionSigner::new(AppId::new("123"), PrivateKey::from_pem(pem)?);
/// let exchanger = HttpTokenExchanger::new(&ClientConfig::default())?;
/// let cache = InstallationTokenCache::new(Arc::new(signer), Arc::new(exchanger));
///
/// let token = cache.get_valid_token(InstallationId::new(42)).await?;
/// println!("valid until {}", token.expires_at());
/// # Ok(())
/// # }
/// ```
pub struct InstallationTokenCache {
    signer: Arc<dyn AssertionSigner>,
    exchanger: Arc<dyn TokenExchanger>,
    clock: Arc<dyn Clock>,
    slots: Mutex<HashMap<InstallationId, Slot>>,
}

impl InstallationTokenCache {
    /// Create an empty cache.
    pub fn new(signer: Arc<dyn AssertionSigner>, exchanger: Arc<dyn TokenExchanger>) -> Self {
        Self {
            signer,
            exchanger,
            clock: Arc::new(SystemClock),
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the time source used for staleness checks.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The signer used for exchanges, also used for App-level calls.
    pub fn signer(&self) -> &Arc<dyn AssertionSigner> {
        &self.signer
    }

    fn slot(&self, installation_id: InstallationId) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.entry(installation_id).or_default().clone()
    }

    /// Return a token for `installation_id` that is valid right now.
    ///
    /// A cached token is returned while `now < expires_at`. Otherwise a fresh
    /// assertion is minted and exchanged exactly once; the result replaces the
    /// cached entry. A failed exchange leaves the cache untouched and is not
    /// retried.
    ///
    /// # Errors
    ///
    /// Propagates configuration, signing and exchange failures unchanged.
    pub async fn get_valid_token(
        &self,
        installation_id: InstallationId,
    ) -> Result<InstallationToken, AuthError> {
        let slot = self.slot(installation_id);
        let mut entry = slot.lock().await;

        if let Some(token) = entry.as_ref() {
            if token.is_valid_at(self.clock.now()) {
                debug!(installation_id = %installation_id, "Installation token cache hit");
                return Ok(token.clone());
            }
            debug!(installation_id = %installation_id, "Cached installation token is stale");
        }

        let assertion = self.signer.mint_assertion().await?;
        let issued = self.exchanger.exchange(installation_id, &assertion).await?;

        let token = InstallationToken::new(
            issued.token,
            installation_id,
            issued.expires_at - Duration::seconds(TOKEN_SAFETY_MARGIN_SECS),
        );
        info!(
            installation_id = %installation_id,
            expires_at = %token.expires_at(),
            "Obtained installation token"
        );

        *entry = Some(token.clone());
        Ok(token)
    }

    /// Drop the cached token so the next call performs a fresh exchange.
    pub async fn invalidate(&self, installation_id: InstallationId) {
        let slot = self.slot(installation_id);
        *slot.lock().await = None;
        debug!(installation_id = %installation_id, "Invalidated installation token");
    }

    /// Peek at the cached token without refreshing it.
    pub async fn cached_token(&self, installation_id: InstallationId) -> Option<InstallationToken> {
        let slot = self.slot(installation_id);
        let entry = slot.lock().await;
        entry.clone()
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
