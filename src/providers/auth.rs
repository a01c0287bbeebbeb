//! OAuth2 client-credentials token cache shared by the DIFE and MOL clients.

use serde::Deserialize;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

use super::error::ProviderError;
use crate::config::EndpointConfig;

/// Refresh this long before the token actually expires
const REFRESH_MARGIN: Duration = Duration::from_secs(30);

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    300
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    refresh_at: Instant,
}

impl CachedToken {
    fn new(access_token: String, expires_in: Duration, now: Instant) -> Self {
        Self {
            access_token,
            refresh_at: now + expires_in.saturating_sub(REFRESH_MARGIN),
        }
    }

    fn is_fresh(&self, now: Instant) -> bool {
        now < self.refresh_at
    }
}

pub struct TokenCache {
    provider: &'static str,
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    timeout: Duration,
    cached: RwLock<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new(provider: &'static str, http: reqwest::Client, config: &EndpointConfig) -> Self {
        Self {
            provider,
            http,
            token_url: config.token_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            timeout: config.request_timeout(),
            cached: RwLock::new(None),
        }
    }

    /// Current access token, fetching a new one when missing or near expiry.
    pub async fn bearer(&self) -> Result<String, ProviderError> {
        {
            let guard = self.cached.read().await;
            if let Some(token) = guard.as_ref()
                && token.is_fresh(Instant::now())
            {
                return Ok(token.access_token.clone());
            }
        }

        let mut guard = self.cached.write().await;
        // Another task may have refreshed while we waited for the write lock
        if let Some(token) = guard.as_ref()
            && token.is_fresh(Instant::now())
        {
            return Ok(token.access_token.clone());
        }

        let token = self.fetch().await?;
        let access_token = token.access_token.clone();
        *guard = Some(token);
        Ok(access_token)
    }

    /// Drop the cached token (after a 401)
    pub async fn invalidate(&self) {
        *self.cached.write().await = None;
    }

    async fn fetch(&self) -> Result<CachedToken, ProviderError> {
        debug!(provider = self.provider, "Requesting access token");

        let response = self
            .http
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(self.provider, self.timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Auth {
                provider: self.provider,
                message: format!("token endpoint returned HTTP {}: {}", status.as_u16(), body),
            });
        }

        let token: TokenResponse = response.json().await.map_err(|e| ProviderError::Auth {
            provider: self.provider,
            message: format!("invalid token response: {}", e),
        })?;

        Ok(CachedToken::new(
            token.access_token,
            Duration::from_secs(token.expires_in),
            Instant::now(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_freshness_respects_margin() {
        let now = Instant::now();
        let token = CachedToken::new("t".into(), Duration::from_secs(300), now);
        assert!(token.is_fresh(now + Duration::from_secs(269)));
        assert!(!token.is_fresh(now + Duration::from_secs(270)));
    }

    #[test]
    fn test_short_lived_token_is_never_fresh() {
        let now = Instant::now();
        let token = CachedToken::new("t".into(), Duration::from_secs(10), now);
        assert!(!token.is_fresh(now));
    }

    #[tokio::test]
    async fn test_invalidate_clears_cache() {
        let cache = TokenCache::new("DIFE", reqwest::Client::new(), &EndpointConfig::default());
        *cache.cached.write().await = Some(CachedToken::new(
            "abc".into(),
            Duration::from_secs(3600),
            Instant::now(),
        ));
        assert_eq!(cache.bearer().await.unwrap(), "abc");

        cache.invalidate().await;
        assert!(cache.cached.read().await.is_none());
    }
}
