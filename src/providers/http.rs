//! Authenticated JSON-over-HTTP transport shared by the provider clients.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

use super::auth::TokenCache;
use super::error::ProviderError;
use crate::config::EndpointConfig;

pub struct JsonClient {
    provider: &'static str,
    http: reqwest::Client,
    base_url: String,
    default_timeout: Duration,
    token: TokenCache,
}

impl JsonClient {
    pub fn new(provider: &'static str, config: &EndpointConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ProviderError::Transport {
                provider,
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            provider,
            token: TokenCache::new(provider, http.clone(), config),
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            default_timeout: config.request_timeout(),
        })
    }

    pub fn provider(&self) -> &'static str {
        self.provider
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// POST `body` to `path` and decode the JSON reply.
    ///
    /// 4xx replies are still decoded as `R` when possible: both providers
    /// report business errors as structured bodies with a client-error status.
    pub async fn post<B, R>(&self, path: &str, body: &B, timeout: Duration) -> Result<R, ProviderError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let token = self.token.bearer().await?;

        debug!(provider = self.provider, url = %url, "POST");

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(self.provider, timeout, e))?;

        let status = response.status();
        if status.as_u16() == 401 {
            self.token.invalidate().await;
            return Err(ProviderError::Auth {
                provider: self.provider,
                message: "access token rejected".to_string(),
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::from_reqwest(self.provider, timeout, e))?;

        if status.is_server_error() {
            warn!(provider = self.provider, status = status.as_u16(), "Provider server error");
            return Err(ProviderError::Http {
                provider: self.provider,
                status: status.as_u16(),
                body: text,
            });
        }

        match serde_json::from_str::<R>(&text) {
            Ok(decoded) => Ok(decoded),
            Err(_) if status.is_client_error() => Err(ProviderError::Http {
                provider: self.provider,
                status: status.as_u16(),
                body: text,
            }),
            Err(e) => Err(ProviderError::Decode {
                provider: self.provider,
                message: e.to_string(),
            }),
        }
    }
}
