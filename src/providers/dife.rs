//! DIFE key directory client

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use super::error::ProviderError;
use super::http::JsonClient;
use super::types::KeyResolution;
use super::KeyResolutionProvider;
use crate::config::EndpointConfig;
use crate::keys::KeyType;

const RESOLVE_PATH: &str = "/v1/key/resolve";

#[derive(Serialize)]
struct ResolveKeyBody<'a> {
    correlation_id: &'a str,
    key: KeyRef<'a>,
}

#[derive(Serialize)]
struct KeyRef<'a> {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    key_type: Option<&'static str>,
    value: &'a str,
}

pub struct DifeClient {
    client: JsonClient,
}

impl DifeClient {
    pub fn new(config: &EndpointConfig) -> Result<Self, ProviderError> {
        info!("Initializing DIFE client at {}", config.base_url);
        Ok(Self {
            client: JsonClient::new("DIFE", config)?,
        })
    }
}

#[async_trait]
impl KeyResolutionProvider for DifeClient {
    fn name(&self) -> &'static str {
        self.client.provider()
    }

    async fn resolve_key(
        &self,
        correlation_id: &str,
        key: &str,
        key_type: Option<KeyType>,
    ) -> Result<KeyResolution, ProviderError> {
        let body = ResolveKeyBody {
            correlation_id,
            key: KeyRef {
                key_type: key_type.map(KeyType::code),
                value: key,
            },
        };
        self.client
            .post(RESOLVE_PATH, &body, self.client.default_timeout())
            .await
    }
}
