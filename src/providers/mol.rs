//! MOL payment execution client

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::info;

use super::error::ProviderError;
use super::http::JsonClient;
use super::types::{PaymentCreation, PaymentStatusQuery, PaymentStatusResponse, ResolvedKey};
use super::PaymentProvider;
use crate::config::EndpointConfig;
use crate::transfer::types::{PayerAccount, TransferRequest};

const PAYMENT_PATH: &str = "/v1/payment";
const QUERY_PATH: &str = "/v1/payment/query";

#[derive(Serialize)]
struct CreatePaymentBody<'a> {
    transaction_id: &'a str,
    amount: String,
    currency: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    payer: &'a PayerAccount,
    payee: PayeeBody<'a>,
}

#[derive(Serialize)]
struct PayeeBody<'a> {
    key_type: &'static str,
    key_value: &'a str,
    participant_nit: &'a str,
    participant_spbvi: &'a str,
    account_type: &'a str,
    account_number: &'a str,
    identification_type: &'a str,
    identification_number: &'a str,
    name: String,
}

impl<'a> CreatePaymentBody<'a> {
    fn build(request: &'a TransferRequest, resolved: &'a ResolvedKey) -> Self {
        Self {
            transaction_id: &request.transaction_id,
            amount: request.amount.to_string(),
            currency: &request.currency,
            description: request.description.as_deref(),
            payer: &request.payer,
            payee: PayeeBody {
                key_type: resolved.key.key_type.code(),
                key_value: &resolved.key.value,
                participant_nit: &resolved.participant.nit,
                participant_spbvi: &resolved.participant.spbvi,
                account_type: &resolved.payment_method.account_type,
                account_number: &resolved.payment_method.number,
                identification_type: &resolved.person.identification_type,
                identification_number: &resolved.person.identification_number,
                name: resolved.person.display_name(),
            },
        }
    }
}

pub struct MolClient {
    client: JsonClient,
}

impl MolClient {
    pub fn new(config: &EndpointConfig) -> Result<Self, ProviderError> {
        info!("Initializing MOL client at {}", config.base_url);
        Ok(Self {
            client: JsonClient::new("MOL", config)?,
        })
    }
}

#[async_trait]
impl PaymentProvider for MolClient {
    fn name(&self) -> &'static str {
        self.client.provider()
    }

    async fn create_payment(
        &self,
        request: &TransferRequest,
        resolved_key: &ResolvedKey,
    ) -> Result<PaymentCreation, ProviderError> {
        let body = CreatePaymentBody::build(request, resolved_key);
        self.client
            .post(PAYMENT_PATH, &body, self.client.default_timeout())
            .await
    }

    async fn query_payment_status(
        &self,
        query: &PaymentStatusQuery,
        timeout: Duration,
    ) -> Result<PaymentStatusResponse, ProviderError> {
        self.client.post(QUERY_PATH, query, timeout).await
    }
}
