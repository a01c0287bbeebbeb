//! Transfer Orchestrator
//!
//! key format → key resolution (DIFE) → payee checks → payment creation (MOL)
//! → wait for settlement. Every failure is folded into a [`TransferResponse`];
//! nothing is thrown past this boundary.

use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::coordinator::PendingTransferCoordinator;
use super::error::TransferError;
use super::types::{TransferRequest, TransferResponse};
use crate::keys::{KeyType, classify_key, validate_key_format};
use crate::providers::{
    KeyResolutionProvider, PaymentProvider, ResolutionStatus, ResolvedKey,
};

/// Identifiers of a payment MOL accepted
#[derive(Debug, Clone)]
struct SubmittedPayment {
    end_to_end_id: String,
    execution_id: Option<String>,
}

pub struct TransferOrchestrator {
    key_resolver: Arc<dyn KeyResolutionProvider>,
    payment_provider: Arc<dyn PaymentProvider>,
    coordinator: PendingTransferCoordinator,
}

impl TransferOrchestrator {
    pub fn new(
        key_resolver: Arc<dyn KeyResolutionProvider>,
        payment_provider: Arc<dyn PaymentProvider>,
        coordinator: PendingTransferCoordinator,
    ) -> Self {
        Self {
            key_resolver,
            payment_provider,
            coordinator,
        }
    }

    pub fn coordinator(&self) -> &PendingTransferCoordinator {
        &self.coordinator
    }

    /// Run one transfer end to end.
    ///
    /// A settlement that does not arrive within the coordinator budget is
    /// reported as `PENDING`, never as an error.
    pub async fn process_transfer(&self, request: TransferRequest) -> TransferResponse {
        let started_at = Instant::now();
        let transaction_id = request.transaction_id.trim().to_string();
        info!(
            transaction_id = %transaction_id,
            amount = %request.amount,
            currency = %request.currency,
            "Processing transfer"
        );

        let submitted = match self.submit(&request).await {
            Ok(submitted) => submitted,
            Err(e) => {
                let response = e.to_response(&transaction_id);
                warn!(
                    transaction_id = %transaction_id,
                    error_code = e.code(),
                    response_code = %response.response_code,
                    error = %e,
                    "Transfer failed before settlement"
                );
                return response;
            }
        };

        let outcome = self
            .coordinator
            .wait_for_confirmation(&transaction_id, &submitted.end_to_end_id, Some(started_at))
            .await;

        let response = match outcome {
            Ok(response) => response.with_execution_id_if_missing(submitted.execution_id),
            Err(e) if e.is_timeout_like() => {
                info!(
                    transaction_id = %transaction_id,
                    end_to_end_id = %submitted.end_to_end_id,
                    "No final response within budget, reporting transfer as pending"
                );
                TransferResponse::pending(&transaction_id)
                    .with_end_to_end_id(&submitted.end_to_end_id)
                    .with_execution_id(submitted.execution_id)
            }
            Err(e) => {
                warn!(
                    transaction_id = %transaction_id,
                    end_to_end_id = %submitted.end_to_end_id,
                    error = %e,
                    "Waiting for settlement failed"
                );
                TransferError::from(e)
                    .to_response(&transaction_id)
                    .with_end_to_end_id(&submitted.end_to_end_id)
                    .with_execution_id(submitted.execution_id)
            }
        };

        info!(
            transaction_id = %transaction_id,
            response_code = %response.response_code,
            duration_ms = started_at.elapsed().as_millis() as u64,
            "Transfer finished"
        );
        response
    }

    async fn submit(&self, request: &TransferRequest) -> Result<SubmittedPayment, TransferError> {
        validate_request(request)?;

        let resolved = self.resolve_key(&request.payee.key).await?;
        check_payee(request, &resolved)?;

        let creation = self
            .payment_provider
            .create_payment(request, &resolved)
            .await?;

        if !creation.is_accepted() {
            let (code, description) = match creation.errors.first() {
                Some(detail) => (detail.code.clone(), detail.description.clone()),
                None => (
                    creation.response_code.clone(),
                    "Payment not accepted".to_string(),
                ),
            };
            return Err(TransferError::PaymentRejected { code, description });
        }

        let end_to_end_id = creation
            .end_to_end_id()
            .ok_or(TransferError::MissingEndToEndId)?
            .to_string();
        debug!(
            transaction_id = %request.transaction_id,
            end_to_end_id = %end_to_end_id,
            external_transaction_id = ?creation.external_transaction_id,
            "Payment accepted"
        );

        Ok(SubmittedPayment {
            end_to_end_id,
            execution_id: creation.execution_id().map(str::to_string),
        })
    }

    /// Classify, validate and resolve a payee key
    pub async fn resolve_key(&self, key: &str) -> Result<ResolvedKey, TransferError> {
        let key = key.trim();
        let key_type = classify_key(key);
        validate_key_format(key, key_type)?;

        let correlation_id = Uuid::new_v4().to_string();
        debug!(
            correlation_id = %correlation_id,
            key_type = %key_type,
            provider = self.key_resolver.name(),
            "Resolving key"
        );
        let resolution = self
            .key_resolver
            .resolve_key(&correlation_id, key, Some(key_type))
            .await?;

        match (resolution.status, resolution.resolved_key) {
            (ResolutionStatus::Success, Some(resolved)) => Ok(resolved),
            (status, _) => {
                let (code, description) = match resolution.errors.into_iter().next() {
                    Some(detail) => (detail.code, detail.description),
                    None => (
                        "DIFE-0004".to_string(),
                        format!("Key resolution returned {:?} without data", status),
                    ),
                };
                Err(TransferError::KeyNotResolved { code, description })
            }
        }
    }

    /// Key type the resolver will be asked for
    pub fn key_type_of(key: &str) -> KeyType {
        classify_key(key.trim())
    }
}

fn validate_request(request: &TransferRequest) -> Result<(), TransferError> {
    if request.transaction_id.trim().is_empty() {
        return Err(TransferError::InvalidRequest(
            "transaction_id cannot be empty".into(),
        ));
    }
    if request.amount <= Decimal::ZERO {
        return Err(TransferError::InvalidRequest(
            "amount must be greater than zero".into(),
        ));
    }
    if request.currency.trim().is_empty() {
        return Err(TransferError::InvalidRequest("currency cannot be empty".into()));
    }
    if request.payer.account_number.trim().is_empty() {
        return Err(TransferError::InvalidRequest(
            "payer account_number cannot be empty".into(),
        ));
    }
    Ok(())
}

/// Expectations the caller stated about the payee must match DIFE's data
fn check_payee(request: &TransferRequest, resolved: &ResolvedKey) -> Result<(), TransferError> {
    if let Some(expected) = request.payee.identification_number.as_deref()
        && expected.trim() != resolved.person.identification_number.trim()
    {
        return Err(TransferError::PayeeMismatch("identification number"));
    }
    if let Some(expected) = request.payee.account_number.as_deref()
        && expected.trim() != resolved.payment_method.number.trim()
    {
        return Err(TransferError::PayeeMismatch("account number"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransferTimingConfig;
    use crate::providers::mock::{MockKeyResolver, MockPaymentProvider};
    use crate::providers::{KeyResolution, PaymentCreation, ProviderError, ProviderErrorDetail};
    use crate::transfer::types::{ConfirmationSource, TransferResponseCode};
    use std::collections::HashMap;
    use std::time::Duration;

    struct Harness {
        orchestrator: Arc<TransferOrchestrator>,
        resolver: Arc<MockKeyResolver>,
        payments: Arc<MockPaymentProvider>,
    }

    fn harness() -> Harness {
        let resolver = Arc::new(MockKeyResolver::new());
        let payments = Arc::new(MockPaymentProvider::new());
        let coordinator =
            PendingTransferCoordinator::new(TransferTimingConfig::default(), payments.clone());
        Harness {
            orchestrator: Arc::new(TransferOrchestrator::new(
                resolver.clone(),
                payments.clone(),
                coordinator,
            )),
            resolver,
            payments,
        }
    }

    fn request(key: &str) -> TransferRequest {
        serde_json::from_value(serde_json::json!({
            "transaction_id": "TX-1",
            "amount": "150000.00",
            "payer": {
                "account_number": "0123456789",
                "account_type": "CAHO",
                "identification_type": "CC",
                "identification_number": "79000000",
                "name": "Luis Gomez"
            },
            "payee": { "key": key }
        }))
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_webhook_completes_transfer() {
        let h = harness();
        let orchestrator = h.orchestrator.clone();
        let task = tokio::spawn(async move { orchestrator.process_transfer(request("3001234567")).await });

        tokio::time::sleep(Duration::from_secs(3)).await;
        let coordinator = h.orchestrator.coordinator();
        assert!(coordinator.is_pending("E2E-MOCK-000001"));
        assert!(coordinator.resolve_confirmation(
            "E2E-MOCK-000001",
            TransferResponse::approved(""),
            ConfirmationSource::Webhook
        ));

        let response = task.await.unwrap();
        assert_eq!(response.response_code, TransferResponseCode::Approved);
        assert_eq!(response.transaction_id, "TX-1");
        assert_eq!(response.end_to_end_id.as_deref(), Some("E2E-MOCK-000001"));
        assert_eq!(response.execution_id.as_deref(), Some("EXEC-MOCK-000001"));
        assert_eq!(h.resolver.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_completes_transfer() {
        let h = harness();
        h.payments.set_default_status(Some("SETTLED"));
        let started = Instant::now();

        let response = h.orchestrator.process_transfer(request("@ana123")).await;

        assert_eq!(response.response_code, TransferResponseCode::Approved);
        assert_eq!(started.elapsed(), Duration::from_secs(30));
        assert_eq!(h.payments.query_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_reports_pending() {
        let h = harness();
        let started = Instant::now();

        let response = h.orchestrator.process_transfer(request("3001234567")).await;

        assert_eq!(response.response_code, TransferResponseCode::Pending);
        assert_eq!(response.response_code.http_status(), 202);
        assert_eq!(response.end_to_end_id.as_deref(), Some("E2E-MOCK-000001"));
        assert_eq!(response.execution_id.as_deref(), Some("EXEC-MOCK-000001"));
        assert!(started.elapsed() >= Duration::from_secs(50));
        assert_eq!(h.orchestrator.coordinator().pending_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_key_format_skips_providers() {
        let h = harness();
        let response = h.orchestrator.process_transfer(request("@A")).await;

        assert_eq!(response.response_code, TransferResponseCode::ValidationFailed);
        assert_eq!(h.resolver.calls(), 0);
        assert_eq!(h.payments.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_non_positive_amount_rejected() {
        let h = harness();
        let mut req = request("3001234567");
        req.amount = Decimal::ZERO;

        let response = h.orchestrator.process_transfer(req).await;
        assert_eq!(response.response_code, TransferResponseCode::ValidationFailed);
        assert_eq!(h.resolver.calls(), 0);
    }

    #[tokio::test]
    async fn test_unknown_key_is_business_rejection() {
        let h = harness();
        h.resolver
            .script("@ghost", KeyResolution::error("DIFE-0004", "Key not found"));

        let response = h.orchestrator.process_transfer(request("@ghost")).await;

        assert_eq!(response.response_code, TransferResponseCode::RejectedByProvider);
        assert_eq!(response.message, "The key does not exist");
        assert_eq!(response.network_code.as_deref(), Some("DIFE-0004"));
        assert_eq!(h.payments.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_resolver_transport_failure() {
        let h = harness();
        h.resolver.set_fail_transport(true);

        let response = h.orchestrator.process_transfer(request("3001234567")).await;
        assert_eq!(response.response_code, TransferResponseCode::ProviderError);
        assert_eq!(response.network_code.as_deref(), Some("DIFE-5000"));
    }

    #[tokio::test]
    async fn test_payee_mismatch() {
        let h = harness();
        let mut req = request("3001234567");
        req.payee.account_number = Some("9999999999".into());

        let response = h.orchestrator.process_transfer(req).await;
        assert_eq!(response.response_code, TransferResponseCode::ValidationFailed);
        assert_eq!(h.payments.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_matching_payee_expectations_pass() {
        let h = harness();
        let mut req = request("3001234567");
        req.payee.identification_number = Some("1020304050".into());
        req.payee.account_number = Some("0011223344".into());
        h.payments.set_creation(Err(ProviderError::timeout("MOL", Duration::from_secs(15))));

        let response = h.orchestrator.process_transfer(req).await;
        // Got past the payee checks to payment creation
        assert_eq!(h.payments.create_calls(), 1);
        assert_eq!(response.response_code, TransferResponseCode::ProviderError);
        assert_eq!(response.message, "The payment service did not respond in time");
    }

    #[tokio::test]
    async fn test_payment_rejected() {
        let h = harness();
        h.payments.set_creation(Ok(PaymentCreation {
            response_code: "REJECTED".into(),
            external_transaction_id: None,
            additional_data: HashMap::new(),
            errors: vec![ProviderErrorDetail::new("MOL-4220", "Insufficient funds")],
        }));

        let response = h.orchestrator.process_transfer(request("3001234567")).await;
        assert_eq!(response.response_code, TransferResponseCode::RejectedByProvider);
        assert_eq!(response.message, "Insufficient funds");
        assert_eq!(h.orchestrator.coordinator().pending_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_end_to_end_id_is_fatal() {
        let h = harness();
        h.payments.set_creation(Ok(PaymentCreation {
            response_code: "SUCCESS".into(),
            external_transaction_id: Some("MOL-1".into()),
            additional_data: HashMap::new(),
            errors: Vec::new(),
        }));

        let response = h.orchestrator.process_transfer(request("3001234567")).await;
        assert_eq!(response.response_code, TransferResponseCode::InternalError);
        assert_eq!(h.orchestrator.coordinator().pending_count(), 0);
    }

    #[tokio::test]
    async fn test_resolve_key_passes_classified_type() {
        let h = harness();
        let resolved = h.orchestrator.resolve_key(" user@bank.co ").await.unwrap();
        assert_eq!(resolved.key.key_type, KeyType::Email);
        assert_eq!(resolved.key.value, "user@bank.co");
        assert_eq!(TransferOrchestrator::key_type_of("0012345678"), KeyType::CommerceCode);
    }
}
