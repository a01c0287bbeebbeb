//! In-memory providers for tests and `providers.mode: mock`

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::error::ProviderError;
use super::types::{
    KeyInfo, KeyResolution, Participant, PaymentCreation, PaymentMethod, PaymentStatusQuery,
    PaymentStatusResponse, Person, ResolvedKey,
};
use super::{KeyResolutionProvider, PaymentProvider};
use crate::keys::KeyType;
use crate::transfer::types::TransferRequest;

/// Deterministic payee data for `key`
pub fn sample_resolved_key(key: &str, key_type: KeyType) -> ResolvedKey {
    ResolvedKey {
        key: KeyInfo {
            key_type,
            value: key.to_string(),
        },
        participant: Participant {
            nit: "900123456".to_string(),
            spbvi: "CRB_MOCK".to_string(),
        },
        payment_method: PaymentMethod {
            account_type: "CAHO".to_string(),
            number: "0011223344".to_string(),
        },
        person: Person {
            person_type: "N".to_string(),
            identification_type: "CC".to_string(),
            identification_number: "1020304050".to_string(),
            first_name: Some("Ana".to_string()),
            second_name: None,
            last_name: Some("Perez".to_string()),
            second_last_name: None,
            legal_company_name: None,
        },
    }
}

// ============================================================================
// Key resolution
// ============================================================================

/// Resolves every key to [`sample_resolved_key`] unless scripted otherwise
pub struct MockKeyResolver {
    scripted: Mutex<HashMap<String, KeyResolution>>,
    fail_transport: Mutex<bool>,
    calls: AtomicUsize,
}

impl Default for MockKeyResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl MockKeyResolver {
    pub fn new() -> Self {
        Self {
            scripted: Mutex::new(HashMap::new()),
            fail_transport: Mutex::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn script(&self, key: &str, resolution: KeyResolution) {
        self.scripted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), resolution);
    }

    pub fn set_fail_transport(&self, fail: bool) {
        *self.fail_transport.lock().unwrap_or_else(PoisonError::into_inner) = fail;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyResolutionProvider for MockKeyResolver {
    fn name(&self) -> &'static str {
        "DIFE"
    }

    async fn resolve_key(
        &self,
        correlation_id: &str,
        key: &str,
        key_type: Option<KeyType>,
    ) -> Result<KeyResolution, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if *self.fail_transport.lock().unwrap_or_else(PoisonError::into_inner) {
            return Err(ProviderError::Transport {
                provider: "DIFE",
                message: "Mock connection refused".to_string(),
            });
        }

        let scripted = self.scripted.lock().unwrap_or_else(PoisonError::into_inner).get(key).cloned();
        let mut resolution = scripted.unwrap_or_else(|| {
            KeyResolution::success(sample_resolved_key(
                key,
                key_type.unwrap_or(KeyType::Alphanumeric),
            ))
        });
        resolution
            .execution_id
            .get_or_insert_with(|| format!("EXEC-{}", correlation_id));
        Ok(resolution)
    }
}

// ============================================================================
// Payment execution
// ============================================================================

/// Creates payments with fresh end-to-end ids and answers status queries
/// from a script, then from `default_status` (or "not yet known").
pub struct MockPaymentProvider {
    creation: Mutex<Option<Result<PaymentCreation, ProviderError>>>,
    statuses: Mutex<VecDeque<Result<PaymentStatusResponse, ProviderError>>>,
    default_status: Mutex<Option<String>>,
    query_delay: Mutex<Duration>,
    create_calls: AtomicUsize,
    query_calls: AtomicUsize,
    sequence: AtomicUsize,
}

impl Default for MockPaymentProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPaymentProvider {
    pub fn new() -> Self {
        Self {
            creation: Mutex::new(None),
            statuses: Mutex::new(VecDeque::new()),
            default_status: Mutex::new(None),
            query_delay: Mutex::new(Duration::ZERO),
            create_calls: AtomicUsize::new(0),
            query_calls: AtomicUsize::new(0),
            sequence: AtomicUsize::new(1),
        }
    }

    /// Replace the generated payment-creation result
    pub fn set_creation(&self, result: Result<PaymentCreation, ProviderError>) {
        *self.creation.lock().unwrap_or_else(PoisonError::into_inner) = Some(result);
    }

    /// Queue one status-query result (consumed in order)
    pub fn push_status(&self, result: Result<PaymentStatusResponse, ProviderError>) {
        self.statuses.lock().unwrap_or_else(PoisonError::into_inner).push_back(result);
    }

    /// Status reported once the script is exhausted
    pub fn set_default_status(&self, status: Option<&str>) {
        *self.default_status.lock().unwrap_or_else(PoisonError::into_inner) = status.map(str::to_string);
    }

    pub fn set_query_delay(&self, delay: Duration) {
        *self.query_delay.lock().unwrap_or_else(PoisonError::into_inner) = delay;
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn query_calls(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }

    fn generated_creation(&self, request: &TransferRequest) -> PaymentCreation {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        let mut additional_data = HashMap::new();
        additional_data.insert(
            PaymentCreation::END_TO_END_KEY.to_string(),
            format!("E2E-MOCK-{:06}", seq),
        );
        additional_data.insert(
            PaymentCreation::EXECUTION_ID_KEY.to_string(),
            format!("EXEC-MOCK-{:06}", seq),
        );
        PaymentCreation {
            response_code: "SUCCESS".to_string(),
            external_transaction_id: Some(format!("MOL-{}", request.transaction_id)),
            additional_data,
            errors: Vec::new(),
        }
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    fn name(&self) -> &'static str {
        "MOL"
    }

    async fn create_payment(
        &self,
        request: &TransferRequest,
        _resolved_key: &ResolvedKey,
    ) -> Result<PaymentCreation, ProviderError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.creation.lock().unwrap_or_else(PoisonError::into_inner).clone();
        match scripted {
            Some(result) => result,
            None => Ok(self.generated_creation(request)),
        }
    }

    async fn query_payment_status(
        &self,
        query: &PaymentStatusQuery,
        timeout: Duration,
    ) -> Result<PaymentStatusResponse, ProviderError> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.query_delay.lock().unwrap_or_else(PoisonError::into_inner);
        if delay >= timeout {
            tokio::time::sleep(timeout).await;
            return Err(ProviderError::timeout("MOL", timeout));
        }
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(result) = self.statuses.lock().unwrap_or_else(PoisonError::into_inner).pop_front() {
            return result;
        }
        let default_status = self.default_status.lock().unwrap_or_else(PoisonError::into_inner).clone();
        Ok(match default_status {
            Some(status) => PaymentStatusResponse::with_status(&query.end_to_end_id, &status),
            None => PaymentStatusResponse::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::types::ResolutionStatus;

    #[tokio::test]
    async fn test_mock_resolver_default_and_scripted() {
        let resolver = MockKeyResolver::new();
        let ok = resolver
            .resolve_key("c-1", "3001234567", Some(KeyType::Mobile))
            .await
            .unwrap();
        assert_eq!(ok.status, ResolutionStatus::Success);
        assert_eq!(ok.execution_id.as_deref(), Some("EXEC-c-1"));

        resolver.script("@ghost", KeyResolution::error("DIFE-0004", "Key not found"));
        let err = resolver.resolve_key("c-2", "@ghost", None).await.unwrap();
        assert_eq!(err.status, ResolutionStatus::Error);
        assert_eq!(resolver.calls(), 2);

        resolver.set_fail_transport(true);
        assert!(resolver.resolve_key("c-3", "x", None).await.is_err());
    }

    #[tokio::test]
    async fn test_mock_payment_generates_unique_ids() {
        let provider = MockPaymentProvider::new();
        let request: TransferRequest = serde_json::from_value(serde_json::json!({
            "transaction_id": "TX-1",
            "amount": "10",
            "payer": {
                "account_number": "1", "account_type": "CAHO",
                "identification_type": "CC", "identification_number": "1", "name": "x"
            },
            "payee": { "key": "3001234567" }
        }))
        .unwrap();
        let key = sample_resolved_key("3001234567", KeyType::Mobile);

        let a = provider.create_payment(&request, &key).await.unwrap();
        let b = provider.create_payment(&request, &key).await.unwrap();
        assert_ne!(a.end_to_end_id(), b.end_to_end_id());
        assert_eq!(provider.create_calls(), 2);
    }

    #[tokio::test]
    async fn test_mock_status_script_then_default() {
        let provider = MockPaymentProvider::new();
        let query = PaymentStatusQuery::by_end_to_end_id("E2E-1");
        let timeout = Duration::from_secs(1);

        provider.push_status(Ok(PaymentStatusResponse::with_status("E2E-1", "PROCESSING")));
        let first = provider.query_payment_status(&query, timeout).await.unwrap();
        assert_eq!(first.items[0].status, "PROCESSING");

        let second = provider.query_payment_status(&query, timeout).await.unwrap();
        assert!(second.items.is_empty());

        provider.set_default_status(Some("COMPLETED"));
        let third = provider.query_payment_status(&query, timeout).await.unwrap();
        assert_eq!(third.items[0].status, "COMPLETED");
        assert_eq!(provider.query_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_status_times_out() {
        let provider = MockPaymentProvider::new();
        provider.set_query_delay(Duration::from_secs(20));
        let result = provider
            .query_payment_status(
                &PaymentStatusQuery::by_end_to_end_id("E2E-1"),
                Duration::from_secs(10),
            )
            .await;
        assert!(result.unwrap_err().is_timeout());
    }

    #[tokio::test]
    async fn test_poisoned_lock_does_not_break_provider() {
        let provider = std::sync::Arc::new(MockPaymentProvider::new());
        let p = provider.clone();
        let _ = std::thread::spawn(move || {
            let _guard = p.default_status.lock().unwrap();
            panic!("poison default_status");
        })
        .join();
        assert!(provider.default_status.is_poisoned());

        provider.set_default_status(Some("COMPLETED"));
        let status = provider
            .query_payment_status(
                &PaymentStatusQuery::by_end_to_end_id("E2E-P"),
                Duration::from_secs(1),
            )
            .await
            .unwrap();
        assert_eq!(status.items[0].status, "COMPLETED");
    }
}
