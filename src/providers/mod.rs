//! Downstream Providers
//!
//! Capability interfaces for the two external services Charon talks to:
//! - **DIFE**: key directory, resolves a payment alias to payee data
//! - **MOL**: payment execution, creates payments and reports their status
//!
//! HTTP implementations live in [`dife`] and [`mol`]; in-memory doubles in
//! [`mock`].

pub mod auth;
pub mod dife;
pub mod error;
pub mod http;
#[cfg(any(test, feature = "mock-providers"))]
pub mod mock;
pub mod mol;
pub mod types;

pub use dife::DifeClient;
pub use error::ProviderError;
pub use mol::MolClient;
pub use types::{
    KeyResolution, PaymentCreation, PaymentStatusItem, PaymentStatusQuery, PaymentStatusResponse,
    ProviderErrorDetail, ResolutionStatus, ResolvedKey,
};

use async_trait::async_trait;
use std::time::Duration;

use crate::keys::KeyType;
use crate::transfer::types::TransferRequest;

/// Key directory capability
#[async_trait]
pub trait KeyResolutionProvider: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &'static str;

    /// Resolve `key` into participant / person / payment-method data.
    ///
    /// Business errors (unknown key, suspended key) come back as
    /// `Ok(KeyResolution { status: Error, .. })`; `Err` means transport failure.
    async fn resolve_key(
        &self,
        correlation_id: &str,
        key: &str,
        key_type: Option<KeyType>,
    ) -> Result<KeyResolution, ProviderError>;
}

/// Payment execution capability
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &'static str;

    /// Submit a payment. On success `additional_data["END_TO_END"]` carries
    /// the network-assigned id.
    async fn create_payment(
        &self,
        request: &TransferRequest,
        resolved_key: &ResolvedKey,
    ) -> Result<PaymentCreation, ProviderError>;

    /// Query settlement status. Must give up after `timeout`.
    async fn query_payment_status(
        &self,
        query: &PaymentStatusQuery,
        timeout: Duration,
    ) -> Result<PaymentStatusResponse, ProviderError>;
}
