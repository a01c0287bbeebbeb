//! Transfer Error Types

use thiserror::Error;

use super::types::{TransferResponse, TransferResponseCode};
use crate::errors::{ErrorSource, MappedError, ProviderErrorInfo, map_provider_error};
use crate::keys::KeyFormatError;
use crate::providers::ProviderError;

/// Why a pending-transfer wait ended without a settlement outcome
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationError {
    #[error("End-to-end id cannot be empty")]
    InvalidEndToEndId,

    #[error("Duplicate request detected for end-to-end id {0}")]
    Duplicate(String),

    #[error("Final response from the provider was never received for end-to-end id {0}")]
    Timeout(String),

    #[error("Service shutting down")]
    ShuttingDown,

    /// Entry evicted by the stale sweep (its timers were lost)
    #[error("Pending transfer {0} was abandoned")]
    Abandoned(String),
}

impl ConfirmationError {
    /// The payment may still settle after this error
    #[inline]
    pub fn is_timeout_like(&self) -> bool {
        matches!(
            self,
            ConfirmationError::Timeout(_) | ConfirmationError::Abandoned(_)
        )
    }
}

/// Failure at one of the orchestrator stages
#[derive(Error, Debug, Clone)]
pub enum TransferError {
    // === Validation Errors ===
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    InvalidKeyFormat(#[from] KeyFormatError),

    #[error("Payee {0} does not match the resolved key")]
    PayeeMismatch(&'static str),

    // === Provider business errors ===
    #[error("Key could not be resolved: {code} {description}")]
    KeyNotResolved { code: String, description: String },

    #[error("Payment rejected: {code} {description}")]
    PaymentRejected { code: String, description: String },

    #[error("Payment accepted without an end-to-end id")]
    MissingEndToEndId,

    // === System Errors ===
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Confirmation(#[from] ConfirmationError),
}

impl TransferError {
    /// Get the error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            TransferError::InvalidRequest(_) => "INVALID_REQUEST",
            TransferError::InvalidKeyFormat(_) => "INVALID_KEY_FORMAT",
            TransferError::PayeeMismatch(_) => "PAYEE_MISMATCH",
            TransferError::KeyNotResolved { .. } => "KEY_NOT_RESOLVED",
            TransferError::PaymentRejected { .. } => "PAYMENT_REJECTED",
            TransferError::MissingEndToEndId => "MISSING_END_TO_END_ID",
            TransferError::Provider(e) if e.is_timeout() => "PROVIDER_TIMEOUT",
            TransferError::Provider(_) => "PROVIDER_ERROR",
            TransferError::Confirmation(ConfirmationError::Duplicate(_)) => "DUPLICATE_REQUEST",
            TransferError::Confirmation(ConfirmationError::ShuttingDown) => "SHUTTING_DOWN",
            TransferError::Confirmation(_) => "CONFIRMATION_ERROR",
        }
    }

    /// User message and response category
    pub fn mapped(&self) -> MappedError {
        let local = |message: String, response_code| MappedError {
            message,
            response_code,
        };
        match self {
            TransferError::InvalidRequest(_)
            | TransferError::InvalidKeyFormat(_)
            | TransferError::PayeeMismatch(_) => {
                local(self.to_string(), TransferResponseCode::ValidationFailed)
            }
            TransferError::KeyNotResolved { code, description } => map_provider_error(
                &ProviderErrorInfo::new(code.clone(), description.clone(), ErrorSource::Dife),
            ),
            TransferError::PaymentRejected { code, description } => map_provider_error(
                &ProviderErrorInfo::new(code.clone(), description.clone(), ErrorSource::Mol),
            ),
            TransferError::Provider(e) => map_provider_error(&ProviderErrorInfo::new(
                e.code(),
                e.to_string(),
                provider_source(e.provider()),
            )),
            TransferError::MissingEndToEndId => local(
                "The payment could not be tracked".to_string(),
                TransferResponseCode::InternalError,
            ),
            TransferError::Confirmation(e) if e.is_timeout_like() => local(
                TransferResponse::pending("").message,
                TransferResponseCode::Pending,
            ),
            TransferError::Confirmation(e) => {
                local(e.to_string(), TransferResponseCode::InternalError)
            }
        }
    }

    /// Get HTTP status code for this error
    pub fn http_status(&self) -> u16 {
        self.mapped().response_code.http_status()
    }

    /// Normalized outcome for `transaction_id`; raw provider codes are kept
    /// as network diagnostics.
    pub fn to_response(&self, transaction_id: &str) -> TransferResponse {
        let mapped = self.mapped();
        let response = TransferResponse::new(transaction_id, mapped.response_code, mapped.message);
        match self {
            TransferError::KeyNotResolved { code, description }
            | TransferError::PaymentRejected { code, description } => {
                response.with_network_error(code.clone(), description.clone())
            }
            TransferError::Provider(e) => response.with_network_error(e.code(), e.to_string()),
            _ => response,
        }
    }
}

fn provider_source(provider: &str) -> ErrorSource {
    match provider {
        "DIFE" => ErrorSource::Dife,
        "MOL" => ErrorSource::Mol,
        _ => ErrorSource::Charon,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{KeyType, validate_key_format};
    use std::time::Duration;

    #[test]
    fn test_error_codes() {
        let key_err = validate_key_format("123", KeyType::Mobile).unwrap_err();
        assert_eq!(TransferError::from(key_err).code(), "INVALID_KEY_FORMAT");
        assert_eq!(
            TransferError::from(ProviderError::timeout("MOL", Duration::from_secs(1))).code(),
            "PROVIDER_TIMEOUT"
        );
        assert_eq!(
            TransferError::from(ConfirmationError::Duplicate("E2E".into())).code(),
            "DUPLICATE_REQUEST"
        );
    }

    #[test]
    fn test_http_status() {
        let key_err = validate_key_format("123", KeyType::Mobile).unwrap_err();
        assert_eq!(TransferError::from(key_err).http_status(), 400);
        assert_eq!(
            TransferError::from(ProviderError::timeout("MOL", Duration::from_secs(1))).http_status(),
            502
        );
        assert_eq!(TransferError::MissingEndToEndId.http_status(), 500);
        assert_eq!(
            TransferError::from(ConfirmationError::Timeout("E2E".into())).http_status(),
            202
        );
    }

    #[test]
    fn test_to_response_keeps_provider_code() {
        let err = TransferError::KeyNotResolved {
            code: "DIFE-0004".into(),
            description: "Key not found".into(),
        };
        let response = err.to_response("TX-1");
        assert_eq!(response.response_code, TransferResponseCode::RejectedByProvider);
        assert_eq!(response.message, "The key does not exist");
        assert_eq!(response.network_code.as_deref(), Some("DIFE-0004"));
        assert_eq!(response.network_message.as_deref(), Some("Key not found"));
    }

    #[test]
    fn test_display() {
        let err = ConfirmationError::Timeout("E2E-9".into());
        assert_eq!(
            err.to_string(),
            "Final response from the provider was never received for end-to-end id E2E-9"
        );
        assert!(err.is_timeout_like());
        assert!(!ConfirmationError::ShuttingDown.is_timeout_like());
    }
}
