//! Settlement status definitions
//!
//! One enumeration drives both "is this terminal?" (polling gate, webhook
//! classification) and "what outcome does it map to?". PROCESSING / PENDING
//! are never terminal, so they can never be reported as approved.

use std::fmt;
use tracing::warn;

use super::types::{TransferResponse, TransferResponseCode};
use crate::errors::{ErrorSource, ProviderErrorInfo, map_provider_error};
use crate::providers::{PaymentStatusResponse, ProviderErrorDetail};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementStatus {
    Completed,
    Success,
    Settled,
    Approved,
    Processing,
    Pending,
    Failed,
    Error,
    Rejected,
    Unknown(String),
}

impl SettlementStatus {
    /// Case-insensitive parse; unrecognized values are kept verbatim
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "COMPLETED" => Self::Completed,
            "SUCCESS" => Self::Success,
            "SETTLED" => Self::Settled,
            "APPROVED" => Self::Approved,
            "PROCESSING" => Self::Processing,
            "PENDING" => Self::Pending,
            "FAILED" => Self::Failed,
            "ERROR" => Self::Error,
            "REJECTED" => Self::Rejected,
            _ => Self::Unknown(raw.to_string()),
        }
    }

    #[inline]
    pub fn is_approved(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Success | Self::Settled | Self::Approved
        )
    }

    #[inline]
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Failed | Self::Error | Self::Rejected)
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.is_approved() || self.is_rejected()
    }

    /// Response category for this status.
    ///
    /// Non-terminal statuses map to a rejection with a warning; callers are
    /// expected to check [`is_terminal`](Self::is_terminal) first.
    pub fn response_code(&self) -> TransferResponseCode {
        if self.is_approved() {
            TransferResponseCode::Approved
        } else if self.is_rejected() {
            TransferResponseCode::RejectedByProvider
        } else {
            warn!(status = %self, "Mapping non-terminal settlement status to rejection");
            TransferResponseCode::RejectedByProvider
        }
    }
}

impl fmt::Display for SettlementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Completed => "COMPLETED",
            Self::Success => "SUCCESS",
            Self::Settled => "SETTLED",
            Self::Approved => "APPROVED",
            Self::Processing => "PROCESSING",
            Self::Pending => "PENDING",
            Self::Failed => "FAILED",
            Self::Error => "ERROR",
            Self::Rejected => "REJECTED",
            Self::Unknown(raw) => raw.as_str(),
        };
        f.write_str(name)
    }
}

/// Build the caller-facing outcome for a terminal status.
///
/// Rejections carry the first provider error, mapped to a user message.
pub fn settlement_outcome(
    transaction_id: &str,
    end_to_end_id: &str,
    execution_id: Option<String>,
    status: &SettlementStatus,
    errors: &[ProviderErrorDetail],
) -> TransferResponse {
    let code = status.response_code();
    let response = match code {
        TransferResponseCode::Approved => TransferResponse::approved(transaction_id),
        _ => match errors.first() {
            Some(detail) => {
                let mapped = map_provider_error(&ProviderErrorInfo::new(
                    detail.code.clone(),
                    detail.description.clone(),
                    ErrorSource::Mol,
                ));
                TransferResponse::new(transaction_id, code, mapped.message)
                    .with_network_error(detail.code.clone(), detail.description.clone())
            }
            None => TransferResponse::new(transaction_id, code, "Transfer rejected by the network"),
        },
    };
    response
        .with_end_to_end_id(end_to_end_id)
        .with_execution_id(execution_id)
}

/// Final outcome from a status query, or `None` while not yet terminal.
///
/// Needs at least one result item whose status is terminal.
pub fn outcome_from_status(
    transaction_id: &str,
    end_to_end_id: &str,
    response: &PaymentStatusResponse,
) -> Option<TransferResponse> {
    let item = response.items.first()?;
    let status = SettlementStatus::parse(&item.status);
    if !status.is_terminal() {
        return None;
    }
    let errors = if item.errors.is_empty() {
        &response.errors
    } else {
        &item.errors
    };
    Some(settlement_outcome(
        transaction_id,
        end_to_end_id,
        item.execution_id.clone(),
        &status,
        errors,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(SettlementStatus::parse("settled"), SettlementStatus::Settled);
        assert_eq!(
            SettlementStatus::parse("Weird"),
            SettlementStatus::Unknown("Weird".into())
        );
    }

    #[test]
    fn test_terminal_set() {
        for s in ["COMPLETED", "SUCCESS", "SETTLED", "APPROVED"] {
            let status = SettlementStatus::parse(s);
            assert!(status.is_terminal() && status.is_approved(), "{s}");
        }
        for s in ["FAILED", "ERROR", "REJECTED"] {
            let status = SettlementStatus::parse(s);
            assert!(status.is_terminal() && status.is_rejected(), "{s}");
        }
        for s in ["PROCESSING", "PENDING", "SOMETHING"] {
            assert!(!SettlementStatus::parse(s).is_terminal(), "{s}");
        }
    }

    #[test]
    fn test_processing_never_maps_to_approved() {
        assert_eq!(
            SettlementStatus::Processing.response_code(),
            TransferResponseCode::RejectedByProvider
        );
    }

    #[test]
    fn test_outcome_from_status() {
        let empty = PaymentStatusResponse::default();
        assert!(outcome_from_status("TX", "E2E", &empty).is_none());

        let processing = PaymentStatusResponse::with_status("E2E", "PROCESSING");
        assert!(outcome_from_status("TX", "E2E", &processing).is_none());

        let done = PaymentStatusResponse::with_status("E2E", "completed");
        let outcome = outcome_from_status("TX", "E2E", &done).unwrap();
        assert_eq!(outcome.response_code, TransferResponseCode::Approved);
        assert_eq!(outcome.end_to_end_id.as_deref(), Some("E2E"));
    }

    #[test]
    fn test_rejection_carries_mapped_error() {
        let mut rejected = PaymentStatusResponse::with_status("E2E", "REJECTED");
        rejected.items[0]
            .errors
            .push(ProviderErrorDetail::new("AM04", "Insufficient funds"));

        let outcome = outcome_from_status("TX", "E2E", &rejected).unwrap();
        assert_eq!(outcome.response_code, TransferResponseCode::RejectedByProvider);
        assert_eq!(outcome.message, "Insufficient funds");
        assert_eq!(outcome.network_code.as_deref(), Some("AM04"));
    }
}
