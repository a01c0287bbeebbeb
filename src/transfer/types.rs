//! Transfer request / outcome types shared by the orchestrator, the
//! coordinator and the webhook handler.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Custom deserializer for non-empty strings
fn deserialize_non_empty_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    if s.trim().is_empty() {
        return Err(serde::de::Error::custom("string cannot be empty"));
    }
    Ok(s)
}

fn default_currency() -> String {
    "COP".to_string()
}

// ============================================================================
// Request
// ============================================================================

/// Inbound transfer request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransferRequest {
    /// Caller-supplied identifier, stable for the life of the transfer
    #[serde(deserialize_with = "deserialize_non_empty_string")]
    #[schema(example = "TX-20240101-0001")]
    pub transaction_id: String,
    #[schema(value_type = String, example = "150000.00")]
    pub amount: Decimal,
    #[serde(default = "default_currency")]
    #[schema(example = "COP")]
    pub currency: String,
    #[serde(default)]
    pub description: Option<String>,
    pub payer: PayerAccount,
    pub payee: PayeeKey,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PayerAccount {
    #[schema(example = "0123456789")]
    pub account_number: String,
    /// Account type code (e.g. `CAHO` savings, `CCTE` checking)
    #[schema(example = "CAHO")]
    pub account_type: String,
    #[schema(example = "CC")]
    pub identification_type: String,
    #[schema(example = "1020304050")]
    pub identification_number: String,
    pub name: String,
}

/// Payee alias plus optional expectations checked against the resolved data
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PayeeKey {
    #[serde(deserialize_with = "deserialize_non_empty_string")]
    #[schema(example = "3001234567")]
    pub key: String,
    #[serde(default)]
    pub identification_number: Option<String>,
    #[serde(default)]
    pub account_number: Option<String>,
}

// ============================================================================
// Outcome
// ============================================================================

/// Normalized response category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferResponseCode {
    Approved,
    /// No final signal within the adapter's budget; settlement may still happen
    Pending,
    RejectedByProvider,
    ValidationFailed,
    ProviderError,
    InternalError,
}

impl TransferResponseCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Approved => "APPROVED",
            Self::Pending => "PENDING",
            Self::RejectedByProvider => "REJECTED_BY_PROVIDER",
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::ProviderError => "PROVIDER_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// HTTP status suggestion
    pub fn http_status(self) -> u16 {
        match self {
            Self::Approved => 200,
            Self::Pending => 202,
            Self::RejectedByProvider => 422,
            Self::ValidationFailed => 400,
            Self::ProviderError => 502,
            Self::InternalError => 500,
        }
    }

    #[inline]
    pub fn is_final(self) -> bool {
        matches!(self, Self::Approved | Self::RejectedByProvider)
    }
}

impl fmt::Display for TransferResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final (or timeout-derived pending) transfer outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TransferResponse {
    pub transaction_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_to_end_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<String>,
    pub response_code: TransferResponseCode,
    pub message: String,
    /// Raw provider error code, for diagnostics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_message: Option<String>,
}

impl TransferResponse {
    pub fn new(
        transaction_id: impl Into<String>,
        response_code: TransferResponseCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            end_to_end_id: None,
            execution_id: None,
            response_code,
            message: message.into(),
            network_code: None,
            network_message: None,
        }
    }

    pub fn approved(transaction_id: impl Into<String>) -> Self {
        Self::new(
            transaction_id,
            TransferResponseCode::Approved,
            "Transfer approved",
        )
    }

    pub fn pending(transaction_id: impl Into<String>) -> Self {
        Self::new(
            transaction_id,
            TransferResponseCode::Pending,
            "Transfer submitted; final response from the provider was never received",
        )
    }

    pub fn with_end_to_end_id(mut self, end_to_end_id: impl Into<String>) -> Self {
        self.end_to_end_id = Some(end_to_end_id.into());
        self
    }

    pub fn with_execution_id(mut self, execution_id: Option<String>) -> Self {
        self.execution_id = execution_id;
        self
    }

    pub fn with_execution_id_if_missing(mut self, execution_id: Option<String>) -> Self {
        if self.execution_id.is_none() {
            self.execution_id = execution_id;
        }
        self
    }

    pub fn with_network_error(mut self, code: impl Into<String>, message: impl Into<String>) -> Self {
        self.network_code = Some(code.into());
        self.network_message = Some(message.into());
        self
    }
}

/// Channel that delivered the settlement outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmationSource {
    Webhook,
    Polling,
}

impl fmt::Display for ConfirmationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfirmationSource::Webhook => f.write_str("webhook"),
            ConfirmationSource::Polling => f.write_str("polling"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_transfer_request() {
        let json = r#"{
            "transaction_id": "TX-1",
            "amount": "150000.50",
            "payer": {
                "account_number": "0123456789",
                "account_type": "CAHO",
                "identification_type": "CC",
                "identification_number": "1020304050",
                "name": "Ana Perez"
            },
            "payee": { "key": "3001234567" }
        }"#;
        let req: TransferRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.currency, "COP");
        assert_eq!(req.amount.to_string(), "150000.50");
        assert!(req.payee.identification_number.is_none());
    }

    #[test]
    fn test_empty_transaction_id_fails() {
        let json = r#"{
            "transaction_id": "  ",
            "amount": 10,
            "payer": {
                "account_number": "1", "account_type": "CAHO",
                "identification_type": "CC", "identification_number": "1", "name": "x"
            },
            "payee": { "key": "3001234567" }
        }"#;
        let result: Result<TransferRequest, _> = serde_json::from_str(json);
        assert!(result.unwrap_err().to_string().contains("cannot be empty"));
    }

    #[test]
    fn test_response_code_wire_format() {
        assert_eq!(
            serde_json::to_string(&TransferResponseCode::RejectedByProvider).unwrap(),
            "\"REJECTED_BY_PROVIDER\""
        );
        assert_eq!(TransferResponseCode::Pending.http_status(), 202);
        assert!(!TransferResponseCode::Pending.is_final());
    }

    #[test]
    fn test_response_skips_empty_fields() {
        let resp = TransferResponse::approved("TX-1").with_end_to_end_id("E2E-1");
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["response_code"], "APPROVED");
        assert_eq!(json["end_to_end_id"], "E2E-1");
        assert!(json.get("network_code").is_none());
    }
}
