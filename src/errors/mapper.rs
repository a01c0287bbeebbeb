use serde::{Deserialize, Serialize};
use std::fmt;

use crate::transfer::types::TransferResponseCode;

/// Which downstream produced the error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSource {
    Dife,
    Mol,
    Charon,
}

impl fmt::Display for ErrorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorSource::Dife => f.write_str("DIFE"),
            ErrorSource::Mol => f.write_str("MOL"),
            ErrorSource::Charon => f.write_str("CHARON"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderErrorInfo {
    pub code: String,
    pub description: String,
    pub source: ErrorSource,
}

impl ProviderErrorInfo {
    pub fn new(code: impl Into<String>, description: impl Into<String>, source: ErrorSource) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
            source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedError {
    pub message: String,
    pub response_code: TransferResponseCode,
}

impl MappedError {
    fn new(message: &str, response_code: TransferResponseCode) -> Self {
        Self {
            message: message.to_string(),
            response_code,
        }
    }
}

// ============================================================================
// Lookup tables
// ============================================================================

fn dife_entry(code: &str) -> Option<(&'static str, TransferResponseCode)> {
    use TransferResponseCode::*;
    let entry = match code {
        "DIFE-0001" => ("The key format is not valid", ValidationFailed),
        "DIFE-0002" => ("The key type is not supported", ValidationFailed),
        "DIFE-0003" => ("The correlation identifier is not valid", ValidationFailed),
        "DIFE-0004" => ("The key does not exist", RejectedByProvider),
        "DIFE-0005" => ("The key is suspended", RejectedByProvider),
        "DIFE-0006" => ("The key has been cancelled", RejectedByProvider),
        "DIFE-0007" => ("The key is blocked by the participant", RejectedByProvider),
        "DIFE-0008" => ("The participant holding the key is not available", ProviderError),
        "DIFE-5000" => ("The key directory is not available", ProviderError),
        "DIFE-5040" => ("The key directory did not respond in time", ProviderError),
        _ => return None,
    };
    Some(entry)
}

fn mol_entry(code: &str) -> Option<(&'static str, TransferResponseCode)> {
    use TransferResponseCode::*;
    let entry = match code {
        "MOL-4001" => ("The payment request is not valid", ValidationFailed),
        "MOL-4002" => ("The amount is not valid", ValidationFailed),
        "MOL-4003" => ("The payer account is not valid", ValidationFailed),
        "MOL-4220" => ("Insufficient funds", RejectedByProvider),
        "MOL-4221" => ("The payee account is closed or blocked", RejectedByProvider),
        "MOL-4222" => ("The transaction exceeds the allowed limit", RejectedByProvider),
        "MOL-4223" => ("The payment was rejected by the receiving participant", RejectedByProvider),
        "MOL-4224" => ("Duplicate payment instruction", RejectedByProvider),
        "MOL-5000" => ("The payment service is not available", ProviderError),
        "MOL-5040" => ("The payment service did not respond in time", ProviderError),
        // Network (ISO 20022) reason codes surfaced in settlement notifications
        "AC01" => ("The payee account number is incorrect", RejectedByProvider),
        "AC04" => ("The payee account is closed", RejectedByProvider),
        "AC06" => ("The payee account is blocked", RejectedByProvider),
        "AM04" => ("Insufficient funds", RejectedByProvider),
        "AB05" | "AB06" => ("The receiving participant did not respond in time", RejectedByProvider),
        "DUPL" => ("Duplicate payment instruction", RejectedByProvider),
        _ => return None,
    };
    Some(entry)
}

fn fallback(source: ErrorSource) -> MappedError {
    match source {
        ErrorSource::Dife => MappedError::new(
            "The key could not be resolved",
            TransferResponseCode::ProviderError,
        ),
        ErrorSource::Mol => MappedError::new(
            "The payment could not be processed",
            TransferResponseCode::ProviderError,
        ),
        ErrorSource::Charon => MappedError::new(
            "An unexpected error occurred",
            TransferResponseCode::InternalError,
        ),
    }
}

/// Map a provider error to a user message and response category.
///
/// Codes are matched case-insensitively after trimming. Unknown codes fall
/// back to a generic message for the source.
pub fn map_provider_error(info: &ProviderErrorInfo) -> MappedError {
    let code = info.code.trim().to_ascii_uppercase();

    let entry = match info.source {
        ErrorSource::Dife => dife_entry(&code),
        ErrorSource::Mol => mol_entry(&code),
        ErrorSource::Charon => None,
    };

    match entry {
        Some((message, response_code)) => MappedError::new(message, response_code),
        None => {
            tracing::debug!(
                source = %info.source,
                code = %info.code,
                description = %info.description,
                "Unmapped provider error code"
            );
            fallback(info.source)
        }
    }
}
