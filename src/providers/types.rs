//! DIFE / MOL wire types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;

use crate::keys::KeyType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ProviderErrorDetail {
    pub code: String,
    pub description: String,
}

impl ProviderErrorDetail {
    pub fn new(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
        }
    }
}

// ============================================================================
// DIFE: key resolution
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResolutionStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct KeyResolution {
    pub status: ResolutionStatus,
    #[serde(default)]
    pub execution_id: Option<String>,
    #[serde(default)]
    pub trace_id: Option<String>,
    #[serde(default)]
    pub resolved_key: Option<ResolvedKey>,
    #[serde(default)]
    pub errors: Vec<ProviderErrorDetail>,
}

impl KeyResolution {
    pub fn success(resolved_key: ResolvedKey) -> Self {
        Self {
            status: ResolutionStatus::Success,
            execution_id: None,
            trace_id: None,
            resolved_key: Some(resolved_key),
            errors: Vec::new(),
        }
    }

    pub fn error(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            status: ResolutionStatus::Error,
            execution_id: None,
            trace_id: None,
            resolved_key: None,
            errors: vec![ProviderErrorDetail::new(code, description)],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ResolvedKey {
    pub key: KeyInfo,
    pub participant: Participant,
    pub payment_method: PaymentMethod,
    pub person: Person,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct KeyInfo {
    #[serde(rename = "type")]
    pub key_type: KeyType,
    pub value: String,
}

/// Financial institution holding the payee account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Participant {
    pub nit: String,
    pub spbvi: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PaymentMethod {
    #[serde(rename = "type")]
    pub account_type: String,
    pub number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Person {
    #[serde(rename = "type")]
    pub person_type: String,
    pub identification_type: String,
    pub identification_number: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub second_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub second_last_name: Option<String>,
    #[serde(default)]
    pub legal_company_name: Option<String>,
}

impl Person {
    /// Display name: company name for legal persons, joined names otherwise
    pub fn display_name(&self) -> String {
        if let Some(company) = self.legal_company_name.as_deref()
            && !company.is_empty()
        {
            return company.to_string();
        }
        [
            &self.first_name,
            &self.second_name,
            &self.last_name,
            &self.second_last_name,
        ]
        .iter()
        .filter_map(|part| part.as_deref())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
    }
}

// ============================================================================
// MOL: payment creation and status
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentCreation {
    pub response_code: String,
    #[serde(default)]
    pub external_transaction_id: Option<String>,
    #[serde(default)]
    pub additional_data: HashMap<String, String>,
    #[serde(default)]
    pub errors: Vec<ProviderErrorDetail>,
}

impl PaymentCreation {
    pub const END_TO_END_KEY: &'static str = "END_TO_END";
    pub const EXECUTION_ID_KEY: &'static str = "EXECUTION_ID";

    /// Network-assigned end-to-end id, if present and non-blank
    pub fn end_to_end_id(&self) -> Option<&str> {
        self.additional_data
            .get(Self::END_TO_END_KEY)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }

    pub fn execution_id(&self) -> Option<&str> {
        self.additional_data
            .get(Self::EXECUTION_ID_KEY)
            .map(String::as_str)
    }

    /// MOL accepted the instruction for processing
    pub fn is_accepted(&self) -> bool {
        self.errors.is_empty()
            && matches!(
                self.response_code.to_ascii_uppercase().as_str(),
                "SUCCESS" | "ACCEPTED" | "CREATED" | "PROCESSING" | "PENDING"
            )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentStatusQuery {
    pub end_to_end_id: String,
}

impl PaymentStatusQuery {
    pub fn by_end_to_end_id(end_to_end_id: impl Into<String>) -> Self {
        Self {
            end_to_end_id: end_to_end_id.into(),
        }
    }
}

/// Status query result; empty `items` means "not yet known"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PaymentStatusResponse {
    #[serde(default)]
    pub items: Vec<PaymentStatusItem>,
    #[serde(default)]
    pub errors: Vec<ProviderErrorDetail>,
}

impl PaymentStatusResponse {
    pub fn with_status(end_to_end_id: &str, status: &str) -> Self {
        Self {
            items: vec![PaymentStatusItem {
                status: status.to_string(),
                end_to_end_id: Some(end_to_end_id.to_string()),
                execution_id: None,
                errors: Vec::new(),
            }],
            errors: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentStatusItem {
    pub status: String,
    #[serde(default)]
    pub end_to_end_id: Option<String>,
    #[serde(default)]
    pub execution_id: Option<String>,
    #[serde(default)]
    pub errors: Vec<ProviderErrorDetail>,
}
