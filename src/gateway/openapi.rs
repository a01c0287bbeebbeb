//! OpenAPI / Swagger UI Documentation
//!
//! - Swagger UI: `http://localhost:8080/docs`
//! - OpenAPI JSON: `http://localhost:8080/api-docs/openapi.json`

use utoipa::OpenApi;

use crate::gateway::handlers::{HealthResponse, ResolveKeyData, ResolveKeyRequest};
use crate::keys::KeyType;
use crate::providers::types::{KeyInfo, Participant, PaymentMethod, Person};
use crate::providers::{ProviderErrorDetail, ResolvedKey};
use crate::transfer::confirmation::{ConfirmationEvent, SettlementNotification};
use crate::transfer::{
    ConfirmationAck, PayeeKey, PayerAccount, TransferConfirmationRequest, TransferRequest,
    TransferResponse, TransferResponseCode,
};

/// Main API Documentation struct
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Charon BREB Adapter API",
        version = "0.1.0",
        description = "Submits BREB transfers through DIFE key resolution and MOL payment execution, \
                       and returns the settlement outcome delivered by webhook or status polling."
    ),
    servers(
        (url = "http://localhost:8080", description = "Development"),
    ),
    paths(
        crate::gateway::handlers::health_check,
        crate::gateway::handlers::create_transfer,
        crate::gateway::handlers::confirm_transfer,
        crate::gateway::handlers::resolve_key,
    ),
    components(
        schemas(
            HealthResponse,
            TransferRequest,
            PayerAccount,
            PayeeKey,
            TransferResponse,
            TransferResponseCode,
            TransferConfirmationRequest,
            ConfirmationEvent,
            SettlementNotification,
            ConfirmationAck,
            ProviderErrorDetail,
            ResolveKeyRequest,
            ResolveKeyData,
            KeyType,
            ResolvedKey,
            KeyInfo,
            Participant,
            PaymentMethod,
            Person,
        )
    ),
    tags(
        (name = "System", description = "Health"),
        (name = "Transfer", description = "Transfer submission and settlement notifications"),
        (name = "Keys", description = "Payment key lookup"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_routes() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        for expected in [
            "/api/v1/health",
            "/api/v1/transfer",
            "/api/v1/transfer-confirmation",
            "/api/v1/keys/resolve",
        ] {
            assert!(paths.iter().any(|p| p.as_str() == expected), "{expected}");
        }
    }
}
