//! Transfer submission handler

use std::sync::Arc;

use axum::{Json, extract::State, extract::rejection::JsonRejection};

use super::super::state::AppState;
use super::super::types::{ApiResult, error_codes, respond, status_for};
use crate::transfer::{TransferRequest, TransferResponse};

/// Submit a BREB transfer and wait for its settlement
///
/// POST /api/v1/transfer
///
/// The HTTP status follows the outcome: 200 approved, 202 pending (no final
/// answer within the wait budget), 422 rejected, 400 invalid, 502 provider
/// failure, 500 internal error. The outcome is always in `data`.
#[utoipa::path(
    post,
    path = "/api/v1/transfer",
    request_body = TransferRequest,
    responses(
        (status = 200, description = "Transfer approved", body = TransferResponse),
        (status = 202, description = "Submitted, settlement not confirmed yet", body = TransferResponse),
        (status = 400, description = "Invalid request or key format", body = TransferResponse),
        (status = 422, description = "Rejected by the provider or the network", body = TransferResponse),
        (status = 502, description = "Provider unavailable", body = TransferResponse)
    ),
    tag = "Transfer"
)]
pub async fn create_transfer(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TransferRequest>, JsonRejection>,
) -> ApiResult<TransferResponse> {
    let Json(request) = payload?;
    let response = state.orchestrator.process_transfer(request).await;
    let code = response.response_code;
    respond(
        status_for(code),
        error_codes::for_response_code(code),
        code.as_str(),
        response,
    )
}
