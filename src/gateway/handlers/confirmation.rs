//! Settlement webhook handler

use std::sync::Arc;

use axum::{Json, extract::State, extract::rejection::JsonRejection};

use super::super::state::AppState;
use super::super::types::{ApiError, ApiResult, ok};
use crate::transfer::{ConfirmationAck, TransferConfirmationRequest};

/// Receive a settlement notification
///
/// POST /api/v1/transfer-confirmation
///
/// Answers 200 for every well-formed notification, whether or not a
/// transfer was still waiting for it.
#[utoipa::path(
    post,
    path = "/api/v1/transfer-confirmation",
    request_body = TransferConfirmationRequest,
    responses(
        (status = 200, description = "Notification accepted", body = ConfirmationAck),
        (status = 400, description = "Malformed notification")
    ),
    tag = "Transfer"
)]
pub async fn confirm_transfer(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TransferConfirmationRequest>, JsonRejection>,
) -> ApiResult<ConfirmationAck> {
    let Json(request) = payload?;
    if request.payload.payload.end_to_end_id.trim().is_empty() {
        return ApiError::bad_request("end_to_end_id cannot be empty").into_err();
    }
    ok(state.confirmations.handle(&request))
}
