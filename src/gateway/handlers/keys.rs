//! Key lookup handler

use std::sync::Arc;

use axum::{Json, extract::State, extract::rejection::JsonRejection};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::state::AppState;
use super::super::types::{ApiError, ApiResult, ok};
use crate::keys::KeyType;
use crate::providers::ResolvedKey;
use crate::transfer::TransferOrchestrator;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ResolveKeyRequest {
    #[schema(example = "3001234567")]
    pub key: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ResolveKeyData {
    pub key_type: KeyType,
    pub resolved_key: ResolvedKey,
}

/// Resolve a payment key without paying
///
/// POST /api/v1/keys/resolve
#[utoipa::path(
    post,
    path = "/api/v1/keys/resolve",
    request_body = ResolveKeyRequest,
    responses(
        (status = 200, description = "Key resolved", body = ResolveKeyData),
        (status = 400, description = "Invalid key format"),
        (status = 422, description = "Key unknown, suspended or cancelled"),
        (status = 502, description = "Key directory unavailable")
    ),
    tag = "Keys"
)]
pub async fn resolve_key(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ResolveKeyRequest>, JsonRejection>,
) -> ApiResult<ResolveKeyData> {
    let Json(request) = payload?;
    let key_type = TransferOrchestrator::key_type_of(&request.key);
    let resolved_key = state
        .orchestrator
        .resolve_key(&request.key)
        .await
        .map_err(ApiError::from)?;
    ok(ResolveKeyData {
        key_type,
        resolved_key,
    })
}
