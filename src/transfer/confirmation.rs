//! Settlement webhook handling

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;

use super::coordinator::PendingTransferCoordinator;
use super::settlement::{SettlementStatus, settlement_outcome};
use super::types::{ConfirmationSource, TransferResponse, TransferResponseCode};
use crate::providers::ProviderErrorDetail;

/// Inbound settlement notification envelope
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransferConfirmationRequest {
    #[schema(example = "evt-7f3a")]
    pub id: String,
    #[schema(example = "MOL")]
    pub source: String,
    pub payload: ConfirmationEvent,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConfirmationEvent {
    #[schema(example = "payment.settled")]
    pub event_name: String,
    pub payload: SettlementNotification,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SettlementNotification {
    #[serde(default)]
    pub execution_id: Option<String>,
    #[schema(example = "E2E-20240101-000123")]
    pub end_to_end_id: String,
    #[schema(example = "SUCCESS")]
    pub status: String,
    #[serde(default)]
    pub errors: Vec<ProviderErrorDetail>,
}

/// Acknowledgement returned to the webhook sender.
///
/// Identical whether or not a transfer was still waiting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ConfirmationAck {
    pub id: String,
    pub end_to_end_id: String,
    pub response_code: TransferResponseCode,
    pub message: String,
}

#[derive(Clone)]
pub struct ConfirmationHandler {
    coordinator: PendingTransferCoordinator,
}

impl ConfirmationHandler {
    pub fn new(coordinator: PendingTransferCoordinator) -> Self {
        Self { coordinator }
    }

    /// Map the notification to an outcome and hand it to the coordinator
    pub fn handle(&self, request: &TransferConfirmationRequest) -> ConfirmationAck {
        let notification = &request.payload.payload;
        let end_to_end_id = notification.end_to_end_id.trim();
        let outcome = notification_outcome(notification);

        info!(
            webhook_id = %request.id,
            webhook_source = %request.source,
            event_name = %request.payload.event_name,
            end_to_end_id,
            status = %notification.status,
            response_code = %outcome.response_code,
            "Settlement notification received"
        );

        let ack = ConfirmationAck {
            id: request.id.clone(),
            end_to_end_id: end_to_end_id.to_string(),
            response_code: outcome.response_code,
            message: outcome.message.clone(),
        };

        if !self
            .coordinator
            .resolve_confirmation(end_to_end_id, outcome, ConfirmationSource::Webhook)
        {
            info!(end_to_end_id, "No transfer waiting for this notification");
        }
        ack
    }
}

fn notification_outcome(notification: &SettlementNotification) -> TransferResponse {
    let end_to_end_id = notification.end_to_end_id.trim();
    let status = SettlementStatus::parse(&notification.status);
    if status.is_terminal() {
        return settlement_outcome(
            "",
            end_to_end_id,
            notification.execution_id.clone(),
            &status,
            &notification.errors,
        );
    }

    // Still delivered so the caller is not left waiting on a signal we
    // cannot classify.
    warn!(
        end_to_end_id,
        status = %status,
        "Unrecognized settlement status in notification"
    );
    TransferResponse::new(
        "",
        TransferResponseCode::Pending,
        format!("Settlement status {} is not final", status),
    )
    .with_end_to_end_id(end_to_end_id)
    .with_execution_id(notification.execution_id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransferTimingConfig;
    use crate::providers::mock::MockPaymentProvider;
    use std::sync::Arc;
    use std::time::Duration;

    fn webhook(end_to_end_id: &str, status: &str) -> TransferConfirmationRequest {
        serde_json::from_value(serde_json::json!({
            "id": "evt-1",
            "source": "MOL",
            "payload": {
                "event_name": "payment.settled",
                "payload": {
                    "execution_id": "EXEC-9",
                    "end_to_end_id": end_to_end_id,
                    "status": status
                }
            }
        }))
        .unwrap()
    }

    fn handler() -> (ConfirmationHandler, PendingTransferCoordinator) {
        let coordinator = PendingTransferCoordinator::new(
            TransferTimingConfig::default(),
            Arc::new(MockPaymentProvider::new()),
        );
        (ConfirmationHandler::new(coordinator.clone()), coordinator)
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_webhook_approves_waiter() {
        let (handler, coordinator) = handler();
        let c = coordinator.clone();
        let waiter =
            tokio::spawn(async move { c.wait_for_confirmation("TX-1", "E2E-1", None).await });
        tokio::time::sleep(Duration::from_secs(2)).await;

        let ack = handler.handle(&webhook("E2E-1", "SUCCESS"));
        assert_eq!(ack.response_code, TransferResponseCode::Approved);

        let response = waiter.await.unwrap().unwrap();
        assert_eq!(response.transaction_id, "TX-1");
        assert_eq!(response.execution_id.as_deref(), Some("EXEC-9"));
        assert!(!coordinator.is_pending("E2E-1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejection_surfaces_error_details() {
        let (handler, coordinator) = handler();
        let c = coordinator.clone();
        let waiter =
            tokio::spawn(async move { c.wait_for_confirmation("TX-2", "E2E-2", None).await });
        tokio::time::sleep(Duration::from_secs(1)).await;

        let mut request = webhook("E2E-2", "REJECTED");
        request
            .payload
            .payload
            .errors
            .push(ProviderErrorDetail::new("AC04", "Closed account"));
        let ack = handler.handle(&request);
        assert_eq!(ack.response_code, TransferResponseCode::RejectedByProvider);

        let response = waiter.await.unwrap().unwrap();
        assert_eq!(response.message, "The payee account is closed");
        assert_eq!(response.network_code.as_deref(), Some("AC04"));
        assert_eq!(response.network_message.as_deref(), Some("Closed account"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_status_still_resolves() {
        let (handler, coordinator) = handler();
        let c = coordinator.clone();
        let waiter =
            tokio::spawn(async move { c.wait_for_confirmation("TX-3", "E2E-3", None).await });
        tokio::time::sleep(Duration::from_secs(1)).await;

        let ack = handler.handle(&webhook("E2E-3", "ON_HOLD"));
        assert_eq!(ack.response_code, TransferResponseCode::Pending);

        let response = waiter.await.unwrap().unwrap();
        assert_eq!(response.response_code, TransferResponseCode::Pending);
        assert_eq!(coordinator.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_ack_without_waiter() {
        let (handler, _) = handler();
        let ack = handler.handle(&webhook(" E2E-LATE ", "SETTLED"));
        assert_eq!(ack.id, "evt-1");
        assert_eq!(ack.end_to_end_id, "E2E-LATE");
        assert_eq!(ack.response_code, TransferResponseCode::Approved);
    }
}
