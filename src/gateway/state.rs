use std::sync::Arc;

use crate::transfer::{ConfirmationHandler, PendingTransferCoordinator, TransferOrchestrator};

/// Gateway shared state
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<TransferOrchestrator>,
    pub confirmations: ConfirmationHandler,
    pub coordinator: PendingTransferCoordinator,
}

impl AppState {
    pub fn new(orchestrator: Arc<TransferOrchestrator>) -> Self {
        let coordinator = orchestrator.coordinator().clone();
        Self {
            confirmations: ConfirmationHandler::new(coordinator.clone()),
            orchestrator,
            coordinator,
        }
    }
}
