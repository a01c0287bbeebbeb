//! BREB Transfer Flow
//!
//! A transfer is accepted synchronously but settles asynchronously:
//!
//! ```text
//! POST /transfer ─► TransferOrchestrator ─► DIFE resolve ─► MOL create
//!                          │
//!                          ▼
//!             PendingTransferCoordinator ◄── webhook (ConfirmationHandler)
//!                          ▲
//!                          └──────────── status polling (MOL query)
//! ```
//!
//! # Guarantees
//!
//! 1. **Single completion**: webhook, polling, timeout, duplicate eviction and
//!    shutdown race for each entry; exactly one completes it
//! 2. **Bounded wait**: a caller never waits longer than the configured
//!    timeout, measured from when its request arrived
//! 3. **Timeout is not failure**: an unsettled transfer is reported `PENDING`

pub mod confirmation;
pub mod coordinator;
pub mod error;
pub mod orchestrator;
pub mod settlement;
pub mod types;

// Re-exports for convenience
pub use confirmation::{ConfirmationAck, ConfirmationHandler, TransferConfirmationRequest};
pub use coordinator::PendingTransferCoordinator;
pub use error::{ConfirmationError, TransferError};
pub use orchestrator::TransferOrchestrator;
pub use settlement::SettlementStatus;
pub use types::{
    ConfirmationSource, PayeeKey, PayerAccount, TransferRequest, TransferResponse,
    TransferResponseCode,
};
