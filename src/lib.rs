//! Charon - BREB Payment Adapter
//!
//! Turns the asynchronous BREB settlement flow into one synchronous call:
//! resolve the payee key, create the payment, then wait for the settlement
//! outcome from whichever channel reports it first (webhook or polling).
//!
//! # Modules
//!
//! - [`config`] - YAML configuration and transfer timing budget
//! - [`logging`] - tracing subscriber setup
//! - [`keys`] - payment key classification and format validation
//! - [`errors`] - provider error code → user message mapping
//! - [`providers`] - DIFE / MOL capability traits, HTTP clients, mocks
//! - [`transfer`] - orchestrator, pending transfer coordinator, webhook handling
//! - [`gateway`] - axum HTTP API

pub mod config;
pub mod errors;
pub mod gateway;
pub mod keys;
pub mod logging;
pub mod providers;
pub mod transfer;

// Convenient re-exports at crate root
pub use config::{AppConfig, TransferTimingConfig};
pub use transfer::{
    ConfirmationHandler, PendingTransferCoordinator, TransferOrchestrator, TransferRequest,
    TransferResponse, TransferResponseCode,
};
