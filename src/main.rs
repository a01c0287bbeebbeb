//! Charon - BREB Payment Adapter
//!
//! ```text
//! ┌──────────┐    ┌──────────────┐    ┌──────────┐
//! │ Gateway  │───▶│ Orchestrator │───▶│ DIFE/MOL │
//! │  (axum)  │    └──────┬───────┘    └────┬─────┘
//! └────▲─────┘           ▼                 │ webhook / polling
//!      │          ┌─────────────┐          │
//!      └──────────│ Coordinator │◀─────────┘
//!                 └─────────────┘
//! ```
//!
//! Usage: `charon [--env dev|mock|...] [--port 8080]`

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use charon::config::{AppConfig, ProviderMode};
use charon::gateway::{self, AppState};
use charon::logging::init_logging;
use charon::providers::{
    DifeClient, KeyResolutionProvider, MolClient, PaymentProvider,
};
use charon::transfer::{PendingTransferCoordinator, TransferOrchestrator};

type Providers = (Arc<dyn KeyResolutionProvider>, Arc<dyn PaymentProvider>);

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

/// Get port override from command line (--port argument)
fn get_port_override() -> Option<u16> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--port" && i + 1 < args.len() {
            return args[i + 1].parse().ok();
        }
    }
    None
}

fn build_providers(config: &AppConfig) -> anyhow::Result<Providers> {
    match config.providers.mode {
        ProviderMode::Http => {
            let dife = DifeClient::new(&config.providers.dife).context("DIFE client")?;
            let mol = MolClient::new(&config.providers.mol).context("MOL client")?;
            Ok((Arc::new(dife), Arc::new(mol)))
        }
        ProviderMode::Mock => mock_providers(),
    }
}

#[cfg(feature = "mock-providers")]
fn mock_providers() -> anyhow::Result<Providers> {
    use charon::providers::mock::{MockKeyResolver, MockPaymentProvider};

    tracing::warn!("Using in-memory mock providers; no real payments are made");
    let payments = MockPaymentProvider::new();
    // No webhooks in mock mode, so polling has to find a final status
    payments.set_default_status(Some("COMPLETED"));
    Ok((Arc::new(MockKeyResolver::new()), Arc::new(payments)))
}

#[cfg(not(feature = "mock-providers"))]
fn mock_providers() -> anyhow::Result<Providers> {
    anyhow::bail!("providers.mode is `mock` but this build has no mock-providers feature")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let config = AppConfig::load(&env)?;
    let _log_guard = init_logging(&config);

    info!(
        env = %env,
        version = env!("CARGO_PKG_VERSION"),
        git_hash = env!("GIT_HASH"),
        providers = ?config.providers.mode,
        "Starting Charon"
    );

    let (key_resolver, payment_provider) = build_providers(&config)?;

    let coordinator = PendingTransferCoordinator::new(config.transfer.clone(), payment_provider.clone());
    coordinator.start_cleanup();

    let orchestrator = Arc::new(TransferOrchestrator::new(
        key_resolver,
        payment_provider,
        coordinator.clone(),
    ));
    let state = Arc::new(AppState::new(orchestrator));

    let port = get_port_override().unwrap_or(config.gateway.port);
    let shutdown_coordinator = coordinator.clone();
    gateway::run_server(&config.gateway, port, state, async move {
        shutdown_signal().await;
        info!("Shutdown signal received, releasing pending transfers");
        // Waiters return first so their HTTP requests can drain
        shutdown_coordinator.shutdown();
    })
    .await?;

    info!("Charon stopped");
    Ok(())
}
