//! HTTP Gateway
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `POST /api/v1/transfer` | submit a transfer, wait for settlement |
//! | `POST /api/v1/transfer-confirmation` | settlement webhook |
//! | `POST /api/v1/keys/resolve` | key lookup only |
//! | `GET /api/v1/health` | liveness + pending count |

pub mod handlers;
pub mod openapi;
pub mod state;
pub mod types;

use anyhow::Context;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::GatewayConfig;
pub use state::AppState;

/// Build the complete router
pub fn router(state: Arc<AppState>, body_limit_bytes: usize) -> Router {
    let api_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/transfer", post(handlers::create_transfer))
        .route("/transfer-confirmation", post(handlers::confirm_transfer))
        .route("/keys/resolve", post(handlers::resolve_key));

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(DefaultBodyLimit::max(body_limit_bytes))
        .with_state(state)
        // Stateless, added after with_state
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
}

/// Serve until `shutdown` completes, then drain in-flight requests.
pub async fn run_server<F>(
    config: &GatewayConfig,
    port: u16,
    state: Arc<AppState>,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(state, config.body_limit_bytes);

    let addr = format!("{}:{}", config.host, port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind gateway to {} (port already in use?)", addr))?;

    info!("Gateway listening on http://{}", addr);
    info!("API Docs: http://{}/docs", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("gateway server error")
}
