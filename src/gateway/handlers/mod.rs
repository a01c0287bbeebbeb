//! HTTP handlers

mod confirmation;
mod health;
mod keys;
mod transfer;

// `__path_*` items are generated by `#[utoipa::path]` and referenced by the OpenAPI document
pub use confirmation::{__path_confirm_transfer, confirm_transfer};
pub use health::{__path_health_check, HealthResponse, health_check};
pub use keys::{__path_resolve_key, ResolveKeyData, ResolveKeyRequest, resolve_key};
pub use transfer::{__path_create_transfer, create_transfer};
