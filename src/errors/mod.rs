//! Provider error normalization
//!
//! Translates DIFE / MOL error codes into the user-facing message and
//! response-code category carried by every [`crate::transfer::TransferResponse`].

pub mod mapper;

pub use mapper::{ErrorSource, MappedError, ProviderErrorInfo, map_provider_error};
