//! Payment key handling
//!
//! BREB keys are aliases (mobile number, email, `@handle`, identification
//! number, commerce code) that DIFE resolves into full payee data.
//!
//! - [`classifier`]: format inspection → [`KeyType`]
//! - [`validator`]: per-type format rules

pub mod classifier;
pub mod validator;

pub use classifier::{KeyType, classify_key};
pub use validator::{KeyFormatError, validate_key_format};
