//! Provider Error Types

use std::time::Duration;
use thiserror::Error;

/// Transport-level failures talking to DIFE or MOL.
///
/// Expected business errors (key not found, payment rejected) are NOT
/// represented here; providers return them inside their structured responses.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("{provider} request timed out after {timeout_ms}ms")]
    Timeout {
        provider: &'static str,
        timeout_ms: u64,
    },

    #[error("{provider} returned HTTP {status}: {body}")]
    Http {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("{provider} transport error: {message}")]
    Transport {
        provider: &'static str,
        message: String,
    },

    #[error("{provider} response could not be decoded: {message}")]
    Decode {
        provider: &'static str,
        message: String,
    },

    #[error("{provider} authentication failed: {message}")]
    Auth {
        provider: &'static str,
        message: String,
    },
}

impl ProviderError {
    pub fn provider(&self) -> &'static str {
        match self {
            ProviderError::Timeout { provider, .. }
            | ProviderError::Http { provider, .. }
            | ProviderError::Transport { provider, .. }
            | ProviderError::Decode { provider, .. }
            | ProviderError::Auth { provider, .. } => *provider,
        }
    }

    #[inline]
    pub fn is_timeout(&self) -> bool {
        matches!(self, ProviderError::Timeout { .. })
    }

    /// Stable code used when mapping through the error tables
    pub fn code(&self) -> String {
        match self {
            ProviderError::Timeout { provider, .. } => format!("{provider}-5040"),
            _ => format!("{}-5000", self.provider()),
        }
    }

    pub fn timeout(provider: &'static str, timeout: Duration) -> Self {
        ProviderError::Timeout {
            provider,
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    pub fn from_reqwest(provider: &'static str, timeout: Duration, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::timeout(provider, timeout)
        } else if e.is_decode() {
            ProviderError::Decode {
                provider,
                message: e.to_string(),
            }
        } else if let Some(status) = e.status() {
            ProviderError::Http {
                provider,
                status: status.as_u16(),
                body: e.to_string(),
            }
        } else {
            ProviderError::Transport {
                provider,
                message: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        let timeout = ProviderError::timeout("MOL", Duration::from_secs(10));
        assert!(timeout.is_timeout());
        assert_eq!(timeout.code(), "MOL-5040");
        assert_eq!(timeout.to_string(), "MOL request timed out after 10000ms");

        let http = ProviderError::Http {
            provider: "DIFE",
            status: 503,
            body: "unavailable".into(),
        };
        assert_eq!(http.code(), "DIFE-5000");
        assert_eq!(http.provider(), "DIFE");
    }
}
