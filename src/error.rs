//! Error types for the wallet analyzer

use thiserror::Error;

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the wallet analyzer
///
/// The analysis core (normalizer, classifier, balance deltas) never produces
/// these: malformed transaction data degrades to fallback values instead.
/// Errors come from address validation and from the data-fetch collaborator.
/// Configuration loading reports through `anyhow`.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    // RPC errors
    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("RPC timeout after {0}ms")]
    RpcTimeout(u64),

    #[error("RPC connection failed: {0}")]
    RpcConnection(String),

    #[error("RPC node returned error {code}: {message}")]
    RpcResponse { code: i64, message: String },

    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

impl Error {
    /// Check if this error is retryable (transient)
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Rpc(_) | Error::RpcTimeout(_) | Error::RpcConnection(_) => true,
            // -32005: node is behind / rate limited, -32014: block not available yet
            Error::RpcResponse { code, .. } => matches!(code, -32005 | -32014 | 429),
            _ => false,
        }
    }
}

// Conversion from reqwest errors
impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::RpcTimeout(0)
        } else if e.is_connect() {
            Error::RpcConnection(e.to_string())
        } else if e.is_decode() {
            Error::Deserialization(e.to_string())
        } else {
            Error::Rpc(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(Error::Rpc("reset".into()).is_retryable());
        assert!(Error::RpcTimeout(3000).is_retryable());
        assert!(Error::RpcResponse {
            code: -32005,
            message: "node is behind".into()
        }
        .is_retryable());
        assert!(!Error::RpcResponse {
            code: -32602,
            message: "invalid params".into()
        }
        .is_retryable());
        assert!(!Error::InvalidAddress("bad".into()).is_retryable());
        assert!(!Error::Deserialization("bad".into()).is_retryable());
    }

    #[test]
    fn test_display() {
        let err = Error::InvalidAddress("abc".into());
        assert_eq!(err.to_string(), "Invalid address: abc");
    }
}
