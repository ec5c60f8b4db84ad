//! Error types for MuSig operations

use thiserror::Error;

/// Result type alias for MuSig operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while running a signing session
///
/// None of these are retriable with the same nonces. A caller that sees any of
/// them after nonces were generated must discard those nonces and start a new
/// round.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed, off-curve or unknown key material
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Fewer signers than the protocol needs
    #[error("Insufficient signers: required at least {required}, got {actual}")]
    InsufficientSigners { required: usize, actual: usize },

    /// Signing attempted before every signer's public nonces were available
    #[error("Nonces not exchanged: {0}")]
    NoncesNotExchanged(String),

    /// The session nonce set is inconsistent with what this signer contributed
    #[error("Invalid nonce set: {0}")]
    InvalidNonceSet(String),

    /// Scalar bytes or an arithmetic result outside `[1, n)`
    #[error("Scalar out of range: {0}")]
    ScalarOutOfRange(String),

    /// Invalid session configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Session step called out of order
    #[error("Invalid session state: expected {expected}, got {actual}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
