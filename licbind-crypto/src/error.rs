//! Error types for the crypto layer.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur in cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The master secret was missing or empty.
    #[error("master secret must not be empty")]
    EmptyMasterSecret,

    /// Sealing the envelope failed.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// The envelope is shorter than its nonce prefix.
    #[error("envelope too short: expected at least {expected} bytes, got {actual}")]
    EnvelopeTooShort { expected: usize, actual: usize },

    /// Authenticated decryption failed (wrong key, corruption or tampering).
    #[error("envelope authentication failed")]
    EnvelopeAuthenticationFailed,

    /// The operating system random source failed.
    #[error("random source failure: {0}")]
    Random(String),
}
