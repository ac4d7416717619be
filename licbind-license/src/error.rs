//! Error types for the licensing module.

use licbind_crypto::CryptoError;
use thiserror::Error;

/// Licensing-specific errors.
///
/// Each variant renders one distinct message. Envelope failures of any kind
/// surface as [`LicenseError::CorruptOrRevoked`], so a revoked license and a
/// damaged file are indistinguishable to the caller.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// No license file exists at the expected location.
    #[error("no license found at {0}")]
    NoSuchLicense(String),

    /// A license file already exists and would be overwritten.
    #[error("license already exists at {0}")]
    AlreadyExists(String),

    /// The envelope did not authenticate.
    #[error("license file is corrupted or invalid")]
    CorruptOrRevoked,

    /// The envelope opened but the record could not be parsed.
    #[error("malformed license record: {0}")]
    MalformedRecord(String),

    /// The record is bound to a different machine.
    #[error("license is not valid for this machine")]
    WrongMachine,

    /// The stored serial does not match the recomputed one.
    #[error("license serial is invalid")]
    InvalidSerial,

    /// The system clock is earlier than the last recorded use.
    #[error("system clock appears to have been rolled back (last used {last_used}, now {now})")]
    ClockRollbackDetected { last_used: String, now: String },

    /// More distinct usage days than the term allows.
    #[error("license has expired: used {used} days out of {allowed} allowed")]
    LicenseExpired { used: usize, allowed: u32 },

    /// The updated record could not be written.
    #[error("failed to persist license: {0}")]
    PersistenceFailed(String),

    /// No machine identifier can be produced on this platform.
    #[error("unsupported platform: {0}")]
    PlatformUnsupported(String),

    /// Configuration is missing or invalid.
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// The requested license term is not usable.
    #[error("invalid license term: {0}")]
    InvalidTerm(String),

    /// Filesystem access failed (other than a missing license).
    #[error("storage error: {0}")]
    Storage(String),

    /// A crypto failure outside the envelope check.
    #[error("crypto error: {0}")]
    Crypto(String),
}

impl From<CryptoError> for LicenseError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::EnvelopeTooShort { .. } | CryptoError::EnvelopeAuthenticationFailed => {
                Self::CorruptOrRevoked
            }
            CryptoError::EmptyMasterSecret => Self::ConfigInvalid(err.to_string()),
            other => Self::Crypto(other.to_string()),
        }
    }
}

/// Result type for license operations.
pub type LicenseResult<T> = Result<T, LicenseError>;
