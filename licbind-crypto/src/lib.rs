//! Cryptographic primitives for machine-bound licenses.
//!
//! - PBKDF2 key derivation of purpose-scoped keys from one master secret
//! - AES-256-GCM authenticated envelope (`nonce || ciphertext || tag`)
//! - Deterministic serial binding tokens
//!
//! Key material is zeroized on drop and never logged.

mod envelope;
mod error;
mod key;
mod serial;

pub use envelope::{decrypt, encrypt, open, seal, Envelope, NONCE_SIZE, TAG_SIZE};
pub use error::{CryptoError, CryptoResult};
pub use key::{
    derive_key, derive_salt, generate_random_key, random_bytes, DerivedKey, KeyPurpose,
    LicenseKeys, MasterSecret, KEY_SIZE, PBKDF2_ITERATIONS,
};
pub use serial::{bind_serial, SERIAL_LEN};
