//! Key derivation and management.
//!
//! A single master secret is stretched with PBKDF2-HMAC-SHA256 into
//! purpose-scoped keys. Each purpose gets its own deterministic salt, so the
//! same secret always yields the same keys while different purposes yield
//! unrelated ones.

use crate::error::{CryptoError, CryptoResult};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of derived keys in bytes (256 bits for AES-256-GCM).
pub const KEY_SIZE: usize = 32;

/// PBKDF2 iteration count.
pub const PBKDF2_ITERATIONS: u32 = 10_000;

/// Domain-separation prefix mixed into every per-purpose salt.
const SALT_DOMAIN: &[u8] = b"LICENSE_MANAGER_2025_";

/// The externally supplied secret every operational key is derived from.
///
/// Secrets that are not exactly [`KEY_SIZE`] bytes long are normalized with
/// SHA-256, so human-chosen passphrases of any length are accepted.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterSecret {
    bytes: [u8; KEY_SIZE],
}

impl MasterSecret {
    /// Normalizes `secret` into a master secret.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::EmptyMasterSecret`] if `secret` is empty.
    pub fn new(secret: impl AsRef<[u8]>) -> CryptoResult<Self> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(CryptoError::EmptyMasterSecret);
        }

        let mut bytes = [0u8; KEY_SIZE];
        if secret.len() == KEY_SIZE {
            bytes.copy_from_slice(secret);
        } else {
            bytes.copy_from_slice(&Sha256::digest(secret));
        }
        Ok(Self { bytes })
    }

    /// Returns the normalized secret bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl std::fmt::Debug for MasterSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterSecret")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// A derived key with automatic zeroization on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    bytes: [u8; KEY_SIZE],
}

impl DerivedKey {
    /// Creates a key from raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Returns the key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }

    /// Lowercase hex encoding of the key bytes.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// What a derived key is used for. Each purpose has its own salt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyPurpose {
    /// Key mixed into serial binding tokens.
    Serial,
    /// Key for the authenticated envelope.
    Encryption,
}

impl KeyPurpose {
    /// The label hashed into this purpose's salt.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Serial => "SERIAL_KEY_DERIVATION",
            Self::Encryption => "ENCRYPTION_KEY_DERIVATION",
        }
    }
}

/// Computes the deterministic salt for `purpose`.
///
/// `SHA-256(domain || label || master)`.
pub fn derive_salt(master: &MasterSecret, purpose: KeyPurpose) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(SALT_DOMAIN);
    hasher.update(purpose.label().as_bytes());
    hasher.update(master.as_bytes());
    hasher.finalize().into()
}

/// Derives the key for `purpose` from the master secret.
pub fn derive_key(master: &MasterSecret, purpose: KeyPurpose) -> DerivedKey {
    let salt = derive_salt(master, purpose);
    let mut bytes = [0u8; KEY_SIZE];
    pbkdf2_hmac::<Sha256>(master.as_bytes(), &salt, PBKDF2_ITERATIONS, &mut bytes);
    DerivedKey::from_bytes(bytes)
}

/// The pair of operational keys used by the license engine.
#[derive(Clone, Debug)]
pub struct LicenseKeys {
    serial: DerivedKey,
    encryption: DerivedKey,
}

impl LicenseKeys {
    /// Derives both purpose keys from `master`.
    pub fn derive(master: &MasterSecret) -> Self {
        Self {
            serial: derive_key(master, KeyPurpose::Serial),
            encryption: derive_key(master, KeyPurpose::Encryption),
        }
    }

    /// Key used for serial binding.
    pub fn serial(&self) -> &DerivedKey {
        &self.serial
    }

    /// Key used for sealing and opening envelopes.
    pub fn encryption(&self) -> &DerivedKey {
        &self.encryption
    }
}

/// Generates a random key (tests and ad-hoc envelopes, never for licenses).
pub fn generate_random_key() -> DerivedKey {
    let mut bytes = [0u8; KEY_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    DerivedKey::from_bytes(bytes)
}

/// Fills a buffer of `len` bytes from the operating system CSPRNG.
///
/// # Errors
///
/// Returns [`CryptoError::Random`] if the random source is unavailable.
pub fn random_bytes(len: usize) -> CryptoResult<Vec<u8>> {
    let mut bytes = vec![0u8; len];
    rand::rngs::OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| CryptoError::Random(e.to_string()))?;
    Ok(bytes)
}
