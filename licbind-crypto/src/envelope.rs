//! Authenticated envelope using AES-256-GCM.
//!
//! Wire layout: `nonce (12 bytes) || ciphertext || tag (16 bytes)`.
//! There is no header or version byte.

use crate::error::{CryptoError, CryptoResult};
use crate::key::DerivedKey;
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::RngCore;

/// Size of nonce in bytes (96 bits for AES-GCM).
pub const NONCE_SIZE: usize = 12;

/// Size of authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// A sealed payload split into its nonce prefix and the ciphertext+tag body.
#[derive(Clone, Debug)]
pub struct Envelope {
    /// The nonce used for sealing (fresh per call).
    pub nonce: [u8; NONCE_SIZE],
    /// The ciphertext with the authentication tag appended.
    pub ciphertext: Vec<u8>,
}

impl Envelope {
    /// Returns the total encoded size.
    pub fn len(&self) -> usize {
        NONCE_SIZE + self.ciphertext.len()
    }

    /// Returns true if the body is empty.
    pub fn is_empty(&self) -> bool {
        self.ciphertext.is_empty()
    }

    /// Encodes as `nonce || ciphertext`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.len());
        bytes.extend_from_slice(&self.nonce);
        bytes.extend_from_slice(&self.ciphertext);
        bytes
    }

    /// Splits raw bytes into nonce and body.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::EnvelopeTooShort`] if `bytes` cannot hold a nonce.
    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.len() < NONCE_SIZE {
            return Err(CryptoError::EnvelopeTooShort {
                expected: NONCE_SIZE,
                actual: bytes.len(),
            });
        }

        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(&bytes[..NONCE_SIZE]);
        Ok(Self {
            nonce,
            ciphertext: bytes[NONCE_SIZE..].to_vec(),
        })
    }
}

/// Seals `plaintext` under `key` with a freshly generated nonce.
pub fn encrypt(key: &DerivedKey, plaintext: &[u8]) -> CryptoResult<Envelope> {
    let cipher = Aes256Gcm::new(key.as_bytes().into());

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::rngs::OsRng
        .try_fill_bytes(&mut nonce_bytes)
        .map_err(|e| CryptoError::Random(e.to_string()))?;
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    Ok(Envelope {
        nonce: nonce_bytes,
        ciphertext,
    })
}

/// Opens an envelope sealed under `key`.
///
/// Every authentication failure collapses into
/// [`CryptoError::EnvelopeAuthenticationFailed`]; the cause is not reported.
pub fn decrypt(key: &DerivedKey, envelope: &Envelope) -> CryptoResult<Vec<u8>> {
    let cipher = Aes256Gcm::new(key.as_bytes().into());
    let nonce = Nonce::from_slice(&envelope.nonce);

    cipher
        .decrypt(nonce, envelope.ciphertext.as_ref())
        .map_err(|_| CryptoError::EnvelopeAuthenticationFailed)
}

/// Seals `plaintext` and returns the encoded envelope bytes.
pub fn seal(key: &DerivedKey, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
    Ok(encrypt(key, plaintext)?.to_bytes())
}

/// Opens encoded envelope bytes produced by [`seal`].
pub fn open(key: &DerivedKey, bytes: &[u8]) -> CryptoResult<Vec<u8>> {
    let envelope = Envelope::from_bytes(bytes)?;
    decrypt(key, &envelope)
}
