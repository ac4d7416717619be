use licbind_crypto::{
    decrypt, encrypt, generate_random_key, open, seal, CryptoError, Envelope, NONCE_SIZE,
    TAG_SIZE,
};

#[test]
fn seal_open_roundtrip() {
    let key = generate_random_key();
    let plaintext = b"{\"serial\":\"ABCDE\"}";
    let sealed = seal(&key, plaintext).unwrap();
    assert_eq!(open(&key, &sealed).unwrap(), plaintext);
}

#[test]
fn seal_open_empty() {
    let key = generate_random_key();
    let sealed = seal(&key, b"").unwrap();
    assert_eq!(sealed.len(), NONCE_SIZE + TAG_SIZE);
    assert_eq!(open(&key, &sealed).unwrap(), b"");
}

#[test]
fn seal_open_large_data() {
    let key = generate_random_key();
    let plaintext: Vec<u8> = (0..10000).map(|i| (i % 256) as u8).collect();
    let sealed = seal(&key, &plaintext).unwrap();
    assert_eq!(open(&key, &sealed).unwrap(), plaintext);
}

#[test]
fn sealed_layout_is_nonce_then_ciphertext_and_tag() {
    let key = generate_random_key();
    let sealed = seal(&key, b"four").unwrap();
    assert_eq!(sealed.len(), NONCE_SIZE + 4 + TAG_SIZE);
}

#[test]
fn wrong_key_fails_authentication() {
    let key1 = generate_random_key();
    let key2 = generate_random_key();
    let sealed = seal(&key1, b"Secret").unwrap();
    assert!(matches!(
        open(&key2, &sealed),
        Err(CryptoError::EnvelopeAuthenticationFailed)
    ));
}

#[test]
fn tampered_body_fails_authentication() {
    let key = generate_random_key();
    let mut sealed = seal(&key, b"Secret").unwrap();
    sealed[NONCE_SIZE] ^= 0xFF;
    assert!(matches!(
        open(&key, &sealed),
        Err(CryptoError::EnvelopeAuthenticationFailed)
    ));
}

#[test]
fn tampered_nonce_fails_authentication() {
    let key = generate_random_key();
    let mut sealed = seal(&key, b"Secret").unwrap();
    sealed[0] ^= 0x01;
    assert!(open(&key, &sealed).is_err());
}

#[test]
fn truncated_tag_fails_authentication() {
    let key = generate_random_key();
    let mut sealed = seal(&key, b"Secret").unwrap();
    sealed.truncate(sealed.len() - 1);
    assert!(matches!(
        open(&key, &sealed),
        Err(CryptoError::EnvelopeAuthenticationFailed)
    ));
}

#[test]
fn shorter_than_nonce_is_too_short() {
    let key = generate_random_key();
    let err = open(&key, &[0u8; NONCE_SIZE - 1]).unwrap_err();
    match err {
        CryptoError::EnvelopeTooShort { expected, actual } => {
            assert_eq!(expected, NONCE_SIZE);
            assert_eq!(actual, NONCE_SIZE - 1);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn exactly_one_nonce_fails_authentication_not_length() {
    let key = generate_random_key();
    assert!(matches!(
        open(&key, &[0u8; NONCE_SIZE]),
        Err(CryptoError::EnvelopeAuthenticationFailed)
    ));
}

#[test]
fn random_garbage_fails_authentication() {
    let key = generate_random_key();
    let garbage = licbind_crypto::random_bytes(1024).unwrap();
    assert!(matches!(
        open(&key, &garbage),
        Err(CryptoError::EnvelopeAuthenticationFailed)
    ));
}

#[test]
fn same_plaintext_produces_different_envelopes() {
    let key = generate_random_key();
    let e1 = encrypt(&key, b"Same").unwrap();
    let e2 = encrypt(&key, b"Same").unwrap();
    assert_ne!(e1.nonce, e2.nonce);
    assert_ne!(e1.ciphertext, e2.ciphertext);
}

// ── Envelope ─────────────────────────────────────────────────────

#[test]
fn envelope_len() {
    let key = generate_random_key();
    let envelope = encrypt(&key, b"test").unwrap();
    assert_eq!(envelope.len(), NONCE_SIZE + envelope.ciphertext.len());
    assert_eq!(envelope.to_bytes().len(), envelope.len());
}

#[test]
fn envelope_is_empty() {
    let envelope = Envelope {
        nonce: [0u8; NONCE_SIZE],
        ciphertext: vec![],
    };
    assert!(envelope.is_empty());

    let key = generate_random_key();
    assert!(!encrypt(&key, b"data").unwrap().is_empty());
}

#[test]
fn envelope_bytes_split_back() {
    let key = generate_random_key();
    let envelope = encrypt(&key, b"payload").unwrap();
    let parsed = Envelope::from_bytes(&envelope.to_bytes()).unwrap();
    assert_eq!(parsed.nonce, envelope.nonce);
    assert_eq!(decrypt(&key, &parsed).unwrap(), b"payload");
}
