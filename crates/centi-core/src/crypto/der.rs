// ============================================
// File: crates/centi-core/src/crypto/der.rs
// ============================================
//! # X25519 DER Encodings
//!
//! Public keys travel as SubjectPublicKeyInfo and private keys are stored
//! as PKCS#8, both with the RFC 8410 `id-X25519` algorithm identifier.
//! Both layouts are fixed-length so they are handled as a constant prefix
//! followed by the 32 raw key bytes.
//!
//! ```text
//! SPKI   (44): 30 2a 30 05 06 03 2b 65 6e 03 21 00 || key(32)
//! PKCS#8 (48): 30 2e 02 01 00 30 05 06 03 2b 65 6e 04 22 04 20 || key(32)
//! ```

use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use zeroize::Zeroizing;

use super::{X25519_KEY_SIZE, X25519_PKCS8_SIZE, X25519_SPKI_SIZE};
use crate::error::{CoreError, Result};

const SPKI_PREFIX: [u8; 12] = [
    0x30, 0x2a, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x6e, 0x03, 0x21, 0x00,
];

const PKCS8_PREFIX: [u8; 16] = [
    0x30, 0x2e, 0x02, 0x01, 0x00, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x6e, 0x04, 0x22, 0x04,
    0x20,
];

/// Encodes an X25519 public key as SPKI DER.
#[must_use]
pub fn encode_public_key(key: &X25519PublicKey) -> [u8; X25519_SPKI_SIZE] {
    let mut out = [0u8; X25519_SPKI_SIZE];
    out[..SPKI_PREFIX.len()].copy_from_slice(&SPKI_PREFIX);
    out[SPKI_PREFIX.len()..].copy_from_slice(key.as_bytes());
    out
}

/// Parses an SPKI DER X25519 public key.
///
/// # Errors
/// - `InvalidPublicKey`: wrong length or algorithm identifier
pub fn decode_public_key(der: &[u8]) -> Result<X25519PublicKey> {
    if der.len() != X25519_SPKI_SIZE || der[..SPKI_PREFIX.len()] != SPKI_PREFIX {
        return Err(CoreError::invalid_public_key("not an X25519 SPKI structure"));
    }
    let mut raw = [0u8; X25519_KEY_SIZE];
    raw.copy_from_slice(&der[SPKI_PREFIX.len()..]);
    Ok(X25519PublicKey::from(raw))
}

/// Encodes an X25519 private key as PKCS#8 DER.
#[must_use]
pub fn encode_private_key(secret: &StaticSecret) -> Zeroizing<Vec<u8>> {
    let mut out = Zeroizing::new(Vec::with_capacity(X25519_PKCS8_SIZE));
    out.extend_from_slice(&PKCS8_PREFIX);
    out.extend_from_slice(secret.as_bytes());
    out
}

/// Parses a PKCS#8 DER X25519 private key.
///
/// # Errors
/// - `KeyGeneration`: wrong length or algorithm identifier
pub fn decode_private_key(der: &[u8]) -> Result<StaticSecret> {
    if der.len() != X25519_PKCS8_SIZE || der[..PKCS8_PREFIX.len()] != PKCS8_PREFIX {
        return Err(CoreError::key_generation("not an X25519 PKCS#8 structure"));
    }
    let mut raw = Zeroizing::new([0u8; X25519_KEY_SIZE]);
    raw.copy_from_slice(&der[PKCS8_PREFIX.len()..]);
    Ok(StaticSecret::from(*raw))
}
