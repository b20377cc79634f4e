// ============================================
// File: crates/centi-core/src/crypto/aead.rs
// ============================================
//! # Symmetric Encryption
//!
//! ## Creation Reason
//! Provides authenticated encryption for framed packets and for the
//! ECDH public key carried inside a handshake, using ChaCha20-Poly1305.
//!
//! ## Ciphertext Format
//! ```text
//! ┌──────────────────┬──────────────────────────┬──────────────────┐
//! │ Nonce (12 bytes) │ ChaCha20 ciphertext      │ Poly1305 (16)    │
//! └──────────────────┴──────────────────────────┴──────────────────┘
//! ```
//!
//! ## Nonce Construction
//! Every call draws a fresh 96-bit nonce from the OS RNG. Packets travel
//! over unordered, lossy transports, so there is no shared counter that
//! both sides could agree on.
//!
//! ## ⚠️ Important Note for Next Developer
//! - Output is always exactly `plaintext.len() + AEAD_OVERHEAD` bytes;
//!   the packet size arithmetic depends on it
//! - Any decryption failure is reported as the single `Decryption` variant
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};

use centi_common::random::fill_random;

use super::{AEAD_OVERHEAD, NONCE_SIZE};
use crate::error::{CoreError, Result};

/// Encrypts `plaintext` under a 32-byte `key`.
///
/// # Returns
/// `nonce || ciphertext || tag`
///
/// # Errors
/// - `Encryption`: key has the wrong length or the RNG failed
pub fn encrypt(key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new_from_slice(key).map_err(|_| CoreError::Encryption {
        context: "invalid key length".into(),
    })?;

    let mut nonce = [0u8; NONCE_SIZE];
    fill_random(&mut nonce)?;

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|_| CoreError::Encryption {
            context: "ChaCha20-Poly1305 encryption failed".into(),
        })?;

    let mut output = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    output.extend_from_slice(&nonce);
    output.extend_from_slice(&ciphertext);
    Ok(output)
}

/// Decrypts `nonce || ciphertext || tag` produced by [`encrypt`].
///
/// # Errors
/// - `Decryption`: input too short, wrong key, or tampered ciphertext
pub fn decrypt(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    if data.len() < AEAD_OVERHEAD {
        return Err(CoreError::Decryption);
    }

    let cipher = ChaCha20Poly1305::new_from_slice(key).map_err(|_| CoreError::Decryption)?;
    let (nonce, ciphertext) = data.split_at(NONCE_SIZE);

    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CoreError::Decryption)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; 32] = [0x42; 32];

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let plaintext = b"attack at dawn";
        let ciphertext = encrypt(&KEY, plaintext).unwrap();

        assert_eq!(ciphertext.len(), plaintext.len() + AEAD_OVERHEAD);
        assert_eq!(decrypt(&KEY, &ciphertext).unwrap(), plaintext);
    }

    #[test]
    fn test_fresh_nonce_per_call() {
        let a = encrypt(&KEY, b"same").unwrap();
        let b = encrypt(&KEY, b"same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_key_fails() {
        let ciphertext = encrypt(&KEY, b"secret").unwrap();
        let result = decrypt(&[0x43; 32], &ciphertext);
        assert!(matches!(result, Err(CoreError::Decryption)));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let mut ciphertext = encrypt(&KEY, b"secret").unwrap();
        ciphertext[NONCE_SIZE] ^= 0x01;
        assert!(matches!(decrypt(&KEY, &ciphertext), Err(CoreError::Decryption)));
    }

    #[test]
    fn test_empty_plaintext() {
        let ciphertext = encrypt(&KEY, b"").unwrap();
        assert_eq!(ciphertext.len(), AEAD_OVERHEAD);
        assert!(decrypt(&KEY, &ciphertext).unwrap().is_empty());
    }

    #[test]
    fn test_short_input_rejected() {
        assert!(matches!(decrypt(&KEY, &[0u8; 10]), Err(CoreError::Decryption)));
    }

    #[test]
    fn test_bad_key_length() {
        assert!(matches!(
            encrypt(&[0u8; 16], b"x"),
            Err(CoreError::Encryption { .. })
        ));
    }
}
