// ============================================
// File: crates/centi-core/src/crypto/keys.rs
// ============================================
//! # Cryptographic Key Types
//!
//! ## Creation Reason
//! Defines the key types used by the peer protocol with proper security
//! handling (zeroization, redacted debug output, constant-time equality).
//!
//! ## Main Functionality
//! - `KeyMaterial`: Local Kyber768 + X25519 identity
//! - `SessionKey`: 32-byte key shared with one peer after a handshake
//! - `NetworkKey`: 32-byte community key authenticating key distribution
//!
//! ## Key Lifecycle
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │  KeyMaterial (Long-term)                                   │
//! │  ├─ Generated once, persisted as (pk, sk) text             │
//! │  ├─ Kyber768 pair: peers encapsulate against our pk        │
//! │  └─ X25519 pair: identity compared across peers            │
//! │                                                            │
//! │  SessionKey (Per-peer)                                     │
//! │  ├─ HKDF-SHA512(kem_ss, salt = ecdh_ss)                    │
//! │  ├─ Used for ChaCha20-Poly1305 and packet HMACs            │
//! │  └─ Replaced wholesale on re-handshake                     │
//! │                                                            │
//! │  NetworkKey (Per-network)                                  │
//! │  └─ Argon2i(<password>, <salt>)                            │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Text Form
//! ```text
//! pk = base64(kyber_pk)
//! sk = base64(kyber_sk) | base64(pkcs8(x25519_sk))
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Secret key types MUST implement Zeroize
//! - Private keys should NEVER be logged
//! - Use constant-time comparison for key equality
//!
//! ## Last Modified
//! v0.1.0 - Initial key type definitions

use std::fmt;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use pqcrypto_kyber::kyber768;
use pqcrypto_traits::kem::{PublicKey as _, SecretKey as _};
use rand::rngs::OsRng;
use subtle::ConstantTimeEq;
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::{der, mac, KEM_PUBLIC_KEY_SIZE, KEM_SECRET_KEY_SIZE, SYM_KEY_SIZE};
use crate::error::{CoreError, Result};

// ============================================
// SessionKey
// ============================================

/// Symmetric session key shared with one peer.
///
/// # Security
/// - Zeroed on drop
/// - Never logged or serialized
/// - Constant-time comparison
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SessionKey([u8; SYM_KEY_SIZE]);

impl SessionKey {
    /// Creates a session key from raw bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; SYM_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Creates a session key from a slice.
    ///
    /// # Errors
    /// - `InvalidSessionKey`: slice is not exactly 32 bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; SYM_KEY_SIZE] = bytes
            .try_into()
            .map_err(|_| CoreError::InvalidSessionKey {
                actual: bytes.len(),
            })?;
        Ok(Self(array))
    }

    /// Returns the raw key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; SYM_KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionKey([REDACTED])")
    }
}

impl PartialEq for SessionKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for SessionKey {}

// ============================================
// NetworkKey
// ============================================

/// Network-wide authentication key.
///
/// Tags public keys and handshakes so that only members of the same
/// network accept them.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct NetworkKey([u8; SYM_KEY_SIZE]);

impl NetworkKey {
    /// Creates a network key from raw bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; SYM_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Returns the raw key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; SYM_KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for NetworkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NetworkKey([REDACTED])")
    }
}

impl PartialEq for NetworkKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for NetworkKey {}

// ============================================
// KeyMaterial
// ============================================

/// Local node identity: a Kyber768 key pair and an X25519 key pair.
///
/// Immutable once created.
///
/// # Example
/// ```
/// use centi_core::crypto::KeyMaterial;
///
/// let keys = KeyMaterial::generate();
/// let (pk, sk) = keys.to_text();
/// let restored = KeyMaterial::from_text(&pk, &sk).unwrap();
/// assert_eq!(restored.ecdh_public_key().as_bytes(), keys.ecdh_public_key().as_bytes());
/// ```
pub struct KeyMaterial {
    kem_public: kyber768::PublicKey,
    kem_secret: kyber768::SecretKey,
    ecdh_secret: StaticSecret,
    ecdh_public: X25519PublicKey,
}

impl KeyMaterial {
    /// Generates a fresh identity from the OS RNG.
    #[must_use]
    pub fn generate() -> Self {
        let (kem_public, kem_secret) = kyber768::keypair();
        let ecdh_secret = StaticSecret::random_from_rng(OsRng);
        let ecdh_public = X25519PublicKey::from(&ecdh_secret);
        Self {
            kem_public,
            kem_secret,
            ecdh_secret,
            ecdh_public,
        }
    }

    /// Restores an identity from its text form.
    ///
    /// The X25519 public key is recomputed from the private key.
    ///
    /// # Errors
    /// - `KeyGeneration`: any part is malformed or has the wrong size
    pub fn from_text(pk: &str, sk: &str) -> Result<Self> {
        let kem_pk_bytes = BASE64
            .decode(pk.trim())
            .map_err(|_| CoreError::key_generation("public key is not valid base64"))?;
        let kem_public = kyber768::PublicKey::from_bytes(&kem_pk_bytes).map_err(|_| {
            CoreError::key_generation(format!(
                "Kyber768 public key must be {KEM_PUBLIC_KEY_SIZE} bytes"
            ))
        })?;

        let (kem_sk_text, ecdh_sk_text) = sk
            .trim()
            .split_once('|')
            .ok_or_else(|| CoreError::key_generation("private key must be '<kem>|<ecdh>'"))?;

        let kem_sk_bytes = Zeroizing::new(
            BASE64
                .decode(kem_sk_text)
                .map_err(|_| CoreError::key_generation("KEM private key is not valid base64"))?,
        );
        let kem_secret = kyber768::SecretKey::from_bytes(&kem_sk_bytes).map_err(|_| {
            CoreError::key_generation(format!(
                "Kyber768 private key must be {KEM_SECRET_KEY_SIZE} bytes"
            ))
        })?;

        let ecdh_der = Zeroizing::new(
            BASE64
                .decode(ecdh_sk_text)
                .map_err(|_| CoreError::key_generation("ECDH private key is not valid base64"))?,
        );
        let ecdh_secret = der::decode_private_key(&ecdh_der)?;
        let ecdh_public = X25519PublicKey::from(&ecdh_secret);

        Ok(Self {
            kem_public,
            kem_secret,
            ecdh_secret,
            ecdh_public,
        })
    }

    /// Serializes the identity to `(pk, sk)` text.
    ///
    /// # Security Warning
    /// The second element contains private key material.
    #[must_use]
    pub fn to_text(&self) -> (String, String) {
        let pk = BASE64.encode(self.kem_public.as_bytes());
        let ecdh_der = der::encode_private_key(&self.ecdh_secret);
        let sk = format!(
            "{}|{}",
            BASE64.encode(self.kem_secret.as_bytes()),
            BASE64.encode(ecdh_der.as_slice())
        );
        (pk, sk)
    }

    /// Returns the Kyber768 public key.
    #[must_use]
    pub fn kem_public_key(&self) -> &kyber768::PublicKey {
        &self.kem_public
    }

    pub(crate) fn kem_secret_key(&self) -> &kyber768::SecretKey {
        &self.kem_secret
    }

    /// Returns the X25519 public key.
    #[must_use]
    pub fn ecdh_public_key(&self) -> &X25519PublicKey {
        &self.ecdh_public
    }

    /// Returns the X25519 private key.
    #[must_use]
    pub fn ecdh_secret(&self) -> &StaticSecret {
        &self.ecdh_secret
    }

    /// Returns the distributable public key blob.
    ///
    /// ```text
    /// kyber_pk (1184) || spki(x25519_pk) (44) [|| HMAC-SHA512 (64)]
    /// ```
    ///
    /// The trailing tag is present only when a network key is given.
    ///
    /// # Errors
    /// Returns an error if the tag cannot be computed.
    pub fn public_key_bytes(&self, network_key: Option<&NetworkKey>) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(super::SIGNED_PUBLIC_KEY_SIZE);
        out.extend_from_slice(self.kem_public.as_bytes());
        out.extend_from_slice(&der::encode_public_key(&self.ecdh_public));
        if let Some(key) = network_key {
            let tag = mac::hmac_sha512(key.as_bytes(), &out)?;
            out.extend_from_slice(&tag);
        }
        Ok(out)
    }

    /// Returns [`public_key_bytes`](Self::public_key_bytes) as base64.
    ///
    /// # Errors
    /// Returns an error if the tag cannot be computed.
    pub fn encoded_public_key(&self, network_key: Option<&NetworkKey>) -> Result<String> {
        Ok(BASE64.encode(self.public_key_bytes(network_key)?))
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("ecdh_public", &hex::encode(self.ecdh_public.as_bytes()))
            .field("secrets", &"[REDACTED]")
            .finish()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{PUBLIC_KEY_SIZE, SIGNED_PUBLIC_KEY_SIZE, X25519_SPKI_SIZE};

    #[test]
    fn test_kem_sizes_match_constants() {
        assert_eq!(kyber768::public_key_bytes(), KEM_PUBLIC_KEY_SIZE);
        assert_eq!(kyber768::secret_key_bytes(), KEM_SECRET_KEY_SIZE);
        assert_eq!(kyber768::ciphertext_bytes(), crate::crypto::KEM_CIPHERTEXT_SIZE);
        assert_eq!(kyber768::shared_secret_bytes(), SYM_KEY_SIZE);
    }

    #[test]
    fn test_text_roundtrip() {
        let keys = KeyMaterial::generate();
        let (pk, sk) = keys.to_text();
        assert!(sk.contains('|'));

        let restored = KeyMaterial::from_text(&pk, &sk).unwrap();
        assert_eq!(restored.kem_public_key().as_bytes(), keys.kem_public_key().as_bytes());
        assert_eq!(restored.ecdh_public_key().as_bytes(), keys.ecdh_public_key().as_bytes());
        assert_eq!(restored.to_text(), (pk, sk));
    }

    #[test]
    fn test_from_text_rejects_garbage() {
        let keys = KeyMaterial::generate();
        let (pk, sk) = keys.to_text();

        assert!(KeyMaterial::from_text("not base64!", &sk).is_err());
        assert!(KeyMaterial::from_text(&pk, "no-delimiter").is_err());
        assert!(KeyMaterial::from_text(&BASE64.encode([0u8; 10]), &sk).is_err());

        let (kem_sk, _) = sk.split_once('|').unwrap();
        let bad = format!("{kem_sk}|{}", BASE64.encode([0u8; 48]));
        assert!(KeyMaterial::from_text(&pk, &bad).is_err());
    }

    #[test]
    fn test_public_key_bytes_layout() {
        let keys = KeyMaterial::generate();

        let plain = keys.public_key_bytes(None).unwrap();
        assert_eq!(plain.len(), PUBLIC_KEY_SIZE);
        assert_eq!(&plain[..KEM_PUBLIC_KEY_SIZE], keys.kem_public_key().as_bytes());
        let spki = &plain[KEM_PUBLIC_KEY_SIZE..KEM_PUBLIC_KEY_SIZE + X25519_SPKI_SIZE];
        assert_eq!(
            der::decode_public_key(spki).unwrap().as_bytes(),
            keys.ecdh_public_key().as_bytes()
        );

        let network_key = NetworkKey::from_bytes([7u8; 32]);
        let signed = keys.public_key_bytes(Some(&network_key)).unwrap();
        assert_eq!(signed.len(), SIGNED_PUBLIC_KEY_SIZE);
        assert!(mac::verify_hmac_sha512(
            network_key.as_bytes(),
            &signed[..PUBLIC_KEY_SIZE],
            &signed[PUBLIC_KEY_SIZE..]
        ));
    }

    #[test]
    fn test_session_key_from_slice() {
        assert!(SessionKey::from_slice(&[1u8; 32]).is_ok());
        assert!(matches!(
            SessionKey::from_slice(&[1u8; 31]),
            Err(CoreError::InvalidSessionKey { actual: 31 })
        ));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let key = SessionKey::from_bytes([0xAB; 32]);
        assert!(!format!("{key:?}").contains("ab"));

        let keys = KeyMaterial::generate();
        let (_, sk) = keys.to_text();
        let debug = format!("{keys:?}");
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains(&sk));
    }

    #[test]
    fn test_session_key_equality() {
        let a = SessionKey::from_bytes([1u8; 32]);
        let b = SessionKey::from_bytes([1u8; 32]);
        let c = SessionKey::from_bytes([2u8; 32]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
