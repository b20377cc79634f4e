// ============================================
// File: crates/centi-core/src/crypto/handshake.rs
// ============================================
//! # Hybrid Handshake
//!
//! ## Creation Reason
//! Establishes a session key with one peer by combining a Kyber768 KEM
//! exchange with X25519 ECDH, so the key stays secret unless both
//! primitives are broken.
//!
//! ## Handshake Flow
//! ```text
//! Initiator                                        Responder
//!   │                                                  │
//!   │  (ss_kem, ct) = Kyber768.Encaps(responder_kem_pk)│
//!   │  enc_pk = AEAD(ss_kem, spki(our_x25519_pk))      │
//!   │  tag    = HMAC-SHA512(network_subkey, enc_pk)    │
//!   │                                                  │
//!   │  frame(ct || enc_pk || tag) ───────────────────► │
//!   │                                                  │
//!   │                     ss_kem = Decaps(ct)          │
//!   │                     our_pk = AEAD⁻¹(ss_kem, enc) │
//!   │                     check tag (caller)           │
//!   │                                                  │
//!   │  ss_ecdh = X25519(a, B)      ss_ecdh = X25519(b, A)
//!   │  key = HKDF-SHA512(ss_kem, salt = ss_ecdh)       │
//! ```
//!
//! ## Wire Layout (inside the fixed frame)
//! ```text
//! ┌───────────────────────┬────────────────────────┬──────────────────┐
//! │ Kyber768 ct (1088)    │ AEAD(spki pk) (72)     │ HMAC-SHA512 (64) │
//! └───────────────────────┴────────────────────────┴──────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - The blob is framed to the full packet size so a handshake has the
//!   same length on the wire as a data packet
//! - Decapsulation failures are expected traffic (packets meant for other
//!   peers); they are reported, never logged above `trace`
//! - The caller decides whether to commit the derived key
//!
//! ## Last Modified
//! v0.1.0 - Initial handshake implementation

use std::fmt;

use pqcrypto_kyber::kyber768;
use pqcrypto_traits::kem::{Ciphertext as _, SharedSecret as _};
use tracing::trace;
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};

use super::keys::{KeyMaterial, SessionKey};
use super::{
    aead, der, frame, kdf, mac, ENCRYPTED_ECDH_KEY_SIZE, HANDSHAKE_BLOB_SIZE, HASH_SIZE,
    KEM_CIPHERTEXT_SIZE, X25519_SPKI_SIZE,
};
use crate::error::{CoreError, Result};
use crate::protocol::check_packet_size;

// ============================================
// Encapsulation
// ============================================

/// Result of initiating a handshake.
pub struct Encapsulated {
    /// Derived session key; commit it only if the peer has none yet.
    pub session_key: SessionKey,
    /// Framed handshake packet of exactly `packet_size` bytes.
    pub wire: Vec<u8>,
}

impl fmt::Debug for Encapsulated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Encapsulated")
            .field("session_key", &self.session_key)
            .field("wire_len", &self.wire.len())
            .finish()
    }
}

/// Builds a handshake packet addressed to a peer.
///
/// # Arguments
/// * `peer_kem_public` - Peer's Kyber768 public key
/// * `peer_ecdh_public` - Peer's X25519 public key
/// * `our_ecdh_secret` - Our X25519 private key
/// * `packet_size` - Wire packet size
/// * `network_subkey` - Key authenticating network membership
///
/// # Errors
/// - `PacketSizeTooSmall`: `packet_size` below the protocol floor
/// - `InvalidPublicKey`: peer's X25519 key is a low-order point
/// - `Encryption` / `KeyDerivation`: primitive failures
pub fn encapsulate_and_pack(
    peer_kem_public: &kyber768::PublicKey,
    peer_ecdh_public: &X25519PublicKey,
    our_ecdh_secret: &StaticSecret,
    packet_size: usize,
    network_subkey: &[u8],
) -> Result<Encapsulated> {
    check_packet_size(packet_size)?;

    let (kem_shared, kem_ciphertext) = kyber768::encapsulate(peer_kem_public);

    let our_public = der::encode_public_key(&X25519PublicKey::from(our_ecdh_secret));
    let encrypted_public = aead::encrypt(kem_shared.as_bytes(), &our_public)?;
    let tag = mac::hmac_sha512(network_subkey, &encrypted_public)?;

    let mut blob = Vec::with_capacity(HANDSHAKE_BLOB_SIZE);
    blob.extend_from_slice(kem_ciphertext.as_bytes());
    blob.extend_from_slice(&encrypted_public);
    blob.extend_from_slice(&tag);
    let wire = frame::pack_fixed(&blob, packet_size)?;

    let ecdh_shared = our_ecdh_secret.diffie_hellman(peer_ecdh_public);
    if !ecdh_shared.was_contributory() {
        return Err(CoreError::invalid_public_key("low-order X25519 point"));
    }

    let session_key = kdf::combine_shared_secrets(kem_shared.as_bytes(), ecdh_shared.as_bytes())?;
    Ok(Encapsulated { session_key, wire })
}

// ============================================
// Decapsulation
// ============================================

/// Result of accepting a handshake packet.
pub struct Decapsulated {
    session_key: SessionKey,
    peer_ecdh_public: X25519PublicKey,
    encrypted_ecdh_public: Vec<u8>,
    auth_tag: [u8; HASH_SIZE],
    fingerprint: String,
}

impl Decapsulated {
    /// Returns the derived session key.
    #[must_use]
    pub fn session_key(&self) -> &SessionKey {
        &self.session_key
    }

    /// Consumes the result, returning the session key.
    #[must_use]
    pub fn into_session_key(self) -> SessionKey {
        self.session_key
    }

    /// Returns the initiator's X25519 public key.
    #[must_use]
    pub fn peer_ecdh_public(&self) -> &X25519PublicKey {
        &self.peer_ecdh_public
    }

    /// Returns the initiator's X25519 public key as SPKI DER.
    #[must_use]
    pub fn peer_public_key_der(&self) -> [u8; X25519_SPKI_SIZE] {
        der::encode_public_key(&self.peer_ecdh_public)
    }

    /// Returns the authentication tag carried by the handshake.
    #[must_use]
    pub fn auth_tag(&self) -> &[u8] {
        &self.auth_tag
    }

    /// SHA-512 hex of the KEM ciphertext. Unique per encapsulation, so a
    /// re-delivered handshake has the fingerprint of the original.
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Checks the tag against a network subkey in constant time.
    #[must_use]
    pub fn is_authentic(&self, network_subkey: &[u8]) -> bool {
        mac::verify_hmac_sha512(network_subkey, &self.encrypted_ecdh_public, &self.auth_tag)
    }
}

impl fmt::Debug for Decapsulated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decapsulated")
            .field("session_key", &self.session_key)
            .field("peer_ecdh_public", &hex::encode(self.peer_ecdh_public.as_bytes()))
            .finish_non_exhaustive()
    }
}

impl KeyMaterial {
    /// Accepts a handshake packet addressed to us.
    ///
    /// The network tag is returned, not checked; see
    /// [`Decapsulated::is_authentic`].
    ///
    /// # Errors
    /// - `PacketSizeTooSmall`: `packet_size` below the protocol floor
    /// - `MessageTooShort`: framed blob smaller than a handshake
    /// - `HandshakeRejected`: not a handshake, or not one for us
    pub fn decapsulate_and_unpack(&self, wire: &[u8], packet_size: usize) -> Result<Decapsulated> {
        check_packet_size(packet_size)?;

        let blob = frame::unpack_fixed(wire, packet_size).map_err(|_| CoreError::HandshakeRejected)?;
        if blob.len() < HANDSHAKE_BLOB_SIZE {
            return Err(CoreError::too_short(HANDSHAKE_BLOB_SIZE, blob.len()));
        }
        if blob.len() > HANDSHAKE_BLOB_SIZE {
            return Err(CoreError::HandshakeRejected);
        }

        let (ciphertext, rest) = blob.split_at(KEM_CIPHERTEXT_SIZE);
        let (encrypted_public, tag) = rest.split_at(ENCRYPTED_ECDH_KEY_SIZE);
        let fingerprint = mac::sha512_hex(ciphertext);

        let ciphertext = kyber768::Ciphertext::from_bytes(ciphertext)
            .map_err(|_| CoreError::HandshakeRejected)?;
        let kem_shared = kyber768::decapsulate(&ciphertext, self.kem_secret_key());

        let public_der = aead::decrypt(kem_shared.as_bytes(), encrypted_public).map_err(|_| {
            trace!("Handshake ECDH key failed to decrypt");
            CoreError::HandshakeRejected
        })?;
        let peer_ecdh_public =
            der::decode_public_key(&public_der).map_err(|_| CoreError::HandshakeRejected)?;

        let ecdh_shared = self.ecdh_secret().diffie_hellman(&peer_ecdh_public);
        if !ecdh_shared.was_contributory() {
            return Err(CoreError::HandshakeRejected);
        }

        let session_key =
            kdf::combine_shared_secrets(kem_shared.as_bytes(), ecdh_shared.as_bytes())?;

        let mut auth_tag = [0u8; HASH_SIZE];
        auth_tag.copy_from_slice(tag);

        Ok(Decapsulated {
            session_key,
            peer_ecdh_public,
            encrypted_ecdh_public: encrypted_public.to_vec(),
            auth_tag,
            fingerprint,
        })
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::MIN_PACKET_SIZE;

    const SUBKEY: &[u8] = b"network-subkey";

    fn initiate(from: &KeyMaterial, to: &KeyMaterial, packet_size: usize) -> Encapsulated {
        encapsulate_and_pack(
            to.kem_public_key(),
            to.ecdh_public_key(),
            from.ecdh_secret(),
            packet_size,
            SUBKEY,
        )
        .unwrap()
    }

    #[test]
    fn test_both_sides_derive_same_key() {
        let alice = KeyMaterial::generate();
        let bob = KeyMaterial::generate();

        let hello = initiate(&alice, &bob, 4096);
        let accepted = bob.decapsulate_and_unpack(&hello.wire, 4096).unwrap();

        assert_eq!(accepted.session_key(), &hello.session_key);
        assert_eq!(
            accepted.peer_ecdh_public().as_bytes(),
            alice.ecdh_public_key().as_bytes()
        );
    }

    #[test]
    fn test_wire_is_packet_sized() {
        let alice = KeyMaterial::generate();
        let bob = KeyMaterial::generate();

        for size in [MIN_PACKET_SIZE, 4096, 8192] {
            assert_eq!(initiate(&alice, &bob, size).wire.len(), size);
        }
    }

    #[test]
    fn test_auth_tag_checked_against_subkey() {
        let alice = KeyMaterial::generate();
        let bob = KeyMaterial::generate();

        let hello = initiate(&alice, &bob, 4096);
        let accepted = bob.decapsulate_and_unpack(&hello.wire, 4096).unwrap();

        assert_eq!(accepted.auth_tag().len(), HASH_SIZE);
        assert!(accepted.is_authentic(SUBKEY));
        assert!(!accepted.is_authentic(b"another network"));
    }

    #[test]
    fn test_fresh_key_per_handshake() {
        let alice = KeyMaterial::generate();
        let bob = KeyMaterial::generate();

        let first = initiate(&alice, &bob, 4096);
        let second = initiate(&alice, &bob, 4096);
        assert_ne!(first.session_key, second.session_key);
    }

    #[test]
    fn test_fingerprint_identifies_redelivery() {
        let alice = KeyMaterial::generate();
        let bob = KeyMaterial::generate();

        let hello = initiate(&alice, &bob, 4096);
        let once = bob.decapsulate_and_unpack(&hello.wire, 4096).unwrap();
        let again = bob.decapsulate_and_unpack(&hello.wire, 4096).unwrap();
        assert_eq!(once.fingerprint(), again.fingerprint());
        assert_eq!(once.fingerprint().len(), HASH_SIZE * 2);

        let other = initiate(&alice, &bob, 4096);
        let other = bob.decapsulate_and_unpack(&other.wire, 4096).unwrap();
        assert_ne!(once.fingerprint(), other.fingerprint());
    }

    #[test]
    fn test_wrong_recipient_rejected() {
        let alice = KeyMaterial::generate();
        let bob = KeyMaterial::generate();
        let carol = KeyMaterial::generate();

        let hello = initiate(&alice, &bob, 4096);
        let result = carol.decapsulate_and_unpack(&hello.wire, 4096);
        assert!(matches!(result, Err(CoreError::HandshakeRejected)));
    }

    #[test]
    fn test_tampered_handshake_rejected() {
        let alice = KeyMaterial::generate();
        let bob = KeyMaterial::generate();

        let mut hello = initiate(&alice, &bob, 4096);
        // flip a bit inside the encrypted ECDH key
        hello.wire[8 + KEM_CIPHERTEXT_SIZE + 20] ^= 0x01;
        assert!(bob.decapsulate_and_unpack(&hello.wire, 4096).is_err());
    }

    #[test]
    fn test_undersized_blob_rejected() {
        let bob = KeyMaterial::generate();
        let wire = frame::pack_fixed(&[0u8; 100], 4096).unwrap();

        let result = bob.decapsulate_and_unpack(&wire, 4096);
        assert!(matches!(result, Err(CoreError::MessageTooShort { .. })));
    }

    #[test]
    fn test_minimum_packet_size_enforced() {
        let alice = KeyMaterial::generate();
        let bob = KeyMaterial::generate();

        let result = encapsulate_and_pack(
            bob.kem_public_key(),
            bob.ecdh_public_key(),
            alice.ecdh_secret(),
            MIN_PACKET_SIZE - 1,
            SUBKEY,
        );
        assert!(matches!(result, Err(CoreError::PacketSizeTooSmall { .. })));

        let result = bob.decapsulate_and_unpack(&[0u8; 100], 100);
        assert!(matches!(result, Err(CoreError::PacketSizeTooSmall { .. })));
    }

    #[test]
    fn test_random_noise_rejected() {
        let bob = KeyMaterial::generate();
        let noise = centi_common::random::random_bytes(4096).unwrap();
        assert!(bob.decapsulate_and_unpack(&noise, 4096).is_err());
    }
}
