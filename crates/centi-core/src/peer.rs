// ============================================
// File: crates/centi-core/src/peer.rs
// ============================================
//! # Peer
//!
//! ## Creation Reason
//! Represents one remote party and owns every piece of mutable state tied
//! to it: public keys, session key, alias. All of it sits behind a single
//! per-peer mutex so a lookup through `PeerManager` never has to take a
//! global lock to mutate a peer.
//!
//! ## Main Functionality
//! - Public key installation (with optional network authentication)
//! - Handshake initiation and session installation
//! - `pack` / `unpack`: compression, fragmentation, wire document, fixed
//!   framing and AEAD encryption
//! - Onion re-wrapping for relayed delivery
//! - Public key list exchange
//!
//! ## Peer State
//! ```text
//! ┌─────────┐  set_public_key   ┌──────────┐  install_session*  ┌────────────────────┐
//! │ Unknown │ ────────────────► │ KeyKnown │ ─────────────────► │ SessionEstablished │
//! └─────────┘                   └──────────┘                    └────────────────────┘
//!      │                                                            ▲      │
//!      └──────────────── install_session (responder) ──────────────┘      │
//!                                                       re-handshake ◄─────┘
//! ```
//!
//! ## Pack Pipeline
//! ```text
//! data ─► gzip? ─► chunks(max_chunk_size) ─► pack_data ─► pack_fixed ─► AEAD ─► packet_size bytes
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - The mutex is held for the whole of `pack`/`unpack`; never call back
//!   into the same peer while holding it
//! - Replacing a session is one assignment under the lock. Never write the
//!   X25519 key and the session key in separate critical sections.
//! - A changed X25519 identity invalidates the KEM key and session key
//!
//! ## Last Modified
//! v0.1.0 - Initial peer implementation

use std::fmt;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use parking_lot::Mutex;
use pqcrypto_kyber::kyber768;
use pqcrypto_traits::kem::PublicKey as _;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use x25519_dalek::PublicKey as X25519PublicKey;

use centi_common::random::{random_bytes, random_index};
use centi_common::CommonError;

use crate::crypto::handshake::{self, Encapsulated};
use crate::crypto::keys::{KeyMaterial, NetworkKey, SessionKey};
use crate::crypto::{
    aead, der, frame, mac, KEM_PUBLIC_KEY_SIZE, PUBLIC_KEY_SIZE, SIGNED_PUBLIC_KEY_SIZE,
    X25519_SPKI_SIZE,
};
use crate::error::{CoreError, Result};
use crate::protocol::{
    check_packet_size, compress, inner_frame_size, max_chunk_size, pack_data,
    unpack_data_to_packet, Packet, PacketType,
};

/// Dummy payload length of a public key request.
const PUBLIC_KEY_REQUEST_SIZE: usize = 10;

// ============================================
// PeerState
// ============================================

/// How far the key exchange with a peer has progressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    /// Alias only.
    Unknown,
    /// Public key known, no session yet.
    KeyKnown,
    /// Session key installed.
    SessionEstablished,
}

// ============================================
// KnownPublicKey
// ============================================

/// One entry of a public key list exchanged between peers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownPublicKey {
    /// Advisory platform hint.
    #[serde(default)]
    pub platform: String,
    /// Alias the sender knows this key under.
    pub alias: String,
    /// Base64 public key blob.
    pub content: String,
}

impl KnownPublicKey {
    /// Decodes the public key blob.
    ///
    /// # Errors
    /// Returns an error if `content` is not valid base64.
    pub fn public_key_bytes(&self) -> Result<Vec<u8>> {
        Ok(BASE64.decode(&self.content).map_err(CommonError::from)?)
    }
}

// ============================================
// Peer
// ============================================

struct PeerInner {
    alias: String,
    platform: String,
    kem_public: Option<kyber768::PublicKey>,
    ecdh_public: Option<X25519PublicKey>,
    public_key_bytes: Vec<u8>,
    session_key: Option<SessionKey>,
}

impl PeerInner {
    fn session_key(&self) -> Result<&SessionKey> {
        self.session_key
            .as_ref()
            .ok_or_else(|| CoreError::missing_session_key(&self.alias))
    }

    /// Replaces the X25519 identity. A different key drops everything
    /// derived from the old one.
    fn replace_ecdh_public(&mut self, key: X25519PublicKey) {
        let changed = self
            .ecdh_public
            .map_or(false, |current| current.as_bytes() != key.as_bytes());
        if changed {
            debug!(alias = %self.alias, "Peer identity changed, dropping stale keys");
            self.kem_public = None;
            self.session_key = None;
        }
        if changed || self.kem_public.is_none() {
            self.public_key_bytes = der::encode_public_key(&key).to_vec();
        }
        self.ecdh_public = Some(key);
    }
}

/// A remote party.
pub struct Peer {
    inner: Mutex<PeerInner>,
}

impl Peer {
    /// Creates a discovery placeholder that knows only an alias.
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            inner: Mutex::new(PeerInner {
                alias: alias.into(),
                platform: String::new(),
                kem_public: None,
                ecdh_public: None,
                public_key_bytes: Vec::new(),
                session_key: None,
            }),
        }
    }

    /// Creates a peer with a known public key blob.
    ///
    /// # Errors
    /// See [`set_public_key`](Self::set_public_key).
    pub fn with_public_key(
        alias: impl Into<String>,
        public_key: &[u8],
        network_key: Option<&NetworkKey>,
    ) -> Result<Self> {
        let peer = Self::new(alias);
        peer.set_public_key(public_key, network_key)?;
        Ok(peer)
    }

    // ========================================
    // Accessors
    // ========================================

    /// Returns the alias.
    #[must_use]
    pub fn alias(&self) -> String {
        self.inner.lock().alias.clone()
    }

    /// Renames the peer.
    pub fn set_alias(&self, alias: impl Into<String>) {
        self.inner.lock().alias = alias.into();
    }

    /// Returns the platform hint.
    #[must_use]
    pub fn platform(&self) -> String {
        self.inner.lock().platform.clone()
    }

    /// Sets the platform hint.
    pub fn set_platform(&self, platform: impl Into<String>) {
        self.inner.lock().platform = platform.into();
    }

    /// Canonical public key bytes: the KEM + SPKI blob when the full key
    /// is known, the SPKI alone when only the X25519 key is, else empty.
    #[must_use]
    pub fn public_key_bytes(&self) -> Vec<u8> {
        self.inner.lock().public_key_bytes.clone()
    }

    /// Returns the peer's X25519 public key, if known.
    #[must_use]
    pub fn ecdh_public_key(&self) -> Option<X25519PublicKey> {
        self.inner.lock().ecdh_public
    }

    /// Returns the current key exchange state.
    #[must_use]
    pub fn state(&self) -> PeerState {
        let inner = self.inner.lock();
        if inner.session_key.is_some() {
            PeerState::SessionEstablished
        } else if inner.ecdh_public.is_some() {
            PeerState::KeyKnown
        } else {
            PeerState::Unknown
        }
    }

    /// Checks if a 32-byte session key is installed.
    #[must_use]
    pub fn has_valid_session_key(&self) -> bool {
        self.inner.lock().session_key.is_some()
    }

    /// Checks if a handshake can be initiated towards this peer.
    #[must_use]
    pub fn has_kem_public_key(&self) -> bool {
        self.inner.lock().kem_public.is_some()
    }

    /// Returns a copy of the session key, if any.
    #[must_use]
    pub fn session_key(&self) -> Option<SessionKey> {
        self.inner.lock().session_key.clone()
    }

    // ========================================
    // Key Installation
    // ========================================

    /// Installs a public key blob.
    ///
    /// Accepts the bare blob (`kem_pk || spki`) or the blob with a trailing
    /// HMAC-SHA512 tag. With a network key the tag is required and checked;
    /// without one any tag is stripped unverified. Only the bare blob is
    /// stored.
    ///
    /// # Errors
    /// - `InvalidPublicKey`: wrong length, bad tag, or unparsable key
    pub fn set_public_key(&self, public_key: &[u8], network_key: Option<&NetworkKey>) -> Result<()> {
        let (kem_public, ecdh_public, body) = parse_public_key(public_key, network_key)?;

        let mut inner = self.inner.lock();
        inner.replace_ecdh_public(ecdh_public);
        inner.kem_public = Some(kem_public);
        inner.public_key_bytes = body.to_vec();
        trace!(alias = %inner.alias, "Public key installed");
        Ok(())
    }

    /// Installs only the X25519 key, as learned from a handshake.
    ///
    /// # Errors
    /// - `InvalidPublicKey`: `spki` is not an X25519 SPKI document
    pub fn set_ecdh_public_key(&self, spki: &[u8]) -> Result<()> {
        let key = der::decode_public_key(spki)?;
        self.inner.lock().replace_ecdh_public(key);
        Ok(())
    }

    /// Checks if `public_key` belongs to this peer.
    ///
    /// Identity is the X25519 key. `public_key` may be a SPKI document or
    /// a full public key blob, tagged or not.
    #[must_use]
    pub fn matches_public_key(&self, public_key: &[u8]) -> bool {
        let Some(candidate) = extract_ecdh_public(public_key) else {
            return false;
        };
        self.inner
            .lock()
            .ecdh_public
            .map_or(false, |own| own.as_bytes() == candidate.as_bytes())
    }

    /// Installs a raw session key on a peer whose X25519 key is known.
    ///
    /// # Errors
    /// - `InvalidSessionKey`: `key` is not exactly 32 bytes
    /// - `MissingPeerKey`: no public key is known for the peer yet
    pub fn set_session_key(&self, key: &[u8]) -> Result<()> {
        let key = SessionKey::from_slice(key)?;
        let mut inner = self.inner.lock();
        if inner.ecdh_public.is_none() {
            return Err(CoreError::missing_peer_key(&inner.alias));
        }
        inner.session_key = Some(key);
        Ok(())
    }

    /// Installs the result of an accepted handshake, replacing any
    /// previous session in one step.
    pub fn install_session(&self, peer_ecdh_public: X25519PublicKey, session_key: SessionKey) {
        let mut inner = self.inner.lock();
        inner.replace_ecdh_public(peer_ecdh_public);
        inner.session_key = Some(session_key);
        debug!(alias = %inner.alias, "Session installed");
    }

    /// Commits an initiator-side session key unless one exists already.
    ///
    /// Returns `true` if the key was installed.
    pub fn install_session_if_absent(&self, session_key: SessionKey) -> bool {
        let mut inner = self.inner.lock();
        if inner.session_key.is_some() || inner.ecdh_public.is_none() {
            return false;
        }
        inner.session_key = Some(session_key);
        debug!(alias = %inner.alias, "Session committed");
        true
    }

    // ========================================
    // Handshake
    // ========================================

    /// Builds a handshake packet addressed to this peer.
    ///
    /// The derived key is returned, not installed; commit it with
    /// [`install_session_if_absent`](Self::install_session_if_absent).
    ///
    /// # Errors
    /// - `MissingPeerKey`: the peer's public key is not known
    /// - see [`handshake::encapsulate_and_pack`]
    pub fn encapsulate_and_pack(
        &self,
        keys: &KeyMaterial,
        packet_size: usize,
        network_subkey: &[u8],
    ) -> Result<Encapsulated> {
        let inner = self.inner.lock();
        let (Some(kem_public), Some(ecdh_public)) = (&inner.kem_public, &inner.ecdh_public) else {
            return Err(CoreError::missing_peer_key(&inner.alias));
        };
        handshake::encapsulate_and_pack(
            kem_public,
            ecdh_public,
            keys.ecdh_secret(),
            packet_size,
            network_subkey,
        )
    }

    // ========================================
    // Encryption
    // ========================================

    /// Encrypts `data` under the session key.
    ///
    /// # Errors
    /// - `MissingSessionKey`
    pub fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        let inner = self.inner.lock();
        aead::encrypt(inner.session_key()?.as_bytes(), data)
    }

    /// Decrypts `data` under the session key.
    ///
    /// # Errors
    /// - `MissingSessionKey`, `Decryption`
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        let inner = self.inner.lock();
        aead::decrypt(inner.session_key()?.as_bytes(), data)
    }

    // ========================================
    // Pack / Unpack
    // ========================================

    /// Splits `data` into encrypted packets of exactly `packet_size` bytes.
    ///
    /// Sequence numbers run from `start_seq`; the total is
    /// `start_seq + chunk count`, so every `seq < total`. Empty `data`
    /// still yields one packet.
    ///
    /// # Errors
    /// - `PacketSizeTooSmall`, `MissingSessionKey`, or any primitive
    ///   failure. No partial output is returned.
    /// - `OutOfRange`: `start_seq` leaves no room for the packet count
    pub fn pack(
        &self,
        data: &[u8],
        packet_size: usize,
        packet_type: PacketType,
        start_seq: u64,
    ) -> Result<Vec<Vec<u8>>> {
        check_packet_size(packet_size)?;

        let inner = self.inner.lock();
        let session_key = inner.session_key()?;

        let (payload, compressed) = compress(data)?;
        let chunk_size = max_chunk_size(packet_size);
        let chunks: Vec<&[u8]> = if payload.is_empty() {
            vec![&payload[..]]
        } else {
            payload.chunks(chunk_size).collect()
        };
        let total = u64::try_from(chunks.len())
            .ok()
            .and_then(|count| start_seq.checked_add(count))
            .ok_or_else(|| CommonError::out_of_range(start_seq, 0, u64::MAX))?;

        let mut packets = Vec::with_capacity(chunks.len());
        for (seq, chunk) in (start_seq..).zip(chunks) {
            let document = pack_data(packet_type, compressed, seq, total, chunk, session_key)?;
            let framed = frame::pack_fixed(&document, inner_frame_size(packet_size))?;
            packets.push(aead::encrypt(session_key.as_bytes(), &framed)?);
        }

        trace!(
            alias = %inner.alias,
            packet_type = ?packet_type,
            bytes = data.len(),
            compressed,
            packets = packets.len(),
            "Packed message"
        );
        Ok(packets)
    }

    /// Packs application data for this peer.
    ///
    /// # Errors
    /// See [`pack`](Self::pack).
    pub fn pack_to_send(&self, data: &[u8], packet_size: usize) -> Result<Vec<Vec<u8>>> {
        self.pack(data, packet_size, PacketType::Data, 0)
    }

    /// Packs application data for this peer and wraps it `hops` times for
    /// relays picked at random from `candidates`.
    ///
    /// Each layer concatenates the current packet set into one message and
    /// packs it for the chosen relay as `Retransmit`. A relay recovers the
    /// inner packets with [`split_relay_payload`]. Repeat picks are allowed.
    ///
    /// # Errors
    /// - `NoRelayCandidates`: `hops > 0` with an empty candidate list
    /// - see [`pack`](Self::pack)
    pub fn pack_to_resend(
        &self,
        data: &[u8],
        packet_size: usize,
        hops: u8,
        candidates: &[Arc<Peer>],
    ) -> Result<Vec<Vec<u8>>> {
        if hops > 0 && candidates.is_empty() {
            return Err(CoreError::NoRelayCandidates);
        }

        let mut packets = self.pack_to_send(data, packet_size)?;
        for _ in 0..hops {
            let relay = &candidates[random_index(candidates.len())?];
            packets = relay.pack(&packets.concat(), packet_size, PacketType::Retransmit, 0)?;
        }
        Ok(packets)
    }

    /// Decrypts and decodes one wire packet.
    ///
    /// A `Decryption` error usually means the packet is for someone else.
    ///
    /// # Errors
    /// - `PacketSizeTooSmall`, `MissingSessionKey`, `Decryption`,
    ///   `InvalidPacket`
    pub fn unpack(&self, wire: &[u8], packet_size: usize) -> Result<Packet> {
        check_packet_size(packet_size)?;
        if wire.len() != packet_size {
            return Err(CoreError::InvalidPacket);
        }

        let inner = self.inner.lock();
        let session_key = inner.session_key()?;
        let framed = aead::decrypt(session_key.as_bytes(), wire)?;
        let document = frame::unpack_fixed(&framed, inner_frame_size(packet_size))?;
        unpack_data_to_packet(document, session_key)
    }

    // ========================================
    // Public Key Exchange
    // ========================================

    /// Builds a single public key request packet.
    ///
    /// # Errors
    /// See [`pack`](Self::pack).
    pub fn pack_public_key_request(&self, packet_size: usize) -> Result<Vec<u8>> {
        let filler = random_bytes(PUBLIC_KEY_REQUEST_SIZE)?;
        let mut packets = self.pack(&filler, packet_size, PacketType::PublicKeyRequest, 0)?;
        // Ten random bytes always fit one packet.
        Ok(packets.swap_remove(0))
    }

    /// Packs the public keys of `peers` (those that have one) for this peer.
    ///
    /// # Errors
    /// See [`pack`](Self::pack).
    pub fn pack_public_keys(&self, peers: &[Arc<Peer>], packet_size: usize) -> Result<Vec<Vec<u8>>> {
        let known: Vec<KnownPublicKey> = peers
            .iter()
            .filter_map(|peer| {
                let public_key = peer.public_key_bytes();
                (public_key.len() >= PUBLIC_KEY_SIZE).then(|| KnownPublicKey {
                    platform: peer.platform(),
                    alias: peer.alias(),
                    content: BASE64.encode(public_key),
                })
            })
            .collect();

        let data = serde_json::to_vec(&known)
            .map_err(|e| CoreError::from(CommonError::encoding("public key list", e)))?;
        self.pack(&data, packet_size, PacketType::PublicKey, 0)
    }
}

impl fmt::Debug for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Peer")
            .field("alias", &inner.alias)
            .field("has_public_key", &inner.kem_public.is_some())
            .field("has_session_key", &inner.session_key.is_some())
            .finish()
    }
}

// ============================================
// Free Functions
// ============================================

/// Parses a reassembled public key list.
///
/// # Errors
/// Returns a decoding error for anything but a JSON list of entries.
pub fn unpack_public_keys(data: &[u8]) -> Result<Vec<KnownPublicKey>> {
    serde_json::from_slice(data)
        .map_err(|e| CoreError::from(CommonError::decoding("public key list", e)))
}

/// Recovers the inner packets from a reassembled `Retransmit` message.
///
/// # Errors
/// - `InvalidPacket`: empty, or not a whole number of packets
pub fn split_relay_payload(payload: &[u8], packet_size: usize) -> Result<Vec<Vec<u8>>> {
    check_packet_size(packet_size)?;
    if payload.is_empty() || payload.len() % packet_size != 0 {
        return Err(CoreError::InvalidPacket);
    }
    Ok(payload.chunks(packet_size).map(<[u8]>::to_vec).collect())
}

fn parse_public_key<'a>(
    public_key: &'a [u8],
    network_key: Option<&NetworkKey>,
) -> Result<(kyber768::PublicKey, X25519PublicKey, &'a [u8])> {
    let (body, tag) = match public_key.len() {
        PUBLIC_KEY_SIZE => (public_key, None),
        SIGNED_PUBLIC_KEY_SIZE => {
            let (body, tag) = public_key.split_at(PUBLIC_KEY_SIZE);
            (body, Some(tag))
        }
        other => {
            return Err(CoreError::invalid_public_key(format!(
                "expected {PUBLIC_KEY_SIZE} or {SIGNED_PUBLIC_KEY_SIZE} bytes, got {other}"
            )))
        }
    };

    if let Some(network_key) = network_key {
        let authentic =
            tag.map_or(false, |tag| mac::verify_hmac_sha512(network_key.as_bytes(), body, tag));
        if !authentic {
            return Err(CoreError::invalid_public_key("network authentication failed"));
        }
    }

    let (kem_bytes, spki) = body.split_at(KEM_PUBLIC_KEY_SIZE);
    let kem_public = kyber768::PublicKey::from_bytes(kem_bytes)
        .map_err(|_| CoreError::invalid_public_key("malformed Kyber768 key"))?;
    let ecdh_public = der::decode_public_key(spki)?;
    Ok((kem_public, ecdh_public, body))
}

fn extract_ecdh_public(public_key: &[u8]) -> Option<X25519PublicKey> {
    let spki = match public_key.len() {
        X25519_SPKI_SIZE => public_key,
        PUBLIC_KEY_SIZE | SIGNED_PUBLIC_KEY_SIZE => {
            &public_key[KEM_PUBLIC_KEY_SIZE..PUBLIC_KEY_SIZE]
        }
        _ => return None,
    };
    der::decode_public_key(spki).ok()
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::MsgHandler;
    use crate::protocol::MIN_PACKET_SIZE;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;

    const KEY: [u8; 32] = [7u8; 32];
    const SUBKEY: &[u8] = b"community";

    fn peer_with_key(alias: &str, key: &[u8; 32]) -> Peer {
        let peer = Peer::new(alias);
        peer.install_session(X25519PublicKey::from([9u8; 32]), SessionKey::from_bytes(*key));
        peer
    }

    fn reassemble(receiver: &Peer, handler: &MsgHandler, packets: &[Vec<u8>], size: usize) {
        for wire in packets {
            let packet = receiver.unpack(wire, size).unwrap();
            handler.add_packet(
                "alice",
                packet.seq(),
                packet.total(),
                packet.is_compressed(),
                packet.payload(),
            );
        }
    }

    #[test]
    fn test_state_transitions() {
        let keys = KeyMaterial::generate();
        let peer = Peer::new("bob");
        assert_eq!(peer.state(), PeerState::Unknown);

        peer.set_public_key(&keys.public_key_bytes(None).unwrap(), None).unwrap();
        assert_eq!(peer.state(), PeerState::KeyKnown);
        assert!(peer.has_kem_public_key());

        peer.set_session_key(&KEY).unwrap();
        assert_eq!(peer.state(), PeerState::SessionEstablished);
    }

    #[test]
    fn test_set_public_key_with_network_key() {
        let keys = KeyMaterial::generate();
        let network = NetworkKey::from_bytes([1u8; 32]);
        let tagged = keys.public_key_bytes(Some(&network)).unwrap();

        let peer = Peer::new("bob");
        peer.set_public_key(&tagged, Some(&network)).unwrap();
        assert_eq!(peer.public_key_bytes(), keys.public_key_bytes(None).unwrap());

        let other = NetworkKey::from_bytes([2u8; 32]);
        assert!(peer.set_public_key(&tagged, Some(&other)).is_err());

        // Untagged keys cannot be authenticated.
        let untagged = keys.public_key_bytes(None).unwrap();
        assert!(peer.set_public_key(&untagged, Some(&network)).is_err());

        // Without a network key the tag is stripped unverified.
        let fresh = Peer::new("carol");
        fresh.set_public_key(&tagged, None).unwrap();
        assert_eq!(fresh.public_key_bytes().len(), PUBLIC_KEY_SIZE);
    }

    #[test]
    fn test_set_public_key_rejects_bad_length() {
        let peer = Peer::new("bob");
        assert!(matches!(
            peer.set_public_key(&[0u8; 100], None),
            Err(CoreError::InvalidPublicKey { .. })
        ));
        assert_eq!(peer.state(), PeerState::Unknown);
    }

    #[test]
    fn test_matches_public_key() {
        let keys = KeyMaterial::generate();
        let other = KeyMaterial::generate();
        let blob = keys.public_key_bytes(None).unwrap();
        let peer = Peer::with_public_key("bob", &blob, None).unwrap();

        assert!(peer.matches_public_key(&blob));
        assert!(peer.matches_public_key(&der::encode_public_key(keys.ecdh_public_key())));
        assert!(!peer.matches_public_key(&other.public_key_bytes(None).unwrap()));
        assert!(!peer.matches_public_key(b"garbage"));
        assert!(!Peer::new("x").matches_public_key(&blob));
    }

    #[test]
    fn test_set_session_key_validates_length() {
        let keys = KeyMaterial::generate();
        let peer = Peer::with_public_key("bob", &keys.public_key_bytes(None).unwrap(), None)
            .unwrap();
        assert!(matches!(
            peer.set_session_key(&[0u8; 16]),
            Err(CoreError::InvalidSessionKey { actual: 16 })
        ));
        assert!(!peer.has_valid_session_key());
    }

    #[test]
    fn test_set_session_key_requires_public_key() {
        let peer = Peer::new("bob");
        assert!(matches!(
            peer.set_session_key(&KEY),
            Err(CoreError::MissingPeerKey { .. })
        ));
        assert_eq!(peer.state(), PeerState::Unknown);
        assert!(peer.session_key().is_none());
    }

    #[test]
    fn test_handshake_between_peers() {
        let alice_keys = KeyMaterial::generate();
        let bob_keys = KeyMaterial::generate();

        // Alice's view of Bob, and Bob's view of the (still anonymous) Alice.
        let bob = Peer::with_public_key("bob", &bob_keys.public_key_bytes(None).unwrap(), None)
            .unwrap();
        let alice = Peer::new("unknown");

        let encapsulated = bob.encapsulate_and_pack(&alice_keys, 4096, SUBKEY).unwrap();
        assert_eq!(encapsulated.wire.len(), 4096);
        assert!(bob.install_session_if_absent(encapsulated.session_key.clone()));

        let accepted = bob_keys.decapsulate_and_unpack(&encapsulated.wire, 4096).unwrap();
        assert!(accepted.is_authentic(SUBKEY));
        alice.install_session(*accepted.peer_ecdh_public(), accepted.into_session_key());

        assert_eq!(bob.session_key(), alice.session_key());
        assert!(alice.matches_public_key(&alice_keys.public_key_bytes(None).unwrap()));

        let packets = bob.pack_to_send(b"hi bob", 4096).unwrap();
        let packet = alice.unpack(&packets[0], 4096).unwrap();
        assert_eq!(packet.payload(), b"hi bob");
    }

    #[test]
    fn test_encapsulate_requires_public_key() {
        let keys = KeyMaterial::generate();
        let peer = Peer::new("bob");
        assert!(matches!(
            peer.encapsulate_and_pack(&keys, 4096, SUBKEY),
            Err(CoreError::MissingPeerKey { .. })
        ));
    }

    #[test]
    fn test_install_session_if_absent_keeps_existing() {
        let keys = KeyMaterial::generate();
        let peer = Peer::with_public_key("bob", &keys.public_key_bytes(None).unwrap(), None)
            .unwrap();
        assert!(peer.install_session_if_absent(SessionKey::from_bytes([1; 32])));
        assert!(!peer.install_session_if_absent(SessionKey::from_bytes([2; 32])));
        assert_eq!(peer.session_key(), Some(SessionKey::from_bytes([1; 32])));

        // No public key, no session.
        assert!(!Peer::new("x").install_session_if_absent(SessionKey::from_bytes([1; 32])));
    }

    #[test]
    fn test_identity_change_drops_session() {
        let first = KeyMaterial::generate();
        let second = KeyMaterial::generate();
        let peer = Peer::with_public_key("bob", &first.public_key_bytes(None).unwrap(), None)
            .unwrap();
        peer.set_session_key(&KEY).unwrap();

        peer.set_ecdh_public_key(&der::encode_public_key(second.ecdh_public_key()))
            .unwrap();
        assert_eq!(peer.state(), PeerState::KeyKnown);
        assert!(!peer.has_kem_public_key());
        assert_eq!(peer.public_key_bytes().len(), X25519_SPKI_SIZE);
    }

    #[test]
    fn test_pack_packet_sizes() {
        let peer = peer_with_key("bob", &KEY);
        let data = random_bytes(10_000).unwrap();
        let packets = peer.pack_to_send(&data, 4096).unwrap();

        assert!(packets.len() >= 3);
        assert!(packets.iter().all(|p| p.len() == 4096));
    }

    #[test]
    fn test_pack_empty_yields_one_packet() {
        let peer = peer_with_key("bob", &KEY);
        let packets = peer.pack_to_send(b"", MIN_PACKET_SIZE).unwrap();
        assert_eq!(packets.len(), 1);

        let packet = peer.unpack(&packets[0], MIN_PACKET_SIZE).unwrap();
        assert_eq!(packet.total(), 1);
        assert!(packet.payload().is_empty());
    }

    #[test]
    fn test_pack_rejects_sequence_overflow() {
        let peer = peer_with_key("bob", &KEY);
        assert!(matches!(
            peer.pack(b"hello", 4096, PacketType::Data, u64::MAX),
            Err(CoreError::Common(CommonError::OutOfRange { .. }))
        ));

        let packets = peer.pack(b"hello", 4096, PacketType::Data, u64::MAX - 1).unwrap();
        let packet = peer.unpack(&packets[0], 4096).unwrap();
        assert_eq!(packet.seq(), u64::MAX - 1);
        assert_eq!(packet.total(), u64::MAX);
    }

    #[test]
    fn test_pack_requires_session_key() {
        let peer = Peer::new("bob");
        assert!(matches!(
            peer.pack_to_send(b"data", 4096),
            Err(CoreError::MissingSessionKey { .. })
        ));
    }

    #[test]
    fn test_minimum_packet_size_enforced() {
        let peer = peer_with_key("bob", &KEY);
        assert!(matches!(
            peer.pack_to_send(b"data", MIN_PACKET_SIZE - 1),
            Err(CoreError::PacketSizeTooSmall { .. })
        ));
        assert!(matches!(
            peer.unpack(&[0u8; 100], 100),
            Err(CoreError::PacketSizeTooSmall { .. })
        ));
    }

    #[test]
    fn test_unpack_foreign_packet() {
        let sender = peer_with_key("bob", &KEY);
        let stranger = peer_with_key("eve", &[9u8; 32]);
        let packets = sender.pack_to_send(b"private", 4096).unwrap();

        let err = stranger.unpack(&packets[0], 4096).unwrap_err();
        assert!(err.is_foreign_packet());
        assert!(matches!(
            sender.unpack(&packets[0][..4000], 4096),
            Err(CoreError::InvalidPacket)
        ));
    }

    #[test]
    fn test_compression_flag_for_random_data() {
        let peer = peer_with_key("bob", &KEY);
        let data = random_bytes(128).unwrap();
        let packets = peer.pack_to_send(&data, 4096).unwrap();
        let packet = peer.unpack(&packets[0], 4096).unwrap();

        assert!(!packet.is_compressed());
        assert_eq!(packet.body.original_len, 128);
        assert_eq!(packet.payload(), &data[..]);
    }

    #[test]
    fn test_reassembly_scenario() {
        let sender = peer_with_key("bob", &KEY);
        let receiver = peer_with_key("alice", &KEY);
        let data = random_bytes(10_000).unwrap();
        let packets = sender.pack_to_send(&data, 4096).unwrap();
        assert!(packets.len() >= 3);
        assert!(packets.iter().all(|p| p.len() == 4096));

        let handler = MsgHandler::new();

        let mut reversed = packets.clone();
        reversed.reverse();
        reassemble(&receiver, &handler, &reversed[..reversed.len() - 1], 4096);
        assert!(handler.by_alias("alice").is_none());

        let mut forward_with_duplicate = packets.clone();
        forward_with_duplicate.push(packets[0].clone());
        reassemble(&receiver, &handler, &forward_with_duplicate, 4096);

        assert_eq!(handler.by_alias("alice").unwrap(), data);
        assert!(!handler.exists("alice"));
    }

    #[test]
    fn test_pack_to_resend_layers() {
        let final_peer = peer_with_key("carol", &[3u8; 32]);
        let relay = Arc::new(peer_with_key("relay", &[4u8; 32]));
        let packets = final_peer
            .pack_to_resend(b"onion", 4096, 1, &[relay.clone()])
            .unwrap();

        // The relay peels one layer.
        let handler = MsgHandler::new();
        for wire in &packets {
            let packet = relay.unpack(wire, 4096).unwrap();
            assert_eq!(packet.packet_type(), PacketType::Retransmit);
            assert!(packet.seq() < packet.total());
            handler.add_packet(
                "relay",
                packet.seq(),
                packet.total(),
                packet.is_compressed(),
                packet.payload(),
            );
        }
        let inner = split_relay_payload(&handler.by_alias("relay").unwrap(), 4096).unwrap();

        let packet = final_peer.unpack(&inner[0], 4096).unwrap();
        assert_eq!(packet.packet_type(), PacketType::Data);
        assert_eq!(packet.payload(), b"onion");
        assert!(relay.unpack(&inner[0], 4096).is_err());
    }

    #[test]
    fn test_pack_to_resend_without_candidates() {
        let peer = peer_with_key("bob", &KEY);
        assert!(matches!(
            peer.pack_to_resend(b"x", 4096, 2, &[]),
            Err(CoreError::NoRelayCandidates)
        ));
        assert_eq!(peer.pack_to_resend(b"x", 4096, 0, &[]).unwrap().len(), 1);
    }

    #[test]
    fn test_split_relay_payload_rejects_partial() {
        assert!(split_relay_payload(&[], 4096).is_err());
        assert!(split_relay_payload(&[0u8; 4097], 4096).is_err());
        assert_eq!(split_relay_payload(&[0u8; 8192], 4096).unwrap().len(), 2);
    }

    #[test]
    fn test_public_key_request() {
        let peer = peer_with_key("bob", &KEY);
        let wire = peer.pack_public_key_request(4096).unwrap();
        let packet = peer.unpack(&wire, 4096).unwrap();
        assert_eq!(packet.packet_type(), PacketType::PublicKeyRequest);
        assert_eq!(packet.payload().len(), PUBLIC_KEY_REQUEST_SIZE);
    }

    #[test]
    fn test_public_key_list_roundtrip() {
        let keys = KeyMaterial::generate();
        let known = Arc::new(
            Peer::with_public_key("dave", &keys.public_key_bytes(None).unwrap(), None).unwrap(),
        );
        let placeholder = Arc::new(Peer::new("nobody"));
        let peer = peer_with_key("bob", &KEY);

        let packets = peer
            .pack_public_keys(&[known, placeholder], 4096)
            .unwrap();
        let handler = MsgHandler::new();
        for wire in &packets {
            let packet = peer.unpack(wire, 4096).unwrap();
            assert_eq!(packet.packet_type(), PacketType::PublicKey);
            handler.add_packet("bob", packet.seq(), packet.total(), packet.is_compressed(), packet.payload());
        }

        let list = unpack_public_keys(&handler.by_alias("bob").unwrap()).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].alias, "dave");
        assert_eq!(list[0].public_key_bytes().unwrap(), keys.public_key_bytes(None).unwrap());
    }

    #[test]
    fn test_unpack_public_keys_accepts_missing_platform() {
        let list = unpack_public_keys(br#"[{"alias":"a","content":"AAAA"}]"#).unwrap();
        assert_eq!(list[0].platform, "");
        assert!(unpack_public_keys(b"not json").is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_fragmentation_roundtrip(
            data in proptest::collection::vec(any::<u8>(), 0..12_000),
            size in prop::sample::select(vec![2048usize, 4096, 8192]),
            seed in any::<u64>(),
            duplicates in 0usize..3,
        ) {
            let peer = peer_with_key("bob", &KEY);
            let mut packets = peer.pack_to_send(&data, size).unwrap();
            prop_assert!(packets.iter().all(|p| p.len() == size));

            let mut rng = StdRng::seed_from_u64(seed);
            for i in 0..duplicates.min(packets.len()) {
                packets.push(packets[i].clone());
            }
            packets.shuffle(&mut rng);

            let handler = MsgHandler::new();
            reassemble(&peer, &handler, &packets, size);
            prop_assert_eq!(handler.by_alias("alice").unwrap(), data);
        }
    }
}
