// ============================================
// File: crates/centi-core/src/lib.rs
// ============================================
//! # Centi Core - Peer Protocol Engine
//!
//! ## Creation Reason
//! Holds every protocol-level invariant of the network: hybrid key
//! establishment, the wire packet format, fragmentation and reassembly,
//! and per-peer session state. Transports are plain byte pipes and never
//! appear here.
//!
//! ## Main Functionality
//!
//! ### Crypto Module ([`crypto`])
//! - Kyber768 + X25519 hybrid handshake, HKDF-SHA512 key combination
//! - ChaCha20-Poly1305 packet encryption
//! - Fixed-size random-padded framing
//! - Argon2i network key derivation
//!
//! ### Protocol Module ([`protocol`])
//! - `PacketType` and the JSON wire document
//! - Gzip compression
//!
//! ### Peers ([`peer`], [`peer_manager`])
//! - `Peer`: keys, session and the pack/unpack pipeline
//! - `PeerManager`: registry and duplicate merging
//!
//! ### Fragmentation ([`fragment`])
//! - Outbound coalescing buffers, inbound reassembly channels
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                   centi-node                        │
//! │                       │                             │
//! │         ┌─────────────┴─────────────┐               │
//! │         ▼                           ▼               │
//! │    centi-core                centi-transport        │
//! │    You are here                     │               │
//! │         │                           │               │
//! │         └─────────────┬─────────────┘               │
//! │                       ▼                             │
//! │                 centi-common                        │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Security Guarantees
//! - **Confidentiality**: every packet is AEAD-encrypted under a per-peer key
//! - **Integrity**: Poly1305 plus an HMAC-SHA512 per wire document
//! - **Indistinguishability**: handshakes and data packets have one size
//! - **Membership**: handshakes and public keys carry network-key tags
//!
//! ## ⚠️ Important Note for Next Developer
//! - This crate performs no I/O and must stay synchronous
//! - ALL cryptographic code uses audited implementations
//! - ALL secret key types MUST implement Zeroize
//! - Wire constants are protocol constants; changing one breaks peers
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod crypto;
pub mod error;
pub mod fragment;
pub mod peer;
pub mod peer_manager;
pub mod protocol;

// Re-export commonly used items
pub use crypto::{KeyMaterial, NetworkKey, NetworkKeyParams, SessionKey};
pub use error::{CoreError, Result};
pub use fragment::{MsgBufManager, MsgBuffer, MsgChannel, MsgHandler};
pub use peer::{split_relay_payload, unpack_public_keys, KnownPublicKey, Peer, PeerState};
pub use peer_manager::PeerManager;
pub use protocol::{Packet, PacketType, MIN_PACKET_SIZE};
