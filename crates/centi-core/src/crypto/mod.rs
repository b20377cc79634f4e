// ============================================
// File: crates/centi-core/src/crypto/mod.rs
// ============================================
//! # Cryptography Module
//!
//! ## Creation Reason
//! Centralizes the primitive crypto layer of the peer protocol, built on
//! audited RustCrypto and PQClean implementations.
//!
//! ## Main Functionality
//!
//! ### Submodules
//! - [`keys`]: Key types (`KeyMaterial`, `SessionKey`, `NetworkKey`)
//! - [`handshake`]: Kyber768 + X25519 hybrid key establishment
//! - [`aead`]: ChaCha20-Poly1305 with random nonces
//! - [`mac`]: HMAC-SHA512 tags and SHA-512 aliases
//! - [`kdf`]: HKDF-SHA512 key combination and Argon2i network keys
//! - [`frame`]: Fixed-length, randomly padded framing
//! - [`der`]: X25519 SPKI / PKCS#8 encodings
//!
//! ## Packet Construction
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  JSON packet document                                       │
//! │        │                                                    │
//! │        ▼                                                    │
//! │  frame(doc, packet_size - 28) ── random padding             │
//! │        │                                                    │
//! │        ▼                                                    │
//! │  nonce(12) || ChaCha20(frame) || Poly1305(16)               │
//! │        = exactly packet_size bytes on the wire              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Sizes below are wire constants shared with deployed peers
//! - NEVER roll your own crypto
//! - ALL secret key types implement Zeroize
//!
//! ## Last Modified
//! v0.1.0 - Initial crypto implementation

pub mod aead;
pub mod der;
pub mod frame;
pub mod handshake;
pub mod kdf;
pub mod keys;
pub mod mac;

// Re-export primary types at module level
pub use handshake::{encapsulate_and_pack, Decapsulated, Encapsulated};
pub use kdf::{combine_shared_secrets, derive_network_key, NetworkKeyParams};
pub use keys::{KeyMaterial, NetworkKey, SessionKey};

// ============================================
// Constants
// ============================================

/// Size of symmetric keys (session, network, AEAD) in bytes.
pub const SYM_KEY_SIZE: usize = 32;

/// Size of ChaCha20-Poly1305 nonce in bytes.
pub const NONCE_SIZE: usize = 12;

/// Size of Poly1305 authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// Bytes added by one AEAD encryption.
pub const AEAD_OVERHEAD: usize = NONCE_SIZE + TAG_SIZE;

/// Size of an HMAC-SHA512 tag in bytes.
pub const HASH_SIZE: usize = 64;

/// Size of a Kyber768 public key.
pub const KEM_PUBLIC_KEY_SIZE: usize = 1184;

/// Size of a Kyber768 private key.
pub const KEM_SECRET_KEY_SIZE: usize = 2400;

/// Size of a Kyber768 ciphertext.
pub const KEM_CIPHERTEXT_SIZE: usize = 1088;

/// Size of a raw X25519 key.
pub const X25519_KEY_SIZE: usize = 32;

/// Size of an SPKI-encoded X25519 public key.
pub const X25519_SPKI_SIZE: usize = 44;

/// Size of a PKCS#8-encoded X25519 private key.
pub const X25519_PKCS8_SIZE: usize = 48;

/// Size of the AEAD-encrypted SPKI public key inside a handshake.
pub const ENCRYPTED_ECDH_KEY_SIZE: usize = X25519_SPKI_SIZE + AEAD_OVERHEAD;

/// Size of a handshake blob before framing.
pub const HANDSHAKE_BLOB_SIZE: usize = KEM_CIPHERTEXT_SIZE + ENCRYPTED_ECDH_KEY_SIZE + HASH_SIZE;

/// Size of a public key blob without a network tag.
pub const PUBLIC_KEY_SIZE: usize = KEM_PUBLIC_KEY_SIZE + X25519_SPKI_SIZE;

/// Size of a public key blob carrying a network tag.
pub const SIGNED_PUBLIC_KEY_SIZE: usize = PUBLIC_KEY_SIZE + HASH_SIZE;

/// Size of the length prefix of a fixed frame.
pub const FRAME_HEADER_SIZE: usize = 8;
