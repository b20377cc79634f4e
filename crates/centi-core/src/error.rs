// ============================================
// File: crates/centi-core/src/error.rs
// ============================================
//! # Core Error Types
//!
//! ## Creation Reason
//! Defines error types for the peer protocol engine: cryptography,
//! packet decoding, peer state and fragmentation.
//!
//! ## Error Categories
//! 1. **Input Errors**: Undersized packets, bad key encodings, bad sizes
//! 2. **Authentication Errors**: Collapsed into `InvalidPacket` on the
//!    receive path so a caller (or a remote observer timing replies)
//!    cannot tell a forged tag from a garbled document
//! 3. **State Errors**: Missing public key, missing session key, empty buffers
//! 4. **Resource Errors**: RNG and key derivation failures
//!
//! ## ⚠️ Important Note for Next Developer
//! - NEVER include key material in error messages
//! - Every variant is recoverable; nothing in core may abort the process
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

use centi_common::error::CommonError;

// ============================================
// Result Type Alias
// ============================================

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

// ============================================
// CoreError
// ============================================

/// Core error types for protocol and cryptographic operations.
#[derive(Error, Debug)]
pub enum CoreError {
    // ========================================
    // Cryptographic Errors
    // ========================================

    /// Failed to generate or parse key material.
    #[error("Key generation failed: {context}")]
    KeyGeneration {
        /// What key was being generated
        context: String,
    },

    /// Public key bytes are malformed or failed network authentication.
    #[error("Invalid public key: {reason}")]
    InvalidPublicKey {
        /// Why the key was rejected
        reason: String,
    },

    /// Session key is not exactly 32 bytes.
    #[error("Invalid session key length: {actual}")]
    InvalidSessionKey {
        /// Length that was supplied
        actual: usize,
    },

    /// AEAD encryption failed.
    #[error("Encryption failed: {context}")]
    Encryption {
        /// What was being encrypted
        context: String,
    },

    /// AEAD decryption failed (wrong key or tampered ciphertext).
    #[error("Decryption failed: authentication error")]
    Decryption,

    /// Key derivation failed.
    #[error("Key derivation failed: {reason}")]
    KeyDerivation {
        /// Reason for failure
        reason: String,
    },

    /// Handshake blob could not be decapsulated.
    #[error("Handshake rejected")]
    HandshakeRejected,

    // ========================================
    // Protocol Errors
    // ========================================

    /// Packet size below the protocol floor.
    #[error("Packet size {size} is below the minimum of {min}")]
    PacketSizeTooSmall {
        /// Requested packet size
        size: usize,
        /// Protocol minimum
        min: usize,
    },

    /// Payload does not fit in the requested frame.
    #[error("Payload of {payload} bytes does not fit a {size}-byte frame")]
    FrameOverflow {
        /// Payload length
        payload: usize,
        /// Frame size
        size: usize,
    },

    /// Input is shorter than a fixed-offset layout requires.
    #[error("Message too short: expected at least {expected} bytes, got {actual}")]
    MessageTooShort {
        /// Minimum expected length
        expected: usize,
        /// Actual length
        actual: usize,
    },

    /// Unknown packet type byte.
    #[error("Unknown packet type: {0:#04x}")]
    UnknownPacketType(u8),

    /// A wire packet was rejected. Covers bad documents, sequence
    /// violations, truncation and integrity tag mismatches alike.
    #[error("Packet rejected")]
    InvalidPacket,

    /// Failed to (de)compress a payload.
    #[error("Compression error: {reason}")]
    Compression {
        /// What went wrong
        reason: String,
    },

    // ========================================
    // State Errors
    // ========================================

    /// Peer's public key is required but not known yet.
    #[error("Missing public key for peer '{alias}'")]
    MissingPeerKey {
        /// Peer alias
        alias: String,
    },

    /// Peer has no valid session key.
    #[error("No valid session key for peer '{alias}'")]
    MissingSessionKey {
        /// Peer alias
        alias: String,
    },

    /// Nothing queued to send.
    #[error("Empty buffer")]
    EmptyBuffer,

    /// Reassembly was attempted before every fragment arrived.
    #[error("Incomplete message: {received} of {total} fragments")]
    IncompleteMessage {
        /// Fragments present
        received: usize,
        /// Fragments expected
        total: usize,
    },

    /// Relay wrapping was requested without any candidate peers.
    #[error("No relay candidates available")]
    NoRelayCandidates,

    // ========================================
    // Wrapped Errors
    // ========================================

    /// Error from common crate.
    #[error(transparent)]
    Common(#[from] CommonError),
}

impl CoreError {
    // ========================================
    // Convenience Constructors
    // ========================================

    /// Creates a `KeyGeneration` error.
    pub fn key_generation(context: impl Into<String>) -> Self {
        Self::KeyGeneration {
            context: context.into(),
        }
    }

    /// Creates an `InvalidPublicKey` error.
    pub fn invalid_public_key(reason: impl Into<String>) -> Self {
        Self::InvalidPublicKey {
            reason: reason.into(),
        }
    }

    /// Creates a `KeyDerivation` error.
    pub fn key_derivation(reason: impl Into<String>) -> Self {
        Self::KeyDerivation {
            reason: reason.into(),
        }
    }

    /// Creates a `MessageTooShort` error.
    #[must_use]
    pub const fn too_short(expected: usize, actual: usize) -> Self {
        Self::MessageTooShort { expected, actual }
    }

    /// Creates a `Compression` error.
    pub fn compression(reason: impl Into<String>) -> Self {
        Self::Compression {
            reason: reason.into(),
        }
    }

    /// Creates a `MissingPeerKey` error.
    pub fn missing_peer_key(alias: impl Into<String>) -> Self {
        Self::MissingPeerKey {
            alias: alias.into(),
        }
    }

    /// Creates a `MissingSessionKey` error.
    pub fn missing_session_key(alias: impl Into<String>) -> Self {
        Self::MissingSessionKey {
            alias: alias.into(),
        }
    }

    // ========================================
    // Error Classification
    // ========================================

    /// Returns `true` if this is a cryptographic error.
    #[must_use]
    pub const fn is_crypto_error(&self) -> bool {
        matches!(
            self,
            Self::KeyGeneration { .. }
                | Self::InvalidPublicKey { .. }
                | Self::InvalidSessionKey { .. }
                | Self::Encryption { .. }
                | Self::Decryption
                | Self::KeyDerivation { .. }
                | Self::HandshakeRejected
        )
    }

    /// Returns `true` if this is a packet/protocol error.
    #[must_use]
    pub const fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Self::PacketSizeTooSmall { .. }
                | Self::FrameOverflow { .. }
                | Self::MessageTooShort { .. }
                | Self::UnknownPacketType(_)
                | Self::InvalidPacket
                | Self::Compression { .. }
        )
    }

    /// Returns `true` if the caller should (re)run the handshake
    /// before trying again.
    #[must_use]
    pub const fn requires_handshake(&self) -> bool {
        matches!(
            self,
            Self::MissingPeerKey { .. } | Self::MissingSessionKey { .. }
        )
    }

    /// Returns `true` if the input was simply not meant for us: wrong key,
    /// foreign packet, not a handshake. The caller should drop it quietly.
    #[must_use]
    pub const fn is_foreign_packet(&self) -> bool {
        matches!(
            self,
            Self::Decryption | Self::InvalidPacket | Self::HandshakeRejected
        )
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::too_short(1224, 100);
        assert!(err.to_string().contains("1224"));
        assert!(err.to_string().contains("100"));

        let err = CoreError::UnknownPacketType(0xFF);
        assert!(err.to_string().contains("0xff"));
    }

    #[test]
    fn test_error_classification() {
        assert!(CoreError::Decryption.is_crypto_error());
        assert!(CoreError::Decryption.is_foreign_packet());
        assert!(!CoreError::Decryption.is_protocol_error());

        assert!(CoreError::InvalidPacket.is_protocol_error());
        assert!(CoreError::InvalidPacket.is_foreign_packet());

        let err = CoreError::missing_session_key("bob");
        assert!(err.requires_handshake());
        assert!(!err.is_foreign_packet());
    }

    #[test]
    fn test_rejection_does_not_leak_cause() {
        assert_eq!(CoreError::InvalidPacket.to_string(), "Packet rejected");
    }

    #[test]
    fn test_common_error_conversion() {
        let common = CommonError::invalid_input("alias", "empty");
        let core: CoreError = common.into();
        assert!(matches!(core, CoreError::Common(_)));
    }
}
