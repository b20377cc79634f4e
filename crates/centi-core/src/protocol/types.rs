// ============================================
// File: crates/centi-core/src/protocol/types.rs
// ============================================
//! # Packet Types

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Kind of payload a packet carries.
///
/// # Type Values
/// | Value | Type |
/// |-------|------|
/// | 0 | PublicKey (list of known public keys) |
/// | 1 | Data |
/// | 2 | Retransmit (relay layer) |
/// | 3 | PublicKeyRequest |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum PacketType {
    /// Public keys known to the sender.
    PublicKey = 0,
    /// Application data.
    Data = 1,
    /// Ciphertext to be forwarded to the next hop.
    Retransmit = 2,
    /// Request for the receiver's known public keys.
    PublicKeyRequest = 3,
}

impl PacketType {
    /// Converts a byte to a `PacketType`.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::PublicKey),
            1 => Some(Self::Data),
            2 => Some(Self::Retransmit),
            3 => Some(Self::PublicKeyRequest),
            _ => None,
        }
    }

    /// Converts the `PacketType` to its byte representation.
    #[must_use]
    pub const fn as_byte(&self) -> u8 {
        *self as u8
    }

    /// Checks if this packet carries public key traffic.
    #[must_use]
    pub const fn is_key_distribution(&self) -> bool {
        matches!(self, Self::PublicKey | Self::PublicKeyRequest)
    }
}

impl TryFrom<u8> for PacketType {
    type Error = CoreError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_byte(value).ok_or(CoreError::UnknownPacketType(value))
    }
}

impl From<PacketType> for u8 {
    fn from(packet_type: PacketType) -> Self {
        packet_type.as_byte()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_conversion() {
        for byte in 0..=3u8 {
            let packet_type = PacketType::try_from(byte).unwrap();
            assert_eq!(u8::from(packet_type), byte);
        }
        assert!(matches!(
            PacketType::try_from(4),
            Err(CoreError::UnknownPacketType(4))
        ));
    }

    #[test]
    fn test_serde_as_number() {
        assert_eq!(serde_json::to_string(&PacketType::Retransmit).unwrap(), "2");
        let parsed: PacketType = serde_json::from_str("3").unwrap();
        assert_eq!(parsed, PacketType::PublicKeyRequest);
        assert!(serde_json::from_str::<PacketType>("9").is_err());
    }

    #[test]
    fn test_classification() {
        assert!(PacketType::PublicKey.is_key_distribution());
        assert!(PacketType::PublicKeyRequest.is_key_distribution());
        assert!(!PacketType::Data.is_key_distribution());
    }
}
