// ============================================
// File: crates/centi-core/src/protocol/packet.rs
// ============================================
//! # Packet Document Codec
//!
//! ## Creation Reason
//! Serializes one fragment of a message into the self-describing wire
//! document and parses it back, verifying integrity under the session key.
//!
//! ## Document Layout
//! ```text
//! {
//!   "h": { "t": <type u8>, "s": <seq u64>, "l": <total u64>, "c": <0|1> },
//!   "b": { "d": "<base64 chunk>", "o": <chunk length>, "h": "<hex hmac>" }
//! }
//! ```
//! `h.h` is HMAC-SHA512 over the raw chunk keyed by the session key.
//!
//! ## ⚠️ Important Note for Next Developer
//! - Every rejection surfaces as `CoreError::InvalidPacket`. The concrete
//!   reason is only emitted at trace level.
//! - Check order matters: sequence sanity first, then decode, then length,
//!   then HMAC
//!
//! ## Last Modified
//! v0.1.0 - Initial packet codec

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use tracing::trace;

use centi_common::CommonError;

use super::types::PacketType;
use crate::crypto::keys::SessionKey;
use crate::crypto::mac::{hmac_sha512, verify_hmac_sha512};
use crate::error::{CoreError, Result};

// ============================================
// Document Types
// ============================================

/// Packet header: what this fragment is and where it belongs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketHead {
    /// Payload kind.
    #[serde(rename = "t")]
    pub packet_type: PacketType,
    /// Zero-based index of this fragment.
    #[serde(rename = "s")]
    pub seq: u64,
    /// Number of fragments in the message.
    #[serde(rename = "l")]
    pub total: u64,
    /// 1 if the reassembled message is gzip-compressed.
    #[serde(rename = "c")]
    pub compressed: u8,
}

/// Packet body: the encoded chunk and its integrity tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketBody {
    /// Base64 chunk.
    #[serde(rename = "d")]
    pub data: String,
    /// Length of the raw chunk.
    #[serde(rename = "o")]
    pub original_len: u64,
    /// Hex HMAC-SHA512 of the raw chunk.
    #[serde(rename = "h")]
    pub hmac: String,
}

/// A decoded wire document.
///
/// The verified raw chunk is available through [`Packet::payload`] once
/// the packet came out of [`unpack_data_to_packet`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet {
    /// Header section.
    #[serde(rename = "h")]
    pub head: PacketHead,
    /// Body section.
    #[serde(rename = "b")]
    pub body: PacketBody,
    #[serde(skip)]
    payload: Vec<u8>,
}

impl Packet {
    /// Packet type from the header.
    #[must_use]
    pub fn packet_type(&self) -> PacketType {
        self.head.packet_type
    }

    /// Fragment index.
    #[must_use]
    pub fn seq(&self) -> u64 {
        self.head.seq
    }

    /// Fragment count.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.head.total
    }

    /// Whether the whole message is compressed.
    #[must_use]
    pub fn is_compressed(&self) -> bool {
        self.head.compressed != 0
    }

    /// Verified raw chunk.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Consumes the packet, returning the raw chunk.
    #[must_use]
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }
}

// ============================================
// Codec
// ============================================

/// Builds the wire document for one chunk.
///
/// # Errors
/// - `Common(Encoding)` if serialization fails
pub fn pack_data(
    packet_type: PacketType,
    compressed: bool,
    seq: u64,
    total: u64,
    data: &[u8],
    session_key: &SessionKey,
) -> Result<Vec<u8>> {
    let tag = hmac_sha512(session_key.as_bytes(), data)?;

    let packet = Packet {
        head: PacketHead {
            packet_type,
            seq,
            total,
            compressed: u8::from(compressed),
        },
        body: PacketBody {
            data: BASE64.encode(data),
            original_len: data.len() as u64,
            hmac: hex::encode(tag),
        },
        payload: Vec::new(),
    };

    serde_json::to_vec(&packet)
        .map_err(|e| CoreError::from(CommonError::encoding("packet document", e)))
}

/// Parses and verifies a wire document.
///
/// # Errors
/// - `InvalidPacket` for any malformed, inconsistent or unauthentic input
pub fn unpack_data_to_packet(bytes: &[u8], session_key: &SessionKey) -> Result<Packet> {
    let mut packet: Packet =
        serde_json::from_slice(bytes).map_err(|e| reject("malformed document", &e))?;

    if packet.head.total < packet.head.seq {
        return Err(reject("sequence beyond total", &packet.head.seq));
    }

    let mut data = BASE64
        .decode(packet.body.data.as_bytes())
        .map_err(|e| reject("body encoding", &e))?;

    let original_len = usize::try_from(packet.body.original_len)
        .map_err(|e| reject("original length", &e))?;
    if original_len > data.len() {
        return Err(reject("body shorter than original length", &data.len()));
    }
    data.truncate(original_len);

    let tag = hex::decode(packet.body.hmac.as_bytes()).map_err(|e| reject("hmac encoding", &e))?;
    if !verify_hmac_sha512(session_key.as_bytes(), &data, &tag) {
        return Err(reject("hmac mismatch", &packet.head.seq));
    }

    packet.payload = data;
    Ok(packet)
}

fn reject(reason: &'static str, detail: &dyn std::fmt::Display) -> CoreError {
    trace!(reason, %detail, "Packet rejected");
    CoreError::InvalidPacket
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::Value;

    fn key(byte: u8) -> SessionKey {
        SessionKey::from_bytes([byte; 32])
    }

    fn tamper(bytes: &[u8], edit: impl FnOnce(&mut Value)) -> Vec<u8> {
        let mut doc: Value = serde_json::from_slice(bytes).unwrap();
        edit(&mut doc);
        serde_json::to_vec(&doc).unwrap()
    }

    #[test]
    fn test_roundtrip() {
        let wire = pack_data(PacketType::Data, true, 2, 5, b"hello peer", &key(1)).unwrap();
        let packet = unpack_data_to_packet(&wire, &key(1)).unwrap();

        assert_eq!(packet.packet_type(), PacketType::Data);
        assert_eq!(packet.seq(), 2);
        assert_eq!(packet.total(), 5);
        assert!(packet.is_compressed());
        assert_eq!(packet.payload(), b"hello peer");
    }

    #[test]
    fn test_empty_payload() {
        let wire = pack_data(PacketType::PublicKey, false, 0, 1, b"", &key(1)).unwrap();
        let packet = unpack_data_to_packet(&wire, &key(1)).unwrap();
        assert!(packet.payload().is_empty());
        assert!(!packet.body.hmac.is_empty());
    }

    #[test]
    fn test_document_field_names() {
        let wire = pack_data(PacketType::Retransmit, false, 0, 1, b"x", &key(1)).unwrap();
        let doc: Value = serde_json::from_slice(&wire).unwrap();

        assert_eq!(doc["h"]["t"], 2);
        assert_eq!(doc["h"]["s"], 0);
        assert_eq!(doc["h"]["l"], 1);
        assert_eq!(doc["h"]["c"], 0);
        assert_eq!(doc["b"]["d"], "eA==");
        assert_eq!(doc["b"]["o"], 1);
        assert_eq!(doc["b"]["h"].as_str().unwrap().len(), 128);
    }

    #[test]
    fn test_wrong_key_rejected() {
        let wire = pack_data(PacketType::Data, false, 0, 1, b"secret", &key(1)).unwrap();
        assert!(matches!(
            unpack_data_to_packet(&wire, &key(2)),
            Err(CoreError::InvalidPacket)
        ));
    }

    #[test]
    fn test_seq_beyond_total_rejected() {
        let wire = pack_data(PacketType::Data, false, 3, 2, b"data", &key(1)).unwrap();
        assert!(matches!(
            unpack_data_to_packet(&wire, &key(1)),
            Err(CoreError::InvalidPacket)
        ));
    }

    #[test]
    fn test_original_length_checks() {
        let wire = pack_data(PacketType::Data, false, 0, 1, b"abcdef", &key(1)).unwrap();

        let longer = tamper(&wire, |doc| doc["b"]["o"] = Value::from(7));
        assert!(unpack_data_to_packet(&longer, &key(1)).is_err());

        // Truncating changes the HMAC input, so the tag no longer matches.
        let shorter = tamper(&wire, |doc| doc["b"]["o"] = Value::from(3));
        assert!(unpack_data_to_packet(&shorter, &key(1)).is_err());
    }

    #[test]
    fn test_unknown_packet_type_rejected() {
        let wire = pack_data(PacketType::Data, false, 0, 1, b"data", &key(1)).unwrap();
        let bad = tamper(&wire, |doc| doc["h"]["t"] = Value::from(9));
        assert!(matches!(
            unpack_data_to_packet(&bad, &key(1)),
            Err(CoreError::InvalidPacket)
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(unpack_data_to_packet(b"", &key(1)).is_err());
        assert!(unpack_data_to_packet(b"{\"h\":{}}", &key(1)).is_err());
        assert!(unpack_data_to_packet(&[0xFF; 64], &key(1)).is_err());
    }

    proptest! {
        #[test]
        fn prop_roundtrip(
            data in proptest::collection::vec(any::<u8>(), 0..2048),
            seq in 0u64..100,
            extra in 0u64..100,
            compressed in any::<bool>(),
        ) {
            let session_key = key(7);
            let wire = pack_data(PacketType::Data, compressed, seq, seq + extra, &data, &session_key).unwrap();
            let packet = unpack_data_to_packet(&wire, &session_key).unwrap();

            prop_assert_eq!(packet.seq(), seq);
            prop_assert_eq!(packet.total(), seq + extra);
            prop_assert_eq!(packet.is_compressed(), compressed);
            prop_assert_eq!(packet.payload(), &data[..]);
        }

        #[test]
        fn prop_tampered_hmac_rejected(
            data in proptest::collection::vec(any::<u8>(), 1..256),
            position in 0usize..128,
        ) {
            let session_key = key(7);
            let wire = pack_data(PacketType::Data, false, 0, 1, &data, &session_key).unwrap();
            let bad = tamper(&wire, |doc| {
                let mut hmac: Vec<char> = doc["b"]["h"].as_str().unwrap().chars().collect();
                hmac[position] = if hmac[position] == '0' { '1' } else { '0' };
                doc["b"]["h"] = Value::from(hmac.into_iter().collect::<String>());
            });
            prop_assert!(unpack_data_to_packet(&bad, &session_key).is_err());
        }

        #[test]
        fn prop_tampered_body_rejected(
            data in proptest::collection::vec(any::<u8>(), 1..256),
            position in any::<prop::sample::Index>(),
            flip in 1u8..=255,
        ) {
            let session_key = key(7);
            let wire = pack_data(PacketType::Data, false, 0, 1, &data, &session_key).unwrap();
            let bad = tamper(&wire, |doc| {
                let mut raw = data.clone();
                let i = position.index(raw.len());
                raw[i] ^= flip;
                doc["b"]["d"] = Value::from(BASE64.encode(raw));
            });
            prop_assert!(unpack_data_to_packet(&bad, &session_key).is_err());
        }
    }
}
