// ============================================
// File: crates/centi-core/src/protocol/mod.rs
// ============================================
//! # Protocol Module
//!
//! ## Creation Reason
//! Defines the application-level packet: its type byte, the self-describing
//! wire document carrying one fragment, and payload compression.
//!
//! ## Main Functionality
//!
//! ### Submodules
//! - [`types`]: `PacketType`
//! - [`packet`]: JSON wire document codec with HMAC integrity
//! - [`compress`]: Opportunistic gzip compression
//!
//! ## Protocol Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  {"h":{"t":1,"s":0,"l":3,"c":0},                            │
//! │   "b":{"d":"<base64 chunk>","o":2853,"h":"<hex hmac>"}}     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  framed to packet_size - 28, then AEAD-encrypted            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Format Principles
//! - Field-tagged document, so encoding expansion is tolerated
//! - Body encoded as base64 to survive text-only transports
//! - Every packet on the wire is exactly `packet_size` bytes
//!
//! ## ⚠️ Important Note for Next Developer
//! - `MIN_PACKET_SIZE` and `PACKET_DOCUMENT_OVERHEAD` bound each other;
//!   the largest possible document must fit the smallest packet
//!
//! ## Last Modified
//! v0.1.0 - Initial protocol definitions

pub mod compress;
pub mod packet;
pub mod types;

// Re-export primary types
pub use compress::{compress, decompress};
pub use packet::{pack_data, unpack_data_to_packet, Packet, PacketBody, PacketHead};
pub use types::PacketType;

use crate::crypto::{AEAD_OVERHEAD, FRAME_HEADER_SIZE};
use crate::error::{CoreError, Result};

// ============================================
// Constants
// ============================================

/// Smallest packet size the protocol accepts.
pub const MIN_PACKET_SIZE: usize = 2048;

/// Upper bound on the JSON bytes surrounding the encoded chunk:
/// field names, three u64 values, one u8, the type byte and a
/// 128-character hex HMAC.
pub const PACKET_DOCUMENT_OVERHEAD: usize = 256;

/// Rejects packet sizes below [`MIN_PACKET_SIZE`].
///
/// # Errors
/// - `PacketSizeTooSmall`
pub fn check_packet_size(packet_size: usize) -> Result<()> {
    if packet_size < MIN_PACKET_SIZE {
        return Err(CoreError::PacketSizeTooSmall {
            size: packet_size,
            min: MIN_PACKET_SIZE,
        });
    }
    Ok(())
}

/// Size of the frame that is encrypted into one `packet_size` packet.
#[must_use]
pub const fn inner_frame_size(packet_size: usize) -> usize {
    packet_size.saturating_sub(AEAD_OVERHEAD)
}

/// Largest raw chunk that still produces exactly one `packet_size`
/// packet after base64 encoding, document overhead, framing and AEAD.
///
/// Returns 0 when `packet_size` is too small to carry anything.
#[must_use]
pub const fn max_chunk_size(packet_size: usize) -> usize {
    let available = inner_frame_size(packet_size)
        .saturating_sub(FRAME_HEADER_SIZE)
        .saturating_sub(PACKET_DOCUMENT_OVERHEAD);
    available / 4 * 3
}
