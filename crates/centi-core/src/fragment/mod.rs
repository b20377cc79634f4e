// ============================================
// File: crates/centi-core/src/fragment/mod.rs
// ============================================
//! # Fragmentation Module
//!
//! ## Creation Reason
//! Outbound coalescing queues and inbound reassembly of multi-packet
//! messages.
//!
//! ## Main Functionality
//! - [`MsgBuffer`] / [`MsgBufManager`]: per-peer outbound queues that
//!   merge small messages into packet-sized blobs
//! - [`MsgChannel`] / [`MsgHandler`]: per-alias reassembly slots that
//!   tolerate reordering and duplicates
//!
//! ## Data Flow
//! ```text
//! push ─► MsgBuffer ─► next() ─► Peer::pack_to_send ─► transport
//! transport ─► Peer::unpack ─► MsgHandler::add_packet ─► by_alias ─► message
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Reassembly is keyed by alias only: one message in flight per sender.
//!   Fragments whose `total` disagrees with the open channel are dropped.
//! - Nothing here evicts on its own; call `MsgHandler::evict_stale`
//!
//! ## Last Modified
//! v0.1.0 - Initial fragmentation support

mod buffer;
mod reassembly;

pub use buffer::{MsgBufManager, MsgBuffer};
pub use reassembly::{MsgChannel, MsgHandler, MAX_TOTAL_PARTS};
