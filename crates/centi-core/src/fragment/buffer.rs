// ============================================
// File: crates/centi-core/src/fragment/buffer.rs
// ============================================
//! # Outbound Message Buffers
//!
//! ## Creation Reason
//! Small application messages are merged into blobs of up to one packet's
//! payload before packing, so a burst of short messages costs fewer
//! packets.
//!
//! ## Main Functionality
//! - `MsgBuffer`: one peer's queue of pending blobs
//! - `MsgBufManager`: one buffer per alias, served round-robin
//!
//! ## ⚠️ Important Note for Next Developer
//! - Coalescing never reorders: a push only ever extends the newest blob
//! - A blob that fails to pack goes back to the front of its queue
//!
//! ## Last Modified
//! v0.1.0 - Initial buffer implementation

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::error::{CoreError, Result};
use crate::peer::Peer;
use crate::protocol::max_chunk_size;

// ============================================
// MsgBuffer
// ============================================

/// Pending outbound blobs for one peer.
pub struct MsgBuffer {
    peer: Arc<Peer>,
    packet_size: usize,
    msg_size: usize,
    parts: VecDeque<Vec<u8>>,
}

impl MsgBuffer {
    /// Creates an empty buffer packing for `peer` at `packet_size`.
    #[must_use]
    pub fn new(peer: Arc<Peer>, packet_size: usize) -> Self {
        Self {
            peer,
            packet_size,
            msg_size: max_chunk_size(packet_size),
            parts: VecDeque::new(),
        }
    }

    /// Peer this buffer packs for.
    #[must_use]
    pub fn peer(&self) -> &Arc<Peer> {
        &self.peer
    }

    /// Queues `data`, appending to the newest blob while it stays below
    /// one packet's payload.
    pub fn push(&mut self, data: &[u8]) {
        match self.parts.back_mut() {
            Some(last) if last.len() + data.len() < self.msg_size => last.extend_from_slice(data),
            _ => self.parts.push_back(data.to_vec()),
        }
    }

    /// Packs the oldest blob.
    ///
    /// # Errors
    /// - `EmptyBuffer`: nothing queued
    /// - see [`Peer::pack_to_send`]
    pub fn next(&mut self) -> Result<Vec<Vec<u8>>> {
        self.next_via(0, &[])
    }

    /// Packs the oldest blob, wrapped for `hops` relays picked from
    /// `candidates`.
    ///
    /// # Errors
    /// - `EmptyBuffer`: nothing queued
    /// - see [`Peer::pack_to_resend`]
    pub fn next_via(&mut self, hops: u8, candidates: &[Arc<Peer>]) -> Result<Vec<Vec<u8>>> {
        let blob = self.parts.pop_front().ok_or(CoreError::EmptyBuffer)?;
        match self.peer.pack_to_resend(&blob, self.packet_size, hops, candidates) {
            Ok(packets) => Ok(packets),
            Err(e) => {
                self.parts.push_front(blob);
                Err(e)
            }
        }
    }

    /// Number of pending blobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Checks if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Drops everything pending.
    pub fn clear(&mut self) {
        self.parts.clear();
    }
}

impl std::fmt::Debug for MsgBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MsgBuffer")
            .field("peer", &self.peer.alias())
            .field("parts", &self.parts.len())
            .field("msg_size", &self.msg_size)
            .finish()
    }
}

// ============================================
// MsgBufManager
// ============================================

/// Outbound buffers for all peers behind one lock.
#[derive(Default)]
pub struct MsgBufManager {
    buffers: Mutex<VecDeque<MsgBuffer>>,
}

impl MsgBufManager {
    /// Creates an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `data` for `peer`, creating its buffer on first use.
    pub fn push(&self, peer: &Arc<Peer>, data: &[u8], packet_size: usize) {
        let alias = peer.alias();
        let mut buffers = self.buffers.lock();
        if let Some(buffer) = buffers.iter_mut().find(|b| b.peer().alias() == alias) {
            buffer.push(data);
            return;
        }

        let mut buffer = MsgBuffer::new(Arc::clone(peer), packet_size);
        buffer.push(data);
        buffers.push_back(buffer);
        trace!(alias = %alias, "Opened outbound buffer");
    }

    /// Packs the next blob of the buffer at the head of the rotation.
    ///
    /// # Errors
    /// See [`next_via`](Self::next_via).
    pub fn next(&self) -> Result<Vec<Vec<u8>>> {
        self.next_via(0, &[])
    }

    /// Packs the next blob of the head buffer, wrapped for relays.
    ///
    /// The buffer then moves to the back of the rotation, or is dropped
    /// once drained.
    ///
    /// # Errors
    /// - `EmptyBuffer`: no buffers
    /// - see [`MsgBuffer::next_via`]
    pub fn next_via(&self, hops: u8, candidates: &[Arc<Peer>]) -> Result<Vec<Vec<u8>>> {
        let mut buffers = self.buffers.lock();
        let mut buffer = buffers.pop_front().ok_or(CoreError::EmptyBuffer)?;
        let result = buffer.next_via(hops, candidates);
        if !buffer.is_empty() {
            buffers.push_back(buffer);
        }
        result
    }

    /// Number of peers with pending data.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffers.lock().len()
    }

    /// Checks if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffers.lock().is_empty()
    }

    /// Checks if a buffer exists for `alias`.
    #[must_use]
    pub fn exists(&self, alias: &str) -> bool {
        self.buffers.lock().iter().any(|b| b.peer().alias() == alias)
    }
}

impl std::fmt::Debug for MsgBufManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MsgBufManager")
            .field("buffers", &self.len())
            .finish()
    }
}
