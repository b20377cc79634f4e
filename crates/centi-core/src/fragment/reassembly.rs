// ============================================
// File: crates/centi-core/src/fragment/reassembly.rs
// ============================================
//! # Message Reassembly
//!
//! Fragments are placed by sequence number into fixed slots; a slot is
//! written once, so duplicates are harmless and order does not matter.
//! A channel is removed the moment its message is taken out.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{debug, trace};

use centi_common::time::AtomicInstant;

use crate::error::{CoreError, Result};
use crate::protocol::decompress;

/// Largest fragment count a channel accepts.
pub const MAX_TOTAL_PARTS: u64 = 65_536;

// ============================================
// MsgChannel
// ============================================

/// Reassembly slots for one sender.
pub struct MsgChannel {
    alias: String,
    total: u64,
    compressed: bool,
    slots: RwLock<Vec<Option<Vec<u8>>>>,
    last_activity: AtomicInstant,
}

impl MsgChannel {
    /// Creates an empty channel expecting `total` fragments.
    ///
    /// `total` is clamped to [`MAX_TOTAL_PARTS`].
    pub fn new(alias: impl Into<String>, total: u64, compressed: bool) -> Self {
        let total = total.min(MAX_TOTAL_PARTS);
        // Clamped above, so the cast is lossless.
        let slots = vec![None; total as usize];
        Self {
            alias: alias.into(),
            total,
            compressed,
            slots: RwLock::new(slots),
            last_activity: AtomicInstant::now(),
        }
    }

    /// Sender alias.
    #[must_use]
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Expected fragment count.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Whether the assembled message must be inflated.
    #[must_use]
    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    /// Stores a fragment if its slot is still empty.
    ///
    /// Returns `true` if the fragment was stored.
    pub fn push(&self, seq: u64, chunk: &[u8]) -> bool {
        let Ok(index) = usize::try_from(seq) else {
            return false;
        };
        let mut slots = self.slots.write();
        match slots.get_mut(index) {
            Some(slot) if slot.is_none() => {
                *slot = Some(chunk.to_vec());
                self.last_activity.touch();
                true
            }
            _ => false,
        }
    }

    /// Number of filled slots.
    #[must_use]
    pub fn received(&self) -> usize {
        self.slots.read().iter().filter(|slot| slot.is_some()).count()
    }

    /// Checks if every slot is filled.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.slots.read().iter().all(Option::is_some)
    }

    /// Time since the last fragment arrived.
    #[must_use]
    pub fn idle_time(&self) -> Duration {
        self.last_activity.elapsed()
    }

    /// Concatenates the fragments in order and inflates if needed.
    ///
    /// # Errors
    /// - `IncompleteMessage`: a slot is still empty
    /// - `Compression`: the compressed payload is corrupt
    pub fn data(&self) -> Result<Vec<u8>> {
        let slots = self.slots.read();
        let mut out = Vec::new();
        for slot in slots.iter() {
            let Some(chunk) = slot else {
                return Err(CoreError::IncompleteMessage {
                    received: slots.iter().filter(|s| s.is_some()).count(),
                    total: slots.len(),
                });
            };
            out.extend_from_slice(chunk);
        }

        if self.compressed {
            decompress(&out)
        } else {
            Ok(out)
        }
    }
}

impl std::fmt::Debug for MsgChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MsgChannel")
            .field("alias", &self.alias)
            .field("total", &self.total)
            .field("received", &self.received())
            .field("compressed", &self.compressed)
            .finish()
    }
}

// ============================================
// MsgHandler
// ============================================

/// Reassembly channels keyed by sender alias.
#[derive(Default)]
pub struct MsgHandler {
    channels: DashMap<String, Arc<MsgChannel>>,
}

impl MsgHandler {
    /// Creates an empty handler.
    #[must_use]
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Files one fragment under `alias`.
    ///
    /// Opens a channel on first arrival. Ignores the fragment if the open
    /// channel expects a different `total`, if `seq` is out of range, or
    /// if its slot is already filled.
    ///
    /// Returns `true` if the fragment was stored.
    pub fn add_packet(&self, alias: &str, seq: u64, total: u64, compressed: bool, chunk: &[u8]) -> bool {
        if total == 0 || total > MAX_TOTAL_PARTS || seq >= total {
            trace!(alias, seq, total, "Fragment out of range");
            return false;
        }

        let channel = self
            .channels
            .entry(alias.to_string())
            .or_insert_with(|| Arc::new(MsgChannel::new(alias, total, compressed)))
            .clone();

        if channel.total() != total {
            trace!(
                alias,
                expected = channel.total(),
                total,
                "Fragment belongs to another message, dropped"
            );
            return false;
        }
        channel.push(seq, chunk)
    }

    /// Takes the assembled message for `alias` if it is complete.
    ///
    /// A complete channel is removed even when inflating fails.
    #[must_use]
    pub fn by_alias(&self, alias: &str) -> Option<Vec<u8>> {
        let (_, channel) = self.channels.remove_if(alias, |_, channel| channel.is_full())?;
        match channel.data() {
            Ok(data) => Some(data),
            Err(e) => {
                debug!(alias, error = %e, "Failed to assemble message");
                None
            }
        }
    }

    /// Checks if a channel is open for `alias`.
    #[must_use]
    pub fn exists(&self, alias: &str) -> bool {
        self.channels.contains_key(alias)
    }

    /// Number of open channels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Checks if no channel is open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Drops the channel for `alias`.
    pub fn remove(&self, alias: &str) -> bool {
        self.channels.remove(alias).is_some()
    }

    /// Drops channels that saw no fragment for `max_idle`.
    ///
    /// Returns the aliases that were evicted.
    pub fn evict_stale(&self, max_idle: Duration) -> Vec<String> {
        let stale: Vec<String> = self
            .channels
            .iter()
            .filter(|entry| entry.value().idle_time() > max_idle)
            .map(|entry| entry.key().clone())
            .collect();

        let mut evicted = Vec::with_capacity(stale.len());
        for alias in stale {
            if self
                .channels
                .remove_if(&alias, |_, channel| channel.idle_time() > max_idle)
                .is_some()
            {
                debug!(alias = %alias, "Evicted stale reassembly channel");
                evicted.push(alias);
            }
        }
        evicted
    }
}

impl std::fmt::Debug for MsgHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MsgHandler")
            .field("channels", &self.len())
            .finish()
    }
}
