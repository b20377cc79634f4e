// ============================================
// File: crates/centi-transport/src/traits.rs
// ============================================
//! # Transport Trait
//!
//! ## Creation Reason
//! The capability interface every transport module implements. The node
//! talks to transports only through this trait; the protocol core never
//! sees them at all.
//!
//! ## Design Philosophy
//! - Transports are byte pipes: whole packets in, whole packets out
//! - Async-first design with `async_trait`
//! - Receiving is a non-blocking drain, driven by the node's poll loop
//!
//! ## ⚠️ Important Note for Next Developer
//! - Implementations must be Send + Sync for use in async contexts
//! - `recv_all` must not return the transport's own sends
//!
//! ## Last Modified
//! v0.1.0 - Initial trait definitions

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Result;

/// Free-form module arguments, as read from configuration.
pub type TransportArgs = HashMap<String, String>;

/// A pluggable channel that carries fixed-size packets between peers.
///
/// # Lifecycle
/// ```text
/// init_channels ─► send / recv_all ... ─► delete_channels
/// ```
///
/// # Example
/// ```ignore
/// async fn relay(from: &dyn Transport, to: &dyn Transport) -> Result<()> {
///     for packet in from.recv_all().await? {
///         to.send(&packet).await?;
///     }
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait Transport: Send + Sync {
    /// Module name, unique per node.
    fn name(&self) -> &str;

    /// Prepares the underlying channels.
    ///
    /// # Errors
    /// Returns error if the channels cannot be created
    async fn init_channels(&self) -> Result<()>;

    /// Publishes one packet.
    ///
    /// # Errors
    /// Returns error if the transport is inactive or the send fails
    async fn send(&self, packet: &[u8]) -> Result<()>;

    /// Drains every packet that arrived since the last call.
    ///
    /// # Errors
    /// Returns error if the transport is inactive or the read fails
    async fn recv_all(&self) -> Result<Vec<Vec<u8>>>;

    /// Tears the channels down. Further sends fail.
    ///
    /// # Errors
    /// Returns error if cleanup fails
    async fn delete_channels(&self) -> Result<()>;

    /// Returns `true` between `init_channels` and `delete_channels`.
    fn is_active(&self) -> bool;
}
