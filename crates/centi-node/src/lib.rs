// ============================================
// File: crates/centi-node/src/lib.rs
// ============================================
//! # centi Node Library
//!
//! ## Creation Reason
//! Turns the protocol engine into a running participant: configuration,
//! transport wiring and the poll loop that ties them together.
//!
//! ## Main Functionality
//! - [`config`]: Node configuration management
//! - [`node`]: The `Node` orchestrator
//! - [`error`]: Node-specific error types
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           Node                                  │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌─────────────┐     ┌─────────────┐     ┌─────────────────┐    │
//! │  │ KeyMaterial │     │ PeerManager │     │  MsgBufManager  │    │
//! │  └─────────────┘     └─────────────┘     └─────────────────┘    │
//! │                                                                 │
//! │  ┌─────────────────────────────────────────────────────────┐    │
//! │  │     MsgHandler × 3  (data, relay, public keys)          │    │
//! │  └─────────────────────────────────────────────────────────┘    │
//! │                                                                 │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                     Transport Layer                             │
//! │       Vec<Arc<dyn Transport>>, built by TransportRegistry       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Data Flow
//! ```text
//! queue_message → MsgBufManager → pack (+ relay layers) → broadcast
//! recv_all → classify → reassemble → Delivered
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Configuration changes require restart (no hot-reload)
//! - The node holds no socket of its own; everything goes through
//!   transports
//!
//! ## Last Modified
//! v0.1.0 - Initial node library

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod node;

// Re-export primary types
pub use config::NodeConfig;
pub use error::{NodeError, Result};
pub use node::{Delivered, Node, NodeSettings};
