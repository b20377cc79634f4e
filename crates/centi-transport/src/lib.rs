// ============================================
// File: crates/centi-transport/src/lib.rs
// ============================================
//! # Centi Transport - Pluggable Packet Channels
//!
//! ## Creation Reason
//! Packets leave and enter a node through transport modules: anything that
//! can carry an opaque blob between parties. This crate defines the
//! capability trait, an explicit module registry, and an in-memory
//! transport.
//!
//! ## Main Functionality
//!
//! ### Modules
//! - [`traits`]: `Transport` trait
//! - [`memory`]: shared-board transport
//! - [`registry`]: name → constructor table
//! - [`error`]: transport error types
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                   centi-node                        │
//! │                       │                             │
//! │         ┌─────────────┴─────────────┐               │
//! │         ▼                           ▼               │
//! │    centi-core                centi-transport        │
//! │                               You are here          │
//! │         │                           │               │
//! │         └─────────────┬─────────────┘               │
//! │                       ▼                             │
//! │                 centi-common                        │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Transports never interpret packets; they are already encrypted and
//!   padded by the core
//! - Always go through the trait so the node stays testable
//!
//! ## Last Modified
//! v0.1.0 - Initial transport layer implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod memory;
pub mod registry;
pub mod traits;

// Re-export primary types
pub use error::{Result, TransportError};
pub use memory::{MemoryBoard, MemoryTransport};
pub use registry::{TransportConstructor, TransportRegistry};
pub use traits::{Transport, TransportArgs};
