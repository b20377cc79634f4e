// ============================================
// File: crates/centi-common/src/lib.rs
// ============================================
//! # centi Common - Shared Utilities Library
//!
//! ## Creation Reason
//! Holds the small pieces every centi crate needs: the base error type,
//! randomness helpers, lock-free timestamps and passphrase parsing.
//!
//! ## Main Functionality
//! - [`error`]: Common error types and result aliases
//! - [`random`]: CSPRNG-backed byte, index and delay helpers
//! - [`time`]: `AtomicInstant` for activity tracking without locks
//! - [`passphrase`]: `<base64 salt>:<password>` parsing
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 centi-node                          │
//! │                    │                                │
//! │         ┌──────────┴──────────┐                    │
//! │         ▼                     ▼                    │
//! │    centi-core          centi-transport             │
//! │         │                     │                    │
//! │         └──────────┬──────────┘                    │
//! │                    ▼                               │
//! │              centi-common  ◄── You are here        │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - This crate is the foundation - changes affect everything
//! - Keep dependencies minimal
//! - Never put protocol logic here
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod passphrase;
pub mod random;
pub mod time;

// Re-export commonly used items at crate root
pub use error::{CommonError, Result};
pub use passphrase::SaltedPassphrase;
pub use time::AtomicInstant;
