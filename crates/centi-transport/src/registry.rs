// ============================================
// File: crates/centi-transport/src/registry.rs
// ============================================
//! # Transport Registry
//!
//! ## Creation Reason
//! Maps module names to constructors. The registry is an ordinary value
//! owned by whoever builds transports; there is no process-wide table.
//!
//! ## Usage
//! ```
//! use std::sync::Arc;
//! use centi_transport::{MemoryBoard, TransportArgs, TransportRegistry};
//!
//! let mut registry = TransportRegistry::new();
//! registry.register_memory(Arc::new(MemoryBoard::default())).unwrap();
//!
//! let transport = registry.build("memory", &TransportArgs::new()).unwrap();
//! assert_eq!(transport.name(), "memory");
//! ```
//!
//! ## Last Modified
//! v0.1.0 - Initial registry

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::memory::{self, MemoryBoard, MemoryTransport};
use crate::traits::{Transport, TransportArgs};

/// Builds a transport from module arguments.
pub type TransportConstructor =
    Box<dyn Fn(&TransportArgs) -> Result<Arc<dyn Transport>> + Send + Sync>;

/// Named transport constructors.
#[derive(Default)]
pub struct TransportRegistry {
    modules: HashMap<String, TransportConstructor>,
}

impl TransportRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a constructor under `name`.
    ///
    /// # Errors
    /// - `ModuleAlreadyRegistered`
    pub fn register(&mut self, name: impl Into<String>, constructor: TransportConstructor) -> Result<()> {
        let name = name.into();
        if self.modules.contains_key(&name) {
            return Err(TransportError::ModuleAlreadyRegistered(name));
        }
        debug!(module = %name, "Transport module registered");
        self.modules.insert(name, constructor);
        Ok(())
    }

    /// Registers the in-memory transport, attached to `board`.
    ///
    /// # Errors
    /// - `ModuleAlreadyRegistered`
    pub fn register_memory(&mut self, board: Arc<MemoryBoard>) -> Result<()> {
        self.register(
            memory::MODULE_NAME,
            Box::new(move |args| {
                let transport: Arc<dyn Transport> =
                    Arc::new(MemoryTransport::from_args(args, Arc::clone(&board)));
                Ok(transport)
            }),
        )
    }

    /// Removes a module.
    ///
    /// # Errors
    /// - `UnknownModule`
    pub fn unregister(&mut self, name: &str) -> Result<()> {
        self.modules
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| TransportError::UnknownModule(name.to_string()))
    }

    /// Builds a transport of module `name`.
    ///
    /// # Errors
    /// - `UnknownModule`, or whatever the constructor reports
    pub fn build(&self, name: &str, args: &TransportArgs) -> Result<Arc<dyn Transport>> {
        let constructor = self
            .modules
            .get(name)
            .ok_or_else(|| TransportError::UnknownModule(name.to_string()))?;
        constructor(args)
    }

    /// Checks if `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    /// Registered module names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.modules.keys().cloned().collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for TransportRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportRegistry")
            .field("modules", &self.names())
            .finish()
    }
}
