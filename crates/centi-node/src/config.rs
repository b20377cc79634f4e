// ============================================
// File: crates/centi-node/src/config.rs
// ============================================
//! # Node Configuration
//!
//! ## Creation Reason
//! Provides configuration management for a centi node, loaded from a
//! TOML file.
//!
//! ## Main Functionality
//! - `NodeConfig`: Main configuration structure
//! - TOML file loading and parsing
//! - Configuration validation
//! - Defaults for every field
//!
//! ## Configuration Sections
//! - `network`: Packet size, network key and subkeys, relaying policy
//! - `keys`: Own key pair (text form) and known peer public keys
//! - `timing`: Poll interval, reassembly timeout, send jitter
//! - `logging`: Log level
//! - `transports`: Transport modules to start, with their arguments
//!
//! ## Example Configuration
//! ```toml
//! [network]
//! packet_size = 4096
//! network_key = "c2FsdHNhbHQ=:correct horse battery staple"
//! relay_hops = 1
//! accept_unknown = true
//!
//! [network.network_subkeys]
//! bob = "cGVwcGVycGVwcGVy:bob's secret"
//!
//! [keys]
//! peers = ["<base64 public key>"]
//!
//! [timing]
//! poll_interval_ms = 1000
//! min_delay_ms = 0
//! max_delay_ms = 250
//!
//! [[transports]]
//! module = "memory"
//! args = { name = "loopback" }
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Every node of a network needs the same `packet_size`, `network_key`
//!   and `argon2_lanes`, or they cannot talk
//! - A missing key pair is generated at startup and NOT written back;
//!   use `centi-node keygen` for a stable identity
//!
//! ## Last Modified
//! v0.1.0 - Initial configuration implementation

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use centi_common::SaltedPassphrase;
use centi_core::protocol::MIN_PACKET_SIZE;
use centi_core::{KeyMaterial, NetworkKeyParams};

use crate::error::{NodeError, Result};

// ============================================
// NodeConfig
// ============================================

/// Main node configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Network configuration.
    #[serde(default)]
    pub network: NetworkConfig,

    /// Key configuration.
    #[serde(default)]
    pub keys: KeysConfig,

    /// Timing configuration.
    #[serde(default)]
    pub timing: TimingConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Transport modules to start.
    #[serde(default = "default_transports")]
    pub transports: Vec<TransportConfig>,
}

impl NodeConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    /// Returns error if file cannot be read, parsed or validated.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        info!("Loading configuration from: {}", path_str);

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| NodeError::config_load(&path_str, e.to_string()))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| NodeError::config_load(&path_str, e.to_string()))?;

        config.validate()?;

        info!("Configuration loaded successfully");
        Ok(config)
    }

    /// Loads configuration from a string.
    ///
    /// # Errors
    /// Returns error if the content cannot be parsed or validated.
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| NodeError::config_load("<string>", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns `ConfigInvalid` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        self.network.validate()?;
        self.keys.validate()?;
        self.timing.validate()?;
        if self.transports.is_empty() {
            return Err(NodeError::config_invalid(
                "transports",
                "at least one transport is required",
            ));
        }
        for transport in &self.transports {
            transport.validate()?;
        }
        Ok(())
    }

    /// Serializes configuration to TOML string.
    #[must_use]
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            keys: KeysConfig::default(),
            timing: TimingConfig::default(),
            logging: LoggingConfig::default(),
            transports: default_transports(),
        }
    }
}

// ============================================
// NetworkConfig
// ============================================

/// Network configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Fixed size of every wire packet.
    #[serde(default = "default_packet_size")]
    pub packet_size: usize,

    /// Community passphrase, `<base64 salt>:<password>`.
    #[serde(default)]
    pub network_key: Option<String>,

    /// Per-peer handshake passphrases, keyed by peer alias.
    #[serde(default)]
    pub network_subkeys: HashMap<String, String>,

    /// Argon2 lanes used when stretching passphrases.
    #[serde(default = "default_argon2_lanes")]
    pub argon2_lanes: u32,

    /// Relay layers wrapped around every outbound message.
    #[serde(default)]
    pub relay_hops: u8,

    /// Accept handshakes from peers whose key is not configured.
    #[serde(default)]
    pub accept_unknown: bool,

    /// Answer public key requests with the known peer list.
    #[serde(default)]
    pub send_known_peers: bool,

    /// Initiate every handshake from a throwaway X25519 key tagged with a
    /// random subkey, so responders cannot tell who is calling. Only
    /// responders with `accept_unknown` will take such handshakes.
    #[serde(default)]
    pub ephemeral_mode: bool,
}

fn default_packet_size() -> usize {
    4096
}

fn default_argon2_lanes() -> u32 {
    1
}

impl NetworkConfig {
    fn validate(&self) -> Result<()> {
        if self.packet_size < MIN_PACKET_SIZE {
            return Err(NodeError::config_invalid(
                "network.packet_size",
                format!("must be at least {MIN_PACKET_SIZE}"),
            ));
        }

        if self.argon2_lanes == 0 {
            return Err(NodeError::config_invalid(
                "network.argon2_lanes",
                "must be greater than 0",
            ));
        }

        self.network_passphrase()?;
        for alias in self.network_subkeys.keys() {
            if alias.is_empty() {
                return Err(NodeError::config_invalid(
                    "network.network_subkeys",
                    "alias cannot be empty",
                ));
            }
        }
        self.subkey_passphrases()?;
        Ok(())
    }

    /// Parses the community passphrase, if configured.
    ///
    /// # Errors
    /// Returns `ConfigInvalid` if it is not `<base64 salt>:<password>`.
    pub fn network_passphrase(&self) -> Result<Option<SaltedPassphrase>> {
        self.network_key
            .as_deref()
            .map(|raw| parse_passphrase("network.network_key", raw))
            .transpose()
    }

    /// Parses every subkey passphrase.
    ///
    /// # Errors
    /// Returns `ConfigInvalid` naming the first malformed entry.
    pub fn subkey_passphrases(&self) -> Result<Vec<(String, SaltedPassphrase)>> {
        self.network_subkeys
            .iter()
            .map(|(alias, raw)| {
                let field = format!("network.network_subkeys.{alias}");
                Ok((alias.clone(), parse_passphrase(&field, raw)?))
            })
            .collect()
    }

    /// Argon2 parameters for this network.
    #[must_use]
    pub fn key_params(&self) -> NetworkKeyParams {
        NetworkKeyParams::with_lanes(self.argon2_lanes)
    }
}

fn parse_passphrase(field: &str, raw: &str) -> Result<SaltedPassphrase> {
    raw.parse()
        .map_err(|e: centi_common::CommonError| NodeError::config_invalid(field, e.to_string()))
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            packet_size: default_packet_size(),
            network_key: None,
            network_subkeys: HashMap::new(),
            argon2_lanes: default_argon2_lanes(),
            relay_hops: 0,
            accept_unknown: false,
            send_known_peers: false,
            ephemeral_mode: false,
        }
    }
}

// ============================================
// KeysConfig
// ============================================

/// Key configuration section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeysConfig {
    /// Own public key, text form.
    #[serde(default)]
    pub public_key: Option<String>,

    /// Own private key, text form.
    #[serde(default)]
    pub private_key: Option<String>,

    /// Known peers, base64 public key blobs.
    #[serde(default)]
    pub peers: Vec<String>,
}

impl KeysConfig {
    fn validate(&self) -> Result<()> {
        match (&self.public_key, &self.private_key) {
            (Some(_), None) | (None, Some(_)) => Err(NodeError::config_invalid(
                "keys",
                "public_key and private_key must be set together",
            )),
            _ => Ok(()),
        }
    }

    /// Loads the configured key pair, or generates a fresh one.
    ///
    /// # Errors
    /// Returns error if the configured keys do not parse.
    pub fn key_material(&self) -> Result<KeyMaterial> {
        match (&self.public_key, &self.private_key) {
            (Some(pk), Some(sk)) => Ok(KeyMaterial::from_text(pk, sk)?),
            _ => {
                warn!("No key pair configured, generating an ephemeral one");
                Ok(KeyMaterial::generate())
            }
        }
    }
}

// ============================================
// TimingConfig
// ============================================

/// Timing configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Pause between transport polls.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Idle time after which a partial message is dropped.
    #[serde(default = "default_reassembly_timeout_secs")]
    pub reassembly_timeout_secs: u64,

    /// Lower bound of the random pause between outbound sends.
    #[serde(default)]
    pub min_delay_ms: u64,

    /// Upper bound of the random pause between outbound sends.
    #[serde(default)]
    pub max_delay_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_reassembly_timeout_secs() -> u64 {
    600
}

impl TimingConfig {
    fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(NodeError::config_invalid(
                "timing.poll_interval_ms",
                "must be greater than 0",
            ));
        }

        if self.reassembly_timeout_secs == 0 {
            return Err(NodeError::config_invalid(
                "timing.reassembly_timeout_secs",
                "must be greater than 0",
            ));
        }

        if self.min_delay_ms > self.max_delay_ms {
            return Err(NodeError::config_invalid(
                "timing.min_delay_ms",
                "cannot exceed max_delay_ms",
            ));
        }

        Ok(())
    }

    /// Returns the poll interval.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Returns the reassembly timeout.
    #[must_use]
    pub fn reassembly_timeout(&self) -> Duration {
        Duration::from_secs(self.reassembly_timeout_secs)
    }

    /// Returns the send jitter bounds.
    #[must_use]
    pub fn delay_bounds(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.min_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        )
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            reassembly_timeout_secs: default_reassembly_timeout_secs(),
            min_delay_ms: 0,
            max_delay_ms: 0,
        }
    }
}

// ============================================
// LoggingConfig
// ============================================

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ============================================
// TransportConfig
// ============================================

/// One transport module to start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Registered module name.
    pub module: String,

    /// Module-specific arguments.
    #[serde(default)]
    pub args: HashMap<String, String>,
}

fn default_transports() -> Vec<TransportConfig> {
    vec![TransportConfig {
        module: centi_transport::memory::MODULE_NAME.to_string(),
        args: HashMap::new(),
    }]
}

impl TransportConfig {
    fn validate(&self) -> Result<()> {
        if self.module.trim().is_empty() {
            return Err(NodeError::config_invalid(
                "transports.module",
                "cannot be empty",
            ));
        }
        Ok(())
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = NodeConfig::from_str("").unwrap();
        assert_eq!(config.network.packet_size, 4096);
        assert_eq!(config.network.argon2_lanes, 1);
        assert!(!config.network.ephemeral_mode);
        assert_eq!(config.timing.poll_interval_ms, 1000);
        assert_eq!(config.timing.reassembly_timeout_secs, 600);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.transports.len(), 1);
        assert_eq!(config.transports[0].module, "memory");
    }

    #[test]
    fn test_full_config_format() {
        let toml = r#"
            [network]
            packet_size = 2048
            network_key = "c2FsdHNhbHQ=:correct:horse"
            relay_hops = 2
            accept_unknown = true
            send_known_peers = true
            ephemeral_mode = true

            [network.network_subkeys]
            bob = "cGVwcGVycGVwcGVy:bob's secret"

            [keys]
            peers = ["AAAA", "BBBB"]

            [timing]
            poll_interval_ms = 250
            min_delay_ms = 10
            max_delay_ms = 20

            [logging]
            level = "debug"

            [[transports]]
            module = "memory"
            args = { name = "loopback" }
        "#;

        let config = NodeConfig::from_str(toml).unwrap();
        assert_eq!(config.network.packet_size, 2048);
        assert_eq!(config.network.relay_hops, 2);
        assert!(config.network.accept_unknown);
        assert!(config.network.send_known_peers);
        assert!(config.network.ephemeral_mode);
        assert_eq!(config.keys.peers.len(), 2);
        assert_eq!(config.timing.poll_interval(), Duration::from_millis(250));
        assert_eq!(
            config.timing.delay_bounds(),
            (Duration::from_millis(10), Duration::from_millis(20))
        );
        assert_eq!(config.transports[0].args["name"], "loopback");

        let passphrase = config.network.network_passphrase().unwrap().unwrap();
        assert_eq!(passphrase.salt(), b"saltsalt");
        assert_eq!(passphrase.password(), b"correct:horse");

        let subkeys = config.network.subkey_passphrases().unwrap();
        assert_eq!(subkeys.len(), 1);
        assert_eq!(subkeys[0].0, "bob");
    }

    #[test]
    fn test_packet_size_floor() {
        let err = NodeConfig::from_str("[network]\npacket_size = 1024").unwrap_err();
        assert!(err.is_config_error());
        assert!(err.to_string().contains("network.packet_size"));
    }

    #[test]
    fn test_delay_bounds_ordered() {
        let err = NodeConfig::from_str("[timing]\nmin_delay_ms = 50\nmax_delay_ms = 10").unwrap_err();
        assert!(err.to_string().contains("timing.min_delay_ms"));
    }

    #[test]
    fn test_network_key_requires_salt() {
        let err = NodeConfig::from_str("[network]\nnetwork_key = \"no-salt-here\"").unwrap_err();
        assert!(err.to_string().contains("network.network_key"));
    }

    #[test]
    fn test_half_configured_key_pair_rejected() {
        let err = NodeConfig::from_str("[keys]\npublic_key = \"abc\"").unwrap_err();
        assert!(err.to_string().contains("keys"));
    }

    #[test]
    fn test_empty_transport_list_rejected() {
        let mut config = NodeConfig::default();
        config.transports.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_configured_key_material_round_trip() {
        let keys = KeyMaterial::generate();
        let (pk, sk) = keys.to_text();
        let config = KeysConfig {
            public_key: Some(pk),
            private_key: Some(sk),
            peers: Vec::new(),
        };

        let loaded = config.key_material().unwrap();
        assert_eq!(
            loaded.ecdh_public_key().as_bytes(),
            keys.ecdh_public_key().as_bytes()
        );
    }

    #[test]
    fn test_to_toml_reparses() {
        let mut config = NodeConfig::default();
        config.network.relay_hops = 3;
        config.timing.max_delay_ms = 100;

        let reparsed = NodeConfig::from_str(&config.to_toml()).unwrap();
        assert_eq!(reparsed.network.relay_hops, 3);
        assert_eq!(reparsed.timing.max_delay_ms, 100);
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[network]\npacket_size = 8192\n\n[logging]\nlevel = \"warn\"").unwrap();

        let config = NodeConfig::load(file.path()).await.unwrap();
        assert_eq!(config.network.packet_size, 8192);
        assert_eq!(config.logging.level, "warn");
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = NodeConfig::load(dir.path().join("absent.toml")).await.unwrap_err();
        assert!(matches!(err, NodeError::ConfigLoad { .. }));
    }
}
