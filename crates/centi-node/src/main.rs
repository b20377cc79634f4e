// ============================================
// File: crates/centi-node/src/main.rs
// ============================================
//! # centi Node Entry Point
//!
//! ## Creation Reason
//! Main entry point for the centi node binary.
//! Handles CLI parsing, logging setup, and node startup.
//!
//! ## Main Functionality
//! - CLI argument parsing with clap
//! - Logging initialization with tracing
//! - Key generation and inspection
//! - Node execution with a line-based console
//!
//! ## Usage
//! ```bash
//! # Generate a key pair and paste it into the [keys] section
//! centi-node keygen
//!
//! # Print the public key to hand out to peers
//! centi-node pubkey --config node.toml
//!
//! # Check a config file
//! centi-node validate --config node.toml
//!
//! # Run; type "<alias> <message>" lines on stdin to send
//! centi-node start --config node.toml
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Only the in-memory transport is registered here; it is useful for
//!   loopback testing. Register real modules before `Node::from_config`
//! - `pubkey` derives the network key, which takes a moment with the
//!   default Argon2 cost
//!
//! ## Last Modified
//! v0.1.0 - Initial CLI implementation

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use centi_core::{KeyMaterial, PeerManager};
use centi_node::{Node, NodeConfig, NodeError};
use centi_transport::{MemoryBoard, TransportRegistry};

// ============================================
// CLI Definition
// ============================================

/// centi peer-to-peer messaging node
#[derive(Parser, Debug)]
#[command(name = "centi-node")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a fresh key pair
    Keygen,

    /// Show the public key to share with peers
    Pubkey {
        /// Path to configuration file
        #[arg(short, long, default_value = "node.toml")]
        config: PathBuf,
    },

    /// Validate configuration file
    Validate {
        /// Path to configuration file
        #[arg(short, long, default_value = "node.toml")]
        config: PathBuf,
    },

    /// Start the node
    Start {
        /// Path to configuration file
        #[arg(short, long, default_value = "node.toml")]
        config: PathBuf,
    },
}

// ============================================
// Main
// ============================================

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Keygen => {
            init_logging("warn");
            cmd_keygen()
        }
        Commands::Pubkey { config } => {
            init_logging("warn");
            cmd_pubkey(config).await
        }
        Commands::Validate { config } => {
            init_logging("info");
            cmd_validate(config).await
        }
        Commands::Start { config } => cmd_start(config).await,
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}

// ============================================
// Commands
// ============================================

/// Prints a new key pair as a `[keys]` section.
fn cmd_keygen() -> anyhow::Result<()> {
    let keys = KeyMaterial::generate();
    let (public_key, private_key) = keys.to_text();

    println!("[keys]");
    println!("public_key = \"{public_key}\"");
    println!("private_key = \"{private_key}\"");
    println!();
    println!("# Shareable public key (open network):");
    println!("# {}", keys.encoded_public_key(None)?);
    Ok(())
}

/// Prints the encoded public key, tagged with the network key if any.
async fn cmd_pubkey(config_path: PathBuf) -> anyhow::Result<()> {
    let config = NodeConfig::load(&config_path).await?;
    if config.keys.public_key.is_none() {
        return Err(NodeError::config_invalid("keys", "no key pair configured; run keygen").into());
    }

    let keys = config.keys.key_material()?;
    let peers = match config.network.network_passphrase()? {
        Some(passphrase) => PeerManager::from_passphrase(&passphrase, config.network.key_params())?,
        None => PeerManager::new(None),
    };

    println!("{}", keys.encoded_public_key(peers.network_key())?);
    Ok(())
}

/// Validates configuration file.
async fn cmd_validate(config_path: PathBuf) -> anyhow::Result<()> {
    let config = NodeConfig::load(&config_path).await?;

    println!("✅ Configuration is valid");
    println!();
    println!("Network:");
    println!("   Packet size:    {}", config.network.packet_size);
    println!(
        "   Network key:    {}",
        if config.network.network_key.is_some() { "set" } else { "open network" }
    );
    println!("   Subkeys:        {}", config.network.network_subkeys.len());
    println!("   Relay hops:     {}", config.network.relay_hops);
    println!("   Accept unknown: {}", config.network.accept_unknown);
    println!("   Ephemeral mode: {}", config.network.ephemeral_mode);
    println!();
    println!("Keys:");
    println!(
        "   Key pair:       {}",
        if config.keys.public_key.is_some() { "configured" } else { "ephemeral" }
    );
    println!("   Known peers:    {}", config.keys.peers.len());
    println!();
    println!("Transports:");
    for transport in &config.transports {
        println!("   {}", transport.module);
    }
    println!();

    Ok(())
}

/// Runs the node until Ctrl+C.
async fn cmd_start(config_path: PathBuf) -> anyhow::Result<()> {
    let config = NodeConfig::load(&config_path).await?;
    init_logging(&config.logging.level);

    info!("Starting centi node v{}", env!("CARGO_PKG_VERSION"));

    let mut registry = TransportRegistry::new();
    registry.register_memory(Arc::new(MemoryBoard::default()))?;

    let node = Arc::new(Node::from_config(&config, &registry).await?);
    info!(public_key = %node.public_key()?, "Node identity");

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let (inbox_tx, mut inbox_rx) = mpsc::channel(64);

    let runner = {
        let node = Arc::clone(&node);
        tokio::spawn(async move { node.run(shutdown_rx, inbox_tx).await })
    };

    let printer = tokio::spawn(async move {
        while let Some(message) = inbox_rx.recv().await {
            println!("{}: {}", message.alias, String::from_utf8_lossy(&message.data));
        }
    });

    let console = {
        let node = Arc::clone(&node);
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let Some((alias, text)) = line.trim().split_once(' ') else {
                    continue;
                };
                if let Err(e) = node.queue_message(alias, text.as_bytes()) {
                    warn!("{}", e);
                }
            }
        })
    };

    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal");
    shutdown_tx.send(()).ok();

    runner.await??;
    console.abort();
    printer.await.ok();
    Ok(())
}

// ============================================
// Helper Functions
// ============================================

/// Initializes the tracing subscriber.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .try_init()
        .ok();
}
