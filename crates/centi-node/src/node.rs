// ============================================
// File: crates/centi-node/src/node.rs
// ============================================
//! # Node Orchestrator
//!
//! ## Creation Reason
//! Wires the protocol engine to the transports: owns the identity, the
//! peer registry, the outbound buffers and the reassembly handlers, and
//! drives them from a single poll loop.
//!
//! ## Main Functionality
//! - `Node`: Lifecycle, inbound classification, outbound flushing
//! - `NodeSettings`: The runtime subset of `NodeConfig`
//! - `Delivered`: A fully reassembled application message
//!
//! ## Inbound Classification
//! ```text
//! wire packet (packet_size bytes)
//!   │
//!   ├─► session peers, one by one: unpack
//!   │     ├─ Data              → data handler       → Delivered
//!   │     ├─ Retransmit        → relay handler      → inner packets:
//!   │     │                                             ours → recurse
//!   │     │                                             else → rebroadcast
//!   │     ├─ PublicKey         → public key handler → learn peers
//!   │     └─ PublicKeyRequest  → answer if send_known_peers
//!   │
//!   ├─► handshake: decapsulate, check network tag, install session
//!   │
//!   └─► discard
//! ```
//!
//! ## Simultaneous Handshakes
//! Two nodes that initiate towards each other in the same tick would end
//! up holding each other's keys. A node that already has a session and
//! receives a handshake keeps it only if the initiator's X25519 key sorts
//! lower than its own; otherwise it answers with a fresh handshake of its
//! own, which the other side then accepts.
//!
//! Every accepted handshake is remembered by the fingerprint of its KEM
//! ciphertext. A handshake seen before is dropped, so a re-delivered or
//! replayed packet can never roll a session back.
//!
//! ## Ephemeral Mode
//! With `ephemeral_mode` the node calls out from a throwaway X25519 key
//! with a random subkey tag. The responder sees a stranger and only takes
//! the handshake with `accept_unknown`. Such nodes never counter a
//! handshake; the incoming one always wins.
//!
//! ## ⚠️ Important Note for Next Developer
//! - Every send broadcasts on every active transport; addressing is purely
//!   cryptographic
//! - `handle_incoming` never fails: foreign and malformed packets are
//!   expected traffic on a shared channel
//! - Replies produced while handling input are queued and go out on the
//!   next `flush_outbound`
//!
//! ## Last Modified
//! v0.1.0 - Initial node orchestrator

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, trace, warn};

use centi_common::random::{random_bytes, random_delay};
use centi_core::crypto::handshake::{Decapsulated, Encapsulated};
use centi_core::crypto::mac::sha512_hex;
use centi_core::crypto::{derive_network_key, NetworkKey, PUBLIC_KEY_SIZE, SYM_KEY_SIZE};
use centi_core::{
    split_relay_payload, unpack_public_keys, CoreError, KeyMaterial, MsgBufManager, MsgHandler,
    Packet, PacketType, Peer, PeerManager,
};
use centi_transport::{Transport, TransportRegistry};

use crate::config::NodeConfig;
use crate::error::{NodeError, Result};

// ============================================
// NodeSettings
// ============================================

/// Runtime parameters of a node.
#[derive(Debug, Clone)]
pub struct NodeSettings {
    /// Fixed wire packet size.
    pub packet_size: usize,
    /// Relay layers wrapped around outbound data.
    pub relay_hops: u8,
    /// Accept handshakes from unconfigured peers.
    pub accept_unknown: bool,
    /// Answer public key requests.
    pub send_known_peers: bool,
    /// Initiate from throwaway identities.
    pub ephemeral_mode: bool,
    /// Pause between polls.
    pub poll_interval: Duration,
    /// Idle time before a partial message is dropped.
    pub reassembly_timeout: Duration,
    /// Lower bound of the pause between sends.
    pub min_delay: Duration,
    /// Upper bound of the pause between sends.
    pub max_delay: Duration,
}

impl From<&NodeConfig> for NodeSettings {
    fn from(config: &NodeConfig) -> Self {
        let (min_delay, max_delay) = config.timing.delay_bounds();
        Self {
            packet_size: config.network.packet_size,
            relay_hops: config.network.relay_hops,
            accept_unknown: config.network.accept_unknown,
            send_known_peers: config.network.send_known_peers,
            ephemeral_mode: config.network.ephemeral_mode,
            poll_interval: config.timing.poll_interval(),
            reassembly_timeout: config.timing.reassembly_timeout(),
            min_delay,
            max_delay,
        }
    }
}

impl Default for NodeSettings {
    fn default() -> Self {
        Self::from(&NodeConfig::default())
    }
}

// ============================================
// Delivered
// ============================================

/// A reassembled application message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivered {
    /// Local alias of the sender.
    pub alias: String,
    /// Message bytes.
    pub data: Vec<u8>,
}

/// Handshake fingerprints remembered for replay detection.
const HANDSHAKE_LOG_CAPACITY: usize = 4096;

/// Bounded set of handshake fingerprints; the oldest is forgotten first.
#[derive(Debug, Default)]
struct HandshakeLog {
    order: VecDeque<String>,
    seen: HashSet<String>,
}

impl HandshakeLog {
    /// Records `fingerprint`. Returns `false` if it was already known.
    fn insert(&mut self, fingerprint: &str) -> bool {
        if self.seen.contains(fingerprint) {
            return false;
        }
        if self.order.len() >= HANDSHAKE_LOG_CAPACITY {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        self.order.push_back(fingerprint.to_string());
        self.seen.insert(fingerprint.to_string());
        true
    }
}

/// What became of one inbound packet.
enum Inbound {
    Delivered(Delivered),
    Consumed,
    Foreign,
}

// ============================================
// Node
// ============================================

/// A running centi node.
pub struct Node {
    settings: NodeSettings,
    keys: KeyMaterial,
    peers: PeerManager,
    /// Handshake keys per peer alias, derived from `network_subkeys`.
    subkeys: HashMap<String, NetworkKey>,
    outbound: MsgBufManager,
    /// Ready-made packets (relayed, replies, counter-handshakes).
    pending: Mutex<VecDeque<Vec<u8>>>,
    handshakes: Mutex<HandshakeLog>,
    data: MsgHandler,
    relay: MsgHandler,
    public_keys: MsgHandler,
    transports: Vec<Arc<dyn Transport>>,
}

impl Node {
    /// Assembles a node from its parts.
    pub fn new(
        settings: NodeSettings,
        keys: KeyMaterial,
        peers: PeerManager,
        subkeys: HashMap<String, NetworkKey>,
        transports: Vec<Arc<dyn Transport>>,
    ) -> Self {
        Self {
            settings,
            keys,
            peers,
            subkeys,
            outbound: MsgBufManager::new(),
            pending: Mutex::new(VecDeque::new()),
            handshakes: Mutex::new(HandshakeLog::default()),
            data: MsgHandler::new(),
            relay: MsgHandler::new(),
            public_keys: MsgHandler::new(),
            transports,
        }
    }

    /// Builds a node from configuration: loads or generates keys, derives
    /// network keys, loads peers and starts every configured transport.
    ///
    /// Transports that fail to start are skipped.
    ///
    /// # Errors
    /// - `ConfigInvalid`: malformed keys or passphrases
    /// - `Core`: key derivation or peer key parsing failed
    /// - `NoTransports`: no transport could be started
    pub async fn from_config(config: &NodeConfig, registry: &TransportRegistry) -> Result<Self> {
        let keys = config.keys.key_material()?;
        let params = config.network.key_params();

        let peers = match config.network.network_passphrase()? {
            Some(passphrase) => PeerManager::from_passphrase(&passphrase, params)?,
            None => PeerManager::new(None),
        };
        peers.peers_from_keys(&config.keys.peers)?;

        let mut subkeys = HashMap::new();
        for (alias, passphrase) in config.network.subkey_passphrases()? {
            subkeys.insert(alias, derive_network_key(&passphrase, params)?);
        }

        let mut transports = Vec::with_capacity(config.transports.len());
        for entry in &config.transports {
            let transport = match registry.build(&entry.module, &entry.args) {
                Ok(transport) => transport,
                Err(e) => {
                    warn!(module = %entry.module, error = %e, "Failed to build transport");
                    continue;
                }
            };
            match transport.init_channels().await {
                Ok(()) => {
                    info!(module = %entry.module, transport = %transport.name(), "Transport started");
                    transports.push(transport);
                }
                Err(e) => warn!(module = %entry.module, error = %e, "Failed to start transport"),
            }
        }
        if transports.is_empty() {
            return Err(NodeError::NoTransports);
        }

        Ok(Self::new(
            NodeSettings::from(config),
            keys,
            peers,
            subkeys,
            transports,
        ))
    }

    // ========================================
    // Accessors
    // ========================================

    /// Returns the runtime settings.
    #[must_use]
    pub fn settings(&self) -> &NodeSettings {
        &self.settings
    }

    /// Returns the node's key pair.
    #[must_use]
    pub fn keys(&self) -> &KeyMaterial {
        &self.keys
    }

    /// Returns the peer registry.
    #[must_use]
    pub fn peers(&self) -> &PeerManager {
        &self.peers
    }

    /// Encoded public key to hand out to peers.
    ///
    /// # Errors
    /// Returns error if the network tag cannot be computed.
    pub fn public_key(&self) -> Result<String> {
        Ok(self.keys.encoded_public_key(self.peers.network_key())?)
    }

    /// Number of packets waiting in the ready-made queue.
    #[must_use]
    pub fn pending_packets(&self) -> usize {
        self.pending.lock().len()
    }

    /// Checks if application data is waiting to be packed.
    #[must_use]
    pub fn has_outbound(&self) -> bool {
        !self.outbound.is_empty()
    }

    // ========================================
    // Outbound
    // ========================================

    /// Queues `data` for the peer called `alias`.
    ///
    /// # Errors
    /// - `UnknownPeer`
    pub fn queue_message(&self, alias: &str, data: &[u8]) -> Result<()> {
        let peer = self
            .peers
            .get_peer_by_alias(alias)
            .ok_or_else(|| NodeError::unknown_peer(alias))?;
        self.outbound.push(&peer, data, self.settings.packet_size);
        trace!(alias, bytes = data.len(), "Message queued");
        Ok(())
    }

    /// Starts a handshake with every peer whose public key is known but
    /// who has no session yet.
    ///
    /// Returns the number of handshakes sent.
    pub async fn initiate_handshakes(&self) -> usize {
        let mut sent = 0;
        for peer in self.peers.get_peers() {
            if !peer.has_kem_public_key() || peer.has_valid_session_key() {
                continue;
            }

            let alias = peer.alias();
            let encapsulated = match self.build_handshake(&peer) {
                Ok(encapsulated) => encapsulated,
                Err(e) => {
                    warn!(alias = %alias, error = %e, "Failed to build handshake");
                    continue;
                }
            };

            if peer.install_session_if_absent(encapsulated.session_key) {
                debug!(alias = %alias, "Handshake initiated");
                self.broadcast(&encapsulated.wire).await;
                sent += 1;
            }
        }
        sent
    }

    /// Asks every session peer for the public keys it knows.
    ///
    /// Returns the number of requests sent.
    pub async fn request_public_keys(&self) -> usize {
        let mut sent = 0;
        for peer in self.peers.get_peers() {
            if !peer.has_valid_session_key() {
                continue;
            }
            match peer.pack_public_key_request(self.settings.packet_size) {
                Ok(packet) => {
                    self.broadcast(&packet).await;
                    sent += 1;
                }
                Err(e) => debug!(alias = %peer.alias(), error = %e, "Failed to pack key request"),
            }
        }
        sent
    }

    /// Sends everything that can be sent: queued ready-made packets first,
    /// then every buffered message whose peer has a session.
    ///
    /// Messages for peers without a session stay queued.
    ///
    /// Returns the number of wire packets sent.
    pub async fn flush_outbound(&self) -> usize {
        let mut sent = 0;

        loop {
            let next = self.pending.lock().pop_front();
            let Some(packet) = next else { break };
            self.pause().await;
            if self.broadcast(&packet).await > 0 {
                sent += 1;
            }
        }

        let mut stalled = 0;
        while !self.outbound.is_empty() && stalled < self.outbound.len() {
            let candidates = self.relay_candidates();
            let hops = if candidates.is_empty() {
                0
            } else {
                self.settings.relay_hops
            };

            match self.outbound.next_via(hops, &candidates) {
                Ok(packets) => {
                    stalled = 0;
                    for packet in packets {
                        self.pause().await;
                        if self.broadcast(&packet).await > 0 {
                            sent += 1;
                        }
                    }
                }
                Err(CoreError::EmptyBuffer) => break,
                Err(e) if e.requires_handshake() => {
                    trace!(error = %e, "Message waits for a session");
                    stalled += 1;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to pack message");
                    stalled += 1;
                }
            }
        }

        if sent > 0 {
            debug!(packets = sent, "Outbound flushed");
        }
        sent
    }

    // ========================================
    // Inbound
    // ========================================

    /// Classifies one wire packet and acts on it.
    ///
    /// Returns the message it completed, if any.
    pub fn handle_incoming(&self, wire: &[u8]) -> Option<Delivered> {
        match self.process(wire) {
            Inbound::Delivered(delivered) => Some(delivered),
            Inbound::Consumed | Inbound::Foreign => None,
        }
    }

    /// Reads every active transport once and handles what arrived.
    pub async fn poll_once(&self) -> Vec<Delivered> {
        let mut delivered = Vec::new();
        for transport in &self.transports {
            if !transport.is_active() {
                continue;
            }
            match transport.recv_all().await {
                Ok(packets) => {
                    trace!(transport = %transport.name(), packets = packets.len(), "Polled");
                    delivered.extend(packets.iter().filter_map(|p| self.handle_incoming(p)));
                }
                Err(e) => warn!(transport = %transport.name(), error = %e, "Receive failed"),
            }
        }
        delivered
    }

    /// Runs the poll loop until `shutdown` fires, forwarding completed
    /// messages to `inbox`.
    ///
    /// # Errors
    /// Currently only returns `Ok`; transport failures are logged.
    pub async fn run(
        &self,
        mut shutdown: broadcast::Receiver<()>,
        inbox: mpsc::Sender<Delivered>,
    ) -> Result<()> {
        info!(
            peers = self.peers.len(),
            transports = self.transports.len(),
            packet_size = self.settings.packet_size,
            "Node started"
        );

        let mut ticker = tokio::time::interval(self.settings.poll_interval);
        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    debug!("Node received shutdown signal");
                    break;
                }
                _ = ticker.tick() => {
                    self.tick(&inbox).await;
                }
            }
        }

        for transport in &self.transports {
            if let Err(e) = transport.delete_channels().await {
                warn!(transport = %transport.name(), error = %e, "Transport shutdown error");
            }
        }
        info!("Node shutdown complete");
        Ok(())
    }

    /// One iteration of the poll loop.
    async fn tick(&self, inbox: &mpsc::Sender<Delivered>) {
        self.initiate_handshakes().await;

        for delivered in self.poll_once().await {
            if inbox.send(delivered).await.is_err() {
                warn!("Inbox closed, message dropped");
            }
        }

        self.flush_outbound().await;

        let timeout = self.settings.reassembly_timeout;
        let evicted = self.data.evict_stale(timeout).len()
            + self.relay.evict_stale(timeout).len()
            + self.public_keys.evict_stale(timeout).len();
        let merged = self.peers.merge_duplicates();
        if evicted > 0 || merged > 0 {
            debug!(evicted, merged, "Cleanup cycle complete");
        }
    }

    fn process(&self, wire: &[u8]) -> Inbound {
        if wire.len() != self.settings.packet_size {
            trace!(len = wire.len(), "Discarded packet of foreign size");
            return Inbound::Foreign;
        }

        for peer in self.peers.get_peers() {
            if !peer.has_valid_session_key() {
                continue;
            }
            match peer.unpack(wire, self.settings.packet_size) {
                Ok(packet) => return self.dispatch(&peer, packet),
                Err(e) if e.is_foreign_packet() => {}
                Err(e) => trace!(alias = %peer.alias(), error = %e, "Unpack failed"),
            }
        }

        match self.keys.decapsulate_and_unpack(wire, self.settings.packet_size) {
            Ok(handshake) => self.accept_handshake(handshake),
            Err(e) => {
                trace!(error = %e, "Discarded foreign packet");
                Inbound::Foreign
            }
        }
    }

    fn dispatch(&self, peer: &Arc<Peer>, packet: Packet) -> Inbound {
        let alias = peer.alias();
        let handler = match packet.packet_type() {
            PacketType::Data => &self.data,
            PacketType::Retransmit => &self.relay,
            PacketType::PublicKey => &self.public_keys,
            PacketType::PublicKeyRequest => {
                self.answer_key_request(peer);
                return Inbound::Consumed;
            }
        };

        handler.add_packet(
            &alias,
            packet.seq(),
            packet.total(),
            packet.is_compressed(),
            packet.payload(),
        );
        let Some(message) = handler.by_alias(&alias) else {
            return Inbound::Consumed;
        };

        match packet.packet_type() {
            PacketType::Data => {
                debug!(alias = %alias, bytes = message.len(), "Message delivered");
                Inbound::Delivered(Delivered {
                    alias,
                    data: message,
                })
            }
            PacketType::Retransmit => self.unwrap_relayed(&alias, &message),
            _ => {
                self.learn_public_keys(&alias, &message);
                Inbound::Consumed
            }
        }
    }

    /// Peels one relay layer. Inner packets we can read are handled here;
    /// the rest go back on the wire.
    fn unwrap_relayed(&self, alias: &str, message: &[u8]) -> Inbound {
        let inner = match split_relay_payload(message, self.settings.packet_size) {
            Ok(inner) => inner,
            Err(e) => {
                debug!(alias, error = %e, "Malformed relay message");
                return Inbound::Consumed;
            }
        };

        let mut delivered = None;
        let mut forwarded = 0;
        for packet in inner {
            match self.process(&packet) {
                Inbound::Delivered(message) => {
                    delivered.get_or_insert(message);
                }
                Inbound::Consumed => {}
                Inbound::Foreign => {
                    self.pending.lock().push_back(packet);
                    forwarded += 1;
                }
            }
        }

        if forwarded > 0 {
            debug!(alias, packets = forwarded, "Relaying packets");
        }
        delivered.map_or(Inbound::Consumed, Inbound::Delivered)
    }

    fn answer_key_request(&self, peer: &Arc<Peer>) {
        let alias = peer.alias();
        if !self.settings.send_known_peers {
            debug!(alias = %alias, "Public key request ignored");
            return;
        }

        let others: Vec<Arc<Peer>> = self
            .peers
            .get_peers()
            .into_iter()
            .filter(|p| p.alias() != alias)
            .collect();
        match peer.pack_public_keys(&others, self.settings.packet_size) {
            Ok(packets) => {
                debug!(alias = %alias, keys = others.len(), "Answering public key request");
                self.pending.lock().extend(packets);
            }
            Err(e) => warn!(alias = %alias, error = %e, "Failed to pack public keys"),
        }
    }

    /// Installs keys received from a session peer. They carry no network
    /// tag; the session itself vouches for them.
    fn learn_public_keys(&self, from: &str, message: &[u8]) {
        let entries = match unpack_public_keys(message) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(alias = from, error = %e, "Malformed public key list");
                return;
            }
        };
        let own = match self.keys.public_key_bytes(None) {
            Ok(own) => own,
            Err(e) => {
                warn!(error = %e, "Failed to encode own public key");
                return;
            }
        };

        let mut learned = 0;
        for entry in entries {
            let Ok(bytes) = entry.public_key_bytes() else {
                continue;
            };
            if bytes.len() < PUBLIC_KEY_SIZE
                || bytes.starts_with(&own)
                || self.peers.get_peer_by_public_key(&bytes).is_some()
            {
                continue;
            }

            let alias = if entry.alias.is_empty() || self.peers.exists(&entry.alias) {
                sha512_hex(&bytes[..PUBLIC_KEY_SIZE])
            } else {
                entry.alias.clone()
            };
            match Peer::with_public_key(alias, &bytes, None) {
                Ok(peer) => {
                    peer.set_platform(entry.platform);
                    self.peers.add_peer(Arc::new(peer));
                    learned += 1;
                }
                Err(e) => debug!(alias = from, error = %e, "Rejected relayed public key"),
            }
        }

        if learned > 0 {
            info!(alias = from, learned, "Learned public keys");
        }
    }

    fn accept_handshake(&self, handshake: Decapsulated) -> Inbound {
        let spki = handshake.peer_public_key_der();
        let known = self.peers.get_peer_by_public_key(&spki);

        // Known identities must carry a valid tag; strangers (ephemeral
        // initiators included) are taken on trust only with accept_unknown.
        let authentic = self.accepted_subkeys().iter().any(|key| handshake.is_authentic(key));
        if !authentic && (known.is_some() || !self.settings.accept_unknown) {
            debug!("Handshake failed network authentication");
            return Inbound::Consumed;
        }

        if !self.handshakes.lock().insert(handshake.fingerprint()) {
            debug!("Replayed handshake dropped");
            return Inbound::Consumed;
        }

        let remote = *handshake.peer_ecdh_public();
        let peer = match known {
            Some(peer) => peer,
            None if self.settings.accept_unknown => {
                let peer = Arc::new(Peer::new(sha512_hex(&spki)));
                self.peers.add_peer(Arc::clone(&peer));
                info!(alias = %peer.alias(), "Accepted handshake from unknown peer");
                peer
            }
            None => {
                debug!("Handshake from unknown peer rejected");
                return Inbound::Consumed;
            }
        };

        if !self.settings.ephemeral_mode
            && peer.has_valid_session_key()
            && !self.yields_to(remote.as_bytes())
            && peer.has_kem_public_key()
        {
            self.counter_handshake(&peer);
            return Inbound::Consumed;
        }

        peer.install_session(remote, handshake.into_session_key());
        Inbound::Consumed
    }

    /// Replaces our session with `peer` by a fresh one of our own making.
    fn counter_handshake(&self, peer: &Arc<Peer>) {
        let alias = peer.alias();
        match self.build_handshake(peer) {
            Ok(encapsulated) => {
                if let Err(e) = peer.set_session_key(encapsulated.session_key.as_bytes()) {
                    warn!(alias = %alias, error = %e, "Failed to install session");
                    return;
                }
                debug!(alias = %alias, "Countered concurrent handshake");
                self.pending.lock().push_back(encapsulated.wire);
            }
            Err(e) => warn!(alias = %alias, error = %e, "Failed to build handshake"),
        }
    }

    /// Encapsulates towards `peer`, from our own identity and subkey or,
    /// in ephemeral mode, from a throwaway key and a random tag.
    fn build_handshake(&self, peer: &Peer) -> Result<Encapsulated> {
        let packet_size = self.settings.packet_size;
        if self.settings.ephemeral_mode {
            let throwaway = KeyMaterial::generate();
            let subkey = random_bytes(SYM_KEY_SIZE)?;
            return Ok(peer.encapsulate_and_pack(&throwaway, packet_size, &subkey)?);
        }
        Ok(peer.encapsulate_and_pack(&self.keys, packet_size, &self.subkey_for(&peer.alias()))?)
    }

    // ========================================
    // Helpers
    // ========================================

    /// Handshakes from lower X25519 keys win.
    fn yields_to(&self, remote: &[u8; 32]) -> bool {
        remote < self.keys.ecdh_public_key().as_bytes()
    }

    /// Key tagging our handshakes towards `alias`.
    fn subkey_for(&self, alias: &str) -> Vec<u8> {
        self.subkeys
            .get(alias)
            .or(self.peers.network_key())
            .map(|key| key.as_bytes().to_vec())
            .unwrap_or_default()
    }

    /// Keys an inbound handshake tag may be made with. An open network
    /// (no network key) also accepts the empty key.
    fn accepted_subkeys(&self) -> Vec<Vec<u8>> {
        let mut keys: Vec<Vec<u8>> = self
            .subkeys
            .values()
            .map(|key| key.as_bytes().to_vec())
            .collect();
        match self.peers.network_key() {
            Some(key) => keys.push(key.as_bytes().to_vec()),
            None => keys.push(Vec::new()),
        }
        keys
    }

    fn relay_candidates(&self) -> Vec<Arc<Peer>> {
        self.peers
            .get_peers()
            .into_iter()
            .filter(|peer| peer.has_valid_session_key())
            .collect()
    }

    async fn pause(&self) {
        if self.settings.max_delay.is_zero() {
            return;
        }
        tokio::time::sleep(random_delay(self.settings.min_delay, self.settings.max_delay)).await;
    }

    /// Sends `packet` on every active transport. Returns how many took it.
    async fn broadcast(&self, packet: &[u8]) -> usize {
        let mut delivered = 0;
        for transport in &self.transports {
            if !transport.is_active() {
                continue;
            }
            match transport.send(packet).await {
                Ok(()) => delivered += 1,
                Err(e) => warn!(transport = %transport.name(), error = %e, "Send failed"),
            }
        }
        delivered
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("packet_size", &self.settings.packet_size)
            .field("peers", &self.peers.len())
            .field("transports", &self.transports.len())
            .finish_non_exhaustive()
    }
}

// ============================================
// Tests
// ============================================
