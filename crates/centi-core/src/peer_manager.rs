// ============================================
// File: crates/centi-core/src/peer_manager.rs
// ============================================
//! # Peer Manager
//!
//! ## Creation Reason
//! Owns the set of known peers and the network key that authenticates
//! public key distribution.
//!
//! ## Main Functionality
//! - Peer registry behind a reader/writer lock
//! - Bootstrapping peers from configured public keys
//! - Lookup by alias or by public key
//! - Merging duplicate entries once identity is confirmed
//!
//! ## Locking
//! ```text
//! PeerManager::peers (RwLock)   - membership only
//!        └─► Arc<Peer> (Mutex)  - per-peer keys and alias
//! ```
//! Lookups clone the `Arc` and drop the registry lock before touching the
//! peer. `merge_duplicates` is the one place that holds the write lock
//! while taking peer locks, one peer at a time.
//!
//! ## ⚠️ Important Note for Next Developer
//! - Aliases are NOT unique. Discovery creates placeholders freely and
//!   `merge_duplicates` cleans up afterwards.
//!
//! ## Last Modified
//! v0.1.0 - Initial peer manager

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use parking_lot::RwLock;
use tracing::{debug, info};

use centi_common::{CommonError, SaltedPassphrase};

use crate::crypto::kdf::{derive_network_key, NetworkKeyParams};
use crate::crypto::keys::NetworkKey;
use crate::crypto::mac::sha512_hex;
use crate::crypto::PUBLIC_KEY_SIZE;
use crate::error::Result;
use crate::peer::Peer;

/// Registry of known peers.
pub struct PeerManager {
    peers: RwLock<Vec<Arc<Peer>>>,
    network_key: Option<NetworkKey>,
}

impl PeerManager {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(network_key: Option<NetworkKey>) -> Self {
        Self {
            peers: RwLock::new(Vec::new()),
            network_key,
        }
    }

    /// Creates an empty registry, deriving the network key from a
    /// passphrase.
    ///
    /// # Errors
    /// - `KeyDerivation`: see [`derive_network_key`]
    pub fn from_passphrase(passphrase: &SaltedPassphrase, params: NetworkKeyParams) -> Result<Self> {
        let network_key = derive_network_key(passphrase, params)?;
        Ok(Self::new(Some(network_key)))
    }

    /// Network key, if the node belongs to a closed network.
    #[must_use]
    pub fn network_key(&self) -> Option<&NetworkKey> {
        self.network_key.as_ref()
    }

    /// Adds one peer per base64 public key. The alias is the hex SHA-512
    /// of the canonical key blob.
    ///
    /// Nothing is added unless every key parses.
    ///
    /// # Errors
    /// - `Common(Decoding)`: a key is not valid base64
    /// - `InvalidPublicKey`: a key blob is malformed
    pub fn peers_from_keys<S: AsRef<str>>(&self, encoded_keys: &[S]) -> Result<usize> {
        let mut parsed = Vec::with_capacity(encoded_keys.len());
        for encoded in encoded_keys {
            let bytes = BASE64
                .decode(encoded.as_ref().trim())
                .map_err(CommonError::from)?;
            let peer = Peer::new("");
            peer.set_public_key(&bytes, None)?;
            peer.set_alias(sha512_hex(&peer.public_key_bytes()));
            parsed.push(Arc::new(peer));
        }

        let count = parsed.len();
        self.peers.write().extend(parsed);
        info!(count, "Loaded peers from public keys");
        Ok(count)
    }

    /// Adds a peer.
    pub fn add_peer(&self, peer: Arc<Peer>) {
        debug!(alias = %peer.alias(), "Peer added");
        self.peers.write().push(peer);
    }

    /// Checks if any peer carries `alias`.
    #[must_use]
    pub fn exists(&self, alias: &str) -> bool {
        self.peers.read().iter().any(|p| p.alias() == alias)
    }

    /// First peer carrying `alias`.
    #[must_use]
    pub fn get_peer_by_alias(&self, alias: &str) -> Option<Arc<Peer>> {
        self.peers.read().iter().find(|p| p.alias() == alias).cloned()
    }

    /// First peer whose X25519 key matches `public_key` (SPKI or blob).
    #[must_use]
    pub fn get_peer_by_public_key(&self, public_key: &[u8]) -> Option<Arc<Peer>> {
        self.peers
            .read()
            .iter()
            .find(|p| p.matches_public_key(public_key))
            .cloned()
    }

    /// Snapshot of all peers.
    #[must_use]
    pub fn get_peers(&self) -> Vec<Arc<Peer>> {
        self.peers.read().clone()
    }

    /// Number of peers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    /// Checks if no peer is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.peers.read().is_empty()
    }

    /// Collapses entries that share an alias or an X25519 key.
    ///
    /// The later entry survives, inherits key material it lacks, and takes
    /// the shorter of the two aliases. Returns how many entries were
    /// removed.
    pub fn merge_duplicates(&self) -> usize {
        let mut peers = self.peers.write();
        let mut removed = 0;

        let mut keep = peers.len();
        while keep > 0 {
            keep -= 1;
            let mut i = 0;
            while i < keep {
                if is_duplicate(&peers[i], &peers[keep]) {
                    absorb(&peers[keep], &peers[i]);
                    debug!(alias = %peers[keep].alias(), "Merged duplicate peer");
                    peers.remove(i);
                    keep -= 1;
                    removed += 1;
                } else {
                    i += 1;
                }
            }
        }

        if removed > 0 {
            info!(removed, remaining = peers.len(), "Merged duplicate peers");
        }
        removed
    }
}

impl std::fmt::Debug for PeerManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerManager")
            .field("peers", &self.len())
            .field("network_key", &self.network_key.is_some())
            .finish()
    }
}

fn is_duplicate(a: &Arc<Peer>, b: &Arc<Peer>) -> bool {
    if Arc::ptr_eq(a, b) || a.alias() == b.alias() {
        return true;
    }
    match (a.ecdh_public_key(), b.ecdh_public_key()) {
        (Some(x), Some(y)) => x.as_bytes() == y.as_bytes(),
        _ => false,
    }
}

/// Moves what `keep` lacks over from `old`, without overriding `keep`'s
/// own identity.
fn absorb(keep: &Peer, old: &Peer) {
    let old_public = old.public_key_bytes();
    let same_identity = |keep: &Peer| {
        keep.ecdh_public_key().is_none() || keep.matches_public_key(&old_public)
    };

    let installed = if !keep.has_kem_public_key()
        && old_public.len() == PUBLIC_KEY_SIZE
        && same_identity(keep)
    {
        keep.set_public_key(&old_public, None)
    } else if keep.ecdh_public_key().is_none() && !old_public.is_empty() {
        keep.set_ecdh_public_key(&old_public)
    } else {
        Ok(())
    };
    if let Err(e) = installed {
        debug!(alias = %keep.alias(), error = %e, "Merged public key not installed");
    }

    if !keep.has_valid_session_key() && keep.matches_public_key(&old_public) {
        if let Some(session_key) = old.session_key() {
            if let Err(e) = keep.set_session_key(session_key.as_bytes()) {
                debug!(alias = %keep.alias(), error = %e, "Merged session key not installed");
            }
        }
    }

    let old_alias = old.alias();
    if old_alias.len() < keep.alias().len() {
        keep.set_alias(old_alias);
    }
}
