// ============================================
// File: crates/centi-transport/src/memory.rs
// ============================================
//! # In-Memory Board Transport
//!
//! ## Creation Reason
//! A transport that needs no network: every attached transport posts to
//! one shared board and reads everyone else's posts from it. Used for
//! local multi-node setups and for tests of the node loop.
//!
//! ## Main Functionality
//! - `MemoryBoard`: bounded, shared post list
//! - `MemoryTransport`: one reader/writer attached to a board
//!
//! ## Board Semantics
//! ```text
//!   post ids:  1   2   3   4   5
//!   author:    A   B   A   C   B
//!   B.cursor ────────►│            B next reads 4 (C); 5 is B's own
//! ```
//! - Each transport reads each post at most once (per-transport cursor)
//! - A transport never reads its own posts
//! - When full, the oldest post is dropped
//!
//! ## ⚠️ Important Note for Next Developer
//! - Lagging readers silently miss posts dropped by the capacity bound
//!
//! ## Last Modified
//! v0.1.0 - Initial memory transport

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::error::{Result, TransportError};
use crate::traits::{Transport, TransportArgs};

// ============================================
// Constants
// ============================================

/// Default number of posts a board keeps.
pub const DEFAULT_BOARD_CAPACITY: usize = 4096;

/// Largest single post.
pub const MAX_POST_SIZE: usize = 1024 * 1024;

/// Module name the memory transport registers under.
pub const MODULE_NAME: &str = "memory";

// ============================================
// MemoryBoard
// ============================================

struct Post {
    id: u64,
    author: u64,
    data: Vec<u8>,
}

/// Shared post list.
pub struct MemoryBoard {
    posts: Mutex<VecDeque<Post>>,
    capacity: usize,
    next_post: AtomicU64,
    next_member: AtomicU64,
}

impl MemoryBoard {
    /// Creates a board holding at most `capacity` posts.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            posts: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity: capacity.max(1),
            next_post: AtomicU64::new(1),
            next_member: AtomicU64::new(1),
        }
    }

    /// Number of posts currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.posts.lock().len()
    }

    /// Checks if the board holds no posts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.posts.lock().is_empty()
    }

    fn register(&self) -> u64 {
        self.next_member.fetch_add(1, Ordering::Relaxed)
    }

    fn post(&self, author: u64, data: &[u8]) {
        let mut posts = self.posts.lock();
        // Ids are taken under the lock so the list stays sorted.
        let id = self.next_post.fetch_add(1, Ordering::Relaxed);
        if posts.len() >= self.capacity {
            posts.pop_front();
        }
        posts.push_back(Post {
            id,
            author,
            data: data.to_vec(),
        });
    }

    /// Returns posts newer than `cursor` not written by `reader`, and the
    /// new cursor.
    fn read_since(&self, reader: u64, cursor: u64) -> (Vec<Vec<u8>>, u64) {
        let posts = self.posts.lock();
        let mut latest = cursor;
        let unread = posts
            .iter()
            .filter(|post| post.id > cursor)
            .inspect(|post| latest = post.id)
            .filter(|post| post.author != reader)
            .map(|post| post.data.clone())
            .collect();
        (unread, latest)
    }
}

impl Default for MemoryBoard {
    fn default() -> Self {
        Self::new(DEFAULT_BOARD_CAPACITY)
    }
}

impl std::fmt::Debug for MemoryBoard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBoard")
            .field("posts", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

// ============================================
// MemoryTransport
// ============================================

/// A transport attached to a [`MemoryBoard`].
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use centi_transport::{MemoryBoard, MemoryTransport, Transport};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let board = Arc::new(MemoryBoard::default());
/// let alice = MemoryTransport::new("alice", Arc::clone(&board));
/// let bob = MemoryTransport::new("bob", board);
/// alice.init_channels().await?;
/// bob.init_channels().await?;
///
/// alice.send(b"hello").await?;
/// assert_eq!(bob.recv_all().await?, vec![b"hello".to_vec()]);
/// assert!(alice.recv_all().await?.is_empty());
/// # Ok(())
/// # }
/// ```
pub struct MemoryTransport {
    name: String,
    member: u64,
    board: Arc<MemoryBoard>,
    cursor: AtomicU64,
    active: AtomicBool,
}

impl MemoryTransport {
    /// Attaches a new transport to `board`.
    ///
    /// It only sees posts made after it was attached.
    pub fn new(name: impl Into<String>, board: Arc<MemoryBoard>) -> Self {
        let member = board.register();
        let cursor = board.next_post.load(Ordering::Relaxed).saturating_sub(1);
        Self {
            name: name.into(),
            member,
            board,
            cursor: AtomicU64::new(cursor),
            active: AtomicBool::new(false),
        }
    }

    /// Builds a transport from module arguments.
    ///
    /// # Arguments
    /// * `args` - `name` (optional, defaults to `memory`)
    /// * `board` - Board to attach to
    pub fn from_args(args: &TransportArgs, board: Arc<MemoryBoard>) -> Self {
        let name = args
            .get("name")
            .cloned()
            .unwrap_or_else(|| MODULE_NAME.to_string());
        Self::new(name, board)
    }

    fn ensure_active(&self) -> Result<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(TransportError::NotActive(self.name.clone()))
        }
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    fn name(&self) -> &str {
        &self.name
    }

    async fn init_channels(&self) -> Result<()> {
        self.active.store(true, Ordering::Release);
        debug!(transport = %self.name, "Memory channels initialised");
        Ok(())
    }

    async fn send(&self, packet: &[u8]) -> Result<()> {
        self.ensure_active()?;
        if packet.len() > MAX_POST_SIZE {
            return Err(TransportError::PayloadTooLarge {
                size: packet.len(),
                limit: MAX_POST_SIZE,
            });
        }
        self.board.post(self.member, packet);
        trace!(transport = %self.name, bytes = packet.len(), "Posted packet");
        Ok(())
    }

    async fn recv_all(&self) -> Result<Vec<Vec<u8>>> {
        self.ensure_active()?;
        let cursor = self.cursor.load(Ordering::Acquire);
        let (packets, latest) = self.board.read_since(self.member, cursor);
        self.cursor.fetch_max(latest, Ordering::AcqRel);
        Ok(packets)
    }

    async fn delete_channels(&self) -> Result<()> {
        self.active.store(false, Ordering::Release);
        debug!(transport = %self.name, "Memory channels deleted");
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for MemoryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTransport")
            .field("name", &self.name)
            .field("member", &self.member)
            .field("active", &self.is_active())
            .finish()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    async fn attached(name: &str, board: &Arc<MemoryBoard>) -> MemoryTransport {
        let transport = MemoryTransport::new(name, Arc::clone(board));
        transport.init_channels().await.unwrap();
        transport
    }

    #[tokio::test]
    async fn test_post_and_read() {
        let board = Arc::new(MemoryBoard::default());
        let alice = attached("alice", &board).await;
        let bob = attached("bob", &board).await;

        alice.send(b"one").await.unwrap();
        alice.send(b"two").await.unwrap();

        assert_eq!(bob.recv_all().await.unwrap(), vec![b"one".to_vec(), b"two".to_vec()]);
        // Each post is read once.
        assert!(bob.recv_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_own_posts_skipped() {
        let board = Arc::new(MemoryBoard::default());
        let alice = attached("alice", &board).await;
        let bob = attached("bob", &board).await;

        alice.send(b"from alice").await.unwrap();
        bob.send(b"from bob").await.unwrap();

        assert_eq!(alice.recv_all().await.unwrap(), vec![b"from bob".to_vec()]);
        assert_eq!(bob.recv_all().await.unwrap(), vec![b"from alice".to_vec()]);
    }

    #[tokio::test]
    async fn test_late_joiner_sees_only_new_posts() {
        let board = Arc::new(MemoryBoard::default());
        let alice = attached("alice", &board).await;
        alice.send(b"old").await.unwrap();

        let carol = attached("carol", &board).await;
        alice.send(b"new").await.unwrap();
        assert_eq!(carol.recv_all().await.unwrap(), vec![b"new".to_vec()]);
    }

    #[tokio::test]
    async fn test_capacity_bound() {
        let board = Arc::new(MemoryBoard::new(2));
        let alice = attached("alice", &board).await;
        let bob = attached("bob", &board).await;

        for packet in [b"1", b"2", b"3"] {
            alice.send(packet).await.unwrap();
        }
        assert_eq!(board.len(), 2);
        assert_eq!(bob.recv_all().await.unwrap(), vec![b"2".to_vec(), b"3".to_vec()]);
    }

    #[tokio::test]
    async fn test_inactive_transport_rejected() {
        let board = Arc::new(MemoryBoard::default());
        let alice = MemoryTransport::new("alice", Arc::clone(&board));
        assert!(matches!(
            alice.send(b"x").await,
            Err(TransportError::NotActive(_))
        ));

        alice.init_channels().await.unwrap();
        assert!(alice.is_active());
        alice.delete_channels().await.unwrap();
        assert!(alice.recv_all().await.is_err());
    }

    #[tokio::test]
    async fn test_oversized_post_rejected() {
        let board = Arc::new(MemoryBoard::default());
        let alice = attached("alice", &board).await;
        let big = vec![0u8; MAX_POST_SIZE + 1];
        assert!(matches!(
            alice.send(&big).await,
            Err(TransportError::PayloadTooLarge { .. })
        ));
    }

    #[test]
    fn test_from_args() {
        let board = Arc::new(MemoryBoard::default());
        let mut args = TransportArgs::new();
        assert_eq!(MemoryTransport::from_args(&args, Arc::clone(&board)).name(), MODULE_NAME);

        args.insert("name".into(), "lan".into());
        assert_eq!(MemoryTransport::from_args(&args, board).name(), "lan");
    }
}
