//! The connection registry: identity → live connection handle.
//!
//! At most one live handle per identity. A new registration for the same
//! identity supersedes the old one (it never queues behind it); the caller
//! receives the orphaned handle back and is responsible for closing it.
//!
//! Entries live in a [`DashMap`], so exclusive access is per shard - no
//! global lock spans the registry, and unrelated identities never contend.
//! `lookup_sender` clones the outbound sender out of the shard guard so no
//! registry lock is ever held across an await point.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

use chat_types::{Identity, ServerFrame, UserId};

/// Process-wide handle id counter. Ids are never reused within a process
/// lifetime, which is what makes stale-disconnect detection sound.
static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// A live, authenticated connection bound to exactly one identity.
///
/// Owned by the registry for its registered lifetime; the session task keeps
/// only the id and the receiving half of the outbound queue.
pub struct ConnectionHandle {
    handle_id: u64,
    identity: Identity,
    outbound: mpsc::Sender<ServerFrame>,
}

impl ConnectionHandle {
    /// Bind a fresh handle to an identity and its outbound queue.
    pub fn new(identity: Identity, outbound: mpsc::Sender<ServerFrame>) -> Self {
        Self {
            handle_id: NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed),
            identity,
            outbound,
        }
    }

    /// The process-unique id of this handle.
    pub fn handle_id(&self) -> u64 {
        self.handle_id
    }

    /// The identity this handle is bound to.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Hand a frame to this connection's outbound queue without waiting.
    ///
    /// Fails if the queue is full or the connection is already gone - the
    /// caller treats both as "unreachable".
    pub fn try_deliver(&self, frame: ServerFrame) -> Result<(), ServerFrame> {
        self.outbound.try_send(frame).map_err(|e| e.into_inner())
    }
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("handle_id", &self.handle_id)
            .field("identity", &self.identity.id)
            .finish()
    }
}

/// In-memory presence map: identity → current connection handle.
///
/// Scoped to process lifetime; a restart implies every client
/// re-authenticates and re-registers.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    entries: DashMap<UserId, ConnectionHandle>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handle for its identity.
    ///
    /// Returns the superseded handle if one was present - the caller must
    /// proactively close it so no identity ends up with two live sessions.
    pub fn register(&self, handle: ConnectionHandle) -> Option<ConnectionHandle> {
        let user_id = handle.identity().id;
        let previous = self.entries.insert(user_id, handle);
        if previous.is_some() {
            tracing::debug!(user = %user_id, "registration superseded an existing connection");
        }
        previous
    }

    /// Look up the current handle id and outbound sender for an identity.
    ///
    /// The sender is cloned out of the shard guard; callers never hold a
    /// registry lock while sending.
    pub fn lookup_sender(&self, user_id: &UserId) -> Option<(u64, mpsc::Sender<ServerFrame>)> {
        self.entries
            .get(user_id)
            .map(|entry| (entry.handle_id(), entry.outbound.clone()))
    }

    /// Remove the entry for an identity, but only if the stored handle is
    /// the caller's.
    ///
    /// A stale disconnect callback (from a superseded connection) is a
    /// no-op, never an error: the newer connection stays registered.
    /// Returns whether an entry was removed.
    pub fn remove(&self, user_id: &UserId, handle_id: u64) -> bool {
        self.entries
            .remove_if(user_id, |_, handle| handle.handle_id() == handle_id)
            .is_some()
    }

    /// Whether an identity currently has a live connection.
    pub fn is_online(&self, user_id: &UserId) -> bool {
        self.entries.contains_key(user_id)
    }

    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
