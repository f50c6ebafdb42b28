//! Shared table of live sessions.
//!
//! Each session's write half is stored here so any other session's RELAY can
//! reach it. The read half never enters the registry; it stays with the task
//! serving that connection.

use std::{collections::HashMap, sync::Arc};

use tokio::{
    io::AsyncWrite,
    sync::{Mutex, RwLock},
};

pub type SessionId = u64;

pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Write half of a session, shared between its own task and relaying senders.
pub type SharedWriter = Arc<Mutex<BoxedWriter>>;

/// Session id to stream mapping plus the id allocator.
///
/// The map and the counter live under one lock so that allocating an id and
/// inserting its entry happen as a single exclusive step.
pub struct Registry {
    inner: RwLock<Sessions>,
}

struct Sessions {
    users: HashMap<SessionId, SharedWriter>,
    next_id: SessionId,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Sessions {
                users: HashMap::new(),
                next_id: 1,
            }),
        }
    }

    /// Allocates the next id and stores `writer` under it.
    ///
    /// Returns the id together with the shared handle the caller should use
    /// for its own replies.
    pub async fn register<W>(&self, writer: W) -> (SessionId, SharedWriter)
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let boxed: BoxedWriter = Box::new(writer);
        let writer = Arc::new(Mutex::new(boxed));
        let mut sessions = self.inner.write().await;
        let id = sessions.next_id;
        sessions.next_id += 1;
        sessions.users.insert(id, Arc::clone(&writer));
        (id, writer)
    }

    pub async fn lookup(&self, id: SessionId) -> Option<SharedWriter> {
        self.inner.read().await.users.get(&id).cloned()
    }

    /// Every registered id except `exclude`, ascending.
    pub async fn other_ids(&self, exclude: SessionId) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = {
            let sessions = self.inner.read().await;
            sessions
                .users
                .keys()
                .copied()
                .filter(|id| *id != exclude)
                .collect()
        };
        ids.sort_unstable();
        ids
    }

    /// Drops the entry for `id`. The id is not handed out again.
    pub async fn remove(&self, id: SessionId) -> Option<SharedWriter> {
        self.inner.write().await.users.remove(&id)
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.users.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Removes every entry, returning how many were registered.
    pub async fn drain(&self) -> usize {
        let mut sessions = self.inner.write().await;
        let count = sessions.users.len();
        sessions.users.clear();
        count
    }
}
