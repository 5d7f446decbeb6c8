//! Session registry: the single source of truth for "who is connected,
//! to what, on this instance".
//!
//! One `RwLock` guards both maps together so `sessions` and
//! `sessions_by_user` can never observe each other mid-update — the
//! invariant the teacher's `DashMap`-per-map design couldn't give (two
//! separate concurrent maps can each finish their own update in either
//! order, leaving a window where a session_id exists in one but not the
//! other).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::presentation::websocket::messages::{CloseCommand, GatewaySend};
use crate::presentation::websocket::session::GatewaySession;

/// Read-only view of one session, enough for the dispatch router to
/// decide recipients without touching the registry's internals.
#[derive(Debug, Clone)]
pub struct SessionDescriptor {
    pub session_id: String,
    pub user_id: i64,
    pub guilds: HashSet<i64>,
}

struct Entry {
    user_id: i64,
    guilds: HashSet<i64>,
    sender: tokio::sync::mpsc::UnboundedSender<GatewaySend>,
    close_sender: tokio::sync::mpsc::UnboundedSender<CloseCommand>,
}

struct Inner {
    sessions: HashMap<String, Entry>,
    sessions_by_user: HashMap<i64, HashSet<String>>,
}

#[derive(Clone)]
pub struct Registry {
    inner: Arc<RwLock<Inner>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                sessions: HashMap::new(),
                sessions_by_user: HashMap::new(),
            })),
        }
    }

    pub async fn register(
        &self,
        session_id: String,
        user_id: i64,
        guilds: HashSet<i64>,
        sender: tokio::sync::mpsc::UnboundedSender<GatewaySend>,
        close_sender: tokio::sync::mpsc::UnboundedSender<CloseCommand>,
    ) {
        let mut inner = self.inner.write().await;
        inner.sessions.insert(
            session_id.clone(),
            Entry {
                user_id,
                guilds,
                sender,
                close_sender,
            },
        );
        inner
            .sessions_by_user
            .entry(user_id)
            .or_default()
            .insert(session_id);
    }

    pub async fn unregister(&self, session_id: &str) {
        let mut inner = self.inner.write().await;
        if let Some(entry) = inner.sessions.remove(session_id) {
            if let Some(set) = inner.sessions_by_user.get_mut(&entry.user_id) {
                set.remove(session_id);
                if set.is_empty() {
                    inner.sessions_by_user.remove(&entry.user_id);
                }
            }
        }
    }

    pub async fn set_guilds(&self, session_id: &str, guilds: HashSet<i64>) {
        let mut inner = self.inner.write().await;
        if let Some(entry) = inner.sessions.get_mut(session_id) {
            entry.guilds = guilds;
        }
    }

    pub async fn add_guilds(&self, session_id: &str, guild_ids: impl IntoIterator<Item = i64>) {
        let mut inner = self.inner.write().await;
        if let Some(entry) = inner.sessions.get_mut(session_id) {
            entry.guilds.extend(guild_ids);
        }
    }

    pub async fn remove_guild(&self, session_id: &str, guild_id: i64) {
        let mut inner = self.inner.write().await;
        if let Some(entry) = inner.sessions.get_mut(session_id) {
            entry.guilds.remove(&guild_id);
        }
    }

    /// The guild scopes a session is currently dispatched for — used by
    /// `REQUEST_MEMBERS` to verify the caller actually belongs to the guild
    /// it is querying before handing back member data.
    pub async fn guilds_for(&self, session_id: &str) -> Option<HashSet<i64>> {
        let inner = self.inner.read().await;
        inner.sessions.get(session_id).map(|e| e.guilds.clone())
    }

    pub async fn is_user_online(&self, user_id: i64) -> bool {
        let inner = self.inner.read().await;
        inner
            .sessions_by_user
            .get(&user_id)
            .is_some_and(|set| !set.is_empty())
    }

    pub async fn session_count(&self) -> usize {
        self.inner.read().await.sessions.len()
    }

    /// Every session belonging to one user, across however many devices
    /// they have connected — used by `NotifyGuildJoin`/`NotifyGuildLeave`
    /// to update every one of that user's live sessions atomically.
    pub async fn session_ids_for_user(&self, user_id: i64) -> Vec<String> {
        let inner = self.inner.read().await;
        inner
            .sessions_by_user
            .get(&user_id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Every live sender, for a full-instance broadcast (shutdown `RECONNECT`).
    pub async fn all_senders(&self) -> Vec<tokio::sync::mpsc::UnboundedSender<GatewaySend>> {
        let inner = self.inner.read().await;
        inner.sessions.values().map(|e| e.sender.clone()).collect()
    }

    /// Every live close-command sender, for shutdown to explicitly close
    /// each connection with `GoingAway` once the `RECONNECT` broadcast
    /// above has been queued ahead of it on each session's channel.
    pub async fn all_close_senders(&self) -> Vec<tokio::sync::mpsc::UnboundedSender<CloseCommand>> {
        let inner = self.inner.read().await;
        inner
            .sessions
            .values()
            .map(|e| e.close_sender.clone())
            .collect()
    }

    /// Snapshot every session descriptor plus its sender, for the dispatch
    /// router to decide recipients against.
    pub async fn snapshot(&self) -> Vec<(SessionDescriptor, tokio::sync::mpsc::UnboundedSender<GatewaySend>)> {
        let inner = self.inner.read().await;
        inner
            .sessions
            .iter()
            .map(|(session_id, entry)| {
                (
                    SessionDescriptor {
                        session_id: session_id.clone(),
                        user_id: entry.user_id,
                        guilds: entry.guilds.clone(),
                    },
                    entry.sender.clone(),
                )
            })
            .collect()
    }

    pub async fn sender_for(
        &self,
        session_id: &str,
    ) -> Option<tokio::sync::mpsc::UnboundedSender<GatewaySend>> {
        let inner = self.inner.read().await;
        inner.sessions.get(session_id).map(|e| e.sender.clone())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-session live state (sequence counter + replay buffer), keyed
/// separately from the registry above because only the owning
/// connection task ever mutates it — no lock contention with routing.
pub type SessionTable = Arc<RwLock<HashMap<String, GatewaySession>>>;

pub fn new_session_table() -> SessionTable {
    Arc::new(RwLock::new(HashMap::new()))
}
