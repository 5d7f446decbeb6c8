//! Gateway server lifecycle and typed dispatch payloads.
//!
//! The payload structs below are the shapes a connected client actually
//! sees once an [`Event`] envelope reaches the Dispatch Router — they
//! never cross the broker themselves, only `Event::data` does.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::infrastructure::bus::{subjects, Event, EventBus};
use crate::presentation::websocket::messages::{CloseCommand, GatewaySend, OpCode};
use crate::presentation::websocket::registry::{new_session_table, Registry, SessionTable};
use crate::presentation::websocket::router::dispatch_recipients;
use crate::presentation::websocket::session::GatewaySession;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageCreateEvent {
    pub id: String,
    pub channel_id: String,
    pub guild_id: Option<i64>,
    pub author: UserObject,
    pub content: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edited_timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildUpdateEvent {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelCreateEvent {
    pub id: String,
    pub guild_id: Option<i64>,
    pub name: String,
    #[serde(rename = "type")]
    pub channel_type: i32,
    pub position: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelUpdateEvent {
    pub id: String,
    pub guild_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelDeleteEvent {
    pub id: String,
    pub guild_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildMemberAddEvent {
    pub guild_id: i64,
    pub user: UserObject,
    pub joined_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceUpdateEvent {
    pub user_id: String,
    pub guild_id: Option<i64>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypingStartEvent {
    pub channel_id: String,
    pub guild_id: Option<i64>,
    pub user_id: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserObject {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// Owns the registry and the session-local dispatch state, and bridges
/// the Event Bus into it: one `app.>` subscription per instance, fanned
/// out to whichever local sessions the Dispatch Router names.
pub struct GatewayServer {
    registry: Registry,
    sessions: SessionTable,
    heartbeat_interval_ms: u64,
    heartbeat_timeout_ms: u64,
    identify_timeout_ms: u64,
    replay_buffer_size: usize,
    shutdown_token: CancellationToken,
}

impl GatewayServer {
    pub fn new(
        heartbeat_interval_ms: u64,
        heartbeat_timeout_ms: u64,
        identify_timeout_ms: u64,
        replay_buffer_size: usize,
    ) -> Self {
        Self {
            registry: Registry::new(),
            sessions: new_session_table(),
            heartbeat_interval_ms,
            heartbeat_timeout_ms,
            identify_timeout_ms,
            replay_buffer_size,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// The root cancellation every session loop selects on alongside its
    /// socket read, so [`Self::shutdown`] doesn't rely solely on a session
    /// noticing its close command — a session blocked on something other
    /// than the socket (or mid-iteration) still observes the same signal.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn sessions(&self) -> &SessionTable {
        &self.sessions
    }

    pub fn heartbeat_interval_ms(&self) -> u64 {
        self.heartbeat_interval_ms
    }

    pub fn heartbeat_timeout_ms(&self) -> u64 {
        self.heartbeat_timeout_ms
    }

    pub fn identify_timeout_ms(&self) -> u64 {
        self.identify_timeout_ms
    }

    pub fn replay_buffer_size(&self) -> usize {
        self.replay_buffer_size
    }

    pub async fn is_user_online(&self, user_id: i64) -> bool {
        self.registry.is_user_online(user_id).await
    }

    pub async fn session_count(&self) -> usize {
        self.registry.session_count().await
    }

    /// Enter a freshly-identified connection into both the registry (for
    /// routing) and the local session table (for replay/sequencing), under
    /// the registry lock so the two never observe each other mid-update.
    pub async fn register_session(
        &self,
        session_id: String,
        user_id: i64,
        guilds: HashSet<i64>,
        sender: tokio::sync::mpsc::UnboundedSender<GatewaySend>,
        close_sender: tokio::sync::mpsc::UnboundedSender<CloseCommand>,
    ) {
        self.registry
            .register(session_id.clone(), user_id, guilds, sender, close_sender)
            .await;

        let mut session = GatewaySession::new(session_id.clone(), self.replay_buffer_size);
        session.user_id = user_id;
        session.identified = true;
        self.sessions.write().await.insert(session_id, session);
        crate::infrastructure::metrics::set_gateway_sessions_active(
            self.registry.session_count().await as i64,
        );
    }

    /// Remove a session from routing (the registry) but keep its replay
    /// buffer around, disconnected, so a `RESUME` shortly after can still
    /// pick it back up. A background sweep reaps it once it has been
    /// disconnected past [`Self::RESUME_RETENTION_MS`].
    pub async fn unregister_session(&self, session_id: &str) {
        self.registry.unregister(session_id).await;
        if let Some(session) = self.sessions.write().await.get_mut(session_id) {
            session.mark_disconnected();
        }
        crate::infrastructure::metrics::set_gateway_sessions_active(
            self.registry.session_count().await as i64,
        );
    }

    /// How long a disconnected session's replay buffer is kept around for
    /// a `RESUME` before being reaped. Not specified by the protocol
    /// (which only promises the buffer is in-memory and per-session); this
    /// is an implementation choice bounding the memory a churn of dropped
    /// connections can pin.
    pub const RESUME_RETENTION_MS: u64 = 5 * 60 * 1000;

    /// Periodic GC: drop any session table entry that has been
    /// disconnected longer than the retention window.
    pub async fn purge_stale_sessions(&self) {
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, s| !s.disconnected_longer_than(Self::RESUME_RETENTION_MS));
    }

    /// `NotifyGuildJoin`: add a guild id to every live session of this user.
    pub async fn notify_guild_join(&self, user_id: i64, guild_id: i64) {
        for session_id in self.registry.session_ids_for_user(user_id).await {
            self.registry.add_guilds(&session_id, [guild_id]).await;
        }
    }

    /// `NotifyGuildLeave`: the inverse of [`Self::notify_guild_join`].
    pub async fn notify_guild_leave(&self, user_id: i64, guild_id: i64) {
        for session_id in self.registry.session_ids_for_user(user_id).await {
            self.registry.remove_guild(&session_id, guild_id).await;
        }
    }

    /// Server shutdown dance: push `RECONNECT` to every live session so
    /// clients resume elsewhere instead of treating this as a hard error,
    /// queue `GoingAway` behind it on each session's close channel, then
    /// cancel the root [`Self::shutdown_token`] every session loop selects
    /// on. The channel sends give an orderly `RECONNECT`-then-close for a
    /// session idle on its socket read; the token cancellation is the
    /// backstop that unblocks a session loop regardless of what it's
    /// currently waiting on.
    pub async fn shutdown(&self) {
        let frame = GatewaySend::op_only(OpCode::Reconnect);
        for sender in self.registry.all_senders().await {
            let _ = sender.send(frame.clone());
        }
        for close_sender in self.registry.all_close_senders().await {
            let _ = close_sender.send(CloseCommand::GOING_AWAY);
        }
        self.shutdown_token.cancel();
    }

    /// Subscribe to every event this instance's clients might care about
    /// and start fanning it out. Spawns its own task; returns immediately.
    pub fn start_fanout(self: &Arc<Self>, bus: &EventBus) -> Result<(), crate::shared::error::AppError> {
        let server = Arc::clone(self);
        bus.subscribe_wildcard(subjects::EVENTS_WILDCARD, move |event: Event| {
            let server = Arc::clone(&server);
            async move {
                server.fan_out(event).await;
            }
        })
    }

    async fn fan_out(&self, event: Event) {
        let snapshot = self.registry.snapshot().await;
        let descriptors: Vec<_> = snapshot.iter().map(|(d, _)| d.clone()).collect();
        let recipients = dispatch_recipients(&event, &descriptors);
        crate::infrastructure::metrics::record_gateway_dispatch(!recipients.is_empty());
        if recipients.is_empty() {
            return;
        }

        let senders: std::collections::HashMap<_, _> = snapshot
            .into_iter()
            .map(|(d, sender)| (d.session_id, sender))
            .collect();

        let mut sessions = self.sessions.write().await;
        for session_id in recipients {
            let Some(sender) = senders.get(&session_id) else {
                continue;
            };
            let Some(session) = sessions.get_mut(&session_id) else {
                continue;
            };
            let frame = session.next_dispatch(&event.event_type, event.data.clone());
            if sender.send(frame).is_err() {
                tracing::debug!(session_id, "dropping event, send channel closed");
            }
        }
    }

    /// Attempt a `RESUME`: the session id must still be held in the local
    /// session table (not yet reaped) and must belong to the same user as
    /// the presented token. On success, re-enters the registry (so
    /// dispatch resumes) and returns the frames to replay, oldest first.
    /// `None` means the caller should send `RECONNECT` and close, forcing
    /// a fresh `IDENTIFY`.
    pub async fn resume_session(
        &self,
        session_id: &str,
        user_id: i64,
        since_seq: u64,
        guilds: HashSet<i64>,
        sender: tokio::sync::mpsc::UnboundedSender<GatewaySend>,
        close_sender: tokio::sync::mpsc::UnboundedSender<CloseCommand>,
    ) -> Option<Vec<GatewaySend>> {
        let replay = {
            let mut sessions = self.sessions.write().await;
            let session = sessions.get_mut(session_id)?;
            if session.user_id != user_id {
                return None;
            }
            let replay = session.replay_since(since_seq)?;
            session.mark_resumed();
            replay
        };

        self.registry
            .register(session_id.to_string(), user_id, guilds, sender, close_sender)
            .await;
        Some(replay)
    }

    /// Send a frame straight to one session, bypassing the bus entirely
    /// (used for directly-addressed control frames like `RECONNECT`).
    pub async fn send_raw(&self, session_id: &str, frame: GatewaySend) -> bool {
        match self.registry.sender_for(session_id).await {
            Some(sender) => sender.send(frame).is_ok(),
            None => false,
        }
    }
}
