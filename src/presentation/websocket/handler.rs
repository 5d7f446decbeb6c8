//! WebSocket Connection Handler
//!
//! Drives one connection through the handshake/heartbeat/resume state
//! machine described by the gateway protocol: `HELLO` immediately on
//! upgrade, then either `IDENTIFY` or `RESUME` within the configured
//! grace period, then the steady-state loop of client ops and
//! server-pushed dispatches until the socket closes or the heartbeat
//! lapses.

use std::collections::HashSet;
use std::time::Duration;

use axum::extract::{
    ws::{CloseFrame, Message, WebSocket},
    State, WebSocketUpgrade,
};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::{interval, timeout};
use uuid::Uuid;

use crate::domain::{ChannelRepository, MemberRepository, UserRepository};
use crate::infrastructure::bus::subjects;
use crate::infrastructure::cache::{SessionCacheService, TypingCacheService, UserPresence};
use crate::infrastructure::repositories::{PgChannelRepository, PgMemberRepository, PgUserRepository};
use crate::presentation::websocket::gateway::TypingStartEvent;
use crate::presentation::websocket::messages::{
    CloseCommand, GatewayReceive, GatewaySend, HelloPayload, IdentifyPayload, OpCode,
    ReadyPayload, RequestMembersPayload, ResumePayload, SubscribePayload, TypingPayload,
};
use crate::startup::AppState;

/// WebSocket upgrade entry point.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// The result of a successful handshake, whichever op produced it.
struct Handshake {
    session_id: String,
    user_id: i64,
    guilds: HashSet<i64>,
    resumed_from: Option<u64>,
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<GatewaySend>();
    let (close_tx, mut close_rx) = mpsc::unbounded_channel::<CloseCommand>();

    let hello = GatewaySend::with_data(
        OpCode::Hello,
        json!(HelloPayload {
            heartbeat_interval: state.gateway.heartbeat_interval_ms(),
        }),
    );
    if send_frame(&mut ws_tx, &hello).await.is_err() {
        return;
    }

    let writer_task = tokio::spawn(async move {
        loop {
            // `biased` so a dispatch frame already queued (e.g. the
            // `RECONNECT` a shutdown broadcasts ahead of its close
            // command) is always written before a pending close wins the
            // race — both channels are unbounded and polling order would
            // otherwise be arbitrary.
            tokio::select! {
                biased;
                frame = rx.recv() => {
                    match frame {
                        Some(frame) => {
                            if send_frame(&mut ws_tx, &frame).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                cmd = close_rx.recv() => {
                    if let Some(cmd) = cmd {
                        let _ = ws_tx
                            .send(Message::Close(Some(CloseFrame {
                                code: cmd.code,
                                reason: cmd.reason.into(),
                            })))
                            .await;
                    }
                    break;
                }
            }
        }
        let _ = ws_tx.close().await;
    });

    let handshake = timeout(
        Duration::from_millis(state.gateway.identify_timeout_ms()),
        perform_handshake(&mut ws_rx, &tx, &close_tx, &state),
    )
    .await;

    let handshake = match handshake {
        Ok(Some(h)) => h,
        Ok(None) => {
            tracing::debug!("handshake rejected, closing");
            let _ = close_tx.send(CloseCommand::POLICY_VIOLATION);
            let _ = writer_task.await;
            return;
        }
        Err(_) => {
            tracing::debug!("identify timeout, closing");
            let _ = close_tx.send(CloseCommand::POLICY_VIOLATION);
            let _ = writer_task.await;
            return;
        }
    };

    tracing::info!(
        session_id = %handshake.session_id,
        user_id = handshake.user_id,
        resumed = handshake.resumed_from.is_some(),
        "gateway session established"
    );

    run_session(ws_rx, tx, handshake, state).await;
    writer_task.abort();
}

async fn send_frame(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    frame: &GatewaySend,
) -> Result<(), ()> {
    let text = match serde_json::to_string(frame) {
        Ok(t) => t,
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize gateway frame");
            return Err(());
        }
    };
    timeout(Duration::from_secs(5), sink.send(Message::Text(text.into())))
        .await
        .map_err(|_| ())?
        .map_err(|_| ())
}

/// Waits for the first substantive client frame and turns it into a live
/// registration, either a fresh `IDENTIFY` or a `RESUME` of a still-held
/// session. Returns `None` on anything that should end the connection
/// without a `RECONNECT` (bad token, malformed payload, early close).
async fn perform_handshake(
    ws_rx: &mut futures::stream::SplitStream<WebSocket>,
    tx: &mpsc::UnboundedSender<GatewaySend>,
    close_tx: &mpsc::UnboundedSender<CloseCommand>,
    state: &AppState,
) -> Option<Handshake> {
    while let Some(msg) = ws_rx.next().await {
        let text = match msg {
            Ok(Message::Text(t)) => t,
            Ok(Message::Close(_)) | Err(_) => return None,
            Ok(_) => continue,
        };

        let Ok(recv) = serde_json::from_str::<GatewayReceive>(&text) else {
            continue;
        };

        if recv.op == OpCode::Identify as u8 {
            let Some(d) = recv.d else { return None };
            let Ok(identify) = serde_json::from_value::<IdentifyPayload>(d) else {
                return None;
            };
            return handle_identify(identify, tx, close_tx, state).await;
        }

        if recv.op == OpCode::Resume as u8 {
            let Some(d) = recv.d else { return None };
            let Ok(resume) = serde_json::from_value::<ResumePayload>(d) else {
                return None;
            };
            return handle_resume(resume, tx, close_tx, state).await;
        }

        // Anything else before a handshake op is a protocol violation.
        return None;
    }
    None
}

async fn handle_identify(
    identify: IdentifyPayload,
    tx: &mpsc::UnboundedSender<GatewaySend>,
    close_tx: &mpsc::UnboundedSender<CloseCommand>,
    state: &AppState,
) -> Option<Handshake> {
    let identity = state.auth_verifier.verify(&identify.token).await.ok()?;
    let user_id = identity.user_id;

    let (user_info, guilds) = load_user_data(user_id, state).await?;
    let guild_ids: HashSet<i64> = guilds
        .iter()
        .filter_map(|g| g.get("id").and_then(|v| v.as_str()).and_then(|s| s.parse().ok()))
        .collect();

    let session_id = Uuid::new_v4().to_string();
    state
        .gateway
        .register_session(
            session_id.clone(),
            user_id,
            guild_ids.clone(),
            tx.clone(),
            close_tx.clone(),
        )
        .await;

    let ready = state
        .gateway
        .sessions()
        .write()
        .await
        .get_mut(&session_id)
        .map(|s| {
            s.next_dispatch(
                "READY",
                json!(ReadyPayload {
                    v: 10,
                    user: user_info,
                    guilds,
                    session_id: session_id.clone(),
                }),
            )
        });

    let Some(ready) = ready else { return None };
    if tx.send(ready).is_err() {
        state.gateway.unregister_session(&session_id).await;
        return None;
    }

    let presence = SessionCacheService::new(state.redis.clone());
    let _ = presence
        .set_presence(
            user_id,
            &UserPresence {
                user_id,
                status: "online".to_string(),
                custom_status: None,
                last_seen: chrono::Utc::now().timestamp(),
                guild_ids: guild_ids.iter().copied().collect(),
            },
        )
        .await;

    Some(Handshake {
        session_id,
        user_id,
        guilds: guild_ids,
        resumed_from: None,
    })
}

async fn handle_resume(
    resume: ResumePayload,
    tx: &mpsc::UnboundedSender<GatewaySend>,
    close_tx: &mpsc::UnboundedSender<CloseCommand>,
    state: &AppState,
) -> Option<Handshake> {
    let identity = state.auth_verifier.verify(&resume.token).await.ok()?;
    let user_id = identity.user_id;

    let (_, guilds) = load_user_data(user_id, state).await?;
    let guild_ids: HashSet<i64> = guilds
        .iter()
        .filter_map(|g| g.get("id").and_then(|v| v.as_str()).and_then(|s| s.parse().ok()))
        .collect();

    let replay = state
        .gateway
        .resume_session(
            &resume.session_id,
            user_id,
            resume.seq,
            guild_ids.clone(),
            tx.clone(),
            close_tx.clone(),
        )
        .await;

    let Some(frames) = replay else {
        let _ = tx.send(GatewaySend::op_only(OpCode::Reconnect));
        return None;
    };

    let replayed = frames.len();
    for frame in frames {
        if tx.send(frame).is_err() {
            state.gateway.unregister_session(&resume.session_id).await;
            return None;
        }
    }

    let resumed_dispatch = state
        .gateway
        .sessions()
        .write()
        .await
        .get_mut(&resume.session_id)
        .map(|s| s.next_dispatch("RESUMED", json!({ "replayed": replayed })));

    if let Some(frame) = resumed_dispatch {
        let _ = tx.send(frame);
    }

    Some(Handshake {
        session_id: resume.session_id,
        user_id,
        guilds: guild_ids,
        resumed_from: Some(resume.seq),
    })
}

async fn load_user_data(
    user_id: i64,
    state: &AppState,
) -> Option<(serde_json::Value, Vec<serde_json::Value>)> {
    let user_repo = PgUserRepository::new(state.db.clone());
    let member_repo = PgMemberRepository::new(state.db.clone());

    let user = user_repo.find_by_id(user_id).await.ok()??;
    let user_info = json!({
        "id": user.id.to_string(),
        "username": user.username,
        "display_name": user.display_name,
        "avatar_url": user.avatar_url,
    });

    let memberships = member_repo.find_by_user(user_id).await.ok()?;
    let guild_values: Vec<serde_json::Value> = memberships
        .into_iter()
        .map(|m| json!({ "id": m.server_id.to_string() }))
        .collect();

    Some((user_info, guild_values))
}

/// Steady-state loop: client ops on one side, the writer channel already
/// draining dispatches fanned out from the bus on the other. Runs until
/// the socket closes, a heartbeat is missed, or the send channel dies.
async fn run_session(
    mut ws_rx: futures::stream::SplitStream<WebSocket>,
    tx: mpsc::UnboundedSender<GatewaySend>,
    handshake: Handshake,
    state: AppState,
) {
    let Handshake {
        session_id,
        user_id,
        mut guilds,
        ..
    } = handshake;

    let heartbeat_timeout_ms = state.gateway.heartbeat_timeout_ms();
    let mut liveness_check = interval(Duration::from_millis(heartbeat_timeout_ms / 2 + 1));
    liveness_check.tick().await;
    let shutdown_token = state.gateway.shutdown_token();

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        handle_op(&text, &session_id, user_id, &mut guilds, &tx, &state).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
            _ = liveness_check.tick() => {
                let alive = state
                    .gateway
                    .sessions()
                    .read()
                    .await
                    .get(&session_id)
                    .is_some_and(|s| s.is_alive(heartbeat_timeout_ms));
                if !alive {
                    tracing::info!(session_id = %session_id, "heartbeat timeout, dropping connection");
                    break;
                }
            }
            _ = shutdown_token.cancelled() => {
                tracing::debug!(session_id = %session_id, "shutdown cancellation observed");
                break;
            }
        }

        if tx.is_closed() {
            break;
        }
    }

    state.gateway.unregister_session(&session_id).await;
    let presence = SessionCacheService::new(state.redis.clone());
    if !state.gateway.is_user_online(user_id).await {
        let _ = presence.update_status(user_id, "offline").await;
    }
    tracing::info!(session_id = %session_id, user_id, "gateway session closed");
}

async fn handle_op(
    text: &str,
    session_id: &str,
    user_id: i64,
    guilds: &mut HashSet<i64>,
    tx: &mpsc::UnboundedSender<GatewaySend>,
    state: &AppState,
) {
    let Ok(recv) = serde_json::from_str::<GatewayReceive>(text) else {
        tracing::debug!(session_id, "dropping malformed gateway frame");
        return;
    };

    if recv.op == OpCode::Heartbeat as u8 {
        if let Some(session) = state.gateway.sessions().write().await.get_mut(session_id) {
            session.heartbeat();
        }
        let _ = tx.send(GatewaySend::op_only(OpCode::HeartbeatAck));
        let presence = SessionCacheService::new(state.redis.clone());
        let _ = presence.heartbeat(user_id).await;
        return;
    }

    if recv.op == OpCode::PresenceUpdate as u8 {
        let Some(d) = recv.d else { return };
        let status = d.get("status").and_then(|v| v.as_str()).unwrap_or("online").to_string();
        let presence = SessionCacheService::new(state.redis.clone());
        if presence.update_status(user_id, &status).await.unwrap_or(false) {
            let _ = state
                .bus
                .publish_user_event(
                    subjects::PRESENCE_UPDATE,
                    "PRESENCE_UPDATE",
                    user_id,
                    json!({ "user_id": user_id.to_string(), "status": status }),
                )
                .await;
        }
        return;
    }

    if recv.op == OpCode::Typing as u8 {
        let Some(d) = recv.d else { return };
        let Ok(payload) = serde_json::from_value::<TypingPayload>(d) else { return };
        let Ok(channel_id) = payload.channel_id.parse::<i64>() else { return };

        let channel_repo = PgChannelRepository::new(state.db.clone());
        let guild_id = match channel_repo.find_by_id(channel_id).await {
            Ok(Some(channel)) => channel.server_id,
            _ => None,
        };

        let typing_cache = TypingCacheService::new(state.redis.clone());
        let _ = typing_cache.set_typing(channel_id, user_id).await;

        let _ = state
            .bus
            .publish_channel_event(
                subjects::TYPING_START,
                "TYPING_START",
                guild_id,
                channel_id,
                json!(TypingStartEvent {
                    channel_id: channel_id.to_string(),
                    guild_id,
                    user_id: user_id.to_string(),
                    timestamp: chrono::Utc::now().timestamp_millis(),
                }),
            )
            .await;
        return;
    }

    if recv.op == OpCode::RequestMembers as u8 {
        let Some(d) = recv.d else { return };
        let Ok(payload) = serde_json::from_value::<RequestMembersPayload>(d) else { return };
        let Ok(guild_id) = payload.guild_id.parse::<i64>() else { return };

        if !guilds.contains(&guild_id) {
            tracing::debug!(session_id, guild_id, "ignoring REQUEST_MEMBERS for unsubscribed guild");
            return;
        }

        let member_repo = PgMemberRepository::new(state.db.clone());
        let user_repo = PgUserRepository::new(state.db.clone());
        let limit = payload.limit.clamp(1, 1000) as i32;

        let members = match &payload.query {
            Some(q) if !q.is_empty() => member_repo.search(guild_id, q, limit).await,
            _ => member_repo.find_by_server_id(guild_id, None, limit).await,
        };
        let Ok(members) = members else { return };

        let mut member_objects = Vec::with_capacity(members.len());
        for member in members {
            let username = match user_repo.find_by_id(member.user_id).await {
                Ok(Some(u)) => u.username,
                _ => continue,
            };
            member_objects.push(json!({
                "user_id": member.user_id.to_string(),
                "username": username,
                "nickname": member.nickname,
                "roles": member.roles.iter().map(|r| r.to_string()).collect::<Vec<_>>(),
            }));
        }

        if let Some(frame) = state
            .gateway
            .sessions()
            .write()
            .await
            .get_mut(session_id)
            .map(|s| {
                s.next_dispatch(
                    "GUILD_MEMBERS_CHUNK",
                    json!({ "guild_id": guild_id.to_string(), "members": member_objects }),
                )
            })
        {
            let _ = tx.send(frame);
        }
        return;
    }

    if recv.op == OpCode::Subscribe as u8 {
        let Some(d) = recv.d else { return };
        let Ok(payload) = serde_json::from_value::<SubscribePayload>(d) else { return };
        let ids: Vec<i64> = payload
            .guild_ids
            .iter()
            .filter_map(|s| s.parse().ok())
            .collect();
        guilds.extend(ids.iter().copied());
        state.gateway.registry().add_guilds(session_id, ids).await;
        return;
    }

    if recv.op == OpCode::Resume as u8 {
        // RESUME on an already-running session: the connection never
        // dropped, so there is no registry re-entry to do. A stale
        // sequence still replays whatever the buffer retained; a
        // sequence at or past the session's current tip just gets an
        // empty replay (it has already seen everything).
        let Some(d) = recv.d else { return };
        let Ok(resume) = serde_json::from_value::<ResumePayload>(d) else {
            return;
        };
        if resume.session_id != session_id {
            tracing::debug!(session_id, "ignoring RESUME for a different session id");
            return;
        }

        let replay = state
            .gateway
            .sessions()
            .read()
            .await
            .get(session_id)
            .and_then(|s| s.replay_since(resume.seq));

        let Some(frames) = replay else {
            tracing::debug!(session_id, "RESUME cursor ahead of session tip, ignoring");
            return;
        };

        let replayed = frames.len();
        for frame in frames {
            let _ = tx.send(frame);
        }
        let resumed = state
            .gateway
            .sessions()
            .write()
            .await
            .get_mut(session_id)
            .map(|s| s.next_dispatch("RESUMED", json!({ "replayed": replayed })));
        if let Some(frame) = resumed {
            let _ = tx.send(frame);
        }
        return;
    }

    tracing::debug!(session_id, op = recv.op, "unhandled gateway opcode");
}
