//! WebSocket Message Types
//!
//! Discord-compatible gateway message formats.

use serde::{Deserialize, Serialize};

/// Gateway opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    /// Event dispatch
    Dispatch = 0,
    /// Heartbeat
    Heartbeat = 1,
    /// Identify
    Identify = 2,
    /// Presence update
    PresenceUpdate = 3,
    /// Resume a dropped session
    Resume = 5,
    /// Server requests the client reconnect
    Reconnect = 6,
    /// Request guild member chunks
    RequestMembers = 7,
    /// Typing indicator
    Typing = 8,
    /// Subscribe to additional guild/channel scopes after IDENTIFY
    Subscribe = 9,
    /// Hello (server -> client, first frame)
    Hello = 10,
    /// Heartbeat ACK
    HeartbeatAck = 11,
}

/// Incoming gateway message.
#[derive(Debug, Deserialize)]
pub struct GatewayReceive {
    pub op: u8,
    pub d: Option<serde_json::Value>,
    pub s: Option<u64>,
    pub t: Option<String>,
}

/// Outgoing gateway message.
#[derive(Debug, Clone, Serialize)]
pub struct GatewaySend {
    pub op: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
}

impl GatewaySend {
    pub fn op_only(op: OpCode) -> Self {
        Self {
            op: op as u8,
            d: None,
            s: None,
            t: None,
        }
    }

    pub fn with_data(op: OpCode, data: serde_json::Value) -> Self {
        Self {
            op: op as u8,
            d: Some(data),
            s: None,
            t: None,
        }
    }

    pub fn dispatch(seq: u64, event_type: &str, data: serde_json::Value) -> Self {
        Self {
            op: OpCode::Dispatch as u8,
            d: Some(data),
            s: Some(seq),
            t: Some(event_type.to_string()),
        }
    }
}

/// An explicit WebSocket close the writer task should perform, carrying
/// the close code/reason the protocol mandates for a given shutdown
/// path. Kept out of [`GatewaySend`] (which only ever models op/d/s/t
/// dispatch frames) and sent down its own channel so the writer task can
/// tell "write this frame" apart from "close with this code".
#[derive(Debug, Clone, Copy)]
pub struct CloseCommand {
    pub code: u16,
    pub reason: &'static str,
}

impl CloseCommand {
    /// Identify timeout or invalid/expired token.
    pub const POLICY_VIOLATION: Self = Self {
        code: 1008,
        reason: "policy violation",
    };
    /// Server shutting down, preceded by a `RECONNECT` broadcast.
    pub const GOING_AWAY: Self = Self {
        code: 1001,
        reason: "server shutting down",
    };
}

/// Hello payload (op 10).
#[derive(Debug, Serialize)]
pub struct HelloPayload {
    pub heartbeat_interval: u64,
}

/// Ready payload (dispatch READY).
#[derive(Debug, Serialize)]
pub struct ReadyPayload {
    pub v: u8,
    pub user: serde_json::Value,
    pub guilds: Vec<serde_json::Value>,
    pub session_id: String,
}

/// Identify payload (op 2).
#[derive(Debug, Deserialize)]
pub struct IdentifyPayload {
    pub token: String,
    #[serde(default)]
    pub properties: IdentifyProperties,
    #[serde(default)]
    pub compress: bool,
    pub intents: Option<u64>,
}

/// Identify connection properties. All optional in practice — a client
/// that only sends `token` is still a valid `IDENTIFY`.
#[derive(Debug, Default, Deserialize)]
pub struct IdentifyProperties {
    #[serde(default)]
    pub os: String,
    #[serde(default)]
    pub browser: String,
    #[serde(default)]
    pub device: String,
}

/// Resume payload (op 5): re-attach to a previous session and replay
/// anything missed since `seq`.
#[derive(Debug, Deserialize)]
pub struct ResumePayload {
    pub token: String,
    pub session_id: String,
    pub seq: u64,
}

/// Subscribe payload (op 9): add guild scopes to an already-identified session.
#[derive(Debug, Deserialize)]
pub struct SubscribePayload {
    pub guild_ids: Vec<String>,
}

/// Request guild members payload (op 7).
#[derive(Debug, Deserialize)]
pub struct RequestMembersPayload {
    pub guild_id: String,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default = "default_member_request_limit")]
    pub limit: u32,
}

fn default_member_request_limit() -> u32 {
    100
}

/// Typing indicator payload (op 8).
#[derive(Debug, Deserialize)]
pub struct TypingPayload {
    pub channel_id: String,
}
