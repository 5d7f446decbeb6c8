//! Event envelope and subject taxonomy.
//!
//! The envelope is the only shape that ever crosses the broker. `data`
//! stays an opaque JSON value here — per-event-type payload structs live
//! in `presentation::websocket::gateway` (the `GatewayEvent` enum already
//! defined there) and are only materialized once an envelope reaches the
//! Dispatch Router / a specific subscriber, never inside the bus itself.

use serde::{Deserialize, Serialize};

/// Sentinel `guild_id` meaning "every identified session on the instance".
/// Guilds must never be assigned this id.
pub const BROADCAST_SENTINEL: &str = "__broadcast__";

/// The fixed-schema wrapper every bus message wears.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Drives client dispatch (`t` in the gateway wire format), e.g. `MESSAGE_CREATE`.
    #[serde(rename = "type")]
    pub event_type: String,

    /// Hierarchical routing key, e.g. `app.message.create`.
    pub subject: String,

    /// Set when the event belongs to a guild. May be the broadcast sentinel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,

    /// Set when the event targets a single user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Opaque payload, forwarded verbatim to clients.
    pub data: serde_json::Value,
}

impl Event {
    pub fn is_broadcast(&self) -> bool {
        self.guild_id.as_deref() == Some(BROADCAST_SENTINEL)
    }
}

/// Subject taxonomy: `app.<category>.<action>`. Categories are grouped here
/// so producers never hand-format a subject string outside this module.
pub mod subjects {
    pub const MESSAGE_CREATE: &str = "app.message.create";
    pub const MESSAGE_UPDATE: &str = "app.message.update";
    pub const MESSAGE_DELETE: &str = "app.message.delete";

    pub const CHANNEL_CREATE: &str = "app.channel.create";
    pub const CHANNEL_UPDATE: &str = "app.channel.update";
    pub const CHANNEL_DELETE: &str = "app.channel.delete";
    pub const TYPING_START: &str = "app.channel.typing_start";

    pub const GUILD_UPDATE: &str = "app.guild.update";
    pub const GUILD_MEMBER_ADD: &str = "app.guild.member_add";
    pub const GUILD_MEMBER_UPDATE: &str = "app.guild.member_update";
    pub const GUILD_MEMBER_REMOVE: &str = "app.guild.member_remove";

    pub const PRESENCE_UPDATE: &str = "app.presence.update";
    pub const USER_UPDATE: &str = "app.user.update";

    pub const NOTIFICATION_CREATE: &str = "app.notification.create";

    pub const FEDERATION_PREFIX: &str = "app.federation";

    /// Wildcard covering every subject the gateway cares about. Fine for a
    /// core-NATS `subscribe`, which doesn't care about subject overlap —
    /// but NOT for declaring the `EVENTS` stream (see
    /// [`EVENTS_STREAM_SUBJECTS`]): JetStream rejects `create_stream` when
    /// a stream's subjects overlap another stream's, and this wildcard
    /// overlaps [`FEDERATION_WILDCARD`].
    pub const EVENTS_WILDCARD: &str = "app.>";

    /// Wildcard covering only the competitively-consumed federation work queue.
    pub const FEDERATION_WILDCARD: &str = "app.federation.>";

    /// The concrete, non-overlapping subject set the `EVENTS` stream
    /// declares itself over — `app.>` minus `app.federation.>`, spelled
    /// out per category so it never collides with the `FEDERATION`
    /// stream's subjects.
    pub const EVENTS_STREAM_SUBJECTS: &[&str] = &[
        "app.message.>",
        "app.channel.>",
        "app.guild.>",
        "app.presence.>",
        "app.user.>",
        "app.notification.>",
    ];
}

/// Durable stream names, declared at startup by `EnsureStreams`.
pub mod streams {
    pub const EVENTS: &str = "EVENTS";
    pub const FEDERATION: &str = "FEDERATION";
}
