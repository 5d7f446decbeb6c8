//! Notification record entity and repository trait.
//!
//! Maps to the `notifications` table in the database schema. Notification
//! ids are Snowflake-derived (sortable, timestamp-prefixed) so that
//! `id < cursor` paging works without a separate `created_at` index.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// Broad notification category, derived from `notification_type` at
/// creation time and used for preference grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    Mention,
    DirectMessage,
    FriendRequest,
    GuildActivity,
    System,
}

impl NotificationCategory {
    pub fn from_type(notification_type: &str) -> Self {
        match notification_type {
            "MESSAGE_MENTION" | "ROLE_MENTION" => Self::Mention,
            "DIRECT_MESSAGE" => Self::DirectMessage,
            "FRIEND_REQUEST" | "FRIEND_ACCEPT" => Self::FriendRequest,
            t if t.starts_with("GUILD_") => Self::GuildActivity,
            _ => Self::System,
        }
    }
}

/// A single in-app/push notification record.
///
/// Maps to the `notifications` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID, sortable)
/// - user_id: BIGINT NOT NULL REFERENCES users(id)
/// - notification_type: VARCHAR NOT NULL
/// - category: VARCHAR NOT NULL
/// - guild_id, channel_id, message_id: BIGINT NULL
/// - actor_id: BIGINT NOT NULL
/// - actor_name: VARCHAR NOT NULL
/// - content: TEXT NULL
/// - metadata: JSONB NULL
/// - read: BOOLEAN NOT NULL DEFAULT FALSE
/// - created_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub notification_type: String,
    pub category: NotificationCategory,
    pub guild_id: Option<i64>,
    pub channel_id: Option<i64>,
    pub message_id: Option<i64>,
    pub actor_id: i64,
    pub actor_name: String,
    pub content: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// True when this notification concerns an `@mention`, `@here`, or a DM —
    /// the cases a `mentions`-level preference still lets through.
    pub fn is_mention_like(&self) -> bool {
        matches!(
            self.category,
            NotificationCategory::Mention | NotificationCategory::DirectMessage
        )
    }
}

/// Repository trait for notification record persistence.
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Insert a new notification record.
    async fn create(&self, notification: &Notification) -> Result<Notification, AppError>;

    /// List a user's notifications, newest first, optionally before a cursor id.
    async fn list_for_user(
        &self,
        user_id: i64,
        before: Option<i64>,
        limit: i64,
    ) -> Result<Vec<Notification>, AppError>;

    /// Mark a single notification read. `read` only ever transitions
    /// false->true, so this is naturally idempotent against a concurrent
    /// `mark_all_read`.
    async fn mark_read(&self, user_id: i64, notification_id: i64) -> Result<(), AppError>;

    /// Mark every notification created at or before `cursor` as read. Scoping
    /// by cursor (rather than "all rows at call time") means a notification
    /// created after the request was issued is never swept up by a slow
    /// "mark all read" that lands after it — the newest notification wins
    /// and stays unread.
    async fn mark_all_read(&self, user_id: i64, cursor: DateTime<Utc>) -> Result<u64, AppError>;

    /// Delete notifications older than the retention cutoff. Returns the count removed.
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, AppError>;
}
