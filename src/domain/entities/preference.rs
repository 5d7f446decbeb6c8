//! Notification preference entities and repository trait.
//!
//! Resolution precedence, strictly: **Channel > Guild > Global > Default
//! (mentions-only)**. The pure resolution function lives in
//! `domain::services::notification_policy`; this module only defines the
//! storage shapes and the trait that loads them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// How aggressively a scope notifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    All,
    #[default]
    Mentions,
    None,
}

/// Sentinel key used for a user's instance-wide default, stored alongside
/// per-guild rows in the same table (`guild_id IS NULL`).
pub const GLOBAL_SCOPE: &str = "__global__";

/// Per-channel override. Maps to the `channel_notification_prefs` table,
/// primary key `(user_id, channel_id)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelNotificationPref {
    pub user_id: i64,
    pub channel_id: i64,
    pub level: NotificationLevel,
    pub muted_until: Option<DateTime<Utc>>,
}

/// Per-guild or global override. Maps to the `guild_notification_prefs`
/// table, primary key `(user_id, guild_id)` with `guild_id = NULL` meaning
/// the user's global default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildNotificationPref {
    pub user_id: i64,
    pub guild_id: Option<i64>,
    pub level: NotificationLevel,
    pub suppress_here: bool,
    pub suppress_roles: bool,
    pub muted_until: Option<DateTime<Utc>>,
}

/// Per-notification-type delivery channels. Maps to the
/// `notification_type_prefs` table, primary key `(user_id, notification_type)`.
/// Absence of a row means all three fields are true.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TypeDeliveryPref {
    pub in_app: bool,
    pub push: bool,
    pub sound: bool,
}

impl Default for TypeDeliveryPref {
    fn default() -> Self {
        Self {
            in_app: true,
            push: true,
            sound: true,
        }
    }
}

/// Repository trait for notification preference storage.
#[async_trait]
pub trait NotificationPreferenceRepository: Send + Sync {
    async fn find_channel_pref(
        &self,
        user_id: i64,
        channel_id: i64,
    ) -> Result<Option<ChannelNotificationPref>, AppError>;

    async fn find_guild_pref(
        &self,
        user_id: i64,
        guild_id: i64,
    ) -> Result<Option<GuildNotificationPref>, AppError>;

    async fn find_global_pref(
        &self,
        user_id: i64,
    ) -> Result<Option<GuildNotificationPref>, AppError>;

    async fn find_type_pref(
        &self,
        user_id: i64,
        notification_type: &str,
    ) -> Result<Option<TypeDeliveryPref>, AppError>;

    async fn upsert_channel_pref(&self, pref: &ChannelNotificationPref) -> Result<(), AppError>;

    async fn upsert_guild_pref(&self, pref: &GuildNotificationPref) -> Result<(), AppError>;

    async fn upsert_type_pref(
        &self,
        user_id: i64,
        notification_type: &str,
        pref: TypeDeliveryPref,
    ) -> Result<(), AppError>;
}
