//! Notification Preference Repository Implementation
//!
//! PostgreSQL implementation of per-channel, per-guild, and per-type
//! notification delivery preferences.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{
    ChannelNotificationPref, GuildNotificationPref, NotificationLevel,
    NotificationPreferenceRepository, TypeDeliveryPref,
};
use crate::shared::error::AppError;

pub struct PgNotificationPreferenceRepository {
    pool: PgPool,
}

impl PgNotificationPreferenceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn level_from_str(s: &str) -> NotificationLevel {
    match s {
        "all" => NotificationLevel::All,
        "none" => NotificationLevel::None,
        _ => NotificationLevel::Mentions,
    }
}

fn level_as_str(level: NotificationLevel) -> &'static str {
    match level {
        NotificationLevel::All => "all",
        NotificationLevel::Mentions => "mentions",
        NotificationLevel::None => "none",
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ChannelPrefRow {
    user_id: i64,
    channel_id: i64,
    level: String,
    muted_until: Option<DateTime<Utc>>,
}

#[derive(Debug, sqlx::FromRow)]
struct GuildPrefRow {
    user_id: i64,
    guild_id: Option<i64>,
    level: String,
    suppress_here: bool,
    suppress_roles: bool,
    muted_until: Option<DateTime<Utc>>,
}

#[derive(Debug, sqlx::FromRow)]
struct TypePrefRow {
    in_app: bool,
    push: bool,
    sound: bool,
}

#[async_trait]
impl NotificationPreferenceRepository for PgNotificationPreferenceRepository {
    async fn find_channel_pref(
        &self,
        user_id: i64,
        channel_id: i64,
    ) -> Result<Option<ChannelNotificationPref>, AppError> {
        let row = sqlx::query_as::<_, ChannelPrefRow>(
            r#"
            SELECT user_id, channel_id, level, muted_until
            FROM channel_notification_prefs
            WHERE user_id = $1 AND channel_id = $2
            "#,
        )
        .bind(user_id)
        .bind(channel_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| ChannelNotificationPref {
            user_id: r.user_id,
            channel_id: r.channel_id,
            level: level_from_str(&r.level),
            muted_until: r.muted_until,
        }))
    }

    async fn find_guild_pref(
        &self,
        user_id: i64,
        guild_id: i64,
    ) -> Result<Option<GuildNotificationPref>, AppError> {
        let row = sqlx::query_as::<_, GuildPrefRow>(
            r#"
            SELECT user_id, guild_id, level, suppress_here, suppress_roles, muted_until
            FROM guild_notification_prefs
            WHERE user_id = $1 AND guild_id = $2
            "#,
        )
        .bind(user_id)
        .bind(guild_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| GuildNotificationPref {
            user_id: r.user_id,
            guild_id: r.guild_id,
            level: level_from_str(&r.level),
            suppress_here: r.suppress_here,
            suppress_roles: r.suppress_roles,
            muted_until: r.muted_until,
        }))
    }

    async fn find_global_pref(
        &self,
        user_id: i64,
    ) -> Result<Option<GuildNotificationPref>, AppError> {
        let row = sqlx::query_as::<_, GuildPrefRow>(
            r#"
            SELECT user_id, guild_id, level, suppress_here, suppress_roles, muted_until
            FROM guild_notification_prefs
            WHERE user_id = $1 AND guild_id IS NULL
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| GuildNotificationPref {
            user_id: r.user_id,
            guild_id: r.guild_id,
            level: level_from_str(&r.level),
            suppress_here: r.suppress_here,
            suppress_roles: r.suppress_roles,
            muted_until: r.muted_until,
        }))
    }

    async fn find_type_pref(
        &self,
        user_id: i64,
        notification_type: &str,
    ) -> Result<Option<TypeDeliveryPref>, AppError> {
        let row = sqlx::query_as::<_, TypePrefRow>(
            r#"
            SELECT in_app, push, sound
            FROM notification_type_prefs
            WHERE user_id = $1 AND notification_type = $2
            "#,
        )
        .bind(user_id)
        .bind(notification_type)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| TypeDeliveryPref {
            in_app: r.in_app,
            push: r.push,
            sound: r.sound,
        }))
    }

    async fn upsert_channel_pref(&self, pref: &ChannelNotificationPref) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO channel_notification_prefs (user_id, channel_id, level, muted_until)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, channel_id) DO UPDATE
            SET level = EXCLUDED.level, muted_until = EXCLUDED.muted_until
            "#,
        )
        .bind(pref.user_id)
        .bind(pref.channel_id)
        .bind(level_as_str(pref.level))
        .bind(pref.muted_until)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn upsert_guild_pref(&self, pref: &GuildNotificationPref) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO guild_notification_prefs
                (user_id, guild_id, level, suppress_here, suppress_roles, muted_until)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, guild_id) DO UPDATE
            SET level = EXCLUDED.level,
                suppress_here = EXCLUDED.suppress_here,
                suppress_roles = EXCLUDED.suppress_roles,
                muted_until = EXCLUDED.muted_until
            "#,
        )
        .bind(pref.user_id)
        .bind(pref.guild_id)
        .bind(level_as_str(pref.level))
        .bind(pref.suppress_here)
        .bind(pref.suppress_roles)
        .bind(pref.muted_until)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn upsert_type_pref(
        &self,
        user_id: i64,
        notification_type: &str,
        pref: TypeDeliveryPref,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO notification_type_prefs (user_id, notification_type, in_app, push, sound)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, notification_type) DO UPDATE
            SET in_app = EXCLUDED.in_app, push = EXCLUDED.push, sound = EXCLUDED.sound
            "#,
        )
        .bind(user_id)
        .bind(notification_type)
        .bind(pref.in_app)
        .bind(pref.push)
        .bind(pref.sound)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
