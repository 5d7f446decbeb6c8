//! Notification Repository Implementation
//!
//! PostgreSQL implementation of notification record storage, with
//! cursor-based pagination mirroring `PgMessageRepository`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{Notification, NotificationCategory, NotificationRepository};
use crate::shared::error::AppError;

pub struct PgNotificationRepository {
    pool: PgPool,
}

impl PgNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct NotificationRow {
    id: i64,
    user_id: i64,
    notification_type: String,
    guild_id: Option<i64>,
    channel_id: Option<i64>,
    message_id: Option<i64>,
    actor_id: i64,
    actor_name: String,
    content: Option<String>,
    metadata: Option<serde_json::Value>,
    read: bool,
    created_at: DateTime<Utc>,
}

impl NotificationRow {
    fn into_notification(self) -> Notification {
        Notification {
            id: self.id,
            user_id: self.user_id,
            category: NotificationCategory::from_type(&self.notification_type),
            notification_type: self.notification_type,
            guild_id: self.guild_id,
            channel_id: self.channel_id,
            message_id: self.message_id,
            actor_id: self.actor_id,
            actor_name: self.actor_name,
            content: self.content,
            metadata: self.metadata,
            read: self.read,
            created_at: self.created_at,
        }
    }
}

#[async_trait]
impl NotificationRepository for PgNotificationRepository {
    async fn create(&self, notification: &Notification) -> Result<Notification, AppError> {
        let row = sqlx::query_as::<_, NotificationRow>(
            r#"
            INSERT INTO notifications
                (id, user_id, notification_type, guild_id, channel_id, message_id,
                 actor_id, actor_name, content, metadata, read)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, FALSE)
            RETURNING id, user_id, notification_type, guild_id, channel_id, message_id,
                      actor_id, actor_name, content, metadata, read, created_at
            "#,
        )
        .bind(notification.id)
        .bind(notification.user_id)
        .bind(&notification.notification_type)
        .bind(notification.guild_id)
        .bind(notification.channel_id)
        .bind(notification.message_id)
        .bind(notification.actor_id)
        .bind(&notification.actor_name)
        .bind(&notification.content)
        .bind(&notification.metadata)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_notification())
    }

    async fn list_for_user(
        &self,
        user_id: i64,
        before: Option<i64>,
        limit: i64,
    ) -> Result<Vec<Notification>, AppError> {
        let limit = limit.clamp(1, 100);

        let rows = match before {
            Some(cursor) => {
                sqlx::query_as::<_, NotificationRow>(
                    r#"
                    SELECT id, user_id, notification_type, guild_id, channel_id, message_id,
                           actor_id, actor_name, content, metadata, read, created_at
                    FROM notifications
                    WHERE user_id = $1 AND id < $2
                    ORDER BY id DESC
                    LIMIT $3
                    "#,
                )
                .bind(user_id)
                .bind(cursor)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, NotificationRow>(
                    r#"
                    SELECT id, user_id, notification_type, guild_id, channel_id, message_id,
                           actor_id, actor_name, content, metadata, read, created_at
                    FROM notifications
                    WHERE user_id = $1
                    ORDER BY id DESC
                    LIMIT $2
                    "#,
                )
                .bind(user_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows.into_iter().map(|r| r.into_notification()).collect())
    }

    async fn mark_read(&self, user_id: i64, notification_id: i64) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE notifications SET read = TRUE
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(notification_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn mark_all_read(&self, user_id: i64, cursor: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE notifications SET read = TRUE
            WHERE user_id = $1 AND read = FALSE AND created_at <= $2
            "#,
        )
        .bind(user_id)
        .bind(cursor)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM notifications WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
