//! Push Subscription Repository Implementation
//!
//! PostgreSQL implementation of web push subscription storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{PushSubscription, PushSubscriptionRepository};
use crate::shared::error::AppError;

pub struct PgPushSubscriptionRepository {
    pool: PgPool,
}

impl PgPushSubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PushSubscriptionRow {
    id: i64,
    user_id: i64,
    endpoint: String,
    p256dh_key: String,
    auth_key: String,
    user_agent: Option<String>,
    created_at: DateTime<Utc>,
    last_used_at: DateTime<Utc>,
}

impl PushSubscriptionRow {
    fn into_subscription(self) -> PushSubscription {
        PushSubscription {
            id: self.id,
            user_id: self.user_id,
            endpoint: self.endpoint,
            p256dh_key: self.p256dh_key,
            auth_key: self.auth_key,
            user_agent: self.user_agent,
            created_at: self.created_at,
            last_used_at: self.last_used_at,
        }
    }
}

#[async_trait]
impl PushSubscriptionRepository for PgPushSubscriptionRepository {
    async fn upsert(&self, subscription: &PushSubscription) -> Result<PushSubscription, AppError> {
        let row = sqlx::query_as::<_, PushSubscriptionRow>(
            r#"
            INSERT INTO push_subscriptions
                (id, user_id, endpoint, p256dh_key, auth_key, user_agent, last_used_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            ON CONFLICT (user_id, endpoint) DO UPDATE
            SET p256dh_key = EXCLUDED.p256dh_key,
                auth_key = EXCLUDED.auth_key,
                user_agent = EXCLUDED.user_agent,
                last_used_at = NOW()
            RETURNING id, user_id, endpoint, p256dh_key, auth_key, user_agent,
                      created_at, last_used_at
            "#,
        )
        .bind(subscription.id)
        .bind(subscription.user_id)
        .bind(&subscription.endpoint)
        .bind(&subscription.p256dh_key)
        .bind(&subscription.auth_key)
        .bind(&subscription.user_agent)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_subscription())
    }

    async fn find_by_user(&self, user_id: i64) -> Result<Vec<PushSubscription>, AppError> {
        let rows = sqlx::query_as::<_, PushSubscriptionRow>(
            r#"
            SELECT id, user_id, endpoint, p256dh_key, auth_key, user_agent,
                   created_at, last_used_at
            FROM push_subscriptions
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_subscription()).collect())
    }

    async fn touch(&self, id: i64, used_at: DateTime<Utc>) -> Result<(), AppError> {
        sqlx::query("UPDATE push_subscriptions SET last_used_at = $2 WHERE id = $1")
            .bind(id)
            .bind(used_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<(), AppError> {
        sqlx::query("DELETE FROM push_subscriptions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete_stale(&self, cutoff: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM push_subscriptions WHERE last_used_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
