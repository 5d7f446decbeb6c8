//! Web push subscription entity and repository trait.
//!
//! Maps to the `push_subscriptions` table. Uniqueness on `(user_id,
//! endpoint)`; re-registering the same endpoint updates its keys rather
//! than creating a duplicate row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// A browser's web push subscription, as returned by the Push API.
///
/// Maps to the `push_subscriptions` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - user_id: BIGINT NOT NULL REFERENCES users(id)
/// - endpoint: TEXT NOT NULL
/// - p256dh_key: TEXT NOT NULL
/// - auth_key: TEXT NOT NULL
/// - user_agent: TEXT NULL
/// - created_at, last_used_at: TIMESTAMPTZ NOT NULL
/// - UNIQUE (user_id, endpoint)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushSubscription {
    pub id: i64,
    pub user_id: i64,
    pub endpoint: String,
    pub p256dh_key: String,
    pub auth_key: String,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
}

/// Repository trait for push subscription persistence.
#[async_trait]
pub trait PushSubscriptionRepository: Send + Sync {
    /// Insert a new subscription, or update keys/`last_used_at` if the
    /// `(user_id, endpoint)` pair already exists.
    async fn upsert(&self, subscription: &PushSubscription) -> Result<PushSubscription, AppError>;

    /// All subscriptions for a user.
    async fn find_by_user(&self, user_id: i64) -> Result<Vec<PushSubscription>, AppError>;

    /// Touch `last_used_at` after a successful delivery.
    async fn touch(&self, id: i64, used_at: DateTime<Utc>) -> Result<(), AppError>;

    /// Delete a subscription (used after the transport reports `Gone`/`NotFound`).
    async fn delete(&self, id: i64) -> Result<(), AppError>;

    /// Delete subscriptions unused since before `cutoff`. Returns the count removed.
    async fn delete_stale(&self, cutoff: DateTime<Utc>) -> Result<u64, AppError>;
}
