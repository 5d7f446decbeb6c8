//! Notification Service
//!
//! Implements the `CreateNotification` pipeline from the spec's Push
//! Notification Fan-out component: normalize the record, resolve
//! per-type delivery preferences, persist + publish for in-app delivery,
//! and push through the web push transport when enabled. Also owns the
//! two periodic GC sweeps (stale subscriptions, old notification
//! records) and the pure `should_notify` precedence check producers can
//! call before ever constructing a `Notification`.
//!
//! Grounded on the same generic-over-repository-trait shape as
//! `guild_service`/`message_service`, with the push transport and event
//! bus added as the two new collaborators this component needs.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::config::settings::PushSettings;
use crate::domain::entities::{
    Notification, NotificationCategory, NotificationPreferenceRepository, NotificationRepository,
    PushSubscription, PushSubscriptionRepository,
};
use crate::domain::services::notification_policy::{
    DeliveryDecision, NotificationPolicy, PreferenceContext,
};
use crate::infrastructure::bus::{subjects, EventPublisher};
use crate::infrastructure::push::{PushOutcome, PushTransport};
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;

/// Everything a producer knows about a notification before it has an id
/// or timestamp. `CreateNotification` fills in the rest.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: i64,
    pub notification_type: String,
    pub guild_id: Option<i64>,
    pub channel_id: Option<i64>,
    pub message_id: Option<i64>,
    pub actor_id: i64,
    pub actor_name: String,
    pub content: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

/// Rendered title/body/url for one push payload. Contextual: a guild
/// channel, a DM, or bare system context each render differently.
struct PushContent {
    title: String,
    body: String,
    url: Option<String>,
}

pub struct NotificationServiceImpl<N, P, S, T, B>
where
    N: NotificationRepository,
    P: NotificationPreferenceRepository,
    S: PushSubscriptionRepository,
    T: PushTransport,
    B: EventPublisher,
{
    notifications: Arc<N>,
    preferences: Arc<P>,
    subscriptions: Arc<S>,
    push: Option<Arc<T>>,
    bus: Arc<B>,
    id_generator: Arc<SnowflakeGenerator>,
    push_settings: PushSettings,
}

impl<N, P, S, T, B> NotificationServiceImpl<N, P, S, T, B>
where
    N: NotificationRepository,
    P: NotificationPreferenceRepository,
    S: PushSubscriptionRepository,
    T: PushTransport,
    B: EventPublisher,
{
    pub fn new(
        notifications: Arc<N>,
        preferences: Arc<P>,
        subscriptions: Arc<S>,
        push: Option<Arc<T>>,
        bus: Arc<B>,
        id_generator: Arc<SnowflakeGenerator>,
        push_settings: PushSettings,
    ) -> Self {
        Self {
            notifications,
            preferences,
            subscriptions,
            push,
            bus,
            id_generator,
            push_settings,
        }
    }

    /// Load the preference rows relevant to one `(user_id, channel_id?,
    /// guild_id?, notification_type)` tuple. A pure function downstream
    /// (`NotificationPolicy`) then decides from these what to do.
    async fn load_preferences(
        &self,
        user_id: i64,
        guild_id: Option<i64>,
        channel_id: Option<i64>,
        notification_type: &str,
    ) -> Result<PreferenceContext, AppError> {
        let channel = match channel_id {
            Some(cid) => self.preferences.find_channel_pref(user_id, cid).await?,
            None => None,
        };
        let guild = match guild_id {
            Some(gid) => self.preferences.find_guild_pref(user_id, gid).await?,
            None => None,
        };
        let global = self.preferences.find_global_pref(user_id).await?;
        let type_pref = self
            .preferences
            .find_type_pref(user_id, notification_type)
            .await?;

        Ok(PreferenceContext {
            channel,
            guild,
            global,
            type_pref,
        })
    }

    /// The "should a producer even bother calling `create_notification`"
    /// decision from spec §4.5: channel pref (honoring `muted_until`) >
    /// DM-always-yes > guild/global/default. Returns the same
    /// `DeliveryDecision` `create_notification` would compute internally,
    /// so a producer can skip constructing a `NewNotification` at all
    /// when nothing would notify.
    pub async fn should_notify(
        &self,
        user_id: i64,
        notification_type: &str,
        guild_id: Option<i64>,
        channel_id: Option<i64>,
        is_dm: bool,
    ) -> Result<DeliveryDecision, AppError> {
        let ctx = self
            .load_preferences(user_id, guild_id, channel_id, notification_type)
            .await?;

        if is_dm && ctx.channel.is_none() {
            // DMs always notify unless the user has set an explicit
            // per-channel override for this DM channel.
            let type_pref = ctx.type_pref.unwrap_or_default();
            return Ok(DeliveryDecision {
                in_app: type_pref.in_app,
                push: type_pref.push,
                sound: type_pref.sound,
            });
        }

        let probe = Notification {
            id: 0,
            user_id,
            notification_type: notification_type.to_string(),
            category: NotificationCategory::from_type(notification_type),
            guild_id,
            channel_id,
            message_id: None,
            actor_id: 0,
            actor_name: String::new(),
            content: None,
            metadata: None,
            read: false,
            created_at: Utc::now(),
        };

        Ok(NotificationPolicy::should_notify(&probe, &ctx, Utc::now()))
    }

    /// `CreateNotification`: normalize, resolve preferences, persist +
    /// publish for in-app delivery, push through the transport if
    /// configured and the decision allows it.
    pub async fn create_notification(
        &self,
        new: NewNotification,
    ) -> Result<Notification, AppError> {
        let category = NotificationCategory::from_type(&new.notification_type);
        let notification = Notification {
            id: self.id_generator.generate(),
            user_id: new.user_id,
            notification_type: new.notification_type.clone(),
            category,
            guild_id: new.guild_id,
            channel_id: new.channel_id,
            message_id: new.message_id,
            actor_id: new.actor_id,
            actor_name: new.actor_name,
            content: new.content,
            metadata: new.metadata,
            read: false,
            created_at: Utc::now(),
        };

        let ctx = self
            .load_preferences(
                notification.user_id,
                notification.guild_id,
                notification.channel_id,
                &notification.notification_type,
            )
            .await?;
        let decision = NotificationPolicy::should_notify(&notification, &ctx, Utc::now());

        if !decision.notifies_at_all() {
            return Ok(notification);
        }

        let stored = if decision.in_app {
            let stored = self.notifications.create(&notification).await?;
            self.publish_in_app(&stored).await;
            stored
        } else {
            notification
        };

        if decision.push && self.push_settings.vapid_private_key.is_some() {
            self.send_to_user(&stored).await?;
        }

        Ok(stored)
    }

    async fn publish_in_app(&self, notification: &Notification) {
        let payload = json!({
            "id": notification.id.to_string(),
            "type": notification.notification_type,
            "guild_id": notification.guild_id.map(|g| g.to_string()),
            "channel_id": notification.channel_id.map(|c| c.to_string()),
            "message_id": notification.message_id.map(|m| m.to_string()),
            "actor_id": notification.actor_id.to_string(),
            "actor_name": notification.actor_name,
            "content": notification.content,
            "created_at": notification.created_at.to_rfc3339(),
        });

        if let Err(e) = self
            .bus
            .publish_user_event(
                subjects::NOTIFICATION_CREATE,
                "NOTIFICATION_CREATE",
                notification.user_id,
                payload,
            )
            .await
        {
            tracing::warn!(
                user_id = notification.user_id,
                error = %e,
                "failed to publish NOTIFICATION_CREATE"
            );
        }
    }

    fn render_push_content(&self, notification: &Notification) -> PushContent {
        match (notification.guild_id, notification.channel_id) {
            (Some(_), Some(channel_id)) => PushContent {
                title: format!("{} in a channel", notification.actor_name),
                body: notification
                    .content
                    .clone()
                    .unwrap_or_else(|| "sent a message".into()),
                url: Some(format!("/channels/{channel_id}")),
            },
            (None, Some(channel_id)) => PushContent {
                title: notification.actor_name.clone(),
                body: notification
                    .content
                    .clone()
                    .unwrap_or_else(|| "sent you a message".into()),
                url: Some(format!("/channels/@me/{channel_id}")),
            },
            _ => PushContent {
                title: "Notification".into(),
                body: notification
                    .content
                    .clone()
                    .unwrap_or_else(|| format!("{} notified you", notification.actor_name)),
                url: None,
            },
        }
    }

    /// `SendToUser`: push-delivers one notification to every subscription
    /// a user has registered. `410 Gone`/`404` subscriptions are deleted
    /// after the loop; successes advance `last_used_at`; transient
    /// failures are logged and left alone for a later attempt.
    pub async fn send_to_user(&self, notification: &Notification) -> Result<(), AppError> {
        let Some(transport) = &self.push else {
            return Ok(());
        };

        let subscriptions = self.subscriptions.find_by_user(notification.user_id).await?;
        if subscriptions.is_empty() {
            return Ok(());
        }

        let content = self.render_push_content(notification);
        let payload = serde_json::to_vec(&json!({
            "type": notification.notification_type,
            "title": content.title,
            "body": content.body,
            "url": content.url,
            "channel_id": notification.channel_id.map(|c| c.to_string()),
            "guild_id": notification.guild_id.map(|g| g.to_string()),
            "message_id": notification.message_id.map(|m| m.to_string()),
        }))
        .map_err(|e| AppError::Push(format!("serialize push payload: {e}")))?;

        let mut stale = Vec::new();
        let now = Utc::now();
        for subscription in &subscriptions {
            match transport.send(subscription, &payload).await {
                Ok(PushOutcome::Delivered) => {
                    if let Err(e) = self.subscriptions.touch(subscription.id, now).await {
                        tracing::warn!(subscription_id = subscription.id, error = %e, "failed to touch push subscription");
                    }
                }
                Ok(PushOutcome::Gone) => stale.push(subscription.id),
                Ok(PushOutcome::Transient) => {
                    tracing::debug!(subscription_id = subscription.id, "transient push failure, will retry next attempt");
                }
                Err(e) => {
                    tracing::warn!(subscription_id = subscription.id, error = %e, "push delivery error");
                }
            }
        }

        for id in stale {
            if let Err(e) = self.subscriptions.delete(id).await {
                tracing::warn!(subscription_id = id, error = %e, "failed to delete stale push subscription");
            }
        }

        Ok(())
    }

    /// Re-register (or refresh) a browser's push subscription. Uniqueness
    /// on `(user_id, endpoint)` means this both creates and updates.
    pub async fn register_subscription(
        &self,
        subscription: PushSubscription,
    ) -> Result<PushSubscription, AppError> {
        self.subscriptions.upsert(&subscription).await
    }

    /// Periodic GC: subscriptions unused since before the configured
    /// max age.
    pub async fn gc_stale_subscriptions(&self) -> Result<u64, AppError> {
        let cutoff = Utc::now()
            - chrono::Duration::days(self.push_settings.subscription_max_age_days as i64);
        let removed = self.subscriptions.delete_stale(cutoff).await?;
        if removed > 0 {
            tracing::info!(removed, "garbage collected stale push subscriptions");
        }
        Ok(removed)
    }

    /// Periodic GC: notification records older than the configured
    /// retention window.
    pub async fn gc_old_notifications(&self) -> Result<u64, AppError> {
        let cutoff = Utc::now()
            - chrono::Duration::days(self.push_settings.notification_retention_days as i64);
        let removed = self.notifications.delete_older_than(cutoff).await?;
        if removed > 0 {
            tracing::info!(removed, "garbage collected old notification records");
        }
        Ok(removed)
    }

    /// Mark a single notification read.
    pub async fn mark_read(&self, user_id: i64, notification_id: i64) -> Result<(), AppError> {
        self.notifications.mark_read(user_id, notification_id).await
    }

    /// Mark every notification created at or before `cursor` read.
    /// Read-the-newest-wins: a notification created after `cursor` is
    /// never touched, even if this call lands after it was created.
    pub async fn mark_all_read(
        &self,
        user_id: i64,
        cursor: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        self.notifications.mark_all_read(user_id, cursor).await
    }

    /// List a user's notifications, newest first.
    pub async fn list_for_user(
        &self,
        user_id: i64,
        before: Option<i64>,
        limit: i64,
    ) -> Result<Vec<Notification>, AppError> {
        self.notifications.list_for_user(user_id, before, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{
        ChannelNotificationPref, GuildNotificationPref, NotificationLevel, TypeDeliveryPref,
    };
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeBus;

    #[async_trait]
    impl EventPublisher for FakeBus {
        async fn publish_user_event(
            &self,
            _subject: &str,
            _event_type: &str,
            _user_id: i64,
            _data: serde_json::Value,
        ) -> Result<(), AppError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeNotifications {
        stored: Mutex<Vec<Notification>>,
    }

    #[async_trait]
    impl NotificationRepository for FakeNotifications {
        async fn create(&self, notification: &Notification) -> Result<Notification, AppError> {
            self.stored.lock().unwrap().push(notification.clone());
            Ok(notification.clone())
        }
        async fn list_for_user(
            &self,
            _user_id: i64,
            _before: Option<i64>,
            _limit: i64,
        ) -> Result<Vec<Notification>, AppError> {
            Ok(self.stored.lock().unwrap().clone())
        }
        async fn mark_read(&self, _user_id: i64, _notification_id: i64) -> Result<(), AppError> {
            Ok(())
        }
        async fn mark_all_read(&self, _user_id: i64, _cursor: DateTime<Utc>) -> Result<u64, AppError> {
            Ok(0)
        }
        async fn delete_older_than(&self, _cutoff: DateTime<Utc>) -> Result<u64, AppError> {
            Ok(0)
        }
    }

    #[derive(Default)]
    struct FakePreferences {
        channel: Option<ChannelNotificationPref>,
        guild: Option<GuildNotificationPref>,
        global: Option<GuildNotificationPref>,
        type_pref: Option<TypeDeliveryPref>,
    }

    #[async_trait]
    impl NotificationPreferenceRepository for FakePreferences {
        async fn find_channel_pref(
            &self,
            _user_id: i64,
            _channel_id: i64,
        ) -> Result<Option<ChannelNotificationPref>, AppError> {
            Ok(self.channel.clone())
        }
        async fn find_guild_pref(
            &self,
            _user_id: i64,
            _guild_id: i64,
        ) -> Result<Option<GuildNotificationPref>, AppError> {
            Ok(self.guild.clone())
        }
        async fn find_global_pref(&self, _user_id: i64) -> Result<Option<GuildNotificationPref>, AppError> {
            Ok(self.global.clone())
        }
        async fn find_type_pref(
            &self,
            _user_id: i64,
            _notification_type: &str,
        ) -> Result<Option<TypeDeliveryPref>, AppError> {
            Ok(self.type_pref)
        }
        async fn upsert_channel_pref(&self, _pref: &ChannelNotificationPref) -> Result<(), AppError> {
            Ok(())
        }
        async fn upsert_guild_pref(&self, _pref: &GuildNotificationPref) -> Result<(), AppError> {
            Ok(())
        }
        async fn upsert_type_pref(
            &self,
            _user_id: i64,
            _notification_type: &str,
            _pref: TypeDeliveryPref,
        ) -> Result<(), AppError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeSubscriptions {
        subs: Mutex<Vec<PushSubscription>>,
        deleted: Mutex<Vec<i64>>,
    }

    #[async_trait]
    impl PushSubscriptionRepository for FakeSubscriptions {
        async fn upsert(&self, subscription: &PushSubscription) -> Result<PushSubscription, AppError> {
            self.subs.lock().unwrap().push(subscription.clone());
            Ok(subscription.clone())
        }
        async fn find_by_user(&self, user_id: i64) -> Result<Vec<PushSubscription>, AppError> {
            Ok(self
                .subs
                .lock()
                .unwrap()
                .iter()
                .filter(|s| s.user_id == user_id)
                .cloned()
                .collect())
        }
        async fn touch(&self, _id: i64, _used_at: DateTime<Utc>) -> Result<(), AppError> {
            Ok(())
        }
        async fn delete(&self, id: i64) -> Result<(), AppError> {
            self.deleted.lock().unwrap().push(id);
            Ok(())
        }
        async fn delete_stale(&self, _cutoff: DateTime<Utc>) -> Result<u64, AppError> {
            Ok(0)
        }
    }

    fn subscription(id: i64, user_id: i64) -> PushSubscription {
        PushSubscription {
            id,
            user_id,
            endpoint: format!("https://push.example/{id}"),
            p256dh_key: "key".into(),
            auth_key: "auth".into(),
            user_agent: None,
            created_at: Utc::now(),
            last_used_at: Utc::now(),
        }
    }

    fn new_notification(user_id: i64) -> NewNotification {
        NewNotification {
            user_id,
            notification_type: "MESSAGE_MENTION".into(),
            guild_id: Some(1),
            channel_id: Some(2),
            message_id: Some(3),
            actor_id: 99,
            actor_name: "alice".into(),
            content: Some("hey @bob".into()),
            metadata: None,
        }
    }

    fn push_settings(vapid: bool) -> PushSettings {
        PushSettings {
            vapid_public_key: vapid.then(|| "pub".into()),
            vapid_private_key: vapid.then(|| "priv".into()),
            vapid_contact_email: None,
            subscription_max_age_days: 60,
            notification_retention_days: 90,
        }
    }

    #[tokio::test]
    async fn default_preferences_allow_mention_notifications() {
        let prefs = FakePreferences::default();
        let ctx = PreferenceContext {
            channel: prefs.channel.clone(),
            guild: prefs.guild.clone(),
            global: prefs.global.clone(),
            type_pref: prefs.type_pref,
        };

        let level = NotificationPolicy::resolve_level(&ctx);
        assert_eq!(level, NotificationLevel::Mentions);
    }

    #[tokio::test]
    async fn send_to_user_deletes_gone_subscription_and_touches_live_one() {
        struct TwoOutcomeTransport;

        #[async_trait]
        impl PushTransport for TwoOutcomeTransport {
            async fn send(
                &self,
                subscription: &PushSubscription,
                _payload: &[u8],
            ) -> Result<PushOutcome, AppError> {
                if subscription.id == 1 {
                    Ok(PushOutcome::Gone)
                } else {
                    Ok(PushOutcome::Delivered)
                }
            }
        }

        let subscriptions = Arc::new(FakeSubscriptions::default());
        subscriptions.upsert(&subscription(1, 7)).await.unwrap();
        subscriptions.upsert(&subscription(2, 7)).await.unwrap();

        let service = NotificationServiceImpl::new(
            Arc::new(FakeNotifications::default()),
            Arc::new(FakePreferences::default()),
            subscriptions.clone(),
            Some(Arc::new(TwoOutcomeTransport)),
            Arc::new(FakeBus),
            Arc::new(SnowflakeGenerator::new(1, 0)),
            push_settings(true),
        );

        let notification = Notification {
            id: 1,
            user_id: 7,
            notification_type: "MESSAGE_MENTION".into(),
            category: NotificationCategory::Mention,
            guild_id: Some(1),
            channel_id: Some(2),
            message_id: None,
            actor_id: 1,
            actor_name: "alice".into(),
            content: Some("hi".into()),
            metadata: None,
            read: false,
            created_at: Utc::now(),
        };

        service.send_to_user(&notification).await.unwrap();
        assert_eq!(*subscriptions.deleted.lock().unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn should_notify_respects_channel_mute() {
        let prefs = FakePreferences {
            channel: Some(ChannelNotificationPref {
                user_id: 7,
                channel_id: 2,
                level: NotificationLevel::All,
                muted_until: Some(Utc::now() + chrono::Duration::hours(1)),
            }),
            ..Default::default()
        };

        let service = NotificationServiceImpl::new(
            Arc::new(FakeNotifications::default()),
            Arc::new(prefs),
            Arc::new(FakeSubscriptions::default()),
            None::<Arc<crate::infrastructure::push::WebPushTransport>>,
            Arc::new(FakeBus),
            Arc::new(SnowflakeGenerator::new(1, 0)),
            push_settings(false),
        );

        let decision = service
            .should_notify(7, "MESSAGE_MENTION", Some(1), Some(2), false)
            .await
            .unwrap();
        assert!(!decision.notifies_at_all());
    }

    #[tokio::test]
    async fn create_notification_skips_push_when_vapid_not_configured() {
        let notifications = Arc::new(FakeNotifications::default());
        let service = NotificationServiceImpl::new(
            notifications.clone(),
            Arc::new(FakePreferences {
                global: Some(GuildNotificationPref {
                    user_id: 7,
                    guild_id: None,
                    level: NotificationLevel::All,
                    suppress_here: false,
                    suppress_roles: false,
                    muted_until: None,
                }),
                ..Default::default()
            }),
            Arc::new(FakeSubscriptions::default()),
            None::<Arc<crate::infrastructure::push::WebPushTransport>>,
            Arc::new(FakeBus),
            Arc::new(SnowflakeGenerator::new(1, 0)),
            push_settings(false),
        );

        let created = service.create_notification(new_notification(7)).await;
        assert!(created.is_ok());
        assert_eq!(notifications.stored.lock().unwrap().len(), 1);
    }
}
