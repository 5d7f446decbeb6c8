//! Notification delivery policy: resolves whether, and how, a single
//! notification reaches a user.
//!
//! Pure functions over already-loaded preference rows so the precedence
//! rule is unit-testable without a database: **Channel > Guild > Global >
//! Default (mentions-only)**. Nothing here awaits anything.

use chrono::{DateTime, Utc};

use crate::domain::entities::{
    ChannelNotificationPref, GuildNotificationPref, Notification, NotificationLevel,
    TypeDeliveryPref,
};

/// Whether a muted_until timestamp is still in effect at `now`.
fn is_muted(muted_until: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    muted_until.is_some_and(|until| until > now)
}

/// All preference rows relevant to one notification decision, pre-loaded
/// by the caller (the notification service) so this function stays pure.
#[derive(Debug, Default)]
pub struct PreferenceContext {
    pub channel: Option<ChannelNotificationPref>,
    pub guild: Option<GuildNotificationPref>,
    pub global: Option<GuildNotificationPref>,
    pub type_pref: Option<TypeDeliveryPref>,
}

/// Domain service for resolving notification delivery decisions.
pub struct NotificationPolicy;

impl NotificationPolicy {
    /// Resolve the effective `NotificationLevel` for a notification,
    /// applying Channel > Guild > Global > Default precedence. Does not
    /// consider mute windows; call [`Self::is_suppressed`] for that.
    pub fn resolve_level(ctx: &PreferenceContext) -> NotificationLevel {
        if let Some(channel) = &ctx.channel {
            return channel.level;
        }
        if let Some(guild) = &ctx.guild {
            return guild.level;
        }
        if let Some(global) = &ctx.global {
            return global.level;
        }
        NotificationLevel::default()
    }

    /// True when a currently-active mute window (channel or guild scope)
    /// blocks delivery regardless of level.
    pub fn is_suppressed(ctx: &PreferenceContext, now: DateTime<Utc>) -> bool {
        if let Some(channel) = &ctx.channel {
            if is_muted(channel.muted_until, now) {
                return true;
            }
        }
        if let Some(guild) = &ctx.guild {
            if is_muted(guild.muted_until, now) {
                return true;
            }
        }
        false
    }

    /// Whether `@here`/`@role` mentions are suppressed in this guild even
    /// though a plain `@mention` still notifies. Checked before
    /// `should_notify` classifies the notification as mention-like.
    pub fn suppresses_broad_mentions(ctx: &PreferenceContext) -> bool {
        ctx.guild.as_ref().is_some_and(|g| g.suppress_here || g.suppress_roles)
    }

    /// The final in-app/push/sound decision for one notification: level
    /// precedence, then mute windows, then per-type delivery channels.
    pub fn should_notify(
        notification: &Notification,
        ctx: &PreferenceContext,
        now: DateTime<Utc>,
    ) -> DeliveryDecision {
        if Self::is_suppressed(ctx, now) {
            return DeliveryDecision::none();
        }

        let level = Self::resolve_level(ctx);
        let passes_level = match level {
            NotificationLevel::None => false,
            NotificationLevel::Mentions => notification.is_mention_like(),
            NotificationLevel::All => true,
        };

        if !passes_level {
            return DeliveryDecision::none();
        }

        let type_pref = ctx.type_pref.unwrap_or_default();
        DeliveryDecision {
            in_app: type_pref.in_app,
            push: type_pref.push,
            sound: type_pref.sound,
        }
    }
}

/// The three independent delivery channels a notification can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeliveryDecision {
    pub in_app: bool,
    pub push: bool,
    pub sound: bool,
}

impl DeliveryDecision {
    fn none() -> Self {
        Self::default()
    }

    pub fn notifies_at_all(&self) -> bool {
        self.in_app || self.push
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::NotificationCategory;

    fn notification(category: NotificationCategory) -> Notification {
        Notification {
            id: 1,
            user_id: 1,
            notification_type: "MESSAGE_MENTION".into(),
            category,
            guild_id: Some(10),
            channel_id: Some(20),
            message_id: Some(30),
            actor_id: 2,
            actor_name: "someone".into(),
            content: None,
            metadata: None,
            read: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn channel_pref_wins_over_guild_and_global() {
        let ctx = PreferenceContext {
            channel: Some(ChannelNotificationPref {
                user_id: 1,
                channel_id: 20,
                level: NotificationLevel::All,
                muted_until: None,
            }),
            guild: Some(GuildNotificationPref {
                user_id: 1,
                guild_id: Some(10),
                level: NotificationLevel::None,
                suppress_here: false,
                suppress_roles: false,
                muted_until: None,
            }),
            global: None,
            type_pref: None,
        };

        assert_eq!(NotificationPolicy::resolve_level(&ctx), NotificationLevel::All);
    }

    #[test]
    fn default_level_is_mentions_only() {
        let ctx = PreferenceContext::default();
        assert_eq!(
            NotificationPolicy::resolve_level(&ctx),
            NotificationLevel::Mentions
        );

        let decision = NotificationPolicy::should_notify(
            &notification(NotificationCategory::GuildActivity),
            &ctx,
            Utc::now(),
        );
        assert!(!decision.notifies_at_all());

        let decision = NotificationPolicy::should_notify(
            &notification(NotificationCategory::Mention),
            &ctx,
            Utc::now(),
        );
        assert!(decision.notifies_at_all());
    }

    #[test]
    fn active_mute_window_blocks_delivery_even_at_level_all() {
        let now = Utc::now();
        let ctx = PreferenceContext {
            channel: Some(ChannelNotificationPref {
                user_id: 1,
                channel_id: 20,
                level: NotificationLevel::All,
                muted_until: Some(now + chrono::Duration::hours(1)),
            }),
            ..Default::default()
        };

        let decision = NotificationPolicy::should_notify(
            &notification(NotificationCategory::Mention),
            &ctx,
            now,
        );
        assert!(!decision.notifies_at_all());
    }

    #[test]
    fn expired_mute_window_no_longer_blocks() {
        let now = Utc::now();
        let ctx = PreferenceContext {
            channel: Some(ChannelNotificationPref {
                user_id: 1,
                channel_id: 20,
                level: NotificationLevel::All,
                muted_until: Some(now - chrono::Duration::hours(1)),
            }),
            ..Default::default()
        };

        let decision = NotificationPolicy::should_notify(
            &notification(NotificationCategory::GuildActivity),
            &ctx,
            now,
        );
        assert!(decision.notifies_at_all());
    }

    #[test]
    fn type_pref_can_disable_push_while_keeping_in_app() {
        let ctx = PreferenceContext {
            global: Some(GuildNotificationPref {
                user_id: 1,
                guild_id: None,
                level: NotificationLevel::All,
                suppress_here: false,
                suppress_roles: false,
                muted_until: None,
            }),
            type_pref: Some(TypeDeliveryPref {
                in_app: true,
                push: false,
                sound: false,
            }),
            ..Default::default()
        };

        let decision = NotificationPolicy::should_notify(
            &notification(NotificationCategory::GuildActivity),
            &ctx,
            Utc::now(),
        );
        assert!(decision.in_app);
        assert!(!decision.push);
        assert!(!decision.sound);
    }
}
