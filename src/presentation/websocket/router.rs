//! Dispatch Router: decides, for one bus [`Event`], which local sessions
//! should receive it.
//!
//! A pure function over already-loaded session descriptors so the
//! five-case decision can be unit-tested without a running registry or
//! broker. Cases are checked in this order and the first match wins
//! (source order preserved — this is intentionally a linear filter):
//!
//! 1. **User-targeted**: `event.user_id` set and the event isn't itself
//!    guild-scoped; only for `PRESENCE_UPDATE`/`USER_UPDATE` does this
//!    narrow delivery to just that user's sessions (every device).
//! 2. **Guild-scoped by envelope**: `event.guild_id` set. The broadcast
//!    sentinel means every identified session; any other guild id means
//!    sessions whose guild set contains it.
//! 3. **Guild-scoped by subject**: subject under `app.guild.>` but the
//!    envelope carries no `guild_id` — read it out of the payload instead.
//! 4. **Channel-scoped**: `event.channel_id` set but no guild was found
//!    above. The registry has no per-session DM participant list, so
//!    this falls back to every identified session. TODO: once DM
//!    channels carry an explicit participant list in the domain model,
//!    narrow this to just those participants instead of broadcasting.
//! 5. **Default**: no addressable scope above matched — deliver to every
//!    identified session (bare system events with no guild/channel/user).

use crate::infrastructure::bus::Event;
use crate::presentation::websocket::registry::SessionDescriptor;

fn everyone(sessions: &[SessionDescriptor]) -> Vec<String> {
    sessions.iter().map(|s| s.session_id.clone()).collect()
}

fn guild_members(sessions: &[SessionDescriptor], guild_id: i64) -> Vec<String> {
    sessions
        .iter()
        .filter(|s| s.guilds.contains(&guild_id))
        .map(|s| s.session_id.clone())
        .collect()
}

pub fn dispatch_recipients(event: &Event, sessions: &[SessionDescriptor]) -> Vec<String> {
    if event.guild_id.is_none() {
        if let Some(user_id) = event.user_id.as_deref().and_then(|s| s.parse::<i64>().ok()) {
            if event.event_type == "PRESENCE_UPDATE" || event.event_type == "USER_UPDATE" {
                return sessions
                    .iter()
                    .filter(|s| s.user_id == user_id)
                    .map(|s| s.session_id.clone())
                    .collect();
            }
        }
    }

    if let Some(guild_id) = event.guild_id.as_deref() {
        if guild_id == crate::infrastructure::bus::BROADCAST_SENTINEL {
            return everyone(sessions);
        }
        if let Ok(guild_id) = guild_id.parse::<i64>() {
            return guild_members(sessions, guild_id);
        }
    }

    if event.subject.starts_with("app.guild.") {
        if let Some(guild_id) = event
            .data
            .get("guild_id")
            .and_then(|v| v.as_i64().or_else(|| v.as_str().and_then(|s| s.parse().ok())))
        {
            return guild_members(sessions, guild_id);
        }
    }

    if event.channel_id.is_some() {
        return everyone(sessions);
    }

    everyone(sessions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn descriptor(session_id: &str, user_id: i64, guilds: &[i64]) -> SessionDescriptor {
        SessionDescriptor {
            session_id: session_id.to_string(),
            user_id,
            guilds: guilds.iter().copied().collect::<HashSet<_>>(),
        }
    }

    fn event(
        user_id: Option<&str>,
        guild_id: Option<&str>,
        channel_id: Option<&str>,
    ) -> Event {
        typed_event("TEST", user_id, guild_id, channel_id)
    }

    fn typed_event(
        event_type: &str,
        user_id: Option<&str>,
        guild_id: Option<&str>,
        channel_id: Option<&str>,
    ) -> Event {
        Event {
            event_type: event_type.into(),
            subject: "app.test".into(),
            guild_id: guild_id.map(str::to_string),
            channel_id: channel_id.map(str::to_string),
            user_id: user_id.map(str::to_string),
            data: serde_json::json!({}),
        }
    }

    #[test]
    fn user_targeted_presence_update_goes_only_to_that_user() {
        let sessions = vec![
            descriptor("a", 1, &[10]),
            descriptor("b", 2, &[10]),
            descriptor("c", 1, &[]),
        ];
        let ev = typed_event("PRESENCE_UPDATE", Some("1"), None, None);

        let mut recipients = dispatch_recipients(&ev, &sessions);
        recipients.sort();
        assert_eq!(recipients, vec!["a".to_string(), "c".to_string()]);
    }

    #[test]
    fn user_id_on_a_non_presence_event_does_not_narrow_delivery() {
        // Only PRESENCE_UPDATE/USER_UPDATE honor case 1; any other event
        // type with a `user_id` set falls through to its guild scope.
        let sessions = vec![descriptor("a", 1, &[10]), descriptor("b", 2, &[10])];
        let ev = typed_event("MESSAGE_CREATE", Some("1"), Some("10"), None);

        let mut recipients = dispatch_recipients(&ev, &sessions);
        recipients.sort();
        assert_eq!(recipients, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn broadcast_sentinel_reaches_everyone() {
        let sessions = vec![descriptor("a", 1, &[10]), descriptor("b", 2, &[20])];
        let ev = event(None, Some("__broadcast__"), None);

        let mut recipients = dispatch_recipients(&ev, &sessions);
        recipients.sort();
        assert_eq!(recipients, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn guild_scoped_event_reaches_only_subscribed_sessions() {
        let sessions = vec![
            descriptor("a", 1, &[10]),
            descriptor("b", 2, &[20]),
            descriptor("c", 3, &[10, 20]),
        ];
        let ev = event(None, Some("10"), Some("100"));

        let mut recipients = dispatch_recipients(&ev, &sessions);
        recipients.sort();
        assert_eq!(recipients, vec!["a".to_string(), "c".to_string()]);
    }

    #[test]
    fn guild_scoped_by_subject_reads_guild_id_from_payload() {
        let sessions = vec![descriptor("a", 1, &[10]), descriptor("b", 2, &[20])];
        let ev = Event {
            event_type: "GUILD_UPDATE".into(),
            subject: "app.guild.update".into(),
            guild_id: None,
            channel_id: None,
            user_id: None,
            data: serde_json::json!({ "guild_id": 10 }),
        };

        assert_eq!(dispatch_recipients(&ev, &sessions), vec!["a".to_string()]);
    }

    #[test]
    fn dm_event_with_no_guild_falls_back_to_everyone() {
        let sessions = vec![descriptor("a", 1, &[]), descriptor("b", 2, &[])];
        let ev = event(None, None, Some("55"));

        let mut recipients = dispatch_recipients(&ev, &sessions);
        recipients.sort();
        assert_eq!(recipients, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn unscoped_event_reaches_every_identified_session() {
        // Case 5 (default): a bare system event with no user/guild/channel
        // scope goes to everyone, per spec.md §4.3 item 5.
        let sessions = vec![descriptor("a", 1, &[]), descriptor("b", 2, &[5])];
        let ev = event(None, None, None);

        let mut recipients = dispatch_recipients(&ev, &sessions);
        recipients.sort();
        assert_eq!(recipients, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn guild_scoped_event_with_no_subscribers_reaches_no_one() {
        let sessions = vec![descriptor("a", 1, &[10])];
        let ev = event(None, Some("99"), None);

        assert!(dispatch_recipients(&ev, &sessions).is_empty());
    }
}
