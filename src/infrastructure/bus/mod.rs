//! Event Bus: durable pub/sub on top of NATS JetStream.
//!
//! Grounded on the same `jetstream::Context` + idempotent
//! get-or-create stream pattern used for cross-service messaging
//! elsewhere in the ecosystem. Two streams are declared at startup:
//!
//! - `EVENTS` — fan-out traffic consumed by every gateway instance
//!   (`app.>` minus `app.federation.>`), short retention, no consumer
//!   durability required since a missed live event is superseded by
//!   the next `PRESENCE_UPDATE`/`DISPATCH` anyway.
//! - `FEDERATION` — competitively consumed work queue for outbound
//!   federation delivery (`app.federation.>`), longer retention, acked
//!   explicitly so a crashed worker redelivers instead of losing work.
//!
//! `EnsureStreams` is intentionally a strict no-op on drift: if a
//! stream already exists with different config, we log a warning and
//! leave it alone rather than mutating retention policy live under a
//! production broker.

pub mod envelope;

use std::future::Future;
use std::time::Duration;

use async_nats::jetstream::{self, stream::RetentionPolicy};
use futures::StreamExt;

use crate::config::settings::BusSettings;
use crate::shared::error::AppError;

pub use envelope::{streams, subjects, Event, BROADCAST_SENTINEL};

/// The slice of [`EventBus`] the notification service needs to publish
/// `NOTIFICATION_CREATE` events. Exists so notification-service tests can
/// substitute a fake publisher instead of dialing a real broker.
#[async_trait::async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish_user_event(
        &self,
        subject: &str,
        event_type: &str,
        user_id: i64,
        data: serde_json::Value,
    ) -> Result<(), AppError>;
}

/// Handle to the broker connection, shared across the application via `AppState`.
#[derive(Clone)]
pub struct EventBus {
    client: async_nats::Client,
    jetstream: jetstream::Context,
    stream_prefix: String,
    events_retention_hours: u64,
    federation_retention_days: u64,
}

impl EventBus {
    /// Connect to the broker and wrap it in a JetStream context. Does not
    /// declare streams — call [`EventBus::ensure_streams`] once at startup.
    pub async fn connect(settings: &BusSettings) -> Result<Self, AppError> {
        let client = async_nats::connect(&settings.url)
            .await
            .map_err(|e| AppError::Bus(format!("connect to {}: {e}", settings.url)))?;
        let jetstream = jetstream::new(client.clone());

        Ok(Self {
            client,
            jetstream,
            stream_prefix: settings.stream_prefix.clone(),
            events_retention_hours: settings.events_retention_hours,
            federation_retention_days: settings.federation_retention_days,
        })
    }

    fn stream_name(&self, base: &str) -> String {
        format!("{}_{}", self.stream_prefix, base)
    }

    /// Idempotently declare the `EVENTS` and `FEDERATION` streams. Safe to
    /// call on every startup; a pre-existing stream with matching subjects
    /// is left untouched, a pre-existing stream with diverging config is
    /// logged and left untouched (no forced `update_stream`).
    pub async fn ensure_streams(&self) -> Result<(), AppError> {
        self.ensure_stream(
            &self.stream_name(streams::EVENTS),
            subjects::EVENTS_STREAM_SUBJECTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            Duration::from_secs(self.events_retention_hours * 3600),
        )
        .await?;

        self.ensure_stream(
            &self.stream_name(streams::FEDERATION),
            vec![subjects::FEDERATION_WILDCARD.to_string()],
            Duration::from_secs(self.federation_retention_days * 86400),
        )
        .await
    }

    async fn ensure_stream(
        &self,
        name: &str,
        subjects: Vec<String>,
        max_age: Duration,
    ) -> Result<(), AppError> {
        match self.jetstream.get_stream(name).await {
            Ok(existing) => {
                let info = existing
                    .cached_info();
                if info.config.subjects != subjects {
                    tracing::warn!(
                        stream = name,
                        existing = ?info.config.subjects,
                        wanted = ?subjects,
                        "stream exists with different subjects, leaving as-is"
                    );
                }
                Ok(())
            }
            Err(_) => {
                self.jetstream
                    .create_stream(jetstream::stream::Config {
                        name: name.to_string(),
                        subjects,
                        retention: RetentionPolicy::Limits,
                        max_age,
                        ..Default::default()
                    })
                    .await
                    .map_err(|e| AppError::Bus(format!("create stream {name}: {e}")))?;
                tracing::info!(stream = name, "declared stream");
                Ok(())
            }
        }
    }

    async fn publish(&self, event: &Event) -> Result<(), AppError> {
        let result = self.publish_inner(event).await;
        crate::infrastructure::metrics::record_bus_publish(&event.subject, result.is_ok());
        result
    }

    async fn publish_inner(&self, event: &Event) -> Result<(), AppError> {
        let payload = serde_json::to_vec(event)
            .map_err(|e| AppError::Bus(format!("serialize event: {e}")))?;

        let ack = self
            .jetstream
            .publish(event.subject.clone(), payload.into())
            .await
            .map_err(|e| AppError::Bus(format!("publish {}: {e}", event.subject)))?;

        ack.await
            .map_err(|e| AppError::Bus(format!("ack {}: {e}", event.subject)))?;
        Ok(())
    }

    /// Publish an event scoped to a guild. Every session subscribed to that
    /// guild's channels receives it; sessions pass it through the Dispatch
    /// Router to decide whether a given recipient actually sees it.
    pub async fn publish_guild_event(
        &self,
        subject: &str,
        event_type: &str,
        guild_id: i64,
        data: serde_json::Value,
    ) -> Result<(), AppError> {
        self.publish(&Event {
            event_type: event_type.to_string(),
            subject: subject.to_string(),
            guild_id: Some(guild_id.to_string()),
            channel_id: None,
            user_id: None,
            data,
        })
        .await
    }

    /// Publish an event scoped to a single channel (carries both the
    /// channel and, when known, its owning guild for routing).
    pub async fn publish_channel_event(
        &self,
        subject: &str,
        event_type: &str,
        guild_id: Option<i64>,
        channel_id: i64,
        data: serde_json::Value,
    ) -> Result<(), AppError> {
        self.publish(&Event {
            event_type: event_type.to_string(),
            subject: subject.to_string(),
            guild_id: guild_id.map(|g| g.to_string()),
            channel_id: Some(channel_id.to_string()),
            user_id: None,
            data,
        })
        .await
    }

    /// Publish an event addressed to exactly one user (all of their
    /// sessions, across every instance — delivered via `app.>` fan-out).
    pub async fn publish_user_event(
        &self,
        subject: &str,
        event_type: &str,
        user_id: i64,
        data: serde_json::Value,
    ) -> Result<(), AppError> {
        self.publish(&Event {
            event_type: event_type.to_string(),
            subject: subject.to_string(),
            guild_id: None,
            channel_id: None,
            user_id: Some(user_id.to_string()),
            data,
        })
        .await
    }

    /// Publish an event to every identified session on every instance
    /// (the `guild_id` sentinel, never a real guild id).
    pub async fn publish_broadcast(
        &self,
        subject: &str,
        event_type: &str,
        data: serde_json::Value,
    ) -> Result<(), AppError> {
        self.publish(&Event {
            event_type: event_type.to_string(),
            subject: subject.to_string(),
            guild_id: Some(BROADCAST_SENTINEL.to_string()),
            channel_id: None,
            user_id: None,
            data,
        })
        .await
    }

    /// Subscribe to an exact subject. The handler runs in its own spawned
    /// task per message, so a panicking handler drops that one message
    /// instead of killing the subscription loop.
    pub fn subscribe<F, Fut>(&self, subject: &str, handler: F) -> Result<(), AppError>
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.spawn_subscription(subject.to_string(), None, handler)
    }

    /// Subscribe to a wildcard subject pattern (e.g. `app.>`). Every
    /// matching message, across every subject under the pattern, reaches
    /// the handler.
    pub fn subscribe_wildcard<F, Fut>(&self, pattern: &str, handler: F) -> Result<(), AppError>
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.spawn_subscription(pattern.to_string(), None, handler)
    }

    /// Subscribe as part of a named queue group: NATS load-balances
    /// delivery across every member of the group, so exactly one instance
    /// handles a given message. Used for federation delivery workers.
    pub fn queue_subscribe<F, Fut>(
        &self,
        subject: &str,
        queue_group: &str,
        handler: F,
    ) -> Result<(), AppError>
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.spawn_subscription(subject.to_string(), Some(queue_group.to_string()), handler)
    }

    fn spawn_subscription<F, Fut>(
        &self,
        subject: String,
        queue_group: Option<String>,
        handler: F,
    ) -> Result<(), AppError>
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let client = self.client.clone();
        tokio::spawn(async move {
            let subscribe_result = match &queue_group {
                Some(group) => client.queue_subscribe(subject.clone(), group.clone()).await,
                None => client.subscribe(subject.clone()).await,
            };
            let mut subscriber = match subscribe_result {
                Ok(s) => s,
                Err(e) => {
                    tracing::error!(subject, "failed to subscribe: {e}");
                    return;
                }
            };

            while let Some(message) = subscriber.next().await {
                let event: Event = match serde_json::from_slice(&message.payload) {
                    Ok(ev) => ev,
                    Err(e) => {
                        tracing::warn!(subject = %message.subject, "dropping malformed event: {e}");
                        continue;
                    }
                };
                tokio::spawn(handler(event));
            }

            tracing::warn!(subject, "subscription stream ended");
        });

        Ok(())
    }
}

#[async_trait::async_trait]
impl EventPublisher for EventBus {
    async fn publish_user_event(
        &self,
        subject: &str,
        event_type: &str,
        user_id: i64,
        data: serde_json::Value,
    ) -> Result<(), AppError> {
        EventBus::publish_user_event(self, subject, event_type, user_id, data).await
    }
}
