//! Web Push transport: VAPID-signed delivery to browser push services.
//!
//! No teacher or pack example speaks the Push API, so this leans on the
//! `web-push` crate directly — the standard choice for this concern in the
//! Rust ecosystem, kept behind a trait so the notification service and its
//! tests never depend on the concrete HTTP client.

use async_trait::async_trait;
use web_push::{
    ContentEncoding, SubscriptionInfo, VapidSignatureBuilder, WebPushClient, WebPushError,
    WebPushMessageBuilder,
};

use crate::config::settings::PushSettings;
use crate::domain::entities::PushSubscription;
use crate::shared::error::AppError;

/// What happened when a single push was attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Accepted by the push service.
    Delivered,
    /// The push service reports the subscription is dead
    /// (410 Gone / 404 Not Found) — the caller should delete it.
    Gone,
    /// Transient failure (network, 5xx, rate limit) — worth retrying later,
    /// not grounds to delete the subscription.
    Transient,
}

#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn send(
        &self,
        subscription: &PushSubscription,
        payload: &[u8],
    ) -> Result<PushOutcome, AppError>;
}

/// `web-push`-backed transport, signing every message with the instance's
/// VAPID key pair.
pub struct WebPushTransport {
    client: web_push::WebPushClient,
    private_key_b64: String,
    contact: Option<String>,
}

impl WebPushTransport {
    pub fn new(settings: &PushSettings) -> Result<Self, AppError> {
        let private_key_b64 = settings
            .vapid_private_key
            .clone()
            .ok_or_else(|| AppError::Internal("VAPID private key not configured".into()))?;

        let client = WebPushClient::new()
            .map_err(|e| AppError::Push(format!("build http client: {e}")))?;

        Ok(Self {
            client,
            private_key_b64,
            contact: settings.vapid_contact_email.clone(),
        })
    }
}

#[async_trait]
impl PushTransport for WebPushTransport {
    async fn send(
        &self,
        subscription: &PushSubscription,
        payload: &[u8],
    ) -> Result<PushOutcome, AppError> {
        let subscription_info = SubscriptionInfo::new(
            &subscription.endpoint,
            &subscription.p256dh_key,
            &subscription.auth_key,
        );

        let mut sig_builder =
            VapidSignatureBuilder::from_base64(&self.private_key_b64, &subscription_info)
                .map_err(|e| AppError::Push(format!("build vapid signature: {e}")))?;

        if let Some(contact) = &self.contact {
            sig_builder.add_claim("sub", contact.as_str());
        }

        let signature = sig_builder
            .build()
            .map_err(|e| AppError::Push(format!("sign vapid claim: {e}")))?;

        let mut builder = WebPushMessageBuilder::new(&subscription_info);
        builder.set_payload(ContentEncoding::Aes128Gcm, payload);
        builder.set_vapid_signature(signature);

        let message = builder
            .build()
            .map_err(|e| AppError::Push(format!("build message: {e}")))?;

        let outcome = match self.client.send(message).await {
            Ok(()) => PushOutcome::Delivered,
            Err(WebPushError::EndpointNotValid(_)) | Err(WebPushError::EndpointNotFound(_)) => {
                PushOutcome::Gone
            }
            Err(e) => {
                tracing::warn!(
                    endpoint = %subscription.endpoint,
                    "transient push delivery failure: {e}"
                );
                PushOutcome::Transient
            }
        };

        crate::infrastructure::metrics::record_push_delivery(match outcome {
            PushOutcome::Delivered => "delivered",
            PushOutcome::Gone => "gone",
            PushOutcome::Transient => "transient",
        });

        Ok(outcome)
    }
}
