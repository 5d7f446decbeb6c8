//! Application Startup
//!
//! Application building and server initialization. Beyond the pool/cache
//! handles, this wires the event bus, the gateway's `app.>` fan-out, and
//! the notification service, then spawns the background sweeps that have
//! no external trigger (stale-session reaping, push/notification GC).

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::Router;
use sqlx::PgPool;
use tokio::net::TcpListener;
use redis::aio::ConnectionManager;

use crate::application::services::NotificationServiceImpl;
use crate::config::Settings;
use crate::infrastructure::auth::{AuthVerifier, JwtAuthVerifier};
use crate::infrastructure::bus::EventBus;
use crate::infrastructure::push::WebPushTransport;
use crate::infrastructure::repositories::{
    PgNotificationPreferenceRepository, PgNotificationRepository, PgPushSubscriptionRepository,
};
use crate::infrastructure::{cache, database};
use crate::presentation::http::routes;
use crate::presentation::middleware::{cors, logging};
use crate::presentation::websocket::gateway::GatewayServer;
use crate::shared::snowflake::SnowflakeGenerator;

/// Concrete notification service type. Pinning the generic parameters
/// here, rather than making `AppState` itself generic, keeps every
/// handler signature simple.
pub type NotificationService = NotificationServiceImpl<
    PgNotificationRepository,
    PgNotificationPreferenceRepository,
    PgPushSubscriptionRepository,
    WebPushTransport,
    EventBus,
>;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub redis: ConnectionManager,
    pub snowflake: Arc<SnowflakeGenerator>,
    pub gateway: Arc<GatewayServer>,
    pub bus: EventBus,
    pub auth_verifier: Arc<dyn AuthVerifier>,
    pub notifications: Arc<NotificationService>,
    pub settings: Arc<Settings>,
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
    gateway: Arc<GatewayServer>,
    notifications: Arc<NotificationService>,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        // Create database pool
        let db = database::create_pool(&settings.database).await?;
        tracing::info!("Database connection pool created");

        // Create Redis client
        let redis = cache::create_redis_client(&settings.redis).await?;
        tracing::info!("Redis connection established");

        // Create snowflake generator
        let snowflake = Arc::new(SnowflakeGenerator::new(
            settings.snowflake.machine_id as u64,
            0u64, // Default node_id
        ));

        // Connect the event bus and declare its streams before anything
        // starts publishing or subscribing.
        let bus = EventBus::connect(&settings.bus).await?;
        bus.ensure_streams().await?;
        tracing::info!("Event bus connected and streams declared");

        let auth_verifier: Arc<dyn AuthVerifier> = Arc::new(JwtAuthVerifier::new(&settings.jwt));

        // Create WebSocket gateway and start its broker fan-out.
        let gateway = Arc::new(GatewayServer::new(
            settings.gateway.safe_heartbeat_interval_ms(),
            settings.gateway.heartbeat_timeout_ms,
            settings.gateway.identify_timeout_ms,
            settings.gateway.replay_buffer_size,
        ));
        gateway.start_fanout(&bus)?;

        let push_transport = if settings.push.vapid_private_key.is_some() {
            Some(Arc::new(WebPushTransport::new(&settings.push)?))
        } else {
            tracing::warn!("VAPID private key not configured, web push delivery disabled");
            None
        };

        let notifications = Arc::new(NotificationService::new(
            Arc::new(PgNotificationRepository::new(db.clone())),
            Arc::new(PgNotificationPreferenceRepository::new(db.clone())),
            Arc::new(PgPushSubscriptionRepository::new(db.clone())),
            push_transport,
            Arc::new(bus.clone()),
            snowflake.clone(),
            settings.push.clone(),
        ));

        let settings = Arc::new(settings);

        // Create app state
        let state = AppState {
            db,
            redis,
            snowflake,
            gateway: gateway.clone(),
            bus,
            auth_verifier,
            notifications: notifications.clone(),
            settings: settings.clone(),
        };

        // Build router with middleware
        let router = routes::create_router(state.clone())
            .layer(logging::create_trace_layer())
            .layer(cors::create_cors_layer(&settings.cors));

        // Bind to address
        let addr = SocketAddr::from(([0, 0, 0, 0], settings.server.port));
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Listening on {}", addr);

        Ok(Self {
            listener,
            router,
            gateway,
            notifications,
        })
    }

    /// Run the server until stopped, then drain: tell every live gateway
    /// session to reconnect elsewhere before the process actually exits.
    pub async fn run_until_stopped(self) -> Result<()> {
        let gateway = self.gateway.clone();
        spawn_background_tasks(self.gateway, self.notifications);

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal(gateway))
            .await?;
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

/// Periodic sweeps that have no external trigger: reaping disconnected
/// gateway sessions past the resume window, and the two notification GC
/// passes. Each runs on its own interval so a slow GC pass never delays
/// the others.
fn spawn_background_tasks(gateway: Arc<GatewayServer>, notifications: Arc<NotificationService>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            gateway.purge_stale_sessions().await;
        }
    });

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(3600));
        loop {
            interval.tick().await;
            if let Err(e) = notifications.gc_stale_subscriptions().await {
                tracing::warn!("push subscription GC failed: {e}");
            }
            if let Err(e) = notifications.gc_old_notifications().await {
                tracing::warn!("notification retention GC failed: {e}");
            }
        }
    });
}

async fn shutdown_signal(gateway: Arc<GatewayServer>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received, draining gateway sessions");
    gateway.shutdown().await;
}
