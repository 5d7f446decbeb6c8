//! Application settings and configuration structures.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Root configuration structure containing all application settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Server configuration (host, port)
    pub server: ServerSettings,

    /// Database configuration (PostgreSQL)
    pub database: DatabaseSettings,

    /// Redis configuration
    pub redis: RedisSettings,

    /// JWT authentication settings
    pub jwt: JwtSettings,

    /// Snowflake ID generator settings
    pub snowflake: SnowflakeSettings,

    /// Rate limiting configuration
    pub rate_limit: RateLimitSettings,

    /// CORS configuration
    pub cors: CorsSettings,

    /// Event bus (broker) configuration
    pub bus: BusSettings,

    /// WebSocket gateway configuration
    pub gateway: GatewaySettings,

    /// Web push notification configuration
    pub push: PushSettings,

    /// Current environment (development, staging, production)
    pub environment: String,
}

/// Server binding configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind to (e.g., "0.0.0.0")
    pub host: String,

    /// Port number to listen on
    pub port: u16,
}

/// PostgreSQL database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// Database connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections to maintain
    pub min_connections: u32,

    /// Connection acquire timeout in seconds
    pub acquire_timeout: u64,
}

/// Redis configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisSettings {
    /// Redis connection URL
    pub url: String,

    /// Connection pool size
    pub pool_size: u32,
}

/// JWT authentication configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtSettings {
    /// Secret key for signing tokens
    pub secret: String,

    /// Access token expiry in minutes
    pub access_token_expiry_minutes: i64,

    /// Refresh token expiry in days
    pub refresh_token_expiry_days: i64,
}

/// Snowflake ID generator configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SnowflakeSettings {
    /// Machine/worker ID (0-1023)
    pub machine_id: u16,

    /// Custom epoch timestamp in milliseconds
    pub epoch: u64,
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitSettings {
    /// Maximum requests per second
    pub requests_per_second: f64,

    /// Burst size (bucket capacity)
    pub burst_size: u32,
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CorsSettings {
    /// Allowed origins (comma-separated in env)
    pub allowed_origins: Vec<String>,
}

/// Event bus (broker) configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BusSettings {
    /// Broker connection URL (e.g. "nats://localhost:4222")
    pub url: String,

    /// Prefix applied to durable stream names, so multiple environments
    /// can share a broker without colliding.
    pub stream_prefix: String,

    /// Retention window for the `EVENTS` stream, in hours.
    pub events_retention_hours: u64,

    /// Retention window for the `FEDERATION` work-queue stream, in days.
    pub federation_retention_days: u64,
}

/// WebSocket gateway configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewaySettings {
    /// Interval advertised to clients in `HELLO`, in milliseconds.
    pub heartbeat_interval_ms: u64,

    /// Grace period after a missed heartbeat before the connection is
    /// dropped, in milliseconds.
    pub heartbeat_timeout_ms: u64,

    /// Hard cap on how long a connection may wait to send `IDENTIFY`,
    /// in milliseconds.
    pub identify_timeout_ms: u64,

    /// Number of recent `DISPATCH` messages retained per session for resume.
    pub replay_buffer_size: usize,
}

/// Web push notification configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PushSettings {
    /// VAPID public key (base64url, uncompressed P-256 point).
    pub vapid_public_key: Option<String>,

    /// VAPID private key (base64url).
    pub vapid_private_key: Option<String>,

    /// Contact URI included in the VAPID JWT (e.g. "mailto:ops@example.com").
    pub vapid_contact_email: Option<String>,

    /// Subscriptions unused for longer than this are garbage-collected, in days.
    pub subscription_max_age_days: u64,

    /// Notification records older than this are garbage-collected, in days.
    pub notification_retention_days: u64,
}

impl GatewaySettings {
    /// Heartbeat intervals outside this range are never advertised; a
    /// misconfigured value falls back to the safe default rather than
    /// risking a client self-DoS loop.
    pub const MIN_HEARTBEAT_INTERVAL_MS: u64 = 15_000;
    pub const MAX_HEARTBEAT_INTERVAL_MS: u64 = 120_000;
    pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 41_250;

    /// The interval actually safe to advertise, clamped into the valid range.
    pub fn safe_heartbeat_interval_ms(&self) -> u64 {
        if (Self::MIN_HEARTBEAT_INTERVAL_MS..=Self::MAX_HEARTBEAT_INTERVAL_MS)
            .contains(&self.heartbeat_interval_ms)
        {
            self.heartbeat_interval_ms
        } else {
            Self::DEFAULT_HEARTBEAT_INTERVAL_MS
        }
    }
}

impl Settings {
    /// Load settings from environment variables and configuration files.
    ///
    /// The loading order is:
    /// 1. config/default.toml (base configuration)
    /// 2. config/{RUN_ENV}.toml (environment-specific overrides)
    /// 3. Environment variables (highest priority)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        // Determine the running environment
        let environment = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into());

        Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.acquire_timeout", 30)?
            .set_default("redis.pool_size", 10)?
            .set_default("jwt.access_token_expiry_minutes", 15)?
            .set_default("jwt.refresh_token_expiry_days", 7)?
            .set_default("snowflake.machine_id", 1)?
            .set_default("snowflake.epoch", 1420070400000_u64)?
            .set_default("rate_limit.requests_per_second", 10.0)?
            .set_default("rate_limit.burst_size", 30)?
            .set_default("cors.allowed_origins", vec!["http://localhost:3000"])?
            .set_default("bus.url", "nats://localhost:4222")?
            .set_default("bus.stream_prefix", "app")?
            .set_default("bus.events_retention_hours", 24)?
            .set_default("bus.federation_retention_days", 7)?
            .set_default("gateway.heartbeat_interval_ms", GatewaySettings::DEFAULT_HEARTBEAT_INTERVAL_MS)?
            .set_default("gateway.heartbeat_timeout_ms", 10_000_u64)?
            .set_default("gateway.identify_timeout_ms", 10_000_u64)?
            .set_default("gateway.replay_buffer_size", 100)?
            .set_default("push.subscription_max_age_days", 60)?
            .set_default("push.notification_retention_days", 90)?
            // Load from config files
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Load from environment variables
            // APP__SERVER__PORT=3000 -> server.port = 3000
            .add_source(
                Environment::default()
                    .prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            // Map simple environment variables
            .set_override_option(
                "server.host",
                std::env::var("SERVER_HOST").ok(),
            )?
            .set_override_option(
                "server.port",
                std::env::var("SERVER_PORT").ok(),
            )?
            .set_override_option(
                "database.url",
                std::env::var("DATABASE_URL").ok(),
            )?
            .set_override_option(
                "redis.url",
                std::env::var("REDIS_URL").ok(),
            )?
            .set_override_option(
                "jwt.secret",
                std::env::var("JWT_SECRET").ok(),
            )?
            .set_override_option(
                "snowflake.machine_id",
                std::env::var("SNOWFLAKE_MACHINE_ID").ok(),
            )?
            .set_override_option("bus.url", std::env::var("NATS_URL").ok())?
            .set_override_option(
                "push.vapid_public_key",
                std::env::var("VAPID_PUBLIC_KEY").ok(),
            )?
            .set_override_option(
                "push.vapid_private_key",
                std::env::var("VAPID_PRIVATE_KEY").ok(),
            )?
            .set_override_option(
                "push.vapid_contact_email",
                std::env::var("VAPID_CONTACT_EMAIL").ok(),
            )?
            .build()?
            .try_deserialize()
    }

    /// Get the full server address as a string.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl ServerSettings {
    /// Get the socket address for binding.
    pub fn socket_addr(&self) -> std::net::SocketAddr {
        format!("{}:{}", self.host, self.port)
            .parse()
            .expect("Invalid server address configuration")
    }
}

impl DatabaseSettings {
    /// Get the connection URL.
    pub fn connection_url(&self) -> &str {
        &self.url
    }
}
