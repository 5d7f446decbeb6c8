//! Channel Handlers

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::application::dto::request::{CreateChannelRequest, UpdateChannelRequest};
use crate::application::dto::response::ChannelResponse;
use crate::application::services::{
    ChannelDto, ChannelError, ChannelService, ChannelServiceImpl, CreateChannelDto,
    UpdateChannelDto,
};
use crate::infrastructure::bus::subjects;
use crate::infrastructure::repositories::{
    PgChannelRepository, PgMemberRepository, PgServerRepository,
};
use crate::presentation::middleware::AuthUser;
use crate::presentation::websocket::gateway::{ChannelCreateEvent, ChannelDeleteEvent, ChannelUpdateEvent};
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Discord-style numeric channel type, mirroring the gateway's `type` field
/// on `ChannelCreateEvent`. The REST layer stores/returns the string form
/// (`ChannelDto::channel_type`); this only matters at the gateway boundary.
fn channel_type_code(channel_type: &str) -> i32 {
    match channel_type {
        "text" => 0,
        "dm" => 1,
        "voice" => 2,
        "group_dm" => 3,
        "category" => 4,
        _ => 0,
    }
}

/// Create a new channel
pub async fn create_channel(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(guild_id): Path<String>,
    Json(body): Json<CreateChannelRequest>,
) -> Result<(StatusCode, Json<ChannelResponse>), AppError> {
    let guild_id: i64 = guild_id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid guild ID".into()))?;

    // Validate request
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let channel_repo = Arc::new(PgChannelRepository::new(state.db.clone()));
    let server_repo = Arc::new(PgServerRepository::new(state.db.clone()));
    let member_repo = Arc::new(PgMemberRepository::new(state.db.clone()));

    let channel_service = ChannelServiceImpl::new(
        channel_repo,
        server_repo,
        member_repo,
        state.snowflake.clone(),
    );

    let request = CreateChannelDto {
        name: body.name,
        channel_type: body.channel_type,
        topic: body.topic,
        parent_id: body.parent_id.and_then(|s| s.parse().ok()),
        position: body.position,
        nsfw: body.nsfw,
    };

    let channel = channel_service
        .create_channel(guild_id, auth.user_id, request)
        .await
        .map_err(|e| match e {
            ChannelError::GuildNotFound => AppError::NotFound("Guild not found".into()),
            ChannelError::Forbidden => AppError::Forbidden("Permission denied".into()),
            e => AppError::Internal(e.to_string()),
        })?;

    publish_channel_create(&state, guild_id, &channel).await;

    Ok((StatusCode::CREATED, Json(ChannelResponse::from(channel))))
}

/// Get channel by ID
pub async fn get_channel(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
) -> Result<Json<ChannelResponse>, AppError> {
    let channel_id: i64 = channel_id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid channel ID".into()))?;

    let channel_repo = Arc::new(PgChannelRepository::new(state.db.clone()));
    let server_repo = Arc::new(PgServerRepository::new(state.db.clone()));
    let member_repo = Arc::new(PgMemberRepository::new(state.db.clone()));

    let channel_service = ChannelServiceImpl::new(
        channel_repo,
        server_repo,
        member_repo,
        state.snowflake.clone(),
    );

    let channel = channel_service
        .get_channel(channel_id)
        .await
        .map_err(|e| match e {
            ChannelError::NotFound => AppError::NotFound("Channel not found".into()),
            e => AppError::Internal(e.to_string()),
        })?;

    Ok(Json(ChannelResponse::from(channel)))
}

/// Update channel
pub async fn update_channel(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(channel_id): Path<String>,
    Json(body): Json<UpdateChannelRequest>,
) -> Result<Json<ChannelResponse>, AppError> {
    let channel_id: i64 = channel_id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid channel ID".into()))?;

    // Validate request
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let channel_repo = Arc::new(PgChannelRepository::new(state.db.clone()));
    let server_repo = Arc::new(PgServerRepository::new(state.db.clone()));
    let member_repo = Arc::new(PgMemberRepository::new(state.db.clone()));

    let channel_service = ChannelServiceImpl::new(
        channel_repo,
        server_repo,
        member_repo,
        state.snowflake.clone(),
    );

    let update = UpdateChannelDto {
        name: body.name,
        topic: body.topic,
        position: body.position,
        parent_id: body.parent_id.map(|opt| opt.and_then(|s| s.parse().ok())),
        nsfw: body.nsfw,
        rate_limit_per_user: body.rate_limit_per_user,
    };

    let channel = channel_service
        .update_channel(channel_id, auth.user_id, update)
        .await
        .map_err(|e| match e {
            ChannelError::NotFound => AppError::NotFound("Channel not found".into()),
            ChannelError::Forbidden => AppError::Forbidden("Permission denied".into()),
            e => AppError::Internal(e.to_string()),
        })?;

    publish_channel_update(&state, &channel).await;

    Ok(Json(ChannelResponse::from(channel)))
}

/// Delete channel
pub async fn delete_channel(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(channel_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let channel_id: i64 = channel_id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid channel ID".into()))?;

    let channel_repo = Arc::new(PgChannelRepository::new(state.db.clone()));
    let server_repo = Arc::new(PgServerRepository::new(state.db.clone()));
    let member_repo = Arc::new(PgMemberRepository::new(state.db.clone()));

    let channel_service = ChannelServiceImpl::new(
        channel_repo,
        server_repo,
        member_repo,
        state.snowflake.clone(),
    );

    // Looked up before the delete call: once it succeeds the row is gone,
    // and GUILD_CHANNEL_DELETE still needs to tell clients which guild it
    // belonged to.
    let guild_id = channel_service
        .get_channel(channel_id)
        .await
        .ok()
        .and_then(|c| c.guild_id)
        .and_then(|g| g.parse::<i64>().ok());

    channel_service
        .delete_channel(channel_id, auth.user_id)
        .await
        .map_err(|e| match e {
            ChannelError::NotFound => AppError::NotFound("Channel not found".into()),
            ChannelError::Forbidden => AppError::Forbidden("Permission denied".into()),
            e => AppError::Internal(e.to_string()),
        })?;

    publish_channel_delete(&state, channel_id, guild_id).await;

    Ok(StatusCode::NO_CONTENT)
}

/// Publish `CHANNEL_CREATE` to the event bus. Failure here never fails the
/// request: the channel row is already committed.
async fn publish_channel_create(state: &AppState, guild_id: i64, channel: &ChannelDto) {
    let event = ChannelCreateEvent {
        id: channel.id.clone(),
        guild_id: Some(guild_id),
        name: channel.name.clone(),
        channel_type: channel_type_code(&channel.channel_type),
        position: channel.position,
    };

    let Ok(data) = serde_json::to_value(&event) else {
        return;
    };

    let result = state
        .bus
        .publish_channel_event(
            subjects::CHANNEL_CREATE,
            "CHANNEL_CREATE",
            Some(guild_id),
            channel.id.parse().unwrap_or_default(),
            data,
        )
        .await;

    if let Err(e) = result {
        tracing::warn!("failed to publish CHANNEL_CREATE: {e}");
    }
}

/// Publish `CHANNEL_UPDATE` to the event bus.
async fn publish_channel_update(state: &AppState, channel: &ChannelDto) {
    let guild_id = channel.guild_id.as_deref().and_then(|g| g.parse::<i64>().ok());

    let event = ChannelUpdateEvent {
        id: channel.id.clone(),
        guild_id,
        name: Some(channel.name.clone()),
        topic: channel.topic.clone(),
    };

    let Ok(data) = serde_json::to_value(&event) else {
        return;
    };

    let result = state
        .bus
        .publish_channel_event(
            subjects::CHANNEL_UPDATE,
            "CHANNEL_UPDATE",
            guild_id,
            channel.id.parse().unwrap_or_default(),
            data,
        )
        .await;

    if let Err(e) = result {
        tracing::warn!("failed to publish CHANNEL_UPDATE: {e}");
    }
}

/// Publish `CHANNEL_DELETE` to the event bus, once the delete has already
/// succeeded.
async fn publish_channel_delete(state: &AppState, channel_id: i64, guild_id: Option<i64>) {
    let event = ChannelDeleteEvent {
        id: channel_id.to_string(),
        guild_id,
    };

    let Ok(data) = serde_json::to_value(&event) else {
        return;
    };

    let result = state
        .bus
        .publish_channel_event(
            subjects::CHANNEL_DELETE,
            "CHANNEL_DELETE",
            guild_id,
            channel_id,
            data,
        )
        .await;

    if let Err(e) = result {
        tracing::warn!("failed to publish CHANNEL_DELETE: {e}");
    }
}
