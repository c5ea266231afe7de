use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    routing::{get, patch},
    Json, Router,
};
use bytes::Bytes;
use tracing::{info, instrument, warn};

use crate::auth::extractors::AuthUser;
use crate::auth::handlers::is_valid_email;
use crate::error::{ApiError, ApiResult};
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::storage::store_image;
use crate::subscriptions;
use crate::users::dto::{ChannelProfile, PublicUser, UpdateAccountRequest};
use crate::users::repo_types::User;

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/users/current-user", get(current_user))
        .route("/users/update-account", patch(update_account))
        .route("/users/avatar", patch(update_avatar))
        .route("/users/cover-image", patch(update_cover_image))
        .route("/users/c/:username", get(channel_profile))
        .layer(DefaultBodyLimit::max(8 * 1024 * 1024))
}

/// First field with the given name, as bytes plus declared content type.
async fn image_field(multipart: &mut Multipart, name: &str) -> ApiResult<Option<(Bytes, String)>> {
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() != Some(name) {
            continue;
        }
        return crate::auth::handlers::read_image_field(field).await.map(Some);
    }
    Ok(None)
}

#[instrument(skip(user))]
pub async fn current_user(AuthUser(user): AuthUser) -> ApiResponse<PublicUser> {
    ApiResponse::ok(user, "current user fetched")
}

#[instrument(skip(state, user, payload))]
pub async fn update_account(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(payload): Json<UpdateAccountRequest>,
) -> Result<ApiResponse<PublicUser>, ApiError> {
    let full_name = payload.full_name.trim().to_string();
    let email = payload.email.trim().to_lowercase();

    if full_name.is_empty() || email.is_empty() {
        return Err(ApiError::Validation(
            "full name and email are required".into(),
        ));
    }
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(ApiError::Validation("invalid email".into()));
    }

    let updated = User::update_account(&state.db, user.id, &full_name, &email).await?;
    info!(user_id = %user.id, "account details updated");
    Ok(ApiResponse::ok(
        PublicUser::from(updated),
        "account details updated",
    ))
}

#[instrument(skip(state, user, multipart))]
pub async fn update_avatar(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    mut multipart: Multipart,
) -> Result<ApiResponse<PublicUser>, ApiError> {
    let (bytes, content_type) = image_field(&mut multipart, "avatar")
        .await?
        .ok_or_else(|| ApiError::Validation("avatar image is required".into()))?;

    let avatar_url = store_image(state.storage.as_ref(), "avatars", bytes, &content_type).await?;
    let updated = User::update_avatar_url(&state.db, user.id, &avatar_url).await?;

    // Best effort, the new URL is already persisted.
    if let Err(e) = state.storage.delete_by_url(&user.avatar_url).await {
        warn!(error = %e, user_id = %user.id, "failed to delete replaced avatar");
    }

    info!(user_id = %user.id, "avatar updated");
    Ok(ApiResponse::ok(PublicUser::from(updated), "avatar updated"))
}

#[instrument(skip(state, user, multipart))]
pub async fn update_cover_image(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    mut multipart: Multipart,
) -> Result<ApiResponse<PublicUser>, ApiError> {
    let (bytes, content_type) = image_field(&mut multipart, "cover_image")
        .await?
        .ok_or_else(|| ApiError::Validation("cover image is required".into()))?;

    let cover_url = store_image(state.storage.as_ref(), "covers", bytes, &content_type).await?;
    let updated = User::update_cover_url(&state.db, user.id, &cover_url).await?;

    if let Some(old) = user.cover_url.as_deref() {
        if let Err(e) = state.storage.delete_by_url(old).await {
            warn!(error = %e, user_id = %user.id, "failed to delete replaced cover image");
        }
    }

    info!(user_id = %user.id, "cover image updated");
    Ok(ApiResponse::ok(
        PublicUser::from(updated),
        "cover image updated",
    ))
}

#[instrument(skip(state, viewer))]
pub async fn channel_profile(
    State(state): State<AppState>,
    AuthUser(viewer): AuthUser,
    Path(username): Path<String>,
) -> Result<ApiResponse<ChannelProfile>, ApiError> {
    let username = username.trim().to_lowercase();
    if username.is_empty() {
        return Err(ApiError::Validation("username is required".into()));
    }

    let channel = User::find_by_username(&state.db, &username)
        .await?
        .ok_or_else(|| ApiError::NotFound("channel does not exist".into()))?;

    let stats = subscriptions::repo::channel_stats(&state.db, channel.id, viewer.id).await?;

    Ok(ApiResponse::ok(
        ChannelProfile {
            id: channel.id,
            username: channel.username,
            email: channel.email,
            full_name: channel.full_name,
            avatar_url: channel.avatar_url,
            cover_url: channel.cover_url,
            subscribers_count: stats.subscribers_count,
            channels_subscribed_to_count: stats.channels_subscribed_to_count,
            is_subscribed: stats.is_subscribed,
        },
        "channel profile fetched",
    ))
}
