use axum::{
    extract::{multipart::Field, DefaultBodyLimit, FromRef, Multipart, State},
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::auth::cookies::{self, REFRESH_COOKIE};
use crate::auth::dto::{ChangePasswordRequest, LoginPayload, LoginRequest, RefreshRequest, TokenPair};
use crate::auth::extractors::AuthUser;
use crate::auth::jwt::JwtKeys;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::sessions;
use crate::error::{ApiError, ApiResult};
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::storage::store_image;
use crate::users::dto::PublicUser;
use crate::users::repo_types::User;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/users/register", post(register))
        .route("/users/login", post(login))
        .route("/users/logout", post(logout))
        .route("/users/refresh-token", post(refresh))
        .route("/users/change-password", post(change_password))
        .layer(DefaultBodyLimit::max(8 * 1024 * 1024))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Pull the bytes and declared content type out of a file field.
pub(crate) async fn read_image_field(field: Field<'_>) -> ApiResult<(Bytes, String)> {
    let content_type = field
        .content_type()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "application/octet-stream".into());
    let bytes = field
        .bytes()
        .await
        .map_err(|e| ApiError::Validation(format!("unreadable upload: {e}")))?;
    Ok((bytes, content_type))
}

fn bad_part(e: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::Validation(format!("malformed multipart field: {e}"))
}

#[instrument(skip(state, multipart))]
pub async fn register(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<ApiResponse<PublicUser>, ApiError> {
    let mut full_name = String::new();
    let mut username = String::new();
    let mut email = String::new();
    let mut password = String::new();
    let mut avatar: Option<(Bytes, String)> = None;
    let mut cover: Option<(Bytes, String)> = None;

    while let Ok(Some(field)) = multipart.next_field().await {
        let Some(name) = field.name().map(|s| s.to_string()) else {
            continue;
        };
        match name.as_str() {
            "full_name" => full_name = field.text().await.map_err(bad_part)?,
            "username" => username = field.text().await.map_err(bad_part)?,
            "email" => email = field.text().await.map_err(bad_part)?,
            "password" => password = field.text().await.map_err(bad_part)?,
            "avatar" => avatar = Some(read_image_field(field).await?),
            "cover_image" => cover = Some(read_image_field(field).await?),
            _ => {}
        }
    }

    let full_name = full_name.trim().to_string();
    let username = username.trim().to_lowercase();
    let email = email.trim().to_lowercase();

    if full_name.is_empty() || username.is_empty() || email.is_empty() || password.is_empty() {
        warn!("registration with missing fields");
        return Err(ApiError::Validation("all fields are required".into()));
    }
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(ApiError::Validation("invalid email".into()));
    }
    let Some((avatar_bytes, avatar_type)) = avatar else {
        warn!(username = %username, "registration without avatar");
        return Err(ApiError::Validation("avatar image is required".into()));
    };

    if User::username_or_email_taken(&state.db, &username, &email).await? {
        warn!(username = %username, email = %email, "user already exists");
        return Err(ApiError::Conflict(
            "user with this username or email already exists".into(),
        ));
    }

    let avatar_url = store_image(state.storage.as_ref(), "avatars", avatar_bytes, &avatar_type).await?;
    let cover_url = match cover {
        Some((bytes, content_type)) => {
            Some(store_image(state.storage.as_ref(), "covers", bytes, &content_type).await?)
        }
        None => None,
    };

    let hash = hash_password(&password)?;
    let user = User::create(
        &state.db,
        &full_name,
        &username,
        &email,
        &hash,
        &avatar_url,
        cover_url.as_deref(),
    )
    .await?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(ApiResponse::created(
        PublicUser::from(user),
        "user registered",
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<(HeaderMap, ApiResponse<LoginPayload>), ApiError> {
    payload.email = payload
        .email
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty());
    payload.username = payload
        .username
        .map(|u| u.trim().to_lowercase())
        .filter(|u| !u.is_empty());

    if payload.email.is_none() && payload.username.is_none() {
        return Err(ApiError::Validation("username or email is required".into()));
    }
    if payload.password.is_empty() {
        return Err(ApiError::Validation("password is required".into()));
    }

    let user = User::find_by_login(
        &state.db,
        payload.email.as_deref(),
        payload.username.as_deref(),
    )
    .await?
    .ok_or_else(|| {
        warn!("login for unknown user");
        ApiError::NotFound("user does not exist".into())
    })?;

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login with invalid password");
        return Err(ApiError::Unauthorized("invalid user credentials".into()));
    }

    let keys = JwtKeys::from_ref(&state);
    let pair = sessions::issue_token_pair(&state, &keys, user.id).await?;
    let headers = cookies::set_auth_cookies(&keys, &pair.access_token, &pair.refresh_token);

    info!(user_id = %user.id, username = %user.username, "user logged in");
    let payload = LoginPayload {
        user: PublicUser::from(user),
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    };
    Ok((headers, ApiResponse::ok(payload, "user logged in")))
}

#[instrument(skip(state, user))]
pub async fn logout(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<(HeaderMap, ApiResponse<serde_json::Value>), ApiError> {
    sessions::revoke_session(&state, user.id).await?;
    info!(user_id = %user.id, "user logged out");
    Ok((
        cookies::clear_auth_cookies(),
        ApiResponse::ok(serde_json::json!({}), "user logged out"),
    ))
}

#[instrument(skip(state, headers, body))]
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<RefreshRequest>>,
) -> Result<(HeaderMap, ApiResponse<TokenPair>), ApiError> {
    let presented = cookies::cookie_value(&headers, REFRESH_COOKIE)
        .or_else(|| body.and_then(|Json(b)| b.refresh_token))
        .ok_or_else(|| ApiError::Unauthorized("refresh token is missing".into()))?;

    let keys = JwtKeys::from_ref(&state);
    let pair = sessions::rotate_tokens(&state, &keys, &presented).await?;
    let set = cookies::set_auth_cookies(&keys, &pair.access_token, &pair.refresh_token);

    Ok((set, ApiResponse::ok(pair, "access token refreshed")))
}

#[instrument(skip(state, user, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    if payload.old_password.is_empty() || payload.new_password.is_empty() {
        return Err(ApiError::Validation(
            "old and new password are required".into(),
        ));
    }

    let record = User::find_by_id(&state.db, user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("user does not exist".into()))?;

    if !verify_password(&payload.old_password, &record.password_hash)? {
        warn!(user_id = %user.id, "password change with wrong current password");
        return Err(ApiError::Unauthorized("invalid current password".into()));
    }

    let hash = hash_password(&payload.new_password)?;
    User::update_password(&state.db, user.id, &hash).await?;

    // Tokens issued before the change stay valid until they expire.
    info!(user_id = %user.id, "password changed");
    Ok(ApiResponse::ok(serde_json::json!({}), "password changed"))
}
