use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::dto::TokenPair;
use crate::auth::jwt::{JwtKeys, TokenKind};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::users::repo_types::User;

/// Sign a fresh access/refresh pair and persist the refresh half on the
/// user row, displacing whatever token was stored there. Each user has at
/// most one live refresh token.
pub async fn issue_token_pair(
    state: &AppState,
    keys: &JwtKeys,
    user_id: Uuid,
) -> ApiResult<TokenPair> {
    let access_token = keys.sign_access(user_id)?;
    let refresh_token = keys.sign_refresh(user_id)?;
    User::set_refresh_token(&state.db, user_id, Some(&refresh_token)).await?;
    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

/// A presented refresh token is only good while it exactly matches the
/// persisted one. A rotated-away or revoked token fails here, which is
/// how replay of an old token surfaces.
fn rotation_guard(presented: &str, persisted: Option<&str>) -> ApiResult<()> {
    match persisted {
        Some(current) if current == presented => Ok(()),
        _ => Err(ApiError::Unauthorized(
            "refresh token expired or reused".into(),
        )),
    }
}

/// Exchange a refresh token for a new pair. The token must carry a valid
/// refresh signature, name an existing user, and match the persisted
/// token; the new refresh token then replaces the old one.
pub async fn rotate_tokens(
    state: &AppState,
    keys: &JwtKeys,
    presented: &str,
) -> ApiResult<TokenPair> {
    let claims = keys.verify(presented, TokenKind::Refresh).map_err(|e| {
        warn!(error = %e, "refresh token failed verification");
        ApiError::Unauthorized("invalid refresh token".into())
    })?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("invalid refresh token".into()))?;

    rotation_guard(presented, user.refresh_token.as_deref())?;

    let pair = issue_token_pair(state, keys, user.id).await?;
    info!(user_id = %user.id, "refresh token rotated");
    Ok(pair)
}

/// Drop the persisted refresh token. Outstanding refresh tokens stop
/// working at once; the access token runs out on its own ttl.
pub async fn revoke_session(state: &AppState, user_id: Uuid) -> ApiResult<()> {
    User::set_refresh_token(&state.db, user_id, None).await?;
    info!(user_id = %user_id, "session revoked");
    Ok(())
}
