use axum::{
    extract::{Path, State},
    routing::post,
    Router,
};
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::extractors::AuthUser;
use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::subscriptions::repo;
use crate::users::repo_types::User;

pub fn subscription_routes() -> Router<AppState> {
    Router::new().route("/subscriptions/c/:channel_id", post(toggle_subscription))
}

#[derive(Debug, Serialize)]
pub struct SubscriptionStatus {
    pub subscribed: bool,
}

#[instrument(skip(state, viewer))]
pub async fn toggle_subscription(
    State(state): State<AppState>,
    AuthUser(viewer): AuthUser,
    Path(channel_id): Path<Uuid>,
) -> Result<ApiResponse<SubscriptionStatus>, ApiError> {
    if viewer.id == channel_id {
        return Err(ApiError::Validation(
            "cannot subscribe to your own channel".into(),
        ));
    }

    let channel = User::find_public_by_id(&state.db, channel_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("channel does not exist".into()))?;

    let subscribed = repo::toggle(&state.db, viewer.id, channel.id).await?;

    info!(
        viewer_id = %viewer.id,
        channel_id = %channel.id,
        subscribed,
        "subscription toggled"
    );
    Ok(ApiResponse::ok(
        SubscriptionStatus { subscribed },
        "subscription toggled",
    ))
}
