use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::User;

/// The outward-facing slice of a user: everything except credentials and
/// session state.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar_url: String,
    pub cover_url: Option<String>,
    pub created_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            avatar_url: user.avatar_url,
            cover_url: user.cover_url,
            created_at: user.created_at,
        }
    }
}

/// Request body for account-detail updates.
#[derive(Debug, Deserialize)]
pub struct UpdateAccountRequest {
    pub full_name: String,
    pub email: String,
}

/// Channel view of a user with subscription aggregates, relative to the
/// viewer making the request.
#[derive(Debug, Serialize)]
pub struct ChannelProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar_url: String,
    pub cover_url: Option<String>,
    pub subscribers_count: i64,
    pub channels_subscribed_to_count: i64,
    pub is_subscribed: bool,
}
