use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,              // unique, stored lowercase
    pub email: String,                 // unique
    pub full_name: String,
    pub avatar_url: String,
    pub cover_url: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,         // argon2 digest, never exposed in JSON
    #[serde(skip_serializing)]
    pub refresh_token: Option<String>, // the single live refresh token, None when logged out
    pub created_at: OffsetDateTime,
}

#[cfg(test)]
mod user_row_tests {
    use super::*;

    fn sample() -> User {
        User {
            id: Uuid::new_v4(),
            username: "ada".into(),
            email: "ada@x.com".into(),
            full_name: "Ada".into(),
            avatar_url: "https://media.local/streamhub-media/avatars/a.png".into(),
            cover_url: None,
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$abc$def".into(),
            refresh_token: Some("some.jwt.token".into()),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn secrets_never_serialize() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("argon2"));
        assert!(!json.contains("refresh_token"));
        assert!(json.contains("ada@x.com"));
    }
}
