use sqlx::PgPool;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::users::dto::PublicUser;
use crate::users::repo_types::User;

impl User {
    /// Find a user by id.
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> ApiResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, full_name, avatar_url, cover_url,
                   password_hash, refresh_token, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Find a user by username.
    pub async fn find_by_username(db: &PgPool, username: &str) -> ApiResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, full_name, avatar_url, cover_url,
                   password_hash, refresh_token, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Find a user by email or username, whichever is given. Callers pass
    /// at least one of the two.
    pub async fn find_by_login(
        db: &PgPool,
        email: Option<&str>,
        username: Option<&str>,
    ) -> ApiResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, full_name, avatar_url, cover_url,
                   password_hash, refresh_token, created_at
            FROM users
            WHERE ($1::text IS NOT NULL AND email = $1)
               OR ($2::text IS NOT NULL AND username = $2)
            "#,
        )
        .bind(email)
        .bind(username)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Whether a user with this username or email already exists.
    pub async fn username_or_email_taken(
        db: &PgPool,
        username: &str,
        email: &str,
    ) -> ApiResult<bool> {
        let taken = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(SELECT 1 FROM users WHERE username = $1 OR email = $2)
            "#,
        )
        .bind(username)
        .bind(email)
        .fetch_one(db)
        .await?;
        Ok(taken)
    }

    /// Create a new user with hashed password and stored media URLs.
    pub async fn create(
        db: &PgPool,
        full_name: &str,
        username: &str,
        email: &str,
        password_hash: &str,
        avatar_url: &str,
        cover_url: Option<&str>,
    ) -> ApiResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (full_name, username, email, password_hash, avatar_url, cover_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, username, email, full_name, avatar_url, cover_url,
                      password_hash, refresh_token, created_at
            "#,
        )
        .bind(full_name)
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(avatar_url)
        .bind(cover_url)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Persist (or clear, with `None`) the user's refresh token.
    pub async fn set_refresh_token(
        db: &PgPool,
        id: Uuid,
        refresh_token: Option<&str>,
    ) -> ApiResult<()> {
        sqlx::query(
            r#"
            UPDATE users SET refresh_token = $2 WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(refresh_token)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Replace the user's password hash.
    pub async fn update_password(db: &PgPool, id: Uuid, password_hash: &str) -> ApiResult<()> {
        sqlx::query(
            r#"
            UPDATE users SET password_hash = $2 WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Update full name and email.
    pub async fn update_account(
        db: &PgPool,
        id: Uuid,
        full_name: &str,
        email: &str,
    ) -> ApiResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET full_name = $2, email = $3
            WHERE id = $1
            RETURNING id, username, email, full_name, avatar_url, cover_url,
                      password_hash, refresh_token, created_at
            "#,
        )
        .bind(id)
        .bind(full_name)
        .bind(email)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Point the avatar at a freshly stored object.
    pub async fn update_avatar_url(db: &PgPool, id: Uuid, avatar_url: &str) -> ApiResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET avatar_url = $2
            WHERE id = $1
            RETURNING id, username, email, full_name, avatar_url, cover_url,
                      password_hash, refresh_token, created_at
            "#,
        )
        .bind(id)
        .bind(avatar_url)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Point the cover image at a freshly stored object.
    pub async fn update_cover_url(db: &PgPool, id: Uuid, cover_url: &str) -> ApiResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET cover_url = $2
            WHERE id = $1
            RETURNING id, username, email, full_name, avatar_url, cover_url,
                      password_hash, refresh_token, created_at
            "#,
        )
        .bind(id)
        .bind(cover_url)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Fetch only the public columns; the row carries no credentials.
    pub async fn find_public_by_id(db: &PgPool, id: Uuid) -> ApiResult<Option<PublicUser>> {
        let user = sqlx::query_as::<_, PublicUser>(
            r#"
            SELECT id, username, email, full_name, avatar_url, cover_url, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }
}
