use sqlx::PgPool;
use uuid::Uuid;

use crate::error::ApiResult;

/// Subscription aggregates for one channel, relative to a viewer.
#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct ChannelStats {
    pub subscribers_count: i64,
    pub channels_subscribed_to_count: i64,
    pub is_subscribed: bool,
}

/// Count the channel's subscribers, the channels the channel itself
/// subscribes to, and whether the viewer is among the subscribers.
pub async fn channel_stats(
    db: &PgPool,
    channel_id: Uuid,
    viewer_id: Uuid,
) -> ApiResult<ChannelStats> {
    let stats = sqlx::query_as::<_, ChannelStats>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM subscriptions WHERE channel_id = $1) AS subscribers_count,
            (SELECT COUNT(*) FROM subscriptions WHERE subscriber_id = $1) AS channels_subscribed_to_count,
            EXISTS(
                SELECT 1 FROM subscriptions
                WHERE channel_id = $1 AND subscriber_id = $2
            ) AS is_subscribed
        "#,
    )
    .bind(channel_id)
    .bind(viewer_id)
    .fetch_one(db)
    .await?;
    Ok(stats)
}

/// Subscribe when no subscription exists, drop it otherwise. Returns
/// whether the viewer is subscribed afterwards.
pub async fn toggle(db: &PgPool, subscriber_id: Uuid, channel_id: Uuid) -> ApiResult<bool> {
    let deleted = sqlx::query(
        r#"
        DELETE FROM subscriptions WHERE subscriber_id = $1 AND channel_id = $2
        "#,
    )
    .bind(subscriber_id)
    .bind(channel_id)
    .execute(db)
    .await?
    .rows_affected();

    if deleted > 0 {
        return Ok(false);
    }

    sqlx::query(
        r#"
        INSERT INTO subscriptions (subscriber_id, channel_id) VALUES ($1, $2)
        "#,
    )
    .bind(subscriber_id)
    .bind(channel_id)
    .execute(db)
    .await?;
    Ok(true)
}
