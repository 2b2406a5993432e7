//! Repository for the `device_tokens` table.

use aval_core::store::Audience;
use aval_core::types::DbId;
use sqlx::PgExecutor;

use crate::models::device_token::DeviceToken;

pub struct DeviceTokenRepo;

impl DeviceTokenRepo {
    /// Register a token, moving it to `user_id`/`audience` if already known.
    pub async fn register<'e, E: PgExecutor<'e>>(
        executor: E,
        user_id: DbId,
        audience: Audience,
        token: &str,
    ) -> Result<DeviceToken, sqlx::Error> {
        sqlx::query_as::<_, DeviceToken>(
            "INSERT INTO device_tokens (user_id, audience, token)
             VALUES ($1, $2, $3)
             ON CONFLICT (token) DO UPDATE SET user_id = EXCLUDED.user_id, audience = EXCLUDED.audience
             RETURNING id, user_id, audience, token, created_at",
        )
        .bind(user_id)
        .bind(audience.as_str())
        .bind(token)
        .fetch_one(executor)
        .await
    }

    pub async fn list_tokens<'e, E: PgExecutor<'e>>(
        executor: E,
        audience: Audience,
    ) -> Result<Vec<String>, sqlx::Error> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT token FROM device_tokens WHERE audience = $1 ORDER BY id")
                .bind(audience.as_str())
                .fetch_all(executor)
                .await?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }
}
