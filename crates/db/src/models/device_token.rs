//! Push notification device tokens.

use aval_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `device_tokens` table.
#[derive(Debug, Clone, FromRow)]
pub struct DeviceToken {
    pub id: DbId,
    pub user_id: DbId,
    pub audience: String,
    pub token: String,
    pub created_at: Timestamp,
}
