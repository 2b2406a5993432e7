//! Audit entry rows. No `updated_at`: entries are immutable.

use aval_core::audit::AuditEntry;
use aval_core::error::CoreError;
use aval_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `case_history` table.
#[derive(Debug, Clone, FromRow)]
pub struct HistoryRow {
    pub id: DbId,
    pub case_id: DbId,
    pub state: String,
    pub stage: String,
    pub comment: Option<String>,
    pub user_id: Option<DbId>,
    pub created_at: Timestamp,
}

impl TryFrom<HistoryRow> for AuditEntry {
    type Error = CoreError;

    fn try_from(row: HistoryRow) -> Result<Self, Self::Error> {
        Ok(AuditEntry {
            id: row.id,
            case_id: row.case_id,
            state: row.state.parse()?,
            stage: row.stage.parse()?,
            comment: row.comment,
            user_id: row.user_id,
            created_at: row.created_at,
        })
    }
}
