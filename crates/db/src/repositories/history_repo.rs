//! Repository for the append-only `case_history` table.
//!
//! There is deliberately no update or delete here; the table also carries a
//! trigger that rejects both.

use aval_core::audit::NewAuditEntry;
use aval_core::types::DbId;
use sqlx::{PgConnection, PgExecutor};

use crate::models::history::HistoryRow;

const COLUMNS: &str = "id, case_id, state, stage, comment, user_id, created_at";

pub struct HistoryRepo;

impl HistoryRepo {
    /// Append an entry inside the transition's transaction.
    pub async fn append(
        conn: &mut PgConnection,
        case_id: DbId,
        entry: &NewAuditEntry,
    ) -> Result<HistoryRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO case_history (case_id, state, stage, comment, user_id)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, HistoryRow>(&query)
            .bind(case_id)
            .bind(entry.state.as_str())
            .bind(entry.stage.as_str())
            .bind(&entry.comment)
            .bind(entry.user_id)
            .fetch_one(conn)
            .await
    }

    /// Entries of a case, newest first.
    pub async fn list_for_case<'e, E: PgExecutor<'e>>(
        executor: E,
        case_id: DbId,
    ) -> Result<Vec<HistoryRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM case_history
             WHERE case_id = $1
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, HistoryRow>(&query)
            .bind(case_id)
            .fetch_all(executor)
            .await
    }
}
