//! Repository for the `cases` table.

use aval_core::case::ArtifactKind;
use aval_core::types::DbId;
use sqlx::{PgConnection, PgExecutor};

use crate::models::case::CaseRow;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, event_id, state, comment, call_url, dtm_url, pda_url, \
    consolidated_url, created_at, updated_at";

pub struct CaseRepo;

impl CaseRepo {
    /// Insert a DRAFT case for an event.
    pub async fn create(
        conn: &mut PgConnection,
        event_id: DbId,
        call_url: &str,
    ) -> Result<CaseRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO cases (event_id, state, call_url)
             VALUES ($1, 'DRAFT', $2)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CaseRow>(&query)
            .bind(event_id)
            .bind(call_url)
            .fetch_one(conn)
            .await
    }

    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
    ) -> Result<Option<CaseRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM cases WHERE id = $1");
        sqlx::query_as::<_, CaseRow>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_by_event<'e, E: PgExecutor<'e>>(
        executor: E,
        event_id: DbId,
    ) -> Result<Option<CaseRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM cases WHERE event_id = $1");
        sqlx::query_as::<_, CaseRow>(&query)
            .bind(event_id)
            .fetch_optional(executor)
            .await
    }

    /// Find and row-lock a case for the rest of the transaction.
    pub async fn find_for_update(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<CaseRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM cases WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, CaseRow>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Write a new state; `comment` overwrites the stored comment when `Some`.
    pub async fn update_state(
        conn: &mut PgConnection,
        id: DbId,
        state: &str,
        comment: Option<&str>,
    ) -> Result<CaseRow, sqlx::Error> {
        let query = format!(
            "UPDATE cases SET
                state = $2,
                comment = COALESCE($3, comment),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CaseRow>(&query)
            .bind(id)
            .bind(state)
            .bind(comment)
            .fetch_one(conn)
            .await
    }

    /// Record an artifact URL. Returns `None` if the case does not exist.
    pub async fn set_artifact_url<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
        kind: ArtifactKind,
        url: &str,
    ) -> Result<Option<CaseRow>, sqlx::Error> {
        let column = match kind {
            ArtifactKind::CallForParticipation => "call_url",
            ArtifactKind::Dtm => "dtm_url",
            ArtifactKind::Pda => "pda_url",
            ArtifactKind::Consolidated => "consolidated_url",
        };
        let query = format!(
            "UPDATE cases SET {column} = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CaseRow>(&query)
            .bind(id)
            .bind(url)
            .fetch_optional(executor)
            .await
    }
}
