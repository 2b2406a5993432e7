//! Repository for the `events` table.

use aval_core::event::NewEvent;
use aval_core::types::DbId;
use sqlx::{PgConnection, PgExecutor};

use crate::models::event::EventRow;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, code, name, place, discipline_id, category_id, starts_on, ends_on, \
    coaches_male, coaches_female, athletes_male, athletes_female, state, deleted_at, \
    created_at, updated_at";

pub struct EventRepo;

impl EventRepo {
    /// Register a new event in AVAILABLE state.
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        input: &NewEvent,
    ) -> Result<EventRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO events
                (code, name, place, discipline_id, category_id, starts_on, ends_on,
                 coaches_male, coaches_female, athletes_male, athletes_female)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, EventRow>(&query)
            .bind(&input.code)
            .bind(&input.name)
            .bind(&input.place)
            .bind(input.discipline_id)
            .bind(input.category_id)
            .bind(input.starts_on)
            .bind(input.ends_on)
            .bind(input.coaches_male)
            .bind(input.coaches_female)
            .bind(input.athletes_male)
            .bind(input.athletes_female)
            .fetch_one(executor)
            .await
    }

    /// Find an event by ID, soft-deleted rows included (callers decide).
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
    ) -> Result<Option<EventRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM events WHERE id = $1");
        sqlx::query_as::<_, EventRow>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Find and row-lock an event for the rest of the transaction.
    pub async fn find_for_update(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<EventRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM events WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, EventRow>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Write the mirrored state. Only called alongside a case update.
    pub async fn set_state(
        conn: &mut PgConnection,
        id: DbId,
        state: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE events SET state = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(state)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
