//! Repository for technical requests and their sub-entity tables.
//!
//! A request is stored as one `technical_requests` row plus ordered rows in
//! `request_objectives`, `request_criteria`, `request_line_items` and
//! `request_roster`. Soft-deleted requests stay readable for audit.

use aval_core::request::NewTechnicalRequest;
use aval_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::request::{
    LineItemRow, RequestChildren, RosterRow, TechnicalRequestRow, TextItemRow,
};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, case_id, transport_mode, departure_on, return_on, transport_notes, \
    athletes_male, athletes_female, coaches_male, coaches_female, budget_total_cents, \
    deleted_at, created_at";

pub struct RequestRepo;

impl RequestRepo {
    /// Whether the case has a request that is not soft-deleted.
    pub async fn has_active(conn: &mut PgConnection, case_id: DbId) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS(
                SELECT 1 FROM technical_requests WHERE case_id = $1 AND deleted_at IS NULL
             )",
        )
        .bind(case_id)
        .fetch_one(conn)
        .await
    }

    /// Insert a request with all its sub-entities. `budget_total_cents` is
    /// the checked sum from [`NewTechnicalRequest::budget_total_cents`].
    ///
    /// Must run inside the submission transaction; a concurrent active
    /// request surfaces as a violation of `uq_technical_requests_active_case`.
    pub async fn create(
        conn: &mut PgConnection,
        case_id: DbId,
        input: &NewTechnicalRequest,
        budget_total_cents: i64,
    ) -> Result<TechnicalRequestRow, sqlx::Error> {
        let counts = input.headcounts();
        let query = format!(
            "INSERT INTO technical_requests
                (case_id, transport_mode, departure_on, return_on, transport_notes,
                 athletes_male, athletes_female, coaches_male, coaches_female, budget_total_cents)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, TechnicalRequestRow>(&query)
            .bind(case_id)
            .bind(&input.transport.mode)
            .bind(input.transport.departure_on)
            .bind(input.transport.return_on)
            .bind(&input.transport.notes)
            .bind(counts.athletes_male)
            .bind(counts.athletes_female)
            .bind(counts.coaches_male)
            .bind(counts.coaches_female)
            .bind(budget_total_cents)
            .fetch_one(&mut *conn)
            .await?;

        for (position, text) in input.objectives.iter().enumerate() {
            sqlx::query(
                "INSERT INTO request_objectives (request_id, position, description) VALUES ($1, $2, $3)",
            )
            .bind(row.id)
            .bind(position as i32)
            .bind(text)
            .execute(&mut *conn)
            .await?;
        }
        for (position, text) in input.selection_criteria.iter().enumerate() {
            sqlx::query(
                "INSERT INTO request_criteria (request_id, position, description) VALUES ($1, $2, $3)",
            )
            .bind(row.id)
            .bind(position as i32)
            .bind(text)
            .execute(&mut *conn)
            .await?;
        }
        for (position, item) in input.line_items.iter().enumerate() {
            sqlx::query(
                "INSERT INTO request_line_items
                    (request_id, position, description, quantity, unit_amount_cents)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(row.id)
            .bind(position as i32)
            .bind(&item.description)
            .bind(item.quantity)
            .bind(item.unit_amount_cents)
            .execute(&mut *conn)
            .await?;
        }
        for (position, member) in input.roster.iter().enumerate() {
            sqlx::query(
                "INSERT INTO request_roster
                    (request_id, position, person_id, full_name, role, sex)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(row.id)
            .bind(position as i32)
            .bind(member.person_id)
            .bind(&member.full_name)
            .bind(member.role.as_str())
            .bind(member.sex.as_str())
            .execute(&mut *conn)
            .await?;
        }

        Ok(row)
    }

    /// Soft-delete the active request of a case, if there is one.
    pub async fn soft_delete_active(
        conn: &mut PgConnection,
        case_id: DbId,
    ) -> Result<Option<TechnicalRequestRow>, sqlx::Error> {
        let query = format!(
            "UPDATE technical_requests SET deleted_at = NOW()
             WHERE case_id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TechnicalRequestRow>(&query)
            .bind(case_id)
            .fetch_optional(conn)
            .await
    }

    /// Load the ordered sub-entity rows of one request.
    pub async fn load_children(
        conn: &mut PgConnection,
        request_id: DbId,
    ) -> Result<RequestChildren, sqlx::Error> {
        let objectives = sqlx::query_as::<_, TextItemRow>(
            "SELECT request_id, position, description FROM request_objectives
             WHERE request_id = $1 ORDER BY position",
        )
        .bind(request_id)
        .fetch_all(&mut *conn)
        .await?;
        let criteria = sqlx::query_as::<_, TextItemRow>(
            "SELECT request_id, position, description FROM request_criteria
             WHERE request_id = $1 ORDER BY position",
        )
        .bind(request_id)
        .fetch_all(&mut *conn)
        .await?;
        let line_items = sqlx::query_as::<_, LineItemRow>(
            "SELECT request_id, position, description, quantity, unit_amount_cents
             FROM request_line_items WHERE request_id = $1 ORDER BY position",
        )
        .bind(request_id)
        .fetch_all(&mut *conn)
        .await?;
        let roster = sqlx::query_as::<_, RosterRow>(
            "SELECT request_id, position, person_id, full_name, role, sex
             FROM request_roster WHERE request_id = $1 ORDER BY position",
        )
        .bind(request_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(RequestChildren {
            objectives,
            criteria,
            line_items,
            roster,
        })
    }

    /// The active request row of a case.
    pub async fn find_active_row(
        pool: &PgPool,
        case_id: DbId,
    ) -> Result<Option<TechnicalRequestRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM technical_requests
             WHERE case_id = $1 AND deleted_at IS NULL"
        );
        sqlx::query_as::<_, TechnicalRequestRow>(&query)
            .bind(case_id)
            .fetch_optional(pool)
            .await
    }

    /// Every request row of a case, oldest first, soft-deleted ones included.
    pub async fn list_rows_for_case(
        pool: &PgPool,
        case_id: DbId,
    ) -> Result<Vec<TechnicalRequestRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM technical_requests WHERE case_id = $1 ORDER BY id"
        );
        sqlx::query_as::<_, TechnicalRequestRow>(&query)
            .bind(case_id)
            .fetch_all(pool)
            .await
    }
}

/// A request row together with its loaded children, ready for conversion.
pub type LoadedRequest = (TechnicalRequestRow, RequestChildren);

/// Load children for each row using one pooled connection.
pub async fn load_all(
    pool: &PgPool,
    rows: Vec<TechnicalRequestRow>,
) -> Result<Vec<LoadedRequest>, sqlx::Error> {
    let mut conn = pool.acquire().await?;
    let mut loaded = Vec::with_capacity(rows.len());
    for row in rows {
        let children = RequestRepo::load_children(&mut *conn, row.id).await?;
        loaded.push((row, children));
    }
    Ok(loaded)
}
