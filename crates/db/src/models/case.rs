//! Case rows.

use aval_core::case::Case;
use aval_core::error::CoreError;
use aval_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `cases` table.
#[derive(Debug, Clone, FromRow)]
pub struct CaseRow {
    pub id: DbId,
    pub event_id: DbId,
    pub state: String,
    pub comment: Option<String>,
    pub call_url: Option<String>,
    pub dtm_url: Option<String>,
    pub pda_url: Option<String>,
    pub consolidated_url: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<CaseRow> for Case {
    type Error = CoreError;

    fn try_from(row: CaseRow) -> Result<Self, Self::Error> {
        Ok(Case {
            id: row.id,
            event_id: row.event_id,
            state: row.state.parse()?,
            comment: row.comment,
            call_url: row.call_url,
            dtm_url: row.dtm_url,
            pda_url: row.pda_url,
            consolidated_url: row.consolidated_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
