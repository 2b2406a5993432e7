//! Event rows.

use aval_core::error::CoreError;
use aval_core::event::Event;
use aval_core::types::{Date, DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `events` table.
#[derive(Debug, Clone, FromRow)]
pub struct EventRow {
    pub id: DbId,
    pub code: String,
    pub name: String,
    pub place: String,
    pub discipline_id: DbId,
    pub category_id: DbId,
    pub starts_on: Date,
    pub ends_on: Date,
    pub coaches_male: i32,
    pub coaches_female: i32,
    pub athletes_male: i32,
    pub athletes_female: i32,
    pub state: String,
    pub deleted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<EventRow> for Event {
    type Error = CoreError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        Ok(Event {
            id: row.id,
            code: row.code,
            name: row.name,
            place: row.place,
            discipline_id: row.discipline_id,
            category_id: row.category_id,
            starts_on: row.starts_on,
            ends_on: row.ends_on,
            coaches_male: row.coaches_male,
            coaches_female: row.coaches_female,
            athletes_male: row.athletes_male,
            athletes_female: row.athletes_female,
            state: row.state.parse()?,
            deleted_at: row.deleted_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
