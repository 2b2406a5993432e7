//! Mapping of sqlx errors onto the domain error type.

use aval_core::error::CoreError;
use aval_core::types::DbId;

/// Unique index guarding one case per event.
pub const UQ_CASE_PER_EVENT: &str = "uq_cases_event_id";
/// Partial unique index guarding one active request per case.
pub const UQ_ACTIVE_REQUEST: &str = "uq_technical_requests_active_case";

/// Convert a sqlx error into a [`CoreError`].
///
/// Unique violations (PostgreSQL code 23505) on the two invariant indexes
/// become the matching domain conflict for `id`; everything else is a
/// storage failure.
pub fn map_sqlx(err: sqlx::Error, id: DbId) -> CoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            match db_err.constraint() {
                Some(UQ_CASE_PER_EVENT) => return CoreError::CaseAlreadyExists(id),
                Some(UQ_ACTIVE_REQUEST) => return CoreError::DuplicateActiveRequest(id),
                _ => {}
            }
        }
    }
    tracing::error!(error = %err, "Database error");
    CoreError::Storage(err.to_string())
}

/// Convert a sqlx error that carries no domain meaning.
pub fn storage(err: sqlx::Error) -> CoreError {
    tracing::error!(error = %err, "Database error");
    CoreError::Storage(err.to_string())
}
