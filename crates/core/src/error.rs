use crate::case::CaseState;
use crate::types::DbId;

/// Errors raised by the case state machine and its persistence.
///
/// Every variant except [`CoreError::Storage`] is raised before any write
/// becomes visible: validation errors before the transaction starts, state
/// conflicts inside the transaction that would have performed the write.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Event not found: {0}")]
    EventNotFound(DbId),

    #[error("Case not found: {0}")]
    CaseNotFound(DbId),

    #[error("Event {event_id} is not available for a new request (state: {state})")]
    EventNotAvailable { event_id: DbId, state: String },

    #[error("A case already exists for event {0}")]
    CaseAlreadyExists(DbId),

    #[error("Case {0} already has an active technical request")]
    DuplicateActiveRequest(DbId),

    #[error("Case {0} has no active technical request")]
    NoActiveRequest(DbId),

    #[error("Roster lists {roster} athletes but the event declares {declared}")]
    HeadcountMismatch { declared: i32, roster: i32 },

    #[error("Case {case_id} must be {required} for this transition, but is {actual}")]
    InvalidStateForTransition {
        case_id: DbId,
        required: CaseState,
        actual: CaseState,
    },

    /// Submission on a terminal case.
    #[error("Case {case_id} is {state}; only DRAFT or REQUESTED cases accept a technical request")]
    CaseClosed { case_id: DbId, state: CaseState },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<validator::ValidationErrors> for CoreError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}
