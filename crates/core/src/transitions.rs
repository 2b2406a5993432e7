//! Case state machine rules.
//!
//! Pure functions that decide whether an operation is allowed given the rows
//! a store has loaded (and locked) inside its transaction. Stores call these
//! between reading and writing so every implementation enforces the same
//! rules, and the check and the write share one atomic unit.
//!
//! Transition graph:
//! - `DRAFT`     -> `REQUESTED` (submission)
//! - `REQUESTED` -> `ACCEPTED`, `REJECTED` (review decision)
//! - `REQUESTED` -> `REQUESTED` (re-submission after the request was withdrawn)
//! - `ACCEPTED`, `REJECTED`: terminal

use crate::audit::{NewAuditEntry, WorkflowStage};
use crate::case::{Case, CaseState};
use crate::error::CoreError;
use crate::event::{Event, EventState};
use crate::request::NewTechnicalRequest;
use crate::types::DbId;

/// Returns the states a case may move to from `from`.
pub fn valid_transitions(from: CaseState) -> &'static [CaseState] {
    match from {
        CaseState::Draft => &[CaseState::Requested],
        CaseState::Requested => &[CaseState::Accepted, CaseState::Rejected],
        CaseState::Accepted | CaseState::Rejected => &[],
    }
}

/// Whether a case/event pair satisfies the mirroring invariant.
pub fn is_mirrored(case_state: CaseState, event_state: EventState) -> bool {
    case_state.mirrored_event_state() == event_state
}

/// A review decision on a requested case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject { reason: Option<String> },
}

impl Decision {
    pub fn target_state(&self) -> CaseState {
        match self {
            Self::Approve => CaseState::Accepted,
            Self::Reject { .. } => CaseState::Rejected,
        }
    }
}

/// A validated state change, ready to be written by a store.
///
/// The case state, the mirrored event state and the audit entry must all be
/// written in the same transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub case_id: DbId,
    pub event_id: DbId,
    pub from: CaseState,
    pub to: CaseState,
    /// When `Some`, overwrites the case comment.
    pub case_comment: Option<String>,
    pub audit: NewAuditEntry,
}

impl Transition {
    pub fn event_state(&self) -> EventState {
        self.to.mirrored_event_state()
    }
}

/// Check the preconditions for opening a case on `event_id`.
///
/// `event` is the event row (if any) and `case_exists` whether a case is
/// already bound to it.
pub fn check_open(event_id: DbId, event: Option<&Event>, case_exists: bool) -> Result<(), CoreError> {
    let event = match event {
        Some(e) if !e.is_deleted() => e,
        _ => return Err(CoreError::EventNotFound(event_id)),
    };
    if event.state != EventState::Available {
        return Err(CoreError::EventNotAvailable {
            event_id,
            state: event.state.to_string(),
        });
    }
    if case_exists {
        return Err(CoreError::CaseAlreadyExists(event_id));
    }
    Ok(())
}

/// Check a submission and build its transition.
pub fn check_submission(
    case: &Case,
    event: &Event,
    has_active_request: bool,
    request: &NewTechnicalRequest,
    acting_user: Option<DbId>,
) -> Result<Transition, CoreError> {
    if case.state.is_terminal() {
        return Err(CoreError::CaseClosed {
            case_id: case.id,
            state: case.state,
        });
    }
    if has_active_request {
        return Err(CoreError::DuplicateActiveRequest(case.id));
    }

    let declared = event.declared_athletes();
    let roster = request.headcounts().athletes();
    if declared != roster {
        return Err(CoreError::HeadcountMismatch { declared, roster });
    }

    Ok(Transition {
        case_id: case.id,
        event_id: case.event_id,
        from: case.state,
        to: CaseState::Requested,
        case_comment: None,
        audit: NewAuditEntry {
            state: CaseState::Requested,
            stage: WorkflowStage::Submission,
            comment: None,
            user_id: acting_user,
        },
    })
}

/// Check a review decision and build its transition.
///
/// A REQUESTED case whose request was withdrawn has nothing to review and
/// fails with [`CoreError::NoActiveRequest`] until it is re-submitted.
pub fn check_decision(
    case: &Case,
    has_active_request: bool,
    decision: &Decision,
    acting_user: DbId,
) -> Result<Transition, CoreError> {
    if case.state != CaseState::Requested {
        return Err(CoreError::InvalidStateForTransition {
            case_id: case.id,
            required: CaseState::Requested,
            actual: case.state,
        });
    }
    if !has_active_request {
        return Err(CoreError::NoActiveRequest(case.id));
    }

    let to = decision.target_state();
    debug_assert!(valid_transitions(case.state).contains(&to));

    let reason = match decision {
        Decision::Approve => None,
        Decision::Reject { reason } => reason.clone(),
    };

    Ok(Transition {
        case_id: case.id,
        event_id: case.event_id,
        from: case.state,
        to,
        case_comment: reason.clone(),
        audit: NewAuditEntry {
            state: to,
            stage: WorkflowStage::DtmReview,
            comment: reason,
            user_id: Some(acting_user),
        },
    })
}

/// Check that the active request of `case` may be withdrawn.
pub fn check_withdrawal(case: &Case, has_active_request: bool) -> Result<(), CoreError> {
    if case.state != CaseState::Requested {
        return Err(CoreError::InvalidStateForTransition {
            case_id: case.id,
            required: CaseState::Requested,
            actual: case.state,
        });
    }
    if !has_active_request {
        return Err(CoreError::NoActiveRequest(case.id));
    }
    Ok(())
}
