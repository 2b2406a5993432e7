//! Audit trail (historial) of case transitions.
//!
//! Entries are immutable: stores expose append and read, never update or
//! delete. Exactly one entry is written per successful transition, in the same
//! atomic unit as the transition itself.

use serde::{Deserialize, Serialize};

use crate::case::CaseState;
use crate::types::{DbId, Timestamp};

define_state_enum! {
    /// Where in the review chain a transition happened.
    WorkflowStage {
        Submission => "SUBMISSION",
        DtmReview => "DTM_REVIEW",
        Pda => "PDA",
        PreControl => "PRE_CONTROL",
        Secretariat => "SECRETARIAT",
        Finance => "FINANCE",
    }
}

/// A single audit entry. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: DbId,
    pub case_id: DbId,
    /// Case state after the transition.
    pub state: CaseState,
    pub stage: WorkflowStage,
    pub comment: Option<String>,
    pub user_id: Option<DbId>,
    pub created_at: Timestamp,
}

/// Entry to append alongside a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuditEntry {
    pub state: CaseState,
    pub stage: WorkflowStage,
    pub comment: Option<String>,
    pub user_id: Option<DbId>,
}

/// Order entries newest-first. Ties on timestamp fall back to id so entries
/// written within the same instant keep their insertion order reversed.
pub fn sort_newest_first(entries: &mut [AuditEntry]) {
    entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}
