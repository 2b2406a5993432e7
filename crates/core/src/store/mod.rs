//! Transactional persistence seam for the state machine.
//!
//! Each state-changing method of [`CaseStore`] is one atomic unit: the store
//! loads and locks the rows it needs, runs the matching check from
//! [`crate::transitions`], and writes the case, the mirrored event state and
//! the audit entry together, or writes nothing. Implementations: the
//! in-process [`MemoryCaseStore`] and the PostgreSQL store in `aval-db`.

pub mod memory;

use async_trait::async_trait;

use crate::audit::AuditEntry;
use crate::case::{ArtifactKind, Case};
use crate::error::CoreError;
use crate::event::Event;
use crate::request::{NewTechnicalRequest, TechnicalRequest};
use crate::transitions::Decision;
use crate::types::DbId;

pub use memory::MemoryCaseStore;

define_state_enum! {
    /// Recipient groups for workflow notifications.
    Audience {
        /// DTM reviewers, notified when a request is filed.
        Reviewers => "REVIEWERS",
        /// Federation offices, notified of review decisions.
        Requesters => "REQUESTERS",
    }
}

#[async_trait]
pub trait CaseStore: Send + Sync {
    // ── Reads ──

    async fn find_event(&self, event_id: DbId) -> Result<Option<Event>, CoreError>;
    async fn find_case(&self, case_id: DbId) -> Result<Option<Case>, CoreError>;

    /// The non-deleted technical request of a case, if any.
    async fn active_request(&self, case_id: DbId) -> Result<Option<TechnicalRequest>, CoreError>;

    /// Audit entries of a case, newest first.
    async fn list_history(&self, case_id: DbId) -> Result<Vec<AuditEntry>, CoreError>;

    /// Device tokens registered for an audience.
    async fn recipient_tokens(&self, audience: Audience) -> Result<Vec<String>, CoreError>;

    // ── Atomic operations ──

    /// Create a DRAFT case bound to an AVAILABLE event. The event is not
    /// modified.
    async fn open_case(&self, event_id: DbId, call_url: &str) -> Result<Case, CoreError>;

    /// Create the technical request and its sub-entities, move case and event
    /// to REQUESTED and append a SUBMISSION entry.
    async fn submit_request(
        &self,
        case_id: DbId,
        request: &NewTechnicalRequest,
        acting_user: Option<DbId>,
    ) -> Result<Case, CoreError>;

    /// Apply a review decision to a REQUESTED case with an active request,
    /// mirror it onto the event and append a DTM_REVIEW entry.
    async fn decide(
        &self,
        case_id: DbId,
        decision: &Decision,
        acting_user: DbId,
    ) -> Result<Case, CoreError>;

    /// Soft-delete the active technical request of a REQUESTED case.
    async fn withdraw_request(&self, case_id: DbId) -> Result<TechnicalRequest, CoreError>;

    /// Record (or replace) an artifact URL. No state change, no audit entry.
    async fn attach_artifact(
        &self,
        case_id: DbId,
        kind: ArtifactKind,
        url: &str,
    ) -> Result<Case, CoreError>;
}
