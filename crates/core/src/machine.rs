//! The case state machine: the only writer of case and event state.
//!
//! [`CaseStateMachine`] validates input before any write and delegates each
//! operation to one atomic [`CaseStore`] call. It does not run side effects;
//! the workflow orchestrator does that after these calls return.

use std::sync::Arc;

use validator::Validate;

use crate::audit::AuditEntry;
use crate::case::{ArtifactKind, Case};
use crate::error::CoreError;
use crate::request::{NewTechnicalRequest, TechnicalRequest};
use crate::store::CaseStore;
use crate::transitions::Decision;
use crate::types::DbId;

#[derive(Clone)]
pub struct CaseStateMachine {
    store: Arc<dyn CaseStore>,
}

impl CaseStateMachine {
    pub fn new(store: Arc<dyn CaseStore>) -> Self {
        Self { store }
    }

    /// The underlying store, for read access.
    pub fn store(&self) -> &Arc<dyn CaseStore> {
        &self.store
    }

    /// Open a DRAFT case for an AVAILABLE event.
    pub async fn open_case(&self, event_id: DbId, call_url: &str) -> Result<Case, CoreError> {
        if call_url.trim().is_empty() {
            return Err(CoreError::Validation(
                "A call-for-participation document URL is required".into(),
            ));
        }
        let case = self.store.open_case(event_id, call_url).await?;
        tracing::info!(case_id = case.id, event_id, "Case opened");
        Ok(case)
    }

    /// File the technical request of a case.
    pub async fn submit_request(
        &self,
        case_id: DbId,
        request: &NewTechnicalRequest,
        acting_user: Option<DbId>,
    ) -> Result<Case, CoreError> {
        request.validate()?;
        request.budget_total_cents()?;
        let case = self.store.submit_request(case_id, request, acting_user).await?;
        tracing::info!(
            case_id,
            event_id = case.event_id,
            athletes = request.headcounts().athletes(),
            state = %case.state,
            "Technical request submitted"
        );
        Ok(case)
    }

    pub async fn approve(&self, case_id: DbId, acting_user: DbId) -> Result<Case, CoreError> {
        let case = self
            .store
            .decide(case_id, &Decision::Approve, acting_user)
            .await?;
        tracing::info!(case_id, user_id = acting_user, state = %case.state, "Case approved");
        Ok(case)
    }

    pub async fn reject(
        &self,
        case_id: DbId,
        acting_user: DbId,
        reason: Option<String>,
    ) -> Result<Case, CoreError> {
        let reason = reason.filter(|r| !r.trim().is_empty());
        let decision = Decision::Reject { reason };
        let case = self.store.decide(case_id, &decision, acting_user).await?;
        tracing::info!(
            case_id,
            user_id = acting_user,
            reason = ?case.comment,
            "Case rejected"
        );
        Ok(case)
    }

    /// Soft-delete the active request so the case can be re-submitted.
    pub async fn withdraw_request(&self, case_id: DbId) -> Result<TechnicalRequest, CoreError> {
        let request = self.store.withdraw_request(case_id).await?;
        tracing::info!(case_id, request_id = request.id, "Technical request withdrawn");
        Ok(request)
    }

    pub async fn attach_artifact(
        &self,
        case_id: DbId,
        kind: ArtifactKind,
        url: &str,
    ) -> Result<Case, CoreError> {
        if url.trim().is_empty() {
            return Err(CoreError::Validation("Artifact URL must not be empty".into()));
        }
        let case = self.store.attach_artifact(case_id, kind, url).await?;
        tracing::debug!(case_id, kind = %kind, url, "Artifact attached");
        Ok(case)
    }

    /// Audit entries of a case, newest first.
    pub async fn get_history(&self, case_id: DbId) -> Result<Vec<AuditEntry>, CoreError> {
        self.store
            .find_case(case_id)
            .await?
            .ok_or(CoreError::CaseNotFound(case_id))?;
        self.store.list_history(case_id).await
    }
}
