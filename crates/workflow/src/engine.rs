//! The workflow engine.
//!
//! Every operation first runs the matching [`CaseStateMachine`] call. Only
//! when that committed does the engine publish a [`WorkflowEvent`] and, for
//! submissions and decisions, spawn the side effects on a [`TaskTracker`].
//! The caller gets the committed [`Case`] back without waiting for them.

use std::sync::Arc;

use aval_core::audit::AuditEntry;
use aval_core::case::{ArtifactKind, Case};
use aval_core::error::CoreError;
use aval_core::request::{NewTechnicalRequest, TechnicalRequest};
use aval_core::types::DbId;
use aval_core::CaseStateMachine;
use aval_documents::{ArtifactStore, DocumentRenderer, RemoteFetch};
use aval_events::bus::types;
use aval_events::{EventBus, Notifier, WorkflowEvent};
use tokio_util::task::TaskTracker;
use tracing::Instrument;

use crate::error::WorkflowError;
use crate::side_effects::Action;

/// External collaborators used by the side effects.
#[derive(Clone)]
pub struct Collaborators {
    pub renderer: Arc<dyn DocumentRenderer>,
    pub artifacts: Arc<dyn ArtifactStore>,
    pub fetch: Arc<dyn RemoteFetch>,
    pub notifier: Arc<dyn Notifier>,
}

pub(crate) struct Inner {
    pub(crate) machine: CaseStateMachine,
    pub(crate) collaborators: Collaborators,
    pub(crate) bus: Arc<EventBus>,
    tracker: TaskTracker,
}

/// Cheap to clone; clones share the tracker and the bus.
#[derive(Clone)]
pub struct WorkflowEngine {
    inner: Arc<Inner>,
}

impl WorkflowEngine {
    pub fn new(machine: CaseStateMachine, collaborators: Collaborators, bus: Arc<EventBus>) -> Self {
        // A closed tracker still accepts spawns; closing it up front makes
        // `wait` resolve whenever no side effect is running.
        let tracker = TaskTracker::new();
        tracker.close();
        Self {
            inner: Arc::new(Inner {
                machine,
                collaborators,
                bus,
                tracker,
            }),
        }
    }

    pub fn machine(&self) -> &CaseStateMachine {
        &self.inner.machine
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.inner.bus
    }

    /// Number of side-effect tasks still running.
    pub fn in_flight(&self) -> usize {
        self.inner.tracker.len()
    }

    pub async fn open_case(&self, event_id: DbId, call_url: &str) -> Result<Case, WorkflowError> {
        let case = self.inner.machine.open_case(event_id, call_url).await?;
        self.publish(types::CASE_OPENED, &case, None);
        Ok(case)
    }

    /// File the technical request, then render DTM and PDA reports and
    /// notify reviewers in the background.
    pub async fn submit_request(
        &self,
        case_id: DbId,
        request: &NewTechnicalRequest,
        acting_user: Option<DbId>,
    ) -> Result<Case, WorkflowError> {
        let case = self
            .inner
            .machine
            .submit_request(case_id, request, acting_user)
            .await?;
        self.publish(types::CASE_SUBMITTED, &case, acting_user);
        self.dispatch(Action::Submission, &case);
        Ok(case)
    }

    /// Approve, then build the consolidated document and notify requesters
    /// in the background.
    pub async fn approve(&self, case_id: DbId, acting_user: DbId) -> Result<Case, WorkflowError> {
        let case = self.inner.machine.approve(case_id, acting_user).await?;
        self.publish(types::CASE_APPROVED, &case, Some(acting_user));
        self.dispatch(Action::Approval, &case);
        Ok(case)
    }

    /// Reject, then store a cover-only consolidated report and notify
    /// requesters in the background.
    pub async fn reject(
        &self,
        case_id: DbId,
        acting_user: DbId,
        reason: Option<String>,
    ) -> Result<Case, WorkflowError> {
        let case = self.inner.machine.reject(case_id, acting_user, reason).await?;
        self.publish(types::CASE_REJECTED, &case, Some(acting_user));
        self.dispatch(Action::Rejection, &case);
        Ok(case)
    }

    pub async fn withdraw_request(&self, case_id: DbId) -> Result<TechnicalRequest, WorkflowError> {
        // The case-event binding never changes, so it can be read first.
        let case = self
            .inner
            .machine
            .store()
            .find_case(case_id)
            .await?
            .ok_or(CoreError::CaseNotFound(case_id))?;
        let request = self.inner.machine.withdraw_request(case_id).await?;
        self.inner.bus.publish(
            WorkflowEvent::new(types::REQUEST_WITHDRAWN)
                .for_case(case.id, case.event_id)
                .with_payload(serde_json::json!({ "request_id": request.id })),
        );
        Ok(request)
    }

    pub async fn attach_artifact(
        &self,
        case_id: DbId,
        kind: ArtifactKind,
        url: &str,
    ) -> Result<Case, WorkflowError> {
        let case = self.inner.attach(case_id, kind, url).await?;
        Ok(case)
    }

    /// Store an uploaded file as the case's `kind` artifact, replacing the
    /// previous one, and record its URL.
    pub async fn attach_file(
        &self,
        case_id: DbId,
        kind: ArtifactKind,
        bytes: Vec<u8>,
    ) -> Result<Case, WorkflowError> {
        let case = self
            .inner
            .machine
            .store()
            .find_case(case_id)
            .await?
            .ok_or(CoreError::CaseNotFound(case_id))?;

        let url = self
            .inner
            .collaborators
            .artifacts
            .replace(case.artifact_url(kind), bytes, kind.folder())
            .await?;
        let case = self.inner.attach(case_id, kind, &url).await?;
        Ok(case)
    }

    pub async fn get_history(&self, case_id: DbId) -> Result<Vec<AuditEntry>, WorkflowError> {
        Ok(self.inner.machine.get_history(case_id).await?)
    }

    /// Wait until no side-effect task is running.
    ///
    /// Tasks are never cancelled. Any number of callers may wait at once;
    /// tasks spawned while waiting are waited for too.
    pub async fn wait_idle(&self) {
        self.inner.tracker.wait().await;
    }

    fn publish(&self, event_type: &str, case: &Case, actor: Option<DbId>) {
        self.inner.bus.publish(
            WorkflowEvent::new(event_type)
                .for_case(case.id, case.event_id)
                .with_actor(actor)
                .with_payload(serde_json::json!({ "state": case.state })),
        );
    }

    fn dispatch(&self, action: Action, case: &Case) {
        let inner = Arc::clone(&self.inner);
        let case = case.clone();
        let span = tracing::info_span!("side_effects", case_id = case.id, action = action.as_str());
        self.inner
            .tracker
            .spawn(async move { inner.run(action, case).await }.instrument(span));
    }
}

impl Inner {
    /// Record an artifact URL and announce it.
    pub(crate) async fn attach(
        &self,
        case_id: DbId,
        kind: ArtifactKind,
        url: &str,
    ) -> Result<Case, CoreError> {
        let case = self.machine.attach_artifact(case_id, kind, url).await?;
        self.bus.publish(
            WorkflowEvent::new(types::ARTIFACT_ATTACHED)
                .for_case(case.id, case.event_id)
                .with_payload(serde_json::json!({ "kind": kind, "url": url })),
        );
        Ok(case)
    }
}
