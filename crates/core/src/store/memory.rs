//! In-process [`CaseStore`] backed by a single mutex.
//!
//! Every operation runs its read-check-write sequence under one lock
//! acquisition, which gives the same all-or-nothing visibility the
//! PostgreSQL store gets from a transaction. Used by tests and by embedders
//! that do not need durability.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use super::{Audience, CaseStore};
use crate::audit::{sort_newest_first, AuditEntry};
use crate::case::{ArtifactKind, Case, CaseState};
use crate::error::CoreError;
use crate::event::{Event, EventState, NewEvent};
use crate::request::{NewTechnicalRequest, TechnicalRequest};
use crate::transitions::{self, Decision, Transition};
use crate::types::DbId;

#[derive(Default)]
struct State {
    next_id: DbId,
    events: BTreeMap<DbId, Event>,
    cases: BTreeMap<DbId, Case>,
    requests: Vec<TechnicalRequest>,
    history: Vec<AuditEntry>,
    tokens: Vec<(Audience, String)>,
}

impl State {
    fn next_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }

    fn case(&self, case_id: DbId) -> Result<&Case, CoreError> {
        self.cases.get(&case_id).ok_or(CoreError::CaseNotFound(case_id))
    }

    fn has_active_request(&self, case_id: DbId) -> bool {
        self.requests
            .iter()
            .any(|r| r.case_id == case_id && r.is_active())
    }

    /// Write case state, mirrored event state and audit entry together.
    fn apply(&mut self, transition: &Transition) -> Result<Case, CoreError> {
        let now = Utc::now();

        let event = self
            .events
            .get_mut(&transition.event_id)
            .ok_or(CoreError::EventNotFound(transition.event_id))?;
        event.state = transition.event_state();
        event.updated_at = now;

        let case = self
            .cases
            .get_mut(&transition.case_id)
            .ok_or(CoreError::CaseNotFound(transition.case_id))?;
        case.state = transition.to;
        if let Some(comment) = &transition.case_comment {
            case.comment = Some(comment.clone());
        }
        case.updated_at = now;
        let updated = case.clone();

        let id = self.next_id();
        self.history.push(AuditEntry {
            id,
            case_id: transition.case_id,
            state: transition.audit.state,
            stage: transition.audit.stage,
            comment: transition.audit.comment.clone(),
            user_id: transition.audit.user_id,
            created_at: now,
        });

        Ok(updated)
    }
}

/// Mutex-guarded in-memory store.
#[derive(Default)]
pub struct MemoryCaseStore {
    state: Mutex<State>,
}

impl MemoryCaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, CoreError> {
        self.state
            .lock()
            .map_err(|_| CoreError::Storage("memory store lock poisoned".into()))
    }

    /// Register an event in AVAILABLE state.
    pub fn insert_event(&self, input: NewEvent) -> Result<Event, CoreError> {
        let mut state = self.lock()?;
        let now = Utc::now();
        if state.events.values().any(|e| e.code == input.code) {
            return Err(CoreError::Validation(format!(
                "Event code '{}' is already registered",
                input.code
            )));
        }
        let id = state.next_id();
        let event = Event {
            id,
            code: input.code,
            name: input.name,
            place: input.place,
            discipline_id: input.discipline_id,
            category_id: input.category_id,
            starts_on: input.starts_on,
            ends_on: input.ends_on,
            coaches_male: input.coaches_male,
            coaches_female: input.coaches_female,
            athletes_male: input.athletes_male,
            athletes_female: input.athletes_female,
            state: EventState::Available,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        state.events.insert(id, event.clone());
        Ok(event)
    }

    /// Soft-delete an event.
    pub fn soft_delete_event(&self, event_id: DbId) -> Result<bool, CoreError> {
        let mut state = self.lock()?;
        match state.events.get_mut(&event_id) {
            Some(event) if event.deleted_at.is_none() => {
                event.deleted_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Register a device token for an audience.
    pub fn register_token(&self, audience: Audience, token: impl Into<String>) -> Result<(), CoreError> {
        self.lock()?.tokens.push((audience, token.into()));
        Ok(())
    }

    /// Every technical request of a case, soft-deleted ones included.
    pub fn requests_for_case(&self, case_id: DbId) -> Result<Vec<TechnicalRequest>, CoreError> {
        Ok(self
            .lock()?
            .requests
            .iter()
            .filter(|r| r.case_id == case_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CaseStore for MemoryCaseStore {
    async fn find_event(&self, event_id: DbId) -> Result<Option<Event>, CoreError> {
        Ok(self.lock()?.events.get(&event_id).cloned())
    }

    async fn find_case(&self, case_id: DbId) -> Result<Option<Case>, CoreError> {
        Ok(self.lock()?.cases.get(&case_id).cloned())
    }

    async fn active_request(&self, case_id: DbId) -> Result<Option<TechnicalRequest>, CoreError> {
        Ok(self
            .lock()?
            .requests
            .iter()
            .find(|r| r.case_id == case_id && r.is_active())
            .cloned())
    }

    async fn list_history(&self, case_id: DbId) -> Result<Vec<AuditEntry>, CoreError> {
        let mut entries: Vec<AuditEntry> = self
            .lock()?
            .history
            .iter()
            .filter(|e| e.case_id == case_id)
            .cloned()
            .collect();
        sort_newest_first(&mut entries);
        Ok(entries)
    }

    async fn recipient_tokens(&self, audience: Audience) -> Result<Vec<String>, CoreError> {
        Ok(self
            .lock()?
            .tokens
            .iter()
            .filter(|(a, _)| *a == audience)
            .map(|(_, t)| t.clone())
            .collect())
    }

    async fn open_case(&self, event_id: DbId, call_url: &str) -> Result<Case, CoreError> {
        let mut state = self.lock()?;
        let case_exists = state.cases.values().any(|c| c.event_id == event_id);
        transitions::check_open(event_id, state.events.get(&event_id), case_exists)?;

        let now = Utc::now();
        let id = state.next_id();
        let case = Case {
            id,
            event_id,
            state: CaseState::Draft,
            comment: None,
            call_url: Some(call_url.to_string()),
            dtm_url: None,
            pda_url: None,
            consolidated_url: None,
            created_at: now,
            updated_at: now,
        };
        state.cases.insert(id, case.clone());
        Ok(case)
    }

    async fn submit_request(
        &self,
        case_id: DbId,
        request: &NewTechnicalRequest,
        acting_user: Option<DbId>,
    ) -> Result<Case, CoreError> {
        let mut state = self.lock()?;
        let case = state.case(case_id)?;
        let event = state
            .events
            .get(&case.event_id)
            .ok_or(CoreError::EventNotFound(case.event_id))?;
        let transition = transitions::check_submission(
            case,
            event,
            state.has_active_request(case_id),
            request,
            acting_user,
        )?;
        let budget_total_cents = request.budget_total_cents()?;

        let id = state.next_id();
        state.requests.push(TechnicalRequest {
            id,
            case_id,
            objectives: request.objectives.clone(),
            selection_criteria: request.selection_criteria.clone(),
            line_items: request.line_items.clone(),
            transport: request.transport.clone(),
            roster: request.roster.clone(),
            headcounts: request.headcounts(),
            budget_total_cents,
            deleted_at: None,
            created_at: Utc::now(),
        });
        state.apply(&transition)
    }

    async fn decide(
        &self,
        case_id: DbId,
        decision: &Decision,
        acting_user: DbId,
    ) -> Result<Case, CoreError> {
        let mut state = self.lock()?;
        let has_active = state.has_active_request(case_id);
        let transition =
            transitions::check_decision(state.case(case_id)?, has_active, decision, acting_user)?;
        state.apply(&transition)
    }

    async fn withdraw_request(&self, case_id: DbId) -> Result<TechnicalRequest, CoreError> {
        let mut state = self.lock()?;
        let has_active = state.has_active_request(case_id);
        transitions::check_withdrawal(state.case(case_id)?, has_active)?;

        let request = state
            .requests
            .iter_mut()
            .find(|r| r.case_id == case_id && r.is_active())
            .ok_or(CoreError::NoActiveRequest(case_id))?;
        request.deleted_at = Some(Utc::now());
        Ok(request.clone())
    }

    async fn attach_artifact(
        &self,
        case_id: DbId,
        kind: ArtifactKind,
        url: &str,
    ) -> Result<Case, CoreError> {
        let mut state = self.lock()?;
        let case = state
            .cases
            .get_mut(&case_id)
            .ok_or(CoreError::CaseNotFound(case_id))?;
        case.set_artifact_url(kind, url.to_string());
        case.updated_at = Utc::now();
        Ok(case.clone())
    }
}
