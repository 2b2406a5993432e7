//! PostgreSQL implementation of [`CaseStore`].
//!
//! Every mutating operation is one transaction: lock the case (and event)
//! rows with `FOR UPDATE`, run the shared rule check from
//! [`aval_core::transitions`], then write the case, the mirrored event state
//! and the audit entry before committing. Concurrent callers serialize on
//! the row locks, so exactly one of two racing decisions sees `REQUESTED`.

use async_trait::async_trait;
use aval_core::audit::AuditEntry;
use aval_core::case::{ArtifactKind, Case};
use aval_core::error::CoreError;
use aval_core::event::{Event, NewEvent};
use aval_core::request::{NewTechnicalRequest, TechnicalRequest};
use aval_core::store::{Audience, CaseStore};
use aval_core::transitions::{self, Decision, Transition};
use aval_core::types::DbId;
use sqlx::PgConnection;

use crate::error::{map_sqlx, storage};
use crate::repositories::request_repo::load_all;
use crate::repositories::{CaseRepo, DeviceTokenRepo, EventRepo, HistoryRepo, RequestRepo};
use crate::DbPool;

#[derive(Clone)]
pub struct PgCaseStore {
    pool: DbPool,
}

impl PgCaseStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Register an event in AVAILABLE state.
    pub async fn insert_event(&self, input: &NewEvent) -> Result<Event, CoreError> {
        EventRepo::create(&self.pool, input)
            .await
            .map_err(storage)?
            .try_into()
    }

    /// Register a push token for an audience.
    pub async fn register_token(
        &self,
        user_id: DbId,
        audience: Audience,
        token: &str,
    ) -> Result<(), CoreError> {
        DeviceTokenRepo::register(&self.pool, user_id, audience, token)
            .await
            .map_err(storage)?;
        Ok(())
    }

    /// Every technical request of a case, soft-deleted ones included.
    pub async fn requests_for_case(&self, case_id: DbId) -> Result<Vec<TechnicalRequest>, CoreError> {
        let rows = RequestRepo::list_rows_for_case(&self.pool, case_id)
            .await
            .map_err(storage)?;
        load_all(&self.pool, rows)
            .await
            .map_err(storage)?
            .into_iter()
            .map(|(row, children)| row.into_domain(children))
            .collect()
    }

    async fn lock_case(conn: &mut PgConnection, case_id: DbId) -> Result<Case, CoreError> {
        CaseRepo::find_for_update(conn, case_id)
            .await
            .map_err(storage)?
            .ok_or(CoreError::CaseNotFound(case_id))?
            .try_into()
    }

    async fn lock_event(conn: &mut PgConnection, event_id: DbId) -> Result<Option<Event>, CoreError> {
        EventRepo::find_for_update(conn, event_id)
            .await
            .map_err(storage)?
            .map(Event::try_from)
            .transpose()
    }

    /// Write case state, mirrored event state and audit entry.
    async fn apply(conn: &mut PgConnection, transition: &Transition) -> Result<Case, CoreError> {
        EventRepo::set_state(&mut *conn, transition.event_id, transition.event_state().as_str())
            .await
            .map_err(storage)?;
        let row = CaseRepo::update_state(
            &mut *conn,
            transition.case_id,
            transition.to.as_str(),
            transition.case_comment.as_deref(),
        )
        .await
        .map_err(storage)?;
        HistoryRepo::append(&mut *conn, transition.case_id, &transition.audit)
            .await
            .map_err(storage)?;
        row.try_into()
    }
}

#[async_trait]
impl CaseStore for PgCaseStore {
    async fn find_event(&self, event_id: DbId) -> Result<Option<Event>, CoreError> {
        EventRepo::find_by_id(&self.pool, event_id)
            .await
            .map_err(storage)?
            .map(Event::try_from)
            .transpose()
    }

    async fn find_case(&self, case_id: DbId) -> Result<Option<Case>, CoreError> {
        CaseRepo::find_by_id(&self.pool, case_id)
            .await
            .map_err(storage)?
            .map(Case::try_from)
            .transpose()
    }

    async fn active_request(&self, case_id: DbId) -> Result<Option<TechnicalRequest>, CoreError> {
        let Some(row) = RequestRepo::find_active_row(&self.pool, case_id)
            .await
            .map_err(storage)?
        else {
            return Ok(None);
        };
        let mut conn = self.pool.acquire().await.map_err(storage)?;
        let children = RequestRepo::load_children(&mut *conn, row.id)
            .await
            .map_err(storage)?;
        row.into_domain(children).map(Some)
    }

    async fn list_history(&self, case_id: DbId) -> Result<Vec<AuditEntry>, CoreError> {
        HistoryRepo::list_for_case(&self.pool, case_id)
            .await
            .map_err(storage)?
            .into_iter()
            .map(AuditEntry::try_from)
            .collect()
    }

    async fn recipient_tokens(&self, audience: Audience) -> Result<Vec<String>, CoreError> {
        DeviceTokenRepo::list_tokens(&self.pool, audience)
            .await
            .map_err(storage)
    }

    async fn open_case(&self, event_id: DbId, call_url: &str) -> Result<Case, CoreError> {
        let mut tx = self.pool.begin().await.map_err(storage)?;

        let event = Self::lock_event(&mut tx, event_id).await?;
        let case_exists = CaseRepo::find_by_event(&mut *tx, event_id)
            .await
            .map_err(storage)?
            .is_some();
        transitions::check_open(event_id, event.as_ref(), case_exists)?;

        let row = CaseRepo::create(&mut tx, event_id, call_url)
            .await
            .map_err(|e| map_sqlx(e, event_id))?;
        tx.commit().await.map_err(storage)?;
        row.try_into()
    }

    async fn submit_request(
        &self,
        case_id: DbId,
        request: &NewTechnicalRequest,
        acting_user: Option<DbId>,
    ) -> Result<Case, CoreError> {
        let budget_total_cents = request.budget_total_cents()?;
        let mut tx = self.pool.begin().await.map_err(storage)?;

        let case = Self::lock_case(&mut tx, case_id).await?;
        let event = Self::lock_event(&mut tx, case.event_id)
            .await?
            .ok_or(CoreError::EventNotFound(case.event_id))?;
        let has_active = RequestRepo::has_active(&mut tx, case_id)
            .await
            .map_err(storage)?;
        let transition =
            transitions::check_submission(&case, &event, has_active, request, acting_user)?;

        RequestRepo::create(&mut tx, case_id, request, budget_total_cents)
            .await
            .map_err(|e| map_sqlx(e, case_id))?;
        let updated = Self::apply(&mut tx, &transition).await?;
        tx.commit().await.map_err(storage)?;
        Ok(updated)
    }

    async fn decide(
        &self,
        case_id: DbId,
        decision: &Decision,
        acting_user: DbId,
    ) -> Result<Case, CoreError> {
        let mut tx = self.pool.begin().await.map_err(storage)?;

        let case = Self::lock_case(&mut tx, case_id).await?;
        let has_active = RequestRepo::has_active(&mut tx, case_id)
            .await
            .map_err(storage)?;
        let transition = transitions::check_decision(&case, has_active, decision, acting_user)?;
        // Lock order is case then event everywhere.
        Self::lock_event(&mut tx, case.event_id).await?;

        let updated = Self::apply(&mut tx, &transition).await?;
        tx.commit().await.map_err(storage)?;
        Ok(updated)
    }

    async fn withdraw_request(&self, case_id: DbId) -> Result<TechnicalRequest, CoreError> {
        let mut tx = self.pool.begin().await.map_err(storage)?;

        let case = Self::lock_case(&mut tx, case_id).await?;
        let has_active = RequestRepo::has_active(&mut tx, case_id)
            .await
            .map_err(storage)?;
        transitions::check_withdrawal(&case, has_active)?;

        let row = RequestRepo::soft_delete_active(&mut tx, case_id)
            .await
            .map_err(storage)?
            .ok_or(CoreError::NoActiveRequest(case_id))?;
        let children = RequestRepo::load_children(&mut tx, row.id)
            .await
            .map_err(storage)?;
        tx.commit().await.map_err(storage)?;
        row.into_domain(children)
    }

    async fn attach_artifact(
        &self,
        case_id: DbId,
        kind: ArtifactKind,
        url: &str,
    ) -> Result<Case, CoreError> {
        CaseRepo::set_artifact_url(&self.pool, case_id, kind, url)
            .await
            .map_err(storage)?
            .ok_or(CoreError::CaseNotFound(case_id))?
            .try_into()
    }
}
