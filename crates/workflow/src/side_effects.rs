//! Post-commit side effects.
//!
//! Each step's failure is logged, published as `side_effect.failed` and
//! then dropped; later steps still run. Nothing here holds a store lock
//! across an await on a collaborator.

use aval_core::case::{ArtifactKind, Case};
use aval_core::error::CoreError;
use aval_core::event::Event;
use aval_core::request::TechnicalRequest;
use aval_core::store::Audience;
use aval_core::types::DbId;
use aval_documents::{consolidate, report_payload, MergeSource, ReportKind};
use aval_events::bus::types;
use aval_events::{Notification, WorkflowEvent};

use crate::engine::Inner;
use crate::error::SideEffectError;
use crate::templates;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    Submission,
    Approval,
    Rejection,
}

impl Action {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Submission => "submission",
            Self::Approval => "approval",
            Self::Rejection => "rejection",
        }
    }
}

/// Case, event and active request as seen after the commit.
struct Context {
    case: Case,
    event: Event,
    request: Option<TechnicalRequest>,
}

impl Inner {
    pub(crate) async fn run(&self, action: Action, case: Case) {
        let case_id = case.id;
        let ctx = match self.load_context(case).await {
            Ok(ctx) => ctx,
            Err(e) => {
                self.report(case_id, SideEffectError::Context(e));
                return;
            }
        };

        match action {
            Action::Submission => self.after_submission(&ctx).await,
            Action::Approval => self.after_approval(&ctx).await,
            Action::Rejection => self.after_rejection(&ctx).await,
        }
        tracing::debug!(case_id, "Side effects finished");
    }

    async fn load_context(&self, case: Case) -> Result<Context, CoreError> {
        let store = self.machine.store();
        let event = store
            .find_event(case.event_id)
            .await?
            .ok_or(CoreError::EventNotFound(case.event_id))?;
        let request = store.active_request(case.id).await?;
        Ok(Context {
            case,
            event,
            request,
        })
    }

    /// DTM and PDA reports are rendered and stored concurrently.
    async fn after_submission(&self, ctx: &Context) {
        let (dtm, pda) = futures::join!(
            self.render_and_attach(ctx, ReportKind::Dtm),
            self.render_and_attach(ctx, ReportKind::Pda),
        );
        for result in [dtm, pda] {
            if let Err(e) = result {
                self.report(ctx.case.id, e);
            }
        }

        self.notify(ctx, Audience::Reviewers, templates::submitted(&ctx.case, &ctx.event))
            .await;
    }

    /// Consolidated document: cover, then PDA, then DTM.
    async fn after_approval(&self, ctx: &Context) {
        let cover = self.render(ctx, ReportKind::Consolidated).await;
        match cover {
            Ok(cover) => {
                // Reload for artifact URLs attached since the decision.
                let case = match self.machine.store().find_case(ctx.case.id).await {
                    Ok(Some(case)) => case,
                    _ => ctx.case.clone(),
                };
                let sources = MergeSource::for_case(&case);
                let merged =
                    consolidate(cover, &sources, self.collaborators.fetch.as_ref()).await;
                tracing::info!(
                    case_id = case.id,
                    appended = ?merged.appended,
                    skipped = ?merged.skipped,
                    fell_back = merged.fell_back,
                    "Consolidated document assembled"
                );
                if let Err(e) = self
                    .store_and_attach(&case, ArtifactKind::Consolidated, merged.bytes)
                    .await
                {
                    self.report(case.id, e);
                }
            }
            Err(e) => self.report(ctx.case.id, e),
        }

        self.notify(ctx, Audience::Requesters, templates::approved(&ctx.case, &ctx.event))
            .await;
    }

    /// Rejected cases get a cover-only consolidated report.
    async fn after_rejection(&self, ctx: &Context) {
        if let Err(e) = self.render_and_attach(ctx, ReportKind::Consolidated).await {
            self.report(ctx.case.id, e);
        }

        self.notify(ctx, Audience::Requesters, templates::rejected(&ctx.case, &ctx.event))
            .await;
    }

    async fn render(&self, ctx: &Context, kind: ReportKind) -> Result<Vec<u8>, SideEffectError> {
        let payload = report_payload(kind, &ctx.case, &ctx.event, ctx.request.as_ref());
        self.collaborators
            .renderer
            .render(kind, &payload)
            .await
            .map_err(|source| SideEffectError::Render { kind, source })
    }

    async fn render_and_attach(&self, ctx: &Context, kind: ReportKind) -> Result<Case, SideEffectError> {
        let bytes = self.render(ctx, kind).await?;
        self.store_and_attach(&ctx.case, kind.artifact_kind(), bytes).await
    }

    async fn store_and_attach(
        &self,
        case: &Case,
        kind: ArtifactKind,
        bytes: Vec<u8>,
    ) -> Result<Case, SideEffectError> {
        let url = self
            .collaborators
            .artifacts
            .replace(case.artifact_url(kind), bytes, kind.folder())
            .await
            .map_err(|source| SideEffectError::Store { kind, source })?;
        self.attach(case.id, kind, &url)
            .await
            .map_err(|source| SideEffectError::Attach { kind, source })
    }

    async fn notify(&self, ctx: &Context, audience: Audience, notification: Notification) {
        let tokens = match self.machine.store().recipient_tokens(audience).await {
            Ok(tokens) => tokens,
            Err(source) => {
                self.report(ctx.case.id, SideEffectError::Recipients { audience, source });
                return;
            }
        };
        if tokens.is_empty() {
            tracing::debug!(audience = %audience, "No recipients registered");
            return;
        }

        let outcome = self.collaborators.notifier.send(&tokens, &notification).await;
        self.bus.publish(
            WorkflowEvent::new(types::NOTIFICATION_SENT)
                .for_case(ctx.case.id, ctx.case.event_id)
                .with_payload(serde_json::json!({
                    "audience": audience,
                    "title": notification.title,
                    "delivered": outcome.delivered,
                    "failed": outcome.failed,
                })),
        );
        if outcome.failed > 0 {
            self.report(
                ctx.case.id,
                SideEffectError::Delivery {
                    audience,
                    failed: outcome.failed,
                    attempted: outcome.attempted(),
                },
            );
        }
    }

    fn report(&self, case_id: DbId, error: SideEffectError) {
        tracing::error!(case_id, step = error.step(), error = %error, "Side effect failed");
        self.bus
            .publish(WorkflowEvent::side_effect_failed(case_id, error.step(), &error));
    }
}
