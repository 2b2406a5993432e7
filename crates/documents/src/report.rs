//! Report kinds and the structured payloads handed to the renderer.

use std::fmt;

use aval_core::case::{ArtifactKind, Case};
use aval_core::event::Event;
use aval_core::request::TechnicalRequest;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// The reports the workflow asks the renderer for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportKind {
    #[serde(rename = "DTM")]
    Dtm,
    #[serde(rename = "PDA")]
    Pda,
    /// Cover/summary page of the consolidated document.
    #[serde(rename = "CONSOLIDATED")]
    Consolidated,
}

impl ReportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dtm => "DTM",
            Self::Pda => "PDA",
            Self::Consolidated => "CONSOLIDATED",
        }
    }

    /// Path segment used by the HTTP renderer.
    pub fn slug(self) -> &'static str {
        match self {
            Self::Dtm => "dtm",
            Self::Pda => "pda",
            Self::Consolidated => "consolidated",
        }
    }

    /// The case artifact this report is stored as.
    pub fn artifact_kind(self) -> ArtifactKind {
        match self {
            Self::Dtm => ArtifactKind::Dtm,
            Self::Pda => ArtifactKind::Pda,
            Self::Consolidated => ArtifactKind::Consolidated,
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build the renderer payload for `kind`.
///
/// The request is optional: the consolidated cover of a rejected case may be
/// rendered after the request was withdrawn.
pub fn report_payload(
    kind: ReportKind,
    case: &Case,
    event: &Event,
    request: Option<&TechnicalRequest>,
) -> serde_json::Value {
    let mut payload = serde_json::json!({
        "report": kind,
        "generated_at": Utc::now(),
        "case": {
            "id": case.id,
            "state": case.state,
            "comment": case.comment,
        },
        "event": {
            "id": event.id,
            "code": event.code,
            "name": event.name,
            "place": event.place,
            "starts_on": event.starts_on,
            "ends_on": event.ends_on,
            "declared_athletes": event.declared_athletes(),
            "declared_coaches": event.declared_coaches(),
        },
    });

    if let Some(request) = request {
        payload["request"] = match kind {
            ReportKind::Dtm => serde_json::json!({
                "objectives": request.objectives,
                "selection_criteria": request.selection_criteria,
                "roster": request.roster,
                "headcounts": request.headcounts,
            }),
            ReportKind::Pda => serde_json::json!({
                "line_items": request.line_items,
                "transport": request.transport,
                "budget_total_cents": request.budget_total_cents,
            }),
            ReportKind::Consolidated => serde_json::json!({
                "headcounts": request.headcounts,
                "budget_total_cents": request.budget_total_cents,
                "transport": request.transport,
            }),
        };
    }
    payload
}
