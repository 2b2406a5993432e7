//! The aval case (approval folder), one per event.

use serde::{Deserialize, Serialize};

use crate::event::EventState;
use crate::types::{DbId, Timestamp};

define_state_enum! {
    /// Lifecycle of a case: `DRAFT -> REQUESTED -> {ACCEPTED, REJECTED}`.
    CaseState {
        Draft => "DRAFT",
        Requested => "REQUESTED",
        Accepted => "ACCEPTED",
        Rejected => "REJECTED",
    }
}

impl CaseState {
    /// ACCEPTED and REJECTED admit no further transition.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Accepted | Self::Rejected)
    }

    /// The event state that must accompany this case state.
    ///
    /// A DRAFT case has no event-side counterpart; its event stays AVAILABLE.
    pub fn mirrored_event_state(self) -> EventState {
        match self {
            Self::Draft => EventState::Available,
            Self::Requested => EventState::Requested,
            Self::Accepted => EventState::Accepted,
            Self::Rejected => EventState::Rejected,
        }
    }
}

define_state_enum! {
    /// Documents a case references by URL.
    ArtifactKind {
        CallForParticipation => "CALL_FOR_PARTICIPATION",
        Dtm => "DTM",
        Pda => "PDA",
        Consolidated => "CONSOLIDATED",
    }
}

impl ArtifactKind {
    /// Artifact store folder for this kind.
    pub fn folder(self) -> &'static str {
        match self {
            Self::CallForParticipation => "avales/convocatorias",
            Self::Dtm => "avales/dtm",
            Self::Pda => "avales/pda",
            Self::Consolidated => "avales/consolidados",
        }
    }
}

/// An aval case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Case {
    pub id: DbId,
    pub event_id: DbId,
    pub state: CaseState,
    /// Rejection reason, if any.
    pub comment: Option<String>,
    pub call_url: Option<String>,
    pub dtm_url: Option<String>,
    pub pda_url: Option<String>,
    pub consolidated_url: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Case {
    pub fn artifact_url(&self, kind: ArtifactKind) -> Option<&str> {
        match kind {
            ArtifactKind::CallForParticipation => self.call_url.as_deref(),
            ArtifactKind::Dtm => self.dtm_url.as_deref(),
            ArtifactKind::Pda => self.pda_url.as_deref(),
            ArtifactKind::Consolidated => self.consolidated_url.as_deref(),
        }
    }

    pub fn set_artifact_url(&mut self, kind: ArtifactKind, url: String) {
        let slot = match kind {
            ArtifactKind::CallForParticipation => &mut self.call_url,
            ArtifactKind::Dtm => &mut self.dtm_url,
            ArtifactKind::Pda => &mut self.pda_url,
            ArtifactKind::Consolidated => &mut self.consolidated_url,
        };
        *slot = Some(url);
    }
}
