//! Error types for the workflow engine.

use aval_core::case::ArtifactKind;
use aval_core::error::CoreError;
use aval_core::store::Audience;
use aval_documents::{ArtifactError, RenderError, ReportKind};

/// Error returned to callers of [`WorkflowEngine`](crate::WorkflowEngine).
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Storing an uploaded file failed.
    #[error("Artifact storage failed: {0}")]
    Artifact(#[from] ArtifactError),
}

impl WorkflowError {
    /// The domain error, if this is one.
    pub fn as_core(&self) -> Option<&CoreError> {
        match self {
            Self::Core(e) => Some(e),
            Self::Artifact(_) => None,
        }
    }
}

/// A failed side-effect step. Logged and published, never returned.
#[derive(Debug, thiserror::Error)]
pub enum SideEffectError {
    #[error("Loading case context failed: {0}")]
    Context(#[source] CoreError),

    #[error("Rendering the {kind} report failed: {source}")]
    Render {
        kind: ReportKind,
        #[source]
        source: RenderError,
    },

    #[error("Storing the {kind} artifact failed: {source}")]
    Store {
        kind: ArtifactKind,
        #[source]
        source: ArtifactError,
    },

    #[error("Attaching the {kind} artifact failed: {source}")]
    Attach {
        kind: ArtifactKind,
        #[source]
        source: CoreError,
    },

    #[error("Loading {audience} recipients failed: {source}")]
    Recipients {
        audience: Audience,
        #[source]
        source: CoreError,
    },

    #[error("{failed} of {attempted} notifications to {audience} failed")]
    Delivery {
        audience: Audience,
        failed: usize,
        attempted: usize,
    },
}

impl SideEffectError {
    /// Short name of the failed step, used in `side_effect.failed` events.
    pub fn step(&self) -> &'static str {
        match self {
            Self::Context(_) => "context",
            Self::Render { .. } => "render",
            Self::Store { .. } => "store",
            Self::Attach { .. } => "attach",
            Self::Recipients { .. } => "recipients",
            Self::Delivery { .. } => "notify",
        }
    }
}
