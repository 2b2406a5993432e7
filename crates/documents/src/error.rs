//! Error types for the document collaborators.

use crate::report::ReportKind;

/// Error type for report rendering failures.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The HTTP request itself failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The renderer returned a non-2xx status code.
    #[error("Renderer error ({status}): {body}")]
    Renderer { status: u16, body: String },

    /// The renderer answered with something that is not a PDF.
    #[error("Renderer returned a non-PDF body for the {0} report")]
    NotPdf(ReportKind),
}

/// Error type for artifact storage failures.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The storage backend rejected the operation.
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// The URL does not belong to this store.
    #[error("URL is not managed by this store: {0}")]
    ForeignUrl(String),
}

/// Error type for remote fetch failures.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Fetch returned HTTP {0}")]
    HttpStatus(u16),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL is not readable by this fetcher: {0}")]
    ForeignUrl(String),
}

/// Error type for PDF merge failures.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// The document has no usable `/Root` -> `/Pages` tree.
    #[error("PDF has no page tree")]
    MissingPageTree,

    /// Writing the merged document failed.
    #[error("Failed to serialise merged PDF: {0}")]
    Serialize(String),
}
