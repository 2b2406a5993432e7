//! Document collaborators of the aval workflow.
//!
//! - [`render`]: turns a report payload into PDF bytes ([`HttpRenderer`]).
//! - [`artifact`]: persists bytes and hands back a URL ([`S3ArtifactStore`],
//!   [`LocalArtifactStore`]).
//! - [`fetch`]: pulls previously stored artifacts back by URL.
//! - [`merge`] and [`consolidate`]: append stored PDFs to a cover page with
//!   per-document degradation.

pub mod artifact;
pub mod consolidate;
pub mod error;
pub mod fetch;
pub mod merge;
pub mod render;
pub mod report;

pub use artifact::local::LocalArtifactStore;
pub use artifact::s3::{S3ArtifactStore, S3Config};
pub use artifact::ArtifactStore;
pub use consolidate::{consolidate, ConsolidationReport, MergeSource};
pub use error::{ArtifactError, FetchError, MergeError, RenderError};
pub use fetch::{HttpFetch, RemoteFetch};
pub use merge::PdfAccumulator;
pub use render::{DocumentRenderer, HttpRenderer, RendererConfig};
pub use report::{report_payload, ReportKind};
