//! The consolidated document pipeline.
//!
//! An ordered list of optional steps over a [`PdfAccumulator`]: each source
//! whose URL is present is fetched and appended. A missing URL, a failed
//! fetch or an unparsable document skips that source; the accumulator is
//! passed to the next step unchanged. If the cover itself cannot be parsed
//! or the result cannot be serialised, the cover bytes are returned as is.

use aval_core::case::{ArtifactKind, Case};
use serde::Serialize;

use crate::fetch::RemoteFetch;
use crate::merge::PdfAccumulator;

/// One document to append after the cover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSource {
    pub kind: ArtifactKind,
    pub url: Option<String>,
}

impl MergeSource {
    /// The sources appended to a case's cover, in order: PDA then DTM.
    pub fn for_case(case: &Case) -> Vec<Self> {
        [ArtifactKind::Pda, ArtifactKind::Dtm]
            .into_iter()
            .map(|kind| Self {
                kind,
                url: case.artifact_url(kind).map(str::to_string),
            })
            .collect()
    }
}

/// What the pipeline produced and why.
#[derive(Debug, Clone, Serialize)]
pub struct ConsolidationReport {
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub appended: Vec<ArtifactKind>,
    /// Skipped sources with the reason.
    pub skipped: Vec<(ArtifactKind, String)>,
    /// True when the output is the bare cover because merging failed.
    pub fell_back: bool,
}

/// Build the consolidated document from `cover` and `sources`.
pub async fn consolidate(
    cover: Vec<u8>,
    sources: &[MergeSource],
    fetch: &dyn RemoteFetch,
) -> ConsolidationReport {
    let mut report = ConsolidationReport {
        bytes: Vec::new(),
        appended: Vec::new(),
        skipped: Vec::new(),
        fell_back: false,
    };

    let mut acc = match PdfAccumulator::from_bytes(&cover) {
        Ok(acc) => acc,
        Err(e) => {
            tracing::warn!(error = %e, "Cover is not mergeable, storing it alone");
            report.fell_back = true;
            report.bytes = cover;
            return report;
        }
    };

    for source in sources {
        let Some(url) = source.url.as_deref() else {
            report.skipped.push((source.kind, "no artifact".to_string()));
            continue;
        };
        let bytes = match fetch.get(url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(kind = %source.kind, url, error = %e, "Fetch failed, skipping document");
                report.skipped.push((source.kind, e.to_string()));
                continue;
            }
        };
        match acc.append(&bytes) {
            Ok(pages) => {
                tracing::debug!(kind = %source.kind, pages, "Document appended");
                report.appended.push(source.kind);
            }
            Err(e) => {
                tracing::warn!(kind = %source.kind, url, error = %e, "Unreadable PDF, skipping document");
                report.skipped.push((source.kind, e.to_string()));
            }
        }
    }

    match acc.finish() {
        Ok(bytes) => report.bytes = bytes,
        Err(e) => {
            tracing::warn!(error = %e, "Merge failed, storing the cover alone");
            report.appended.clear();
            report.fell_back = true;
            report.bytes = cover;
        }
    }
    report
}
