//! Document metadata for the processing log, extracted from whatever the
//! engine reported.
//!
//! Every input here may be missing. The extractor never fails: an absent
//! page count becomes `None`, an absent OCR flag becomes `false`, an
//! unrecognised status becomes [`ConversionStatus::Unknown`], and a file
//! whose size cannot be read gets `file_size_bytes: None`.

use crate::engine::{EngineReport, PageKind};
use serde::Serialize;
use std::path::Path;
use tracing::debug;

/// Outcome of the conversion as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionStatus {
    Success,
    Partial,
    Failure,
    Unknown,
}

impl ConversionStatus {
    /// Map an engine-specific status spelling onto the four known outcomes.
    ///
    /// Accepts plain words (`"success"`, `"failed"`), enum-style spellings
    /// (`"PARTIAL_SUCCESS"`) and qualified names
    /// (`"ConversionStatus.SUCCESS"`), case-insensitively.
    pub fn normalise(raw: &str) -> Self {
        let lowered = raw.trim().to_ascii_lowercase();
        let word = lowered.rsplit('.').next().unwrap_or_default();
        match word {
            "success" | "succeeded" | "ok" | "completed" => Self::Success,
            "partial" | "partial_success" | "partial-success" | "partialsuccess" => Self::Partial,
            "failure" | "failed" | "fail" | "error" => Self::Failure,
            _ => Self::Unknown,
        }
    }
}

/// Metadata section of the processing log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentMetadata {
    pub file_size_bytes: Option<u64>,
    pub page_count: Option<usize>,
    pub has_ocr_content: bool,
    pub estimated_text_pages: Option<usize>,
    pub conversion_status: ConversionStatus,
}

/// Extract metadata after a successful engine run.
///
/// `report` is `None` when the engine offers no report at all.
pub fn extract(report: Option<&EngineReport>, input: &Path) -> DocumentMetadata {
    let status = report
        .and_then(|r| r.status.as_deref())
        .map(ConversionStatus::normalise)
        .unwrap_or(ConversionStatus::Unknown);
    build(report, input, status)
}

/// Extract metadata after the engine failed.
///
/// Uses whatever partial report the engine left behind; the status is
/// always [`ConversionStatus::Failure`].
pub fn extract_failed(partial: Option<&EngineReport>, input: &Path) -> DocumentMetadata {
    build(partial, input, ConversionStatus::Failure)
}

fn build(report: Option<&EngineReport>, input: &Path, status: ConversionStatus) -> DocumentMetadata {
    let page_count = report.and_then(page_count);
    let ocr_pages = report.and_then(ocr_page_count);

    let has_ocr_content = report
        .and_then(|r| r.ocr_used)
        .or_else(|| ocr_pages.map(|n| n > 0))
        .unwrap_or(false);

    let estimated_text_pages = match (page_count, ocr_pages) {
        (Some(total), Some(ocr)) => total.checked_sub(ocr),
        _ => None,
    };
    if let (Some(total), Some(ocr), None) = (page_count, ocr_pages, estimated_text_pages) {
        debug!(total, ocr, "Engine reported more OCR pages than pages; text estimate dropped");
    }

    DocumentMetadata {
        file_size_bytes: file_size(input),
        page_count,
        has_ocr_content,
        estimated_text_pages,
        conversion_status: status,
    }
}

/// Declared page count, else the number of per-page entries.
fn page_count(report: &EngineReport) -> Option<usize> {
    report
        .page_count
        .or_else(|| report.pages.as_ref().map(Vec::len))
}

fn ocr_page_count(report: &EngineReport) -> Option<usize> {
    report
        .pages
        .as_ref()
        .map(|pages| pages.iter().filter(|p| p.kind == PageKind::Ocr).count())
}

fn file_size(path: &Path) -> Option<u64> {
    match std::fs::metadata(path) {
        Ok(meta) => Some(meta.len()),
        Err(e) => {
            debug!("Could not read size of {}: {}", path.display(), e);
            None
        }
    }
}
