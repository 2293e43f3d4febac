//! The boundary between the telemetry core and a conversion engine.
//!
//! The core never looks inside an engine. It hands over a path and the job's
//! [`PipelineOptions`], and receives either an [`EngineOutput`] or an
//! [`EngineError`]. Whatever the engine knows about the document travels in
//! an [`EngineReport`], a struct of optional fields: an engine that cannot
//! tell the page count simply leaves it `None`, and the metadata extractor
//! turns that into `null` in the processing log.

pub mod vision;

use crate::config::PipelineOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub use vision::VisionEngine;

/// A document-conversion engine.
///
/// `convert` is a blocking call of unbounded duration. It may fail, and the
/// orchestrator also survives it panicking.
pub trait ConversionEngine {
    /// Short engine identifier, e.g. `"vision"`.
    fn name(&self) -> &str;

    /// Version string recorded in `system_info.engine_version`.
    fn version(&self) -> String;

    /// Convert `input` to Markdown.
    fn convert(&self, input: &Path, options: &PipelineOptions)
        -> Result<EngineOutput, EngineError>;
}

/// Successful engine result.
#[derive(Debug, Clone, Default)]
pub struct EngineOutput {
    pub markdown: String,
    pub report: EngineReport,
}

/// What the engine is able to say about the converted document.
///
/// Every field is optional; engines fill in what they know.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineReport {
    /// Engine-specific status spelling, e.g. `"success"` or
    /// `"ConversionStatus.PARTIAL_SUCCESS"`.
    pub status: Option<String>,
    /// Total page count of the document.
    pub page_count: Option<usize>,
    /// Whether OCR was applied anywhere, if the engine tracks it directly.
    pub ocr_used: Option<bool>,
    /// Per-page classification.
    pub pages: Option<Vec<PageReport>>,
}

/// Classification of one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageReport {
    /// 1-indexed page number.
    pub page_num: usize,
    pub kind: PageKind,
    /// Characters of Markdown produced for the page.
    pub chars: usize,
    pub error: Option<String>,
}

/// How a page's text was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageKind {
    /// Read from the PDF's embedded text layer.
    Text,
    /// Recognised from a rendered image of the page.
    Ocr,
    Unknown,
}

/// An unrecoverable engine failure.
///
/// May carry whatever the engine had learned before failing, so the
/// processing log can still report a page count on the failure path.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct EngineError {
    message: String,
    partial: Option<EngineReport>,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            partial: None,
        }
    }

    pub fn with_partial_report(mut self, report: EngineReport) -> Self {
        self.partial = Some(report);
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Report gathered before the failure, if any.
    pub fn partial_report(&self) -> Option<&EngineReport> {
        self.partial.as_ref()
    }
}
