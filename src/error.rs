//! Error types for the pdf-to-markdown library.
//!
//! Three error types reflect three failure modes with different consequences:
//!
//! * [`InputError`]: **Rejected before starting**: the input file or the
//!   configuration is unusable. Returned by the builders in
//!   [`crate::config`]; no conversion runs and no log entry is written.
//!
//! * [`JobError`]: **Fatal for the job**: the engine failed, or its Markdown
//!   could not be written. Stored in [`crate::convert::JobReport::outcome`].
//!   The processing log is still attempted.
//!
//! * [`LoggingError`]: **Never fatal**: the processing log could not be
//!   serialised or written. The orchestrator downgrades it to a warning and
//!   reports it in [`crate::convert::JobReport::log`], next to, and
//!   independent of, the conversion outcome.
//!
//! Engine failures themselves are [`crate::engine::EngineError`]; the
//! bundled vision engine tracks individual pages with [`PageError`].

use crate::engine::EngineError;
use std::path::PathBuf;
use thiserror::Error;

/// Problems with the input file or configuration, detected before conversion.
#[derive(Debug, Error)]
pub enum InputError {
    // ── Input file ────────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    NotFound { path: PathBuf },

    /// The path exists but is a directory or other non-regular file.
    #[error("Input '{path}' is not a regular file")]
    NotAFile { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file could not be opened or read for another reason.
    #[error("Failed to read '{path}': {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file was read, but it is not a PDF (wrong extension or magic bytes).
    #[error("File must be a PDF: '{path}'")]
    NotAPdf { path: PathBuf },

    // ── Options ───────────────────────────────────────────────────────────
    /// An OCR language code contains characters no OCR language code uses.
    #[error("Invalid OCR language code '{code}' (expected letters, digits, '_' or '-')")]
    InvalidLanguage { code: String },

    /// The language list was given but contained no codes.
    #[error("At least one OCR language is required")]
    NoLanguages,

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// A failure that terminates the job with a non-zero status.
#[derive(Debug, Error)]
pub enum JobError {
    /// The conversion engine failed (or panicked).
    #[error("Conversion failed: {0}")]
    Conversion(#[from] EngineError),

    /// The engine succeeded but the Markdown file could not be written.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A failure to serialise or persist the processing log.
///
/// Never terminates a job; see [`crate::convert::LogStatus::Failed`].
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The log entry could not be serialised to JSON.
    #[error("Failed to serialise processing log: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Creating or writing the temporary log file failed.
    #[error("Failed to write processing log '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The temporary file could not be renamed onto the destination.
    #[error("Failed to move processing log into place at '{path}': {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A single page that could not be converted.
///
/// Kept inside the vision engine: a failed page is recorded in
/// [`crate::engine::PageReport::error`] and the remaining pages carry on.
#[derive(Debug, Clone, Error)]
pub enum PageError {
    /// pdfium could not render the page to an image.
    #[error("Page {page}: rasterisation failed: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// No vision provider could be set up for OCR.
    #[error("Page {page}: no vision provider configured: {hint}")]
    ProviderNotConfigured { page: usize, hint: String },

    /// The vision model call failed after all retries.
    #[error("Page {page}: OCR failed after {attempts} attempt(s): {detail}")]
    OcrFailed {
        page: usize,
        attempts: u32,
        detail: String,
    },
}
