//! # pdf-to-markdown
//!
//! Convert a PDF to Markdown and leave behind a machine-readable record of
//! how the conversion went.
//!
//! Every job produces a JSON processing log next to its Markdown: timing,
//! what the engine learned about the document (page count, OCR use, status),
//! derived throughput, the invocation, and version/platform facts. The log
//! is written on failure too, and a log that cannot be written never fails
//! the conversion.
//!
//! ## Flow
//!
//! ```text
//! ConversionJob ──▶ Converter::run ──▶ ConversionEngine::convert
//!   (validated)      │ Stopwatch          (VisionEngine: pdfium + vision OCR)
//!                    ├─ metadata::extract ◀── EngineReport
//!                    ├─ SpeedMetrics::calculate
//!                    ├─ LogEntry::build
//!                    └─ persist ──▶ name.json
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_to_markdown::{ConversionJob, Converter, SystemInfo, VisionConfig, VisionEngine};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let job = ConversionJob::builder("paper.pdf").languages(["en", "de"]).build()?;
//!     let engine = VisionEngine::new(VisionConfig::default());
//!     let system = SystemInfo::capture(&engine);
//!
//!     let report = Converter::new(&engine, &system).run(&job);
//!     let markdown = report.outcome?;
//!     println!("wrote {}", markdown.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf-to-md` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf-to-markdown = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod clock;
pub mod config;
pub mod convert;
pub mod engine;
pub mod error;
pub mod log_entry;
pub mod metadata;
pub mod persist;
pub mod pipeline;
pub mod prompts;
pub mod speed;
pub mod system;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use clock::{ProcessingMetrics, RunningStopwatch, Stopwatch};
pub use config::{
    parse_languages, ConversionJob, ConversionJobBuilder, PipelineOptions, VisionConfig,
    VisionConfigBuilder,
};
pub use convert::{Converter, JobReport, JobState, LogStatus};
pub use engine::{
    ConversionEngine, EngineError, EngineOutput, EngineReport, PageKind, PageReport, VisionEngine,
};
pub use error::{InputError, JobError, LoggingError, PageError};
pub use log_entry::LogEntry;
pub use metadata::{ConversionStatus, DocumentMetadata};
pub use speed::SpeedMetrics;
pub use system::SystemInfo;
