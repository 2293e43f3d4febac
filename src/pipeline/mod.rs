//! Stages of the bundled vision engine.
//!
//! ```text
//! render ────────────────▶ llm ──────────▶ postprocess
//! (pdfium: text layer,      (vision OCR,     (cleanup, join
//!  rasterise, PNG/base64)    retry/timeout)   pages in order)
//! ```
//!
//! 1. [`render`]: the only stage touching pdfium; runs synchronously and
//!    returns owned page data.
//! 2. [`llm`]: the only stage with network I/O; async, driven concurrently
//!    by [`crate::engine::VisionEngine`].
//! 3. [`postprocess`]: pure string passes, shared by text-layer and OCR pages.

pub mod llm;
pub mod postprocess;
pub mod render;
