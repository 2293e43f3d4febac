//! End-to-end tests against the real vision engine.
//!
//! These need the pdfium shared library (and, for the OCR test, a vision
//! provider API key). They are gated behind the `E2E_ENABLED` environment
//! variable so they do not run in CI unless explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 PDFIUM_LIB_PATH=/path/to/libpdfium.so cargo test --test e2e -- --nocapture

use pdf_to_markdown::{
    ConversionJob, Converter, LogStatus, SystemInfo, VisionConfig, VisionEngine,
};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// ── Test helpers ─────────────────────────────────────────────────────────────

macro_rules! e2e_skip_unless_enabled {
    () => {
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
    };
}

/// A one-page PDF whose content stream draws `text` in Helvetica.
///
/// Cross-reference offsets are computed, so pdfium opens it without repair.
fn write_text_pdf(dir: &Path, name: &str, text: &str) -> PathBuf {
    let stream = format!("BT /F1 18 Tf 72 720 Td ({text}) Tj ET");
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
         /Resources << /Font << /F1 4 0 R >> >> /Contents 5 0 R >>"
            .to_string(),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
        format!("<< /Length {} >>\nstream\n{stream}\nendstream", stream.len()),
    ];

    let mut pdf = String::from("%PDF-1.4\n");
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.push_str(&format!("{} 0 obj\n{body}\nendobj\n", i + 1));
    }
    let xref_at = pdf.len();
    pdf.push_str(&format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1));
    for off in offsets {
        pdf.push_str(&format!("{off:010} 00000 n \n"));
    }
    pdf.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
        objects.len() + 1
    ));

    let path = dir.join(name);
    std::fs::write(&path, pdf).unwrap();
    path
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

// ── Text-layer conversion (pdfium only, no API key) ─────────────────────────

#[test]
fn text_pdf_converts_without_ocr() {
    e2e_skip_unless_enabled!();
    let dir = TempDir::new().unwrap();
    let input = write_text_pdf(
        dir.path(),
        "hello.pdf",
        "Quarterly report for the northern region",
    );
    let job = ConversionJob::builder(&input).build().unwrap();
    let engine = VisionEngine::new(VisionConfig::builder().min_text_chars(10).build().unwrap());
    let system = SystemInfo::capture(&engine);

    let report = Converter::new(&engine, &system).run(&job);

    let md_path = report.outcome.expect("conversion should succeed");
    let markdown = std::fs::read_to_string(&md_path).unwrap();
    println!("{markdown}");
    assert!(markdown.contains("Quarterly report"), "got: {markdown:?}");
    assert!(markdown.ends_with('\n'));

    assert!(matches!(report.log, LogStatus::Written(_)));
    let log = read_json(&dir.path().join("hello.json"));
    println!("{}", serde_json::to_string_pretty(&log).unwrap());
    let meta = &log["document_metadata"];
    assert_eq!(meta["page_count"], 1);
    assert_eq!(meta["has_ocr_content"], false);
    assert_eq!(meta["estimated_text_pages"], 1);
    assert_eq!(meta["conversion_status"], "success");
    assert!(log["processing_speed"]["pages_per_minute"].as_f64().unwrap() > 0.0);
    assert!(log["system_info"]["engine_version"]
        .as_str()
        .unwrap()
        .starts_with("vision/"));
}

#[test]
fn garbage_after_magic_bytes_fails_but_is_logged() {
    e2e_skip_unless_enabled!();
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("broken.pdf");
    std::fs::write(&input, b"%PDF-1.4\nthis is not a real document\n").unwrap();
    let job = ConversionJob::builder(&input).build().unwrap();
    let engine = VisionEngine::new(VisionConfig::default());
    let system = SystemInfo::capture(&engine);

    let report = Converter::new(&engine, &system).run(&job);

    assert!(report.outcome.is_err());
    assert!(!dir.path().join("broken.md").exists());
    let log = read_json(&dir.path().join("broken.json"));
    assert_eq!(log["document_metadata"]["conversion_status"], "failure");
    assert!(log["processing_speed"]["seconds_per_page"].is_null());
}

// ── OCR path (needs a vision provider) ──────────────────────────────────────

#[test]
fn forced_ocr_uses_vision_model() {
    e2e_skip_unless_enabled!();
    if std::env::var("OPENAI_API_KEY").is_err() {
        println!("SKIP — set OPENAI_API_KEY to run the OCR e2e test");
        return;
    }
    let dir = TempDir::new().unwrap();
    let input = write_text_pdf(dir.path(), "scan.pdf", "Invoice number 4711");
    let job = ConversionJob::builder(&input)
        .languages(["en"])
        .build()
        .unwrap();
    let config = VisionConfig::builder()
        .provider_name("openai")
        .model("gpt-4.1-nano")
        .force_ocr(true)
        .build()
        .unwrap();
    let engine = VisionEngine::new(config);
    let system = SystemInfo::capture(&engine);

    let report = Converter::new(&engine, &system).run(&job);

    let md_path = report.outcome.expect("OCR conversion should succeed");
    let markdown = std::fs::read_to_string(md_path).unwrap();
    println!("{markdown}");
    assert!(markdown.contains("4711"), "got: {markdown:?}");
    let meta = &read_json(&dir.path().join("scan.json"))["document_metadata"];
    assert_eq!(meta["has_ocr_content"], true);
    assert_eq!(meta["estimated_text_pages"], 0);
}
