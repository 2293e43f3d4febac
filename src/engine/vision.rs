//! The bundled engine: pdfium text extraction with vision-model OCR for
//! pages that have no usable text layer.

use super::{ConversionEngine, EngineError, EngineOutput, EngineReport, PageKind, PageReport};
use crate::config::{PipelineOptions, VisionConfig};
use crate::error::PageError;
use crate::pipeline::render::{self, PageContent};
use crate::pipeline::{llm, postprocess};
use crate::prompts;
use edgequake_llm::ImageData;
use futures::stream::{self, StreamExt};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Converts PDFs with pdfium and a vision LLM.
///
/// `convert` blocks: it drives its own Tokio runtime for the OCR requests
/// and must not be called from inside another runtime.
#[derive(Debug, Clone)]
pub struct VisionEngine {
    config: VisionConfig,
}

impl VisionEngine {
    pub fn new(config: VisionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &VisionConfig {
        &self.config
    }

    /// OCR the queued pages concurrently. Returns results in completion order.
    fn ocr_pages(
        &self,
        queued: Vec<(usize, ImageData)>,
        options: &PipelineOptions,
    ) -> Result<Vec<(usize, Result<String, PageError>)>, EngineError> {
        if queued.is_empty() {
            return Ok(Vec::new());
        }
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(EngineError::new(
                "VisionEngine::convert is blocking and cannot run inside an async runtime",
            ));
        }

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| EngineError::new(format!("Failed to start async runtime: {e}")))?;

        let config = &self.config;
        let system_prompt =
            prompts::system_prompt(config.system_prompt.as_deref(), &options.ocr_languages);
        info!(
            "OCR of {} page(s), concurrency {}",
            queued.len(),
            config.concurrency
        );

        let results: Vec<(usize, Result<String, PageError>)> = runtime.block_on(async {
            let provider = match llm::resolve_provider(config) {
                Ok(p) => p,
                Err(hint) => {
                    warn!("No vision provider: {}", hint);
                    return queued
                        .into_iter()
                        .map(|(page, _)| {
                            let err = PageError::ProviderNotConfigured {
                                page,
                                hint: hint.clone(),
                            };
                            (page, Err(err))
                        })
                        .collect();
                }
            };

            let prompt = &system_prompt;
            stream::iter(queued.into_iter().map(|(page_num, image)| {
                let provider = Arc::clone(&provider);
                async move {
                    let result = llm::ocr_page(&provider, page_num, image, prompt, config).await;
                    (page_num, result)
                }
            }))
            .buffer_unordered(config.concurrency)
            .collect::<Vec<_>>()
            .await
        });
        Ok(results)
    }
}

impl ConversionEngine for VisionEngine {
    fn name(&self) -> &str {
        "vision"
    }

    fn version(&self) -> String {
        let provider = match (&self.config.provider, &self.config.provider_name) {
            (Some(_), _) => "custom",
            (None, Some(name)) => name.as_str(),
            (None, None) => "auto",
        };
        let model = self.config.model.as_deref().unwrap_or("default");
        format!(
            "vision/{} ({}/{}, pdfium-render 0.8)",
            env!("CARGO_PKG_VERSION"),
            provider,
            model
        )
    }

    fn convert(
        &self,
        input: &Path,
        options: &PipelineOptions,
    ) -> Result<EngineOutput, EngineError> {
        let scan = render::scan_document(input, &self.config)?;
        let page_count = scan.page_count;
        debug!(
            "{} of {} pages need OCR",
            scan.ocr_page_count(),
            page_count
        );

        let mut outcomes = Vec::with_capacity(page_count);
        let mut queued = Vec::new();
        for page in scan.pages {
            let (kind, result) = match page.content {
                PageContent::Text(text) => (PageKind::Text, Ok(text)),
                PageContent::Failed(e) => (PageKind::Ocr, Err(e)),
                PageContent::Image(image) => {
                    queued.push((page.page_num, image));
                    continue;
                }
            };
            outcomes.push(PageOutcome {
                page_num: page.page_num,
                kind,
                result,
            });
        }

        let ocr = self.ocr_pages(queued, options).map_err(|e| {
            e.with_partial_report(EngineReport {
                page_count: Some(page_count),
                ..Default::default()
            })
        })?;
        outcomes.extend(ocr.into_iter().map(|(page_num, result)| PageOutcome {
            page_num,
            kind: PageKind::Ocr,
            result,
        }));

        assemble(page_count, outcomes)
    }
}

/// One page after text extraction or OCR.
#[derive(Debug)]
struct PageOutcome {
    page_num: usize,
    kind: PageKind,
    result: Result<String, PageError>,
}

/// Clean and join the pages in order and derive the engine report.
///
/// Fails only when the document has pages and none of them converted.
fn assemble(page_count: usize, mut outcomes: Vec<PageOutcome>) -> Result<EngineOutput, EngineError> {
    outcomes.sort_by_key(|o| o.page_num);

    let mut cleaned = Vec::with_capacity(outcomes.len());
    let mut reports = Vec::with_capacity(outcomes.len());
    let mut first_error: Option<String> = None;

    for outcome in &outcomes {
        match &outcome.result {
            Ok(raw) => {
                let md = postprocess::clean_markdown(raw);
                reports.push(PageReport {
                    page_num: outcome.page_num,
                    kind: outcome.kind,
                    chars: md.chars().count(),
                    error: None,
                });
                cleaned.push(md);
            }
            Err(e) => {
                first_error.get_or_insert_with(|| e.to_string());
                reports.push(PageReport {
                    page_num: outcome.page_num,
                    kind: outcome.kind,
                    chars: 0,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    let failed = reports.iter().filter(|r| r.error.is_some()).count();
    let ocr_used = reports
        .iter()
        .any(|r| r.kind == PageKind::Ocr && r.error.is_none());
    let mut report = EngineReport {
        status: None,
        page_count: Some(page_count),
        ocr_used: Some(ocr_used),
        pages: Some(reports),
    };

    if page_count > 0 && failed == page_count {
        report.status = Some("failure".into());
        let detail = first_error.unwrap_or_default();
        return Err(EngineError::new(format!(
            "none of the {page_count} page(s) could be converted; first error: {detail}"
        ))
        .with_partial_report(report));
    }

    report.status = Some(if failed == 0 { "success" } else { "partial_success" }.into());
    if failed > 0 {
        warn!("{} of {} page(s) failed and were skipped", failed, page_count);
    }

    Ok(EngineOutput {
        markdown: postprocess::join_pages(cleaned.iter().map(String::as_str)),
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{self, ConversionStatus};

    fn text(page_num: usize, body: &str) -> PageOutcome {
        PageOutcome {
            page_num,
            kind: PageKind::Text,
            result: Ok(body.into()),
        }
    }

    fn ocr(page_num: usize, body: &str) -> PageOutcome {
        PageOutcome {
            page_num,
            kind: PageKind::Ocr,
            result: Ok(body.into()),
        }
    }

    fn failed(page_num: usize) -> PageOutcome {
        PageOutcome {
            page_num,
            kind: PageKind::Ocr,
            result: Err(PageError::OcrFailed {
                page: page_num,
                attempts: 4,
                detail: "HTTP 503".into(),
            }),
        }
    }

    #[test]
    fn pages_are_joined_in_page_order() {
        let out = assemble(3, vec![ocr(3, "Three"), text(1, "# One"), ocr(2, "Two")]).unwrap();
        assert_eq!(out.markdown, "# One\n\nTwo\n\nThree\n");
        assert_eq!(out.report.status.as_deref(), Some("success"));
        assert_eq!(out.report.page_count, Some(3));
        assert_eq!(out.report.ocr_used, Some(true));
    }

    #[test]
    fn some_failed_pages_is_partial_success() {
        let out = assemble(2, vec![text(1, "Body"), failed(2)]).unwrap();
        assert_eq!(out.markdown, "Body\n");
        assert_eq!(out.report.status.as_deref(), Some("partial_success"));
        assert_eq!(out.report.ocr_used, Some(false));

        let pages = out.report.pages.as_ref().unwrap();
        assert!(pages[1].error.as_deref().unwrap().contains("HTTP 503"));

        let meta = metadata::extract(Some(&out.report), Path::new("/nope.pdf"));
        assert_eq!(meta.conversion_status, ConversionStatus::Partial);
        assert_eq!(meta.estimated_text_pages, Some(1));
    }

    #[test]
    fn all_pages_failed_is_an_error_with_report() {
        let err = assemble(2, vec![failed(1), failed(2)]).unwrap_err();
        assert!(err.message().contains("none of the 2 page(s)"));
        let partial = err.partial_report().unwrap();
        assert_eq!(partial.page_count, Some(2));
        assert_eq!(partial.pages.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn empty_document_converts_to_empty_markdown() {
        let out = assemble(0, Vec::new()).unwrap();
        assert_eq!(out.markdown, "");
        assert_eq!(out.report.status.as_deref(), Some("success"));
    }

    #[test]
    fn chars_are_counted_after_cleanup() {
        let out = assemble(1, vec![ocr(1, "```markdown\nabc\n```")]).unwrap();
        assert_eq!(out.report.pages.unwrap()[0].chars, 3);
    }

    #[test]
    fn version_names_provider_and_model() {
        let config = VisionConfig::builder()
            .provider_name("openai")
            .model("gpt-4.1-mini")
            .build()
            .unwrap();
        let engine = VisionEngine::new(config);
        assert_eq!(engine.name(), "vision");
        let version = engine.version();
        assert!(version.starts_with("vision/"), "got {version}");
        assert!(version.contains("openai/gpt-4.1-mini"), "got {version}");
    }
}
