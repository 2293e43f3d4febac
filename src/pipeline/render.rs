//! Reading a PDF through pdfium: per-page text layer, rasterisation of the
//! pages that need OCR, and PNG/base64 encoding for the vision API.
//!
//! All pdfium work happens here, synchronously, before any network call.
//! The returned [`DocumentScan`] owns plain data only, so the pdfium handle
//! is dropped before the async OCR stage starts.
//!
//! ## Why cap pixels as well as DPI?
//!
//! Page sizes vary wildly: an A0 poster at 150 DPI would produce a
//! 7,000 × 9,900 px image. `max_rendered_pixels` caps both edges regardless
//! of physical size, keeping memory bounded and the request inside the
//! image-size sweet spot of current vision models.

use crate::config::VisionConfig;
use crate::engine::EngineError;
use crate::error::PageError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info, warn};

/// Environment variable naming an explicit pdfium shared library.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Everything learned from one pass over the document.
#[derive(Debug)]
pub struct DocumentScan {
    pub page_count: usize,
    pub pages: Vec<ScannedPage>,
}

impl DocumentScan {
    pub fn ocr_page_count(&self) -> usize {
        self.pages
            .iter()
            .filter(|p| matches!(p.content, PageContent::Image(_)))
            .count()
    }
}

#[derive(Debug)]
pub struct ScannedPage {
    /// 1-indexed.
    pub page_num: usize,
    pub content: PageContent,
}

/// What a page turned into after the scan.
#[derive(Debug)]
pub enum PageContent {
    /// Usable embedded text.
    Text(String),
    /// Rendered image waiting for OCR.
    Image(ImageData),
    /// Could not be rendered.
    Failed(PageError),
}

/// Bind the pdfium shared library.
///
/// Order: `PDFIUM_LIB_PATH`, a library in the current directory, then the
/// system library search path.
pub fn bind_pdfium() -> Result<Pdfium, EngineError> {
    if let Ok(path) = std::env::var(PDFIUM_LIB_PATH_ENV) {
        if !path.is_empty() {
            let bindings = Pdfium::bind_to_library(&path).map_err(|e| {
                EngineError::new(format!(
                    "Failed to load pdfium from {PDFIUM_LIB_PATH_ENV}='{path}': {e:?}"
                ))
            })?;
            return Ok(Pdfium::new(bindings));
        }
    }

    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|e| {
            EngineError::new(format!(
                "pdfium library not found ({e:?}). Install libpdfium or set {PDFIUM_LIB_PATH_ENV}"
            ))
        })?;
    Ok(Pdfium::new(bindings))
}

/// Open `pdf_path` and classify every page.
///
/// Pages whose text layer has fewer than `config.min_text_chars`
/// non-whitespace characters, or every page when `config.force_ocr` is set,
/// are rendered and encoded for OCR.
pub fn scan_document(pdf_path: &Path, config: &VisionConfig) -> Result<DocumentScan, EngineError> {
    let pdfium = bind_pdfium()?;
    let document = pdfium
        .load_pdf_from_file(pdf_path, config.password.as_deref())
        .map_err(|e| open_error(pdf_path, config.password.is_some(), &e))?;

    let pages = document.pages();
    let page_count = pages.len() as usize;
    info!("PDF loaded: {} pages", page_count);

    let render_config = render_config(config);
    let mut scanned = Vec::with_capacity(page_count);

    for (idx, page) in pages.iter().enumerate() {
        let page_num = idx + 1;
        let text = page.text().map(|t| t.all()).unwrap_or_else(|e| {
            debug!("Page {}: no readable text layer ({:?})", page_num, e);
            String::new()
        });

        let content = if !needs_ocr(&text, config.min_text_chars, config.force_ocr) {
            debug!("Page {}: using text layer ({} chars)", page_num, text.len());
            PageContent::Text(text)
        } else {
            match rasterise(&page, &render_config, page_num) {
                Ok(image) => PageContent::Image(image),
                Err(e) => {
                    warn!("{}", e);
                    PageContent::Failed(e)
                }
            }
        };
        scanned.push(ScannedPage { page_num, content });
    }

    Ok(DocumentScan {
        page_count,
        pages: scanned,
    })
}

fn open_error(pdf_path: &Path, had_password: bool, e: &PdfiumError) -> EngineError {
    let detail = format!("{e:?}");
    if detail.to_ascii_lowercase().contains("password") {
        if had_password {
            EngineError::new(format!("Wrong password for '{}'", pdf_path.display()))
        } else {
            EngineError::new(format!(
                "'{}' is encrypted; supply a password with --password",
                pdf_path.display()
            ))
        }
    } else {
        EngineError::new(format!(
            "Failed to open PDF '{}': {}",
            pdf_path.display(),
            detail
        ))
    }
}

fn render_config(config: &VisionConfig) -> PdfRenderConfig {
    let max = config.max_rendered_pixels as i32;
    PdfRenderConfig::new()
        .scale_page_by_factor(config.dpi as f32 / 72.0)
        .set_maximum_width(max)
        .set_maximum_height(max)
}

fn rasterise(
    page: &PdfPage<'_>,
    render_config: &PdfRenderConfig,
    page_num: usize,
) -> Result<ImageData, PageError> {
    let bitmap = page
        .render_with_config(render_config)
        .map_err(|e| PageError::RenderFailed {
            page: page_num,
            detail: format!("{e:?}"),
        })?;
    let image = bitmap.as_image();
    debug!(
        "Rendered page {} → {}x{} px",
        page_num,
        image.width(),
        image.height()
    );
    encode_page(&image).map_err(|e| PageError::RenderFailed {
        page: page_num,
        detail: format!("PNG encoding failed: {e}"),
    })
}

/// Whether a page with this text layer should go to OCR.
pub fn needs_ocr(text: &str, min_text_chars: usize, force_ocr: bool) -> bool {
    force_ocr || visible_chars(text) < min_text_chars
}

fn visible_chars(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}

/// Encode a rendered page as a base64 PNG for the vision API.
///
/// PNG keeps glyph edges crisp; JPEG artefacts measurably hurt OCR.
/// `detail: "high"` lets tiling models see fine print.
pub fn encode_page(img: &DynamicImage) -> Result<ImageData, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded image → {} bytes base64", b64.len());

    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn encode_small_image() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])));
        let data = encode_page(&img).expect("encode should succeed");
        assert_eq!(data.mime_type, "image/png");
        let decoded = STANDARD.decode(&data.data).expect("valid base64");
        assert_eq!(&decoded[1..4], b"PNG");
    }

    #[test]
    fn sparse_text_layer_goes_to_ocr() {
        assert!(needs_ocr("", 32, false));
        assert!(needs_ocr("  12  \n", 32, false));
        assert!(!needs_ocr(&"word ".repeat(20), 32, false));
    }

    #[test]
    fn whitespace_does_not_count_towards_threshold() {
        let padded = format!("{}abc", " \n\t".repeat(100));
        assert!(needs_ocr(&padded, 4, false));
        assert!(!needs_ocr(&padded, 3, false));
    }

    #[test]
    fn force_ocr_overrides_text_layer() {
        assert!(needs_ocr(&"dense text ".repeat(100), 32, true));
    }

    #[test]
    fn ocr_page_count_counts_images_only() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255])));
        let scan = DocumentScan {
            page_count: 3,
            pages: vec![
                ScannedPage {
                    page_num: 1,
                    content: PageContent::Text("hello".into()),
                },
                ScannedPage {
                    page_num: 2,
                    content: PageContent::Image(encode_page(&img).unwrap()),
                },
                ScannedPage {
                    page_num: 3,
                    content: PageContent::Failed(PageError::RenderFailed {
                        page: 3,
                        detail: "boom".into(),
                    }),
                },
            ],
        };
        assert_eq!(scan.ocr_page_count(), 1);
    }
}
