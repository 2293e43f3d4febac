//! Configuration types: the per-invocation [`ConversionJob`] and the
//! [`VisionConfig`] of the bundled engine.
//!
//! Both are built through validating builders. A [`ConversionJob`] that
//! exists has already passed input validation: the file is there, readable,
//! and starts with the PDF magic bytes. Everything the orchestrator does
//! afterwards can therefore only fail in the engine or in output I/O.

use crate::error::InputError;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Name the binary is installed under; used when reconstructing the command line.
pub const BIN_NAME: &str = "pdf-to-md";

/// OCR languages used when none are configured.
pub const DEFAULT_OCR_LANGUAGES: &[&str] = &["en"];

/// Options handed to the conversion engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOptions {
    /// OCR language codes, normalised to lowercase, in configured order.
    pub ocr_languages: Vec<String>,
    pub verbose: bool,
    pub logging_enabled: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            ocr_languages: DEFAULT_OCR_LANGUAGES.iter().map(|s| s.to_string()).collect(),
            verbose: false,
            logging_enabled: true,
        }
    }
}

/// One validated conversion request: a single input document, where its
/// outputs go, and the pipeline options. Immutable once built.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    input: PathBuf,
    markdown_output: PathBuf,
    log_output: PathBuf,
    options: PipelineOptions,
    command_line: String,
}

impl ConversionJob {
    /// Start building a job for `input`.
    pub fn builder(input: impl Into<PathBuf>) -> ConversionJobBuilder {
        ConversionJobBuilder {
            input: input.into(),
            output: None,
            log_output: None,
            languages: None,
            verbose: false,
            logging_enabled: true,
            command_line: None,
        }
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn markdown_output(&self) -> &Path {
        &self.markdown_output
    }

    pub fn log_output(&self) -> &Path {
        &self.log_output
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn command_line(&self) -> &str {
        &self.command_line
    }
}

/// Builder for [`ConversionJob`].
#[derive(Debug)]
pub struct ConversionJobBuilder {
    input: PathBuf,
    output: Option<PathBuf>,
    log_output: Option<PathBuf>,
    languages: Option<Vec<String>>,
    verbose: bool,
    logging_enabled: bool,
    command_line: Option<String>,
}

impl ConversionJobBuilder {
    /// Markdown destination. Default: `<input stem>.md` next to the input.
    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    /// Log destination. Default: `<input stem>.json` next to the Markdown.
    pub fn log_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_output = Some(path.into());
        self
    }

    pub fn languages<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.languages = Some(codes.into_iter().map(Into::into).collect());
        self
    }

    pub fn verbose(mut self, v: bool) -> Self {
        self.verbose = v;
        self
    }

    pub fn logging(mut self, enabled: bool) -> Self {
        self.logging_enabled = enabled;
        self
    }

    /// The invocation as typed by the user. Reconstructed from the other
    /// settings when not given.
    pub fn command_line(mut self, line: impl Into<String>) -> Self {
        self.command_line = Some(line.into());
        self
    }

    /// Validate the input file and options and resolve output paths.
    pub fn build(self) -> Result<ConversionJob, InputError> {
        validate_input(&self.input)?;

        let ocr_languages = match self.languages {
            Some(codes) => normalise_languages(codes)?,
            None => PipelineOptions::default().ocr_languages,
        };

        let markdown_output = self
            .output
            .clone()
            .unwrap_or_else(|| default_markdown_path(&self.input));
        let log_output = self
            .log_output
            .clone()
            .unwrap_or_else(|| default_log_path(&self.input, &markdown_output));

        if same_path(&markdown_output, &self.input) {
            return Err(InputError::InvalidConfig(format!(
                "output '{}' would overwrite the input PDF",
                markdown_output.display()
            )));
        }
        if self.logging_enabled {
            if same_path(&log_output, &self.input) {
                return Err(InputError::InvalidConfig(format!(
                    "log output '{}' would overwrite the input PDF",
                    log_output.display()
                )));
            }
            if same_path(&log_output, &markdown_output) {
                return Err(InputError::InvalidConfig(format!(
                    "log output '{}' is the same file as the Markdown output",
                    log_output.display()
                )));
            }
        }

        let command_line = self.command_line.clone().unwrap_or_else(|| {
            reconstruct_command_line(
                &self.input,
                self.output.as_deref(),
                &ocr_languages,
                self.verbose,
                self.logging_enabled,
            )
        });

        Ok(ConversionJob {
            input: self.input,
            markdown_output,
            log_output,
            options: PipelineOptions {
                ocr_languages,
                verbose: self.verbose,
                logging_enabled: self.logging_enabled,
            },
            command_line,
        })
    }
}

/// Parse a comma-separated `--languages` value such as `"en, de,FR"`.
pub fn parse_languages(csv: &str) -> Result<Vec<String>, InputError> {
    normalise_languages(csv.split(',').map(str::to_string))
}

fn normalise_languages<I>(codes: I) -> Result<Vec<String>, InputError>
where
    I: IntoIterator<Item = String>,
{
    let mut out: Vec<String> = Vec::new();
    for raw in codes {
        let code = raw.trim().to_lowercase();
        if code.is_empty() {
            continue;
        }
        if !code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(InputError::InvalidLanguage { code: raw });
        }
        if !out.contains(&code) {
            out.push(code);
        }
    }
    if out.is_empty() {
        return Err(InputError::NoLanguages);
    }
    Ok(out)
}

/// Check existence, file type, readability, extension and PDF magic bytes.
fn validate_input(path: &Path) -> Result<(), InputError> {
    if !path.exists() {
        return Err(InputError::NotFound {
            path: path.to_path_buf(),
        });
    }
    if !path.is_file() {
        return Err(InputError::NotAFile {
            path: path.to_path_buf(),
        });
    }

    let is_pdf_ext = path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);
    if !is_pdf_ext {
        return Err(InputError::NotAPdf {
            path: path.to_path_buf(),
        });
    }

    let mut file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(InputError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(e) => {
            return Err(InputError::Unreadable {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };

    let mut magic = [0u8; 4];
    match file.read_exact(&mut magic) {
        Ok(()) if &magic == b"%PDF" => Ok(()),
        Ok(()) => Err(InputError::NotAPdf {
            path: path.to_path_buf(),
        }),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(InputError::NotAPdf {
            path: path.to_path_buf(),
        }),
        Err(e) => Err(InputError::Unreadable {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Equal as written, or resolving to the same existing file.
fn same_path(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn input_stem(input: &Path) -> String {
    input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "document".to_string())
}

/// `dir/name.pdf` → `dir/name.md`.
pub fn default_markdown_path(input: &Path) -> PathBuf {
    input.with_file_name(format!("{}.md", input_stem(input)))
}

/// `<markdown dir>/name.json`, or `name.log.json` if that would clobber the
/// Markdown itself.
pub fn default_log_path(input: &Path, markdown_output: &Path) -> PathBuf {
    let stem = input_stem(input);
    let dir = markdown_output.parent().unwrap_or_else(|| Path::new(""));
    let candidate = dir.join(format!("{stem}.json"));
    if candidate == markdown_output {
        dir.join(format!("{stem}.log.json"))
    } else {
        candidate
    }
}

fn reconstruct_command_line(
    input: &Path,
    output: Option<&Path>,
    languages: &[String],
    verbose: bool,
    logging_enabled: bool,
) -> String {
    let mut line = format!("{BIN_NAME} {}", input.display());
    if let Some(out) = output {
        line.push_str(&format!(" --output {}", out.display()));
    }
    if languages.iter().map(String::as_str).ne(DEFAULT_OCR_LANGUAGES.iter().copied()) {
        line.push_str(&format!(" --languages {}", languages.join(",")));
    }
    if verbose {
        line.push_str(" --verbose");
    }
    if !logging_enabled {
        line.push_str(" --disable-logging");
    }
    line
}

// ── Vision engine configuration ──────────────────────────────────────────

/// Configuration for [`crate::engine::VisionEngine`].
///
/// Built via [`VisionConfig::builder()`] or [`VisionConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf_to_markdown::VisionConfig;
///
/// let config = VisionConfig::builder()
///     .dpi(200)
///     .concurrency(4)
///     .model("gpt-4.1-mini")
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 200);
/// ```
#[derive(Clone)]
pub struct VisionConfig {
    /// Rendering DPI for pages sent to OCR. Range: 72–400. Default: 150.
    ///
    /// 150 DPI keeps body text sharp for the vision model while images stay
    /// well under typical upload limits.
    pub dpi: u32,

    /// Cap on the rendered width and height in pixels. Default: 2000.
    pub max_rendered_pixels: u32,

    /// Concurrent OCR requests. Default: 8.
    pub concurrency: usize,

    /// Vision model identifier. If None, the provider's default is used.
    pub model: Option<String>,

    /// Provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.1.
    pub temperature: f32,

    /// Maximum tokens generated per page. Default: 4096.
    pub max_tokens: usize,

    /// Retries per page on a failed OCR call. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled after each attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-call timeout for OCR requests in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Custom OCR system prompt. If None, uses the built-in prompt.
    pub system_prompt: Option<String>,

    /// Non-whitespace characters a page's text layer needs before it is
    /// trusted instead of OCR'd. Default: 32.
    ///
    /// Scanned pages often carry a few stray glyphs (page numbers, stamps);
    /// a small threshold keeps those pages on the OCR path.
    pub min_text_chars: usize,

    /// OCR every page even when a text layer exists. Default: false.
    pub force_ocr: bool,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            dpi: 150,
            max_rendered_pixels: 2000,
            concurrency: 8,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.1,
            max_tokens: 4096,
            max_retries: 3,
            retry_backoff_ms: 500,
            api_timeout_secs: 60,
            password: None,
            system_prompt: None,
            min_text_chars: 32,
            force_ocr: false,
        }
    }
}

impl fmt::Debug for VisionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisionConfig")
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("concurrency", &self.concurrency)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("min_text_chars", &self.min_text_chars)
            .field("force_ocr", &self.force_ocr)
            .finish()
    }
}

impl VisionConfig {
    pub fn builder() -> VisionConfigBuilder {
        VisionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`VisionConfig`].
#[derive(Debug)]
pub struct VisionConfigBuilder {
    config: VisionConfig,
}

impl VisionConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn min_text_chars(mut self, n: usize) -> Self {
        self.config.min_text_chars = n;
        self
    }

    pub fn force_ocr(mut self, v: bool) -> Self {
        self.config.force_ocr = v;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<VisionConfig, InputError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 400 {
            return Err(InputError::InvalidConfig(format!(
                "DPI must be 72–400, got {}",
                c.dpi
            )));
        }
        if c.concurrency == 0 {
            return Err(InputError::InvalidConfig("Concurrency must be ≥ 1".into()));
        }
        if c.api_timeout_secs == 0 {
            return Err(InputError::InvalidConfig(
                "API timeout must be at least 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_pdf(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, b"%PDF-1.7\n%fake body\n").unwrap();
        path
    }

    #[test]
    fn default_paths_follow_input_stem() {
        let dir = TempDir::new().unwrap();
        let input = write_pdf(&dir, "report.pdf");
        let job = ConversionJob::builder(&input).build().unwrap();

        assert_eq!(job.markdown_output(), dir.path().join("report.md"));
        assert_eq!(job.log_output(), dir.path().join("report.json"));
        assert_eq!(job.options().ocr_languages, vec!["en".to_string()]);
        assert!(job.options().logging_enabled);
    }

    #[test]
    fn log_goes_alongside_custom_output() {
        let dir = TempDir::new().unwrap();
        let input = write_pdf(&dir, "scan.PDF");
        let out_dir = dir.path().join("out");
        let job = ConversionJob::builder(&input)
            .output(out_dir.join("converted.md"))
            .build()
            .unwrap();

        assert_eq!(job.log_output(), out_dir.join("scan.json"));
    }

    #[test]
    fn log_path_never_clobbers_markdown() {
        let input = Path::new("/docs/a.pdf");
        let md = Path::new("/docs/a.json");
        assert_eq!(default_log_path(input, md), PathBuf::from("/docs/a.log.json"));
    }

    #[test]
    fn log_output_equal_to_markdown_is_rejected() {
        let dir = TempDir::new().unwrap();
        let input = write_pdf(&dir, "doc.pdf");
        let md = dir.path().join("doc.md");
        let err = ConversionJob::builder(&input)
            .output(&md)
            .log_output(&md)
            .build()
            .unwrap_err();
        assert!(matches!(err, InputError::InvalidConfig(_)), "got {err:?}");
    }

    #[test]
    fn log_output_equal_to_input_is_rejected() {
        let dir = TempDir::new().unwrap();
        let input = write_pdf(&dir, "doc.pdf");
        let err = ConversionJob::builder(&input)
            .log_output(&input)
            .build()
            .unwrap_err();
        assert!(matches!(err, InputError::InvalidConfig(_)), "got {err:?}");
        assert!(std::fs::read(&input).unwrap().starts_with(b"%PDF"));
    }

    #[test]
    fn markdown_output_equal_to_input_is_rejected() {
        let dir = TempDir::new().unwrap();
        let input = write_pdf(&dir, "doc.pdf");
        let err = ConversionJob::builder(&input)
            .output(dir.path().join(".").join("doc.pdf"))
            .build()
            .unwrap_err();
        assert!(matches!(err, InputError::InvalidConfig(_)), "got {err:?}");
    }

    #[test]
    fn disabled_logging_ignores_log_path_collisions() {
        let dir = TempDir::new().unwrap();
        let input = write_pdf(&dir, "doc.pdf");
        let md = dir.path().join("doc.md");
        assert!(ConversionJob::builder(&input)
            .output(&md)
            .log_output(&md)
            .logging(false)
            .build()
            .is_ok());
    }

    #[test]
    fn missing_input_is_rejected() {
        let err = ConversionJob::builder("/definitely/not/here.pdf")
            .build()
            .unwrap_err();
        assert!(matches!(err, InputError::NotFound { .. }));
    }

    #[test]
    fn directory_input_is_rejected() {
        let dir = TempDir::new().unwrap();
        let err = ConversionJob::builder(dir.path()).build().unwrap_err();
        assert!(matches!(err, InputError::NotAFile { .. }));
    }

    #[test]
    fn wrong_extension_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"%PDF-1.4").unwrap();
        let err = ConversionJob::builder(&path).build().unwrap_err();
        assert!(matches!(err, InputError::NotAPdf { .. }));
    }

    #[test]
    fn wrong_magic_bytes_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fake.pdf");
        std::fs::write(&path, b"PK\x03\x04zip").unwrap();
        let err = ConversionJob::builder(&path).build().unwrap_err();
        assert!(matches!(err, InputError::NotAPdf { .. }));
    }

    #[test]
    fn empty_file_is_not_a_pdf() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.pdf");
        std::fs::write(&path, b"").unwrap();
        let err = ConversionJob::builder(&path).build().unwrap_err();
        assert!(matches!(err, InputError::NotAPdf { .. }));
    }

    #[test]
    fn languages_are_trimmed_lowercased_and_deduplicated() {
        assert_eq!(
            parse_languages(" en, DE,fr ,en,").unwrap(),
            vec!["en", "de", "fr"]
        );
        assert_eq!(parse_languages("ch_sim").unwrap(), vec!["ch_sim"]);
    }

    #[test]
    fn empty_language_list_is_rejected() {
        assert!(matches!(parse_languages(" , ,"), Err(InputError::NoLanguages)));
    }

    #[test]
    fn invalid_language_code_is_rejected() {
        assert!(matches!(
            parse_languages("en,d e"),
            Err(InputError::InvalidLanguage { .. })
        ));
    }

    #[test]
    fn configured_languages_reach_pipeline_options() {
        let dir = TempDir::new().unwrap();
        let input = write_pdf(&dir, "multi.pdf");
        let job = ConversionJob::builder(&input)
            .languages(["de", "fr"])
            .build()
            .unwrap();
        assert_eq!(job.options().ocr_languages, vec!["de", "fr"]);
    }

    #[test]
    fn command_line_is_reconstructed() {
        let dir = TempDir::new().unwrap();
        let input = write_pdf(&dir, "doc.pdf");
        let job = ConversionJob::builder(&input)
            .languages(["en", "de"])
            .verbose(true)
            .logging(false)
            .build()
            .unwrap();
        let line = job.command_line();
        assert!(line.starts_with("pdf-to-md "), "got: {line}");
        assert!(line.contains("--languages en,de"));
        assert!(line.contains("--verbose"));
        assert!(line.contains("--disable-logging"));
    }

    #[test]
    fn explicit_command_line_wins() {
        let dir = TempDir::new().unwrap();
        let input = write_pdf(&dir, "doc.pdf");
        let job = ConversionJob::builder(&input)
            .command_line("pdf-to-md doc.pdf -v")
            .build()
            .unwrap();
        assert_eq!(job.command_line(), "pdf-to-md doc.pdf -v");
    }

    #[test]
    fn vision_config_rejects_bad_dpi() {
        let err = VisionConfig::builder().dpi(20).build().unwrap_err();
        assert!(matches!(err, InputError::InvalidConfig(_)));
    }

    #[test]
    fn vision_config_rejects_zero_concurrency() {
        assert!(VisionConfig::builder().concurrency(0).build().is_err());
    }

    #[test]
    fn vision_config_debug_redacts_password() {
        let config = VisionConfig::builder().password("hunter2").build().unwrap();
        let dbg = format!("{config:?}");
        assert!(!dbg.contains("hunter2"));
    }
}
