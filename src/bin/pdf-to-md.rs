//! CLI binary for pdf-to-markdown.
//!
//! A thin shim over the library crate: maps CLI flags to a `ConversionJob`
//! and a `VisionConfig`, runs one job, and reports the two outcomes.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf_to_markdown::{
    parse_languages, ConversionJob, Converter, JobReport, LogStatus, SystemInfo, VisionConfig,
    VisionEngine,
};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert; writes report.md and report.json next to the input
  pdf-to-md report.pdf

  # Choose the Markdown destination; the log follows it
  pdf-to-md report.pdf -o out/report.md

  # Scanned German/English document, log somewhere else
  pdf-to-md scan.pdf -l de,en --log-output logs/scan.json

  # No processing log
  pdf-to-md report.pdf --disable-logging

  # Specific vision model
  pdf-to-md --provider openai --model gpt-4.1-mini scan.pdf

PROCESSING LOG:
  Every run writes a JSON record with timing, page count, OCR use, conversion
  status, pages per minute, the invocation and version/platform details.
  It is written even when the conversion fails. Failing to write it only
  produces a warning; the exit status reflects the conversion alone.

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to the pdfium shared library
  RUST_LOG                Log filter, overrides --verbose / --quiet

Pages with an embedded text layer are read directly; only pages without one
are sent to the vision model, so a text PDF needs no API key at all.
"#;

/// Convert a PDF to Markdown and record a JSON processing log.
#[derive(Parser, Debug)]
#[command(
    name = "pdf-to-md",
    version,
    about = "Convert a PDF to Markdown and record a JSON processing log",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF file to convert.
    input: PathBuf,

    /// Markdown output path. Default: <input stem>.md next to the input.
    #[arg(short, long, env = "PDF2MD_OUTPUT")]
    output: Option<PathBuf>,

    /// Comma-separated OCR language codes, most likely first.
    #[arg(short, long, env = "PDF2MD_LANGUAGES", default_value = "en")]
    languages: String,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2MD_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2MD_QUIET", conflicts_with = "verbose")]
    quiet: bool,

    /// Do not write the processing log.
    #[arg(long, env = "PDF2MD_DISABLE_LOGGING")]
    disable_logging: bool,

    /// Processing log path. Default: <input stem>.json next to the Markdown.
    #[arg(long, env = "PDF2MD_LOG_OUTPUT", conflicts_with = "disable_logging")]
    log_output: Option<PathBuf>,

    /// Disable the progress spinner.
    #[arg(long, env = "PDF2MD_NO_PROGRESS")]
    no_progress: bool,

    /// Vision model ID (e.g. gpt-4.1-nano, gpt-4.1, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// Vision provider: openai, anthropic, gemini, ollama, azure.
    #[arg(
        long,
        env = "EDGEQUAKE_PROVIDER",
        long_help = "Vision provider. Auto-detected from API key env vars if not set.\n\
          Supported: openai, anthropic, gemini, azure, ollama."
    )]
    provider: Option<String>,

    /// Rendering DPI for OCR pages (72–400).
    #[arg(long, env = "PDF2MD_DPI", default_value_t = 150,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// Number of concurrent OCR requests.
    #[arg(short, long, env = "PDF2MD_CONCURRENCY", default_value_t = 8)]
    concurrency: usize,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2MD_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// OCR every page, even those with a text layer.
    #[arg(long, env = "PDF2MD_FORCE_OCR")]
    force_ocr: bool,

    /// Non-whitespace characters a text layer needs to skip OCR.
    #[arg(long, env = "PDF2MD_MIN_TEXT_CHARS", default_value_t = 32)]
    min_text_chars: usize,

    /// Path to a text file containing a custom OCR system prompt.
    #[arg(long, env = "PDF2MD_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Max model output tokens per page.
    #[arg(long, env = "PDF2MD_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// Model temperature (0.0–2.0).
    #[arg(long, env = "PDF2MD_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Retries per page on OCR failure.
    #[arg(long, env = "PDF2MD_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Per-call OCR timeout in seconds.
    #[arg(long, env = "PDF2MD_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // INFO-level library logs would tear through the spinner, so they are
    // only shown when the spinner is off.
    let show_progress = !cli.quiet && !cli.verbose && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build job and engine ─────────────────────────────────────────────
    let job = build_job(&cli)?;
    let engine = VisionEngine::new(build_vision_config(&cli)?);
    let system = SystemInfo::capture(&engine);

    // ── Run ──────────────────────────────────────────────────────────────
    let progress = show_progress.then(|| spinner(&job));
    let report = Converter::new(&engine, &system).run(&job);
    if let Some(bar) = progress {
        bar.finish_and_clear();
    }

    report_log_status(&report.log, cli.quiet);

    let summary = summary_pages(&report);
    let seconds = report.metrics.duration_seconds();
    let markdown = report
        .outcome
        .with_context(|| conversion_context(&cli.input))?;
    if !cli.quiet {
        eprintln!(
            "{}  {}  {}  →  {}",
            green("✔"),
            summary,
            dim(&format!("{seconds:.2}s")),
            bold(&markdown.display().to_string()),
        );
    }
    Ok(())
}

/// Context for a failed job. `JobError` already names the failure kind.
fn conversion_context(input: &Path) -> String {
    format!("Could not convert {}", input.display())
}

fn build_job(cli: &Cli) -> Result<ConversionJob> {
    let languages = parse_languages(&cli.languages).context("Invalid --languages")?;

    let mut builder = ConversionJob::builder(&cli.input)
        .languages(languages)
        .verbose(cli.verbose)
        .logging(!cli.disable_logging)
        .command_line(shell_join(std::env::args()));
    if let Some(ref out) = cli.output {
        builder = builder.output(out);
    }
    if let Some(ref log) = cli.log_output {
        builder = builder.log_output(log);
    }

    builder.build().context("Invalid input")
}

/// Map CLI args to `VisionConfig`.
fn build_vision_config(cli: &Cli) -> Result<VisionConfig> {
    let mut builder = VisionConfig::builder()
        .dpi(cli.dpi)
        .concurrency(cli.concurrency)
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .max_retries(cli.max_retries)
        .api_timeout_secs(cli.api_timeout)
        .min_text_chars(cli.min_text_chars)
        .force_ocr(cli.force_ocr);

    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password);
    }
    if let Some(ref path) = cli.system_prompt {
        let prompt = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }

    builder.build().context("Invalid configuration")
}

fn spinner(job: &ConversionJob) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
    );
    bar.set_prefix("Converting");
    bar.set_message(job.input().display().to_string());
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

/// A failed log is a warning only; the exit status ignores it.
fn report_log_status(log: &LogStatus, quiet: bool) {
    match log {
        LogStatus::Written(path) if !quiet => {
            eprintln!("{}  log  →  {}", dim("·"), dim(&path.display().to_string()));
        }
        LogStatus::Failed(e) => {
            eprintln!("{} {}", yellow("⚠ warning:"), e);
        }
        _ => {}
    }
}

fn summary_pages(report: &JobReport) -> String {
    match (report.metadata.page_count, report.speed.pages_per_minute) {
        (Some(pages), Some(ppm)) => format!("{pages} pages  ({ppm:.1} pages/min)"),
        (Some(pages), None) => format!("{pages} pages"),
        _ => String::from("converted"),
    }
}

/// Re-join argv for the processing log, quoting arguments with spaces.
fn shell_join(args: impl IntoIterator<Item = String>) -> String {
    args.into_iter()
        .map(|a| {
            if a.is_empty() || a.contains(char::is_whitespace) {
                format!("'{}'", a.replace('\'', r"'\''"))
            } else {
                a
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_documented_flags() {
        let cli = Cli::try_parse_from([
            "pdf-to-md",
            "doc.pdf",
            "-o",
            "out.md",
            "-l",
            "de,en",
            "--log-output",
            "log.json",
            "-v",
        ])
        .unwrap();
        assert_eq!(cli.input, PathBuf::from("doc.pdf"));
        assert_eq!(cli.output, Some(PathBuf::from("out.md")));
        assert_eq!(cli.languages, "de,en");
        assert_eq!(cli.log_output, Some(PathBuf::from("log.json")));
        assert!(cli.verbose);
    }

    #[test]
    fn log_output_conflicts_with_disable_logging() {
        let res = Cli::try_parse_from([
            "pdf-to-md",
            "doc.pdf",
            "--disable-logging",
            "--log-output",
            "x.json",
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn dpi_out_of_range_rejected() {
        assert!(Cli::try_parse_from(["pdf-to-md", "doc.pdf", "--dpi", "1000"]).is_err());
    }

    #[test]
    fn conversion_failure_is_reported_once() {
        use pdf_to_markdown::{EngineError, JobError};

        let outcome: std::result::Result<PathBuf, JobError> =
            Err(EngineError::new("corrupt xref table").into());
        let err = outcome
            .with_context(|| conversion_context(Path::new("doc.pdf")))
            .unwrap_err();
        let rendered = format!("{err:#}");
        assert_eq!(rendered.matches("Conversion failed").count(), 1, "{rendered}");
        assert!(rendered.starts_with("Could not convert doc.pdf"));
    }

    #[test]
    fn shell_join_quotes_spaces() {
        let joined = shell_join(["pdf-to-md", "my file.pdf", "-v"].map(String::from));
        assert_eq!(joined, "pdf-to-md 'my file.pdf' -v");
    }
}
