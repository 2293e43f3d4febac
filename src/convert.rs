//! The conversion orchestrator.
//!
//! [`Converter::run`] drives one [`ConversionJob`] through
//!
//! ```text
//! Pending ─▶ Converting ─┬─▶ Converted ────────┬─▶ LoggingAttempted ─▶ Done
//!                        └─▶ ConversionFailed ─┘
//! ```
//!
//! and reports two outcomes that never influence each other:
//!
//! * [`JobReport::outcome`]: did the document convert and was its Markdown
//!   written? This alone decides the process exit status.
//! * [`JobReport::log`]: was the processing log written? A failure here is
//!   a warning, never a job failure, and a failed conversion is still logged.

use crate::clock::{ProcessingMetrics, Stopwatch};
use crate::config::ConversionJob;
use crate::engine::{ConversionEngine, EngineError, EngineOutput};
use crate::error::{JobError, LoggingError};
use crate::log_entry::LogEntry;
use crate::metadata::{self, DocumentMetadata};
use crate::persist;
use crate::speed::SpeedMetrics;
use crate::system::SystemInfo;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Lifecycle of one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Converting,
    Converted,
    ConversionFailed,
    LoggingAttempted,
    Done,
}

/// What happened to the processing log.
#[derive(Debug)]
pub enum LogStatus {
    /// Logging was turned off for this job.
    Disabled,
    /// The log was written to this path.
    Written(PathBuf),
    /// Writing the log failed; the job outcome is unaffected.
    Failed(LoggingError),
}

impl LogStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, LogStatus::Failed(_))
    }
}

/// Everything known about a finished job.
#[derive(Debug)]
pub struct JobReport {
    /// Path of the written Markdown, or why the job failed.
    pub outcome: Result<PathBuf, JobError>,
    pub log: LogStatus,
    pub metrics: ProcessingMetrics,
    pub metadata: DocumentMetadata,
    pub speed: SpeedMetrics,
    /// States visited, in order, ending with [`JobState::Done`].
    pub states: Vec<JobState>,
}

impl JobReport {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Runs jobs against an engine.
///
/// Holds only shared, read-only references; each [`Converter::run`] call
/// builds all of its own state, so one converter can serve many jobs.
pub struct Converter<'a> {
    engine: &'a dyn ConversionEngine,
    system: &'a SystemInfo,
    fixed_duration: Option<Duration>,
}

impl<'a> Converter<'a> {
    pub fn new(engine: &'a dyn ConversionEngine, system: &'a SystemInfo) -> Self {
        Self {
            engine,
            system,
            fixed_duration: None,
        }
    }

    /// Record `duration` as every job's processing time instead of measuring.
    ///
    /// Two runs of the same job then produce logs that differ only in
    /// `start_time` and `end_time`.
    pub fn with_fixed_duration(mut self, duration: Duration) -> Self {
        self.fixed_duration = Some(duration);
        self
    }

    /// Run `job` to completion.
    pub fn run(&self, job: &ConversionJob) -> JobReport {
        let mut states = vec![JobState::Pending];
        let mut enter = |state: JobState| {
            debug!(?state, "job state");
            states.push(state);
        };

        // ── Converting ───────────────────────────────────────────────────
        info!(
            "Converting {} with engine '{}'",
            job.input().display(),
            self.engine.name()
        );
        enter(JobState::Converting);
        let running = Stopwatch::start();
        let result = self.invoke_engine(job);
        let metrics = match self.fixed_duration {
            Some(d) => running.stop_with(d),
            None => running.stop(),
        };

        // ── Converted | ConversionFailed ─────────────────────────────────
        let (outcome, metadata, speed) = match result {
            Ok(output) => {
                enter(JobState::Converted);
                info!(
                    "Conversion finished in {:.2}s",
                    metrics.duration_seconds()
                );
                let metadata = metadata::extract(Some(&output.report), job.input());
                let speed = SpeedMetrics::calculate(metrics.duration_seconds(), metadata.page_count);
                let outcome = write_markdown(job, &output);
                (outcome, metadata, speed)
            }
            Err(err) => {
                enter(JobState::ConversionFailed);
                warn!(
                    "Conversion failed after {:.2}s: {}",
                    metrics.duration_seconds(),
                    err
                );
                let metadata = metadata::extract_failed(err.partial_report(), job.input());
                (Err(JobError::Conversion(err)), metadata, SpeedMetrics::unavailable())
            }
        };

        // ── LoggingAttempted ─────────────────────────────────────────────
        let log = if job.options().logging_enabled {
            enter(JobState::LoggingAttempted);
            let entry = LogEntry::build(job, &metrics, &metadata, &speed, self.system);
            match persist::persist(&entry, job.log_output()) {
                Ok(()) => {
                    info!("Processing details saved to {}", job.log_output().display());
                    LogStatus::Written(job.log_output().to_path_buf())
                }
                Err(e) => {
                    warn!("Processing log not written: {}", e);
                    LogStatus::Failed(e)
                }
            }
        } else {
            debug!("Processing log disabled");
            LogStatus::Disabled
        };

        enter(JobState::Done);

        JobReport {
            outcome,
            log,
            metrics,
            metadata,
            speed,
            states,
        }
    }

    /// Call the engine, turning a panic into an ordinary conversion error.
    fn invoke_engine(&self, job: &ConversionJob) -> Result<EngineOutput, EngineError> {
        let engine = self.engine;
        panic::catch_unwind(AssertUnwindSafe(|| {
            engine.convert(job.input(), job.options())
        }))
        .unwrap_or_else(|payload| {
            let detail = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic payload".to_string());
            Err(EngineError::new(format!("engine panicked: {detail}")))
        })
    }
}

fn write_markdown(job: &ConversionJob, output: &EngineOutput) -> Result<PathBuf, JobError> {
    let path = job.markdown_output();
    persist::write_atomic(path, output.markdown.as_bytes()).map_err(|e| {
        JobError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e.into_io(),
        }
    })?;
    info!("Markdown written to {}", path.display());
    Ok(path.to_path_buf())
}
