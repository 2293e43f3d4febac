//! The processing log record.
//!
//! [`LogEntry::build`] is pure aggregation: no I/O, no engine calls. The
//! five sections and their key names are a stable contract for downstream
//! readers; every key is always serialised, with `null` for "unavailable".
//!
//! ```text
//! processing_details   timing
//! document_metadata    what the engine told us about the document
//! processing_speed     throughput derived from the two above
//! utility_parameters   how the job was invoked
//! system_info          versions and platform
//! ```

use crate::clock::ProcessingMetrics;
use crate::config::ConversionJob;
use crate::metadata::DocumentMetadata;
use crate::speed::{round_to, SpeedMetrics};
use crate::system::SystemInfo;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

/// One job's processing log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub processing_details: ProcessingDetails,
    pub document_metadata: DocumentMetadata,
    pub processing_speed: SpeedMetrics,
    pub utility_parameters: UtilityParameters,
    pub system_info: SystemInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessingDetails {
    pub processing_time_seconds: f64,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UtilityParameters {
    pub input_file: String,
    pub output_file: String,
    pub ocr_languages: Vec<String>,
    pub verbose_mode: bool,
    pub command_line: String,
}

impl LogEntry {
    /// Assemble the record for one job.
    pub fn build(
        job: &ConversionJob,
        metrics: &ProcessingMetrics,
        metadata: &DocumentMetadata,
        speed: &SpeedMetrics,
        system: &SystemInfo,
    ) -> Self {
        Self {
            processing_details: ProcessingDetails {
                processing_time_seconds: round_to(metrics.duration_seconds(), 3),
                start_time: iso8601(&metrics.started_at),
                end_time: iso8601(&metrics.finished_at),
            },
            document_metadata: metadata.clone(),
            processing_speed: speed.rounded(),
            utility_parameters: UtilityParameters {
                input_file: job.input().display().to_string(),
                output_file: job.markdown_output().display().to_string(),
                ocr_languages: job.options().ocr_languages.clone(),
                verbose_mode: job.options().verbose,
                command_line: job.command_line().to_string(),
            },
            system_info: system.clone(),
        }
    }
}

fn iso8601(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, false)
}
