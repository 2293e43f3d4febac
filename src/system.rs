//! Static facts about this build and host, captured once per process.

use crate::engine::ConversionEngine;
use serde::Serialize;

/// Version of this utility.
pub const UTILITY_VERSION: &str = env!("CARGO_PKG_VERSION");

/// `rustc --version` of the compiler that built this binary.
pub const RUNTIME_VERSION: &str = env!("PDF2MD_RUSTC_VERSION");

/// System section of the processing log.
///
/// Build one with [`SystemInfo::capture`] at start-up and pass it by
/// reference to every job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemInfo {
    pub utility_version: String,
    pub engine_version: String,
    pub runtime_version: String,
    pub platform: String,
    pub architecture: String,
}

impl SystemInfo {
    /// Snapshot of the current build, host and `engine`.
    pub fn capture(engine: &dyn ConversionEngine) -> Self {
        Self {
            utility_version: UTILITY_VERSION.to_string(),
            engine_version: engine.version(),
            runtime_version: RUNTIME_VERSION.to_string(),
            platform: platform_string(),
            architecture: format!("{}bit", usize::BITS),
        }
    }
}

/// e.g. `linux-x86_64-unix`.
fn platform_string() -> String {
    use std::env::consts::{ARCH, FAMILY, OS};
    format!("{OS}-{ARCH}-{FAMILY}")
}
