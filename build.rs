//! Build script: record the compiler version for `system_info.runtime_version`.
//!
//! Cargo exposes the compiler it is using through the `RUSTC` environment
//! variable. We ask it for `--version` once at build time and export the
//! result to the crate as `PDF2MD_RUSTC_VERSION`. Any failure falls back to
//! `"unknown"` so the build never breaks over telemetry.

use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=RUSTC");

    let rustc = std::env::var("RUSTC").unwrap_or_else(|_| "rustc".to_string());
    let version = Command::new(rustc)
        .arg("--version")
        .output()
        .ok()
        .filter(|out| out.status.success())
        .and_then(|out| String::from_utf8(out.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=PDF2MD_RUSTC_VERSION={version}");
}
