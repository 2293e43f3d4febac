//! Writing the processing log (and the Markdown) to disk.
//!
//! Both files are written atomically: the bytes go to a temporary file in
//! the destination directory, which is then renamed over the target. A
//! crash or a full disk therefore never leaves a half-written JSON log for a
//! downstream reader to choke on. The temporary file is removed on every
//! error path when it goes out of scope.

use crate::error::LoggingError;
use crate::log_entry::LogEntry;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Serialise `entry` as pretty JSON and write it to `destination`.
///
/// Never panics; every failure comes back as a [`LoggingError`].
pub fn persist(entry: &LogEntry, destination: &Path) -> Result<(), LoggingError> {
    let mut json = serde_json::to_vec_pretty(entry)?;
    json.push(b'\n');

    write_atomic(destination, &json).map_err(|e| match e {
        AtomicWriteError::Write(source) => LoggingError::Write {
            path: destination.to_path_buf(),
            source,
        },
        AtomicWriteError::Persist(source) => LoggingError::Persist {
            path: destination.to_path_buf(),
            source,
        },
    })?;

    debug!("Processing log written to {}", destination.display());
    Ok(())
}

/// Why an atomic write failed.
#[derive(Debug)]
pub(crate) enum AtomicWriteError {
    /// Creating or filling the temporary file.
    Write(std::io::Error),
    /// Renaming it onto the destination.
    Persist(std::io::Error),
}

impl AtomicWriteError {
    pub(crate) fn into_io(self) -> std::io::Error {
        match self {
            AtomicWriteError::Write(e) | AtomicWriteError::Persist(e) => e,
        }
    }
}

/// Write `bytes` to `path` via a sibling temporary file and a rename.
///
/// Missing parent directories are created.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), AtomicWriteError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(AtomicWriteError::Write)?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(AtomicWriteError::Write)?;
    tmp.write_all(bytes).map_err(AtomicWriteError::Write)?;
    tmp.as_file().sync_all().map_err(AtomicWriteError::Write)?;
    tmp.persist(path)
        .map_err(|e| AtomicWriteError::Persist(e.error))?;
    Ok(())
}
