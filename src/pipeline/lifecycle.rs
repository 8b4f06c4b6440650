//! Per-document file lifecycle: working-directory creation and crash-safe
//! relocation of the source PDF.
//!
//! The working directory doubles as the idempotence guard: its existence
//! means the PDF was already picked up by a prior (possibly crashed) run,
//! and [`prepare_workdir`] refuses to touch it again. The guard only holds
//! while the directory survives — once [`finalize`] removes it, the same
//! filename would be processed afresh.
//!
//! [`finalize`] is the single exit point for every file that got a working
//! directory: it removes the scratch tree and moves the original into the
//! success or failure directory. The driver calls it on every path out of
//! the stage sequence, errors included; only a failure to *create* the
//! working directory skips it, leaving the source file untouched for manual
//! inspection.

use crate::error::Stmt2CsvError;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Derive the working-directory name from the PDF's base filename:
/// lowercased, `.pdf` suffix stripped.
pub fn workdir_name(pdf_path: &Path) -> String {
    let base = pdf_path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    base.strip_suffix(".pdf")
        .map(str::to_string)
        .unwrap_or(base)
}

/// Create the working directory for `pdf_path` under `scratch_dir`.
///
/// Fails with [`Stmt2CsvError::AlreadyProcessed`] if the directory already
/// exists — the sole guard against double-processing a file left in the
/// source location by a crashed run.
pub fn prepare_workdir(scratch_dir: &Path, pdf_path: &Path) -> Result<PathBuf, Stmt2CsvError> {
    let workdir = scratch_dir.join(workdir_name(pdf_path));
    if workdir.exists() {
        return Err(Stmt2CsvError::AlreadyProcessed { workdir });
    }
    fs::create_dir_all(&workdir).map_err(|source| Stmt2CsvError::WorkdirCreateFailed {
        workdir: workdir.clone(),
        source,
    })?;
    debug!("Created working directory '{}'", workdir.display());
    Ok(workdir)
}

/// Remove the working directory (if it still exists) and move the original
/// PDF into the success or failure directory. Returns the destination path.
pub fn finalize(
    pdf_path: &Path,
    workdir: &Path,
    success: bool,
    target_dir: &Path,
    failed_dir: &Path,
) -> Result<PathBuf, Stmt2CsvError> {
    if workdir.exists() {
        fs::remove_dir_all(workdir).map_err(|e| {
            Stmt2CsvError::Internal(format!(
                "failed to remove working directory '{}': {e}",
                workdir.display()
            ))
        })?;
    }

    let dest_dir = if success { target_dir } else { failed_dir };
    let file_name = pdf_path.file_name().ok_or_else(|| {
        Stmt2CsvError::Internal(format!("'{}' has no file name", pdf_path.display()))
    })?;
    let dest = unique_destination(dest_dir, file_name);
    move_file(pdf_path, &dest)?;
    info!(
        "Moved PDF file '{}' into '{}'",
        pdf_path.display(),
        dest_dir.display()
    );
    Ok(dest)
}

/// Pick a destination path that does not clobber an artifact from a prior
/// run: `name.pdf`, then `name-1.pdf`, `name-2.pdf`, ...
fn unique_destination(dir: &Path, file_name: &OsStr) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }

    let name = Path::new(file_name);
    let stem = name
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = name.extension().map(|e| e.to_string_lossy().into_owned());

    let mut n = 1u32;
    loop {
        let suffixed = match &ext {
            Some(ext) => format!("{stem}-{n}.{ext}"),
            None => format!("{stem}-{n}"),
        };
        let candidate = dir.join(suffixed);
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

/// Move a file, falling back to copy + remove when `rename` fails (scratch
/// and destination may live on different filesystems).
fn move_file(from: &Path, to: &Path) -> Result<(), Stmt2CsvError> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    fs::copy(from, to)
        .and_then(|_| fs::remove_file(from))
        .map_err(|e| Stmt2CsvError::MoveFailed {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            detail: e.to_string(),
        })?;
    Ok(())
}
