//! Pipeline driver: the per-file state machine and the batch loop.
//!
//! Per file the driver walks
//! `DISCOVERED → WORKDIR_READY → RASTERIZED → ASSEMBLED → PERSISTED →
//! FINALIZED`, with every stage returning a `Result` the driver matches on
//! — no unwinding for control flow. Failure anywhere after the working
//! directory exists routes the original PDF to the failure directory via
//! the same [`lifecycle::finalize`] call the success path uses, so exactly
//! one of {dest, failed} ends up holding the file and the scratch tree is
//! always gone.
//!
//! Failing to *reach* `WORKDIR_READY` is different: the file is skipped and
//! left in place (see [`lifecycle`]). The batch loop is resilient by
//! construction — each file is processed independently and an error in one
//! never aborts the rest.

use crate::config::PipelineConfig;
use crate::error::Stmt2CsvError;
use crate::ocr::OcrClient;
use crate::pipeline::{assemble, lifecycle, raster};
use crate::store::DocumentStore;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// How one file left the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    /// Fully processed; original moved to the success directory.
    Succeeded,
    /// A stage failed; original moved to the failure directory.
    Failed,
    /// Working directory could not be created (usually: already exists);
    /// original left untouched in the source directory.
    Skipped,
}

/// Tally of a batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl BatchSummary {
    /// Fold one file's outcome into the tally.
    pub fn record(&mut self, outcome: FileOutcome) {
        match outcome {
            FileOutcome::Succeeded => self.succeeded += 1,
            FileOutcome::Failed => self.failed += 1,
            FileOutcome::Skipped => self.skipped += 1,
        }
    }
}

/// List the `*.pdf` files in `source_dir`, sorted by name.
///
/// The sort makes batch order (and therefore store insertion order)
/// deterministic across runs and filesystems.
pub fn enumerate_pdfs(source_dir: &Path) -> Result<Vec<PathBuf>, Stmt2CsvError> {
    let entries = std::fs::read_dir(source_dir).map_err(|e| {
        Stmt2CsvError::Internal(format!(
            "failed to read source directory '{}': {e}",
            source_dir.display()
        ))
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
        })
        .collect();
    files.sort();

    info!("Found {} pdf files", files.len());
    Ok(files)
}

/// The document-processing pipeline for a batch of statement PDFs.
///
/// All collaborators are injected: the OCR client carries the vision
/// transport behind its trait seam, and the store is any open
/// [`DocumentStore`]. Construct once per run and process files through it.
pub struct Pipeline {
    ocr: OcrClient,
    store: DocumentStore,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(ocr: OcrClient, store: DocumentStore, config: PipelineConfig) -> Self {
        Self { ocr, store, config }
    }

    /// Process each file independently; one file's failure never aborts the
    /// batch.
    pub async fn process_files(&self, files: &[PathBuf]) -> BatchSummary {
        let mut summary = BatchSummary::default();
        for pdf_path in files {
            info!("Processing PDF '{}'", pdf_path.display());
            summary.record(self.process_file(pdf_path).await);
        }
        summary
    }

    /// Run the full state machine for one file.
    pub async fn process_file(&self, pdf_path: &Path) -> FileOutcome {
        // WORKDIR_READY is the gate: without a working directory there is
        // nothing to clean up and nothing gets moved.
        let workdir = match lifecycle::prepare_workdir(&self.config.scratch_dir, pdf_path) {
            Ok(dir) => dir,
            Err(err @ Stmt2CsvError::AlreadyProcessed { .. }) => {
                warn!("Skipping '{}': {err}", pdf_path.display());
                return FileOutcome::Skipped;
            }
            Err(err) => {
                error!("Failed to create working directory. Trace: {err}");
                return FileOutcome::Skipped;
            }
        };

        let result = self.run_stages(pdf_path, &workdir).await;
        let success = result.is_ok();
        if let Err(ref err) = result {
            error!("An error occurred while processing the PDF. Trace: {err}");
        }

        // FINALIZED: runs exactly once per file that got a workdir, on the
        // success and the failure path alike.
        if let Err(err) = lifecycle::finalize(
            pdf_path,
            &workdir,
            success,
            &self.config.target_dir,
            &self.config.failed_dir,
        ) {
            error!("Failed to finalise '{}': {err}", pdf_path.display());
            return FileOutcome::Failed;
        }

        if success {
            FileOutcome::Succeeded
        } else {
            FileOutcome::Failed
        }
    }

    /// RASTERIZED → ASSEMBLED → PERSISTED. Any `Err` routes the file to the
    /// failure directory.
    async fn run_stages(&self, pdf_path: &Path, workdir: &Path) -> Result<(), Stmt2CsvError> {
        let images =
            raster::split_pages(pdf_path, workdir, self.config.max_rendered_pixels).await?;
        if images.is_empty() {
            return Err(Stmt2CsvError::NoPages {
                path: pdf_path.to_path_buf(),
            });
        }

        let metadata = assemble::build_metadata(&self.ocr, pdf_path, &images).await?;
        debug!("Processed data: {metadata:?}");

        info!("Saving OCR data to database");
        self.store.insert_document(&metadata)?;
        Ok(())
    }

    /// The store, for export after the batch completes.
    pub fn store(&self) -> &DocumentStore {
        &self.store
    }
}
