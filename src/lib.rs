//! # stmt2csv
//!
//! Digitise scanned bank-statement PDFs with a vision-capable language
//! model and export the transactions as CSV.
//!
//! ## Why a vision model?
//!
//! Statement scans and faxes defeat classic text extraction — skewed pages,
//! dot-matrix fonts, stamps over the amounts. Rasterising each page and
//! letting a VLM read it as a human would turns the hardest step into a
//! prompt, and the rest of the system into plumbing around it: request
//! orchestration, response sanitisation, crash-safe file movement.
//!
//! ## Pipeline Overview
//!
//! ```text
//! source/*.pdf
//!  │
//!  ├─ 1. Lifecycle  create per-document working directory (idempotence guard)
//!  ├─ 2. Raster     one PNG per page via pdfium (CPU-bound, spawn_blocking)
//!  ├─ 3. Assemble   sequential OCR per page + account info from the cover page
//!  ├─ 4. Persist    one row per document in the SQLite store
//!  ├─ 5. Finalize   original → dest/ or failed/, working directory removed
//!  └─ 6. Export     one CSV per stored document
//! ```
//!
//! Processing is deliberately serial: one PDF at a time, one OCR round trip
//! at a time. The only waiting points are the vision API calls and the
//! randomised backoff after a rate limit.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use stmt2csv::{
//!     enumerate_pdfs, export_documents, AzureEndpoint, AzureVisionModel, DocumentStore,
//!     OcrClient, Pipeline, PipelineConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::default();
//!     config.ensure_directories()?;
//!
//!     // Credential read from AZURE_OPENAI_API_KEY; fails fast before any file.
//!     let endpoint = AzureEndpoint::from_env(
//!         "https://my-resource.openai.azure.com",
//!         "2024-02-01",
//!         "gpt-4o",
//!     )?;
//!     let model = Arc::new(AzureVisionModel::new(endpoint, config.api_timeout_secs)?);
//!     let ocr = OcrClient::new(model, config.max_retries);
//!     let store = DocumentStore::open(&config.db_path)?;
//!
//!     let files = enumerate_pdfs(&config.source_dir)?;
//!     let pipeline = Pipeline::new(ocr, store, config.clone());
//!     let summary = pipeline.process_files(&files).await;
//!     eprintln!("{} ok / {} failed / {} skipped",
//!         summary.succeeded, summary.failed, summary.skipped);
//!
//!     export_documents(pipeline.store(), &config.export_dir)?;
//!     Ok(())
//! }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod document;
pub mod error;
pub mod export;
pub mod ocr;
pub mod pipeline;
pub mod prompts;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{AzureEndpoint, PipelineConfig, PipelineConfigBuilder};
pub use document::{
    AccountInformation, DocumentMetadata, PageRecord, StoredDocument, Transaction,
    TransactionBlock,
};
pub use error::Stmt2CsvError;
pub use export::{export_document, export_documents};
pub use ocr::{AzureVisionModel, OcrClient, VisionModel};
pub use pipeline::driver::{enumerate_pdfs, BatchSummary, FileOutcome, Pipeline};
pub use store::DocumentStore;
