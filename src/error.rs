//! Error types for the stmt2csv library.
//!
//! One enum covers the whole pipeline, but its variants fall into two
//! classes the driver treats very differently:
//!
//! * **Startup-fatal** — configuration problems (missing credential, bad
//!   endpoint). These are returned before any file is touched and terminate
//!   the process; they are never encountered mid-batch.
//!
//! * **Per-file** — everything else. The driver catches these at the
//!   file-processing boundary, logs the trace, and routes the source PDF to
//!   the failure directory. One file's error never aborts the batch.
//!
//! [`Stmt2CsvError::AlreadyProcessed`] is special: it means the idempotence
//! guard fired before a working directory was created, so the file is
//! skipped and left in place rather than routed anywhere.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the stmt2csv library.
#[derive(Debug, Error)]
pub enum Stmt2CsvError {
    // ── Configuration errors (startup-fatal) ──────────────────────────────
    /// No API credential in the environment. Checked before processing any
    /// file so a misconfigured run fails at startup, not mid-batch.
    #[error("API key missing.\nSet AZURE_OPENAI_API_KEY before running.")]
    MissingApiKey,

    /// Endpoint configuration could not be turned into a usable client.
    #[error("Invalid service endpoint configuration: {detail}")]
    InvalidEndpoint { detail: String },

    /// A required directory could not be created at startup.
    #[error("Failed to create directory '{path}': {source}")]
    DirectoryCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── File lifecycle errors ─────────────────────────────────────────────
    /// The working directory already exists — the PDF was (at least
    /// partially) processed by a prior run. The file is skipped.
    #[error("Working directory '{workdir}' already exists - pdf was already processed")]
    AlreadyProcessed { workdir: PathBuf },

    /// Creating the per-document working directory failed.
    #[error("Failed to create working directory '{workdir}': {source}")]
    WorkdirCreateFailed {
        workdir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Relocating the source PDF into the success/failure directory failed.
    #[error("Failed to move '{from}' to '{to}': {detail}")]
    MoveFailed {
        from: PathBuf,
        to: PathBuf,
        detail: String,
    },

    // ── Rasterisation errors ──────────────────────────────────────────────
    /// pdfium could not open the document at all.
    #[error("Failed to open PDF '{path}': {detail}")]
    PdfOpenFailed { path: PathBuf, detail: String },

    /// pdfium returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// The converter produced zero page images.
    #[error("No page images produced for '{path}'")]
    NoPages { path: PathBuf },

    /// A rendered page image could not be written to the working directory.
    #[error("Failed to write page image '{path}': {detail}")]
    PageWriteFailed { path: PathBuf, detail: String },

    // ── OCR errors ────────────────────────────────────────────────────────
    /// The vision API signalled a rate limit (HTTP 429). Transient: the OCR
    /// client retries this with randomised backoff.
    #[error("Rate limit exceeded")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Every allowed retry hit the rate limit. Fatal for this file.
    #[error("Rate limit still exceeded after {retries} retries")]
    RateLimitExhausted { retries: u32 },

    /// The vision API returned a non-retryable error.
    #[error("Vision API error (HTTP {status}): {detail}")]
    ApiError { status: u16, detail: String },

    /// Network-level failure talking to the vision API.
    #[error("Vision API transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The page image could not be read for the request attachment.
    #[error("Failed to read image '{path}': {source}")]
    ImageReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The model's (sanitised) response was not the expected JSON object.
    /// Aborts the whole document, not just the page.
    #[error("Malformed model response for {context}: {source}")]
    MalformedResponse {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    // ── Storage errors ────────────────────────────────────────────────────
    /// SQLite open/insert/read failure.
    #[error("Document store error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Document metadata could not be (de)serialised for storage.
    #[error("Document metadata serialisation error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Export errors ─────────────────────────────────────────────────────
    /// Writing a CSV export file failed. Logged per document; export of the
    /// remaining documents continues.
    #[error("Failed to write CSV '{path}': {detail}")]
    ExportWriteFailed { path: PathBuf, detail: String },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Stmt2CsvError {
    /// True for the transient rate-limit signal the OCR client retries on.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Stmt2CsvError::RateLimited { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_processed_display() {
        let e = Stmt2CsvError::AlreadyProcessed {
            workdir: PathBuf::from("scratch/statement_2024"),
        };
        let msg = e.to_string();
        assert!(msg.contains("already processed"), "got: {msg}");
        assert!(msg.contains("statement_2024"));
    }

    #[test]
    fn rate_limited_is_the_retryable_signal() {
        let e = Stmt2CsvError::RateLimited {
            retry_after_secs: Some(30),
        };
        assert!(e.to_string().contains("Rate limit"));
        assert!(e.is_rate_limit());
    }

    #[test]
    fn rate_limit_exhausted_is_not_retryable() {
        let e = Stmt2CsvError::RateLimitExhausted { retries: 10 };
        assert!(!e.is_rate_limit());
        assert!(e.to_string().contains("10"));
    }

    #[test]
    fn api_error_display() {
        let e = Stmt2CsvError::ApiError {
            status: 500,
            detail: "backend overloaded".into(),
        };
        assert!(e.to_string().contains("500"));
        assert!(e.to_string().contains("backend overloaded"));
    }
}
