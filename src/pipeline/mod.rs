//! Pipeline stages for statement-PDF processing.
//!
//! Each submodule implements exactly one transformation step, so every
//! stage is independently testable and the driver stays a thin state
//! machine over `Result`s.
//!
//! ## Data Flow
//!
//! ```text
//! source/*.pdf ──▶ lifecycle ──▶ raster ──▶ assemble ──▶ store
//!  (discovery)     (workdir)     (pdfium)   (OCR calls)  (sqlite)
//!                      │
//!                      └──▶ finalize: dest/ or failed/, workdir removed
//! ```
//!
//! 1. [`lifecycle`] — per-document working directory (idempotence guard)
//!    and success/failure relocation of the original
//! 2. [`raster`]    — one PNG per page into the working directory; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 3. [`assemble`]  — sequential OCR calls per page (plus the cover-page
//!    account-info call) into one [`crate::document::DocumentMetadata`]
//! 4. [`driver`]    — the per-file state machine and the batch loop

pub mod assemble;
pub mod driver;
pub mod lifecycle;
pub mod raster;
