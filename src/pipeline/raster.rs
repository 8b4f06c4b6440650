//! PDF rasterisation: split one PDF into per-page PNG files via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async
//! contexts. `tokio::task::spawn_blocking` moves the work onto a thread
//! designed for blocking operations so the runtime never stalls during
//! CPU-heavy rendering.
//!
//! ## Why re-derive order from filenames?
//!
//! Pages are written as `page_{index}.png` with a zero-based index, and the
//! returned list is ordered by that parsed index — never by directory
//! listing order, which the filesystem does not guarantee. Downstream, the
//! first entry is always the cover page, so a scrambled order would silently
//! attach account data to the wrong page.

use crate::error::Stmt2CsvError;
use image::ImageFormat;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Rasterise every page of `pdf_path` into `workdir` and return the page
/// image paths in page order.
///
/// The longest image edge is capped at `max_pixels`; pdfium scales the other
/// dimension proportionally.
pub async fn split_pages(
    pdf_path: &Path,
    workdir: &Path,
    max_pixels: u32,
) -> Result<Vec<PathBuf>, Stmt2CsvError> {
    let path = pdf_path.to_path_buf();
    let dir = workdir.to_path_buf();

    tokio::task::spawn_blocking(move || split_pages_blocking(&path, &dir, max_pixels))
        .await
        .map_err(|e| Stmt2CsvError::Internal(format!("Rasterisation task panicked: {e}")))?
}

/// Blocking implementation of page splitting.
fn split_pages_blocking(
    pdf_path: &Path,
    workdir: &Path,
    max_pixels: u32,
) -> Result<Vec<PathBuf>, Stmt2CsvError> {
    let pdfium = Pdfium::default();

    let document = pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| Stmt2CsvError::PdfOpenFailed {
            path: pdf_path.to_path_buf(),
            detail: format!("{e:?}"),
        })?;

    let render_config = PdfRenderConfig::new()
        .set_target_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let mut produced = Vec::new();
    for (idx, page) in document.pages().iter().enumerate() {
        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            Stmt2CsvError::RasterisationFailed {
                page: idx,
                detail: format!("{e:?}"),
            }
        })?;

        let image = bitmap.as_image();
        let out_path = workdir.join(format!("page_{idx}.png"));
        image
            .save_with_format(&out_path, ImageFormat::Png)
            .map_err(|e| Stmt2CsvError::PageWriteFailed {
                path: out_path.clone(),
                detail: e.to_string(),
            })?;

        debug!(
            "Rendered page {idx} -> {}x{} px at '{}'",
            image.width(),
            image.height(),
            out_path.display()
        );
        produced.push(out_path);
    }

    debug!(
        "Split PDF '{}' into {} images",
        pdf_path.display(),
        produced.len()
    );
    Ok(order_by_page_index(produced))
}

/// Parse the zero-based page index out of a `page_{index}.png` filename.
pub(crate) fn page_index(path: &Path) -> Option<usize> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .and_then(|stem| stem.strip_prefix("page_"))
        .and_then(|idx| idx.parse().ok())
}

/// Order page image paths by the index embedded in their filenames.
fn order_by_page_index(mut paths: Vec<PathBuf>) -> Vec<PathBuf> {
    paths.sort_by_key(|p| page_index(p).unwrap_or(usize::MAX));
    paths
}
