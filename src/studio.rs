//! Eager (full-batch) page building.
//!
//! ## Why eager vs. streaming?
//!
//! This module provides the simpler API: process every input file, then
//! return all pages at once together with a [`BatchSummary`]. Use
//! [`crate::stream::build_page_stream`] instead when a UI should show pages
//! as they are produced.
//!
//! ## Why strictly sequential?
//!
//! Page order *is* the product. Files are processed one at a time in their
//! sorted order and every file's pages are appended before the next file
//! starts, so indices are reproducible for the same batch. The heavy pixel
//! work still leaves the async runtime (each decode/render runs on a
//! blocking worker thread), but files never overtake each other.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use nanoid::nanoid;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::album::{Orientation, Page};
use crate::config::StudioConfig;
use crate::error::BookleafError;
use crate::pipeline::{assemble, classify, encode, expand, normalize, ocr, rasterize};
use crate::pipeline::{FileKind, InputFile};

/// Everything a finished batch yields: pages in final order plus counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutput {
    /// Pages in reading order, indices `0..N-1`.
    pub pages: Vec<Page>,
    pub summary: BatchSummary,
}

/// Counters and timings for one batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    /// Files submitted, before archive expansion.
    pub files_received: usize,
    /// Files after archives were expanded.
    pub files_expanded: usize,
    /// Files skipped (unsupported, nested archive, oversized).
    pub files_skipped: usize,
    /// Pages produced across all files.
    pub pages_produced: usize,
    /// Pages that carry extracted text.
    pub pages_with_text: usize,
    /// Majority orientation, `None` for an empty batch.
    pub dominant_orientation: Option<Orientation>,
    /// Number of two-page spreads the pages pair into.
    pub spread_count: usize,
    /// Time spent expanding archives.
    pub expand_duration_ms: u64,
    /// Time spent decoding, rendering, and encoding pages.
    pub process_duration_ms: u64,
    /// Wall-clock time for the whole batch.
    pub total_duration_ms: u64,
}

/// Build album pages from a batch of uploaded files.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `inputs` — Uploaded files: images, PDF documents, or ZIP archives
/// * `config` — Processing configuration
///
/// # Returns
/// `Ok(BatchOutput)` with pages in final reading order, even when some files
/// were skipped (check `output.summary.files_skipped`). A batch in which
/// every file was skipped yields an empty page list, not an error; rejecting
/// an empty album is the publisher's job.
///
/// # Errors
/// Returns `Err(BookleafError)` only for fatal problems: a corrupt archive,
/// an image that will not decode, a corrupt document, or an unavailable PDF
/// engine.
pub async fn build_pages(
    inputs: Vec<InputFile>,
    config: &StudioConfig,
) -> Result<BatchOutput, BookleafError> {
    let total_start = Instant::now();
    let files_received = inputs.len();
    info!("Starting batch: {} files", files_received);

    // ── Step 1: Expand archives ──────────────────────────────────────────
    let expand_start = Instant::now();
    let expanded = expand::expand_files(inputs).await?;
    let expand_duration_ms = expand_start.elapsed().as_millis() as u64;
    let files_expanded = expanded.len();
    debug!(
        "Expanded to {} files in {}ms",
        files_expanded, expand_duration_ms
    );

    // Fire on_batch_start now that we know how many files will actually be
    // processed (after expansion), not the submitted count.
    if let Some(ref cb) = config.progress {
        cb.on_batch_start(files_expanded);
    }

    // ── Step 2: Process files in order ───────────────────────────────────
    let process_start = Instant::now();
    let mut pages: Vec<Page> = Vec::new();
    let mut files_skipped = 0usize;

    for file in expanded {
        match process_file(file, pages.len() as u32, config).await? {
            FileOutcome::Pages(mut produced) => {
                for page in &produced {
                    emit_page(config, page);
                }
                pages.append(&mut produced);
            }
            FileOutcome::Skipped => files_skipped += 1,
        }
    }
    let process_duration_ms = process_start.elapsed().as_millis() as u64;

    // ── Step 3: Final ordering and derived stats ─────────────────────────
    assemble::assign_page_indices(&mut pages);

    let pages_with_text = pages.iter().filter(|p| p.ocr_text.is_some()).count();
    let dominant_orientation = if pages.is_empty() {
        None
    } else {
        Some(assemble::dominant_orientation(&pages))
    };
    let spread_count = assemble::build_spreads(&pages).len();

    if pages.is_empty() {
        warn!(
            "Batch produced no pages ({} of {} files skipped)",
            files_skipped, files_expanded
        );
    }

    if let Some(ref cb) = config.progress {
        cb.on_batch_complete(pages.len(), files_skipped);
    }

    let summary = BatchSummary {
        files_received,
        files_expanded,
        files_skipped,
        pages_produced: pages.len(),
        pages_with_text,
        dominant_orientation,
        spread_count,
        expand_duration_ms,
        process_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Batch complete: {} pages from {} files, {}ms total",
        summary.pages_produced, files_received, summary.total_duration_ms
    );

    Ok(BatchOutput { pages, summary })
}

/// Build album pages from files on disk.
///
/// Content types are inferred from extensions; a path that cannot be read is
/// fatal, unlike the per-file skips inside the batch.
pub async fn build_pages_from_paths(
    paths: &[PathBuf],
    config: &StudioConfig,
) -> Result<BatchOutput, BookleafError> {
    let files = load_input_files(paths).await?;
    build_pages(files, config).await
}

/// Read `paths` into [`InputFile`]s without processing them.
///
/// Used by callers that want classification or expansion only.
pub async fn load_input_files(paths: &[PathBuf]) -> Result<Vec<InputFile>, BookleafError> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => BookleafError::FileNotFound { path: path.clone() },
            std::io::ErrorKind::PermissionDenied => {
                BookleafError::PermissionDenied { path: path.clone() }
            }
            _ => BookleafError::Internal(format!("Failed to read {}: {}", path.display(), e)),
        })?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        let content_type = classify::guess_mime_from_name(&name).map(String::from);
        files.push(InputFile::new(name, content_type, bytes));
    }
    Ok(files)
}

// ── Per-file pipeline ────────────────────────────────────────────────────

/// What one input file contributed to the batch.
pub(crate) enum FileOutcome {
    /// Fully built pages, indexed from the `next_index` the caller passed.
    Pages(Vec<Page>),
    /// The file was skipped; the warning and callback already fired.
    Skipped,
}

/// Run one file through its pipeline stage.
///
/// Shared by the eager and streaming entry points so both produce identical
/// pages for identical input. Skips are handled here (warning plus
/// `on_file_skipped`); fatal errors propagate to the caller.
pub(crate) async fn process_file(
    file: InputFile,
    next_index: u32,
    config: &StudioConfig,
) -> Result<FileOutcome, BookleafError> {
    let kind = file.kind();
    if let Some(ref cb) = config.progress {
        cb.on_file_start(&file.name, kind);
    }

    if file.bytes.len() as u64 > config.max_file_bytes {
        let reason = format!(
            "{} bytes exceeds the {} byte limit",
            file.bytes.len(),
            config.max_file_bytes
        );
        return Ok(skip_file(config, &file.name, &reason));
    }

    match kind {
        FileKind::Image => {
            let name = file.name.clone();
            let normalized = normalize::normalize_image(file, config).await?;
            let page = finish_page(
                name,
                next_index,
                normalized.width,
                normalized.height,
                normalized.orientation,
                normalized.image_jpeg,
                normalized.thumbnail_jpeg,
                config,
            )
            .await;
            Ok(FileOutcome::Pages(vec![page]))
        }
        FileKind::Document => {
            let InputFile { name, bytes, .. } = file;
            let rendered = rasterize::rasterize_document(&name, bytes, config).await?;
            if rendered.is_empty() {
                debug!("Document '{}' has no pages", name);
            }
            let mut pages = Vec::with_capacity(rendered.len());
            for raster in rendered {
                let orientation = Orientation::from_dimensions(raster.width, raster.height);
                let page = finish_page(
                    raster.name,
                    next_index + pages.len() as u32,
                    raster.width,
                    raster.height,
                    orientation,
                    raster.image_jpeg,
                    raster.thumbnail_jpeg,
                    config,
                )
                .await;
                pages.push(page);
            }
            Ok(FileOutcome::Pages(pages))
        }
        // Archives inside archives arrive here unexpanded.
        FileKind::Archive => Ok(skip_file(
            config,
            &file.name,
            "nested archives are not expanded",
        )),
        FileKind::Unsupported => Ok(skip_file(config, &file.name, "unsupported file type")),
    }
}

/// Assemble a full [`Page`] from encoded payloads, running text extraction
/// when an extractor is configured.
#[allow(clippy::too_many_arguments)]
async fn finish_page(
    name: String,
    index: u32,
    width: u32,
    height: u32,
    orientation: Orientation,
    image_jpeg: Vec<u8>,
    thumbnail_jpeg: Vec<u8>,
    config: &StudioConfig,
) -> Page {
    let ocr_text = match config.text_extractor {
        Some(ref extractor) => {
            ocr::extract_best_effort(Arc::clone(extractor), &name, image_jpeg.clone()).await
        }
        None => None,
    };

    Page {
        id: nanoid!(),
        index,
        name,
        width,
        height,
        dpi: config.nominal_dpi,
        orientation,
        image_data: encode::to_data_url(&image_jpeg, "image/jpeg"),
        thumbnail_data: encode::to_data_url(&thumbnail_jpeg, "image/jpeg"),
        ocr_text,
    }
}

pub(crate) fn emit_page(config: &StudioConfig, page: &Page) {
    debug!(
        "Page {} ready: '{}' {}x{} {}",
        page.index, page.name, page.width, page.height, page.orientation
    );
    if let Some(ref cb) = config.progress {
        cb.on_page_ready(page.index as usize, &page.name);
    }
}

fn skip_file(config: &StudioConfig, name: &str, reason: &str) -> FileOutcome {
    warn!("Skipping '{}': {}", name, reason);
    if let Some(ref cb) = config.progress {
        cb.on_file_skipped(name, reason);
    }
    FileOutcome::Skipped
}
