//! Error types for the bookleaf library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`BookleafError`] — **Fatal**: the batch or the publish cannot proceed
//!   at all (corrupt archive, undecodable image, empty submission, storage
//!   failure). Returned as `Err(BookleafError)` from the top-level
//!   `build_pages` / `publish_album` / `read_album` functions.
//!
//! * [`StoreError`] — storage-backend failures (filesystem I/O, remote blob
//!   HTTP errors, malformed stored records). Wrapped into
//!   [`BookleafError::Store`] at the public surface so callers can still
//!   match on the backend detail.
//!
//! Deliberately *not* errors: unsupported input files (skipped with a
//! warning), unreadable EXIF orientation (defaults to "no rotation"), failed
//! or empty text extraction (the page simply carries no text), and reading a
//! slug that was never published ([`Ok(None)`] from the reader). Those are
//! expected outcomes, and turning them into errors would force every caller
//! to re-classify them.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the bookleaf library.
#[derive(Debug, Error)]
pub enum BookleafError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// A ZIP archive could not be opened or one of its entries could not be
    /// read. Fatal to the whole batch: a truncated upload usually means the
    /// rest of the payload cannot be trusted either.
    #[error("Archive '{name}' is corrupt or unreadable: {detail}")]
    CorruptArchive { name: String, detail: String },

    // ── Image errors ──────────────────────────────────────────────────────
    /// An image payload could not be decoded.
    #[error("Image '{name}' could not be decoded: {detail}")]
    ImageDecode { name: String, detail: String },

    /// The payload is in a format this build cannot decode (HEIC/HEIF
    /// without the `heif` feature).
    #[error("Image '{name}' is in an unsupported format.\n{hint}")]
    UnsupportedImageFormat { name: String, hint: String },

    /// JPEG/PNG encoding of a produced page failed.
    #[error("Failed to encode page image for '{name}': {detail}")]
    PageEncode { name: String, detail: String },

    // ── Document errors ───────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("Document '{name}' is corrupt: {detail}")]
    CorruptDocument { name: String, detail: String },

    /// Rasterisation of a specific document page failed.
    #[error("Rasterisation failed for '{name}' page {page}: {detail}")]
    PageRender {
        name: String,
        page: usize,
        detail: String,
    },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to the PDFium library: {0}\n\n\
Rasterising PDF documents needs the PDFium shared library.\n\
  • Download a build for your platform from the pdfium-binaries releases.\n\
  • Place libpdfium next to the executable, or install it system-wide.\n"
    )]
    PdfEngineUnavailable(String),

    // ── Publish errors ────────────────────────────────────────────────────
    /// The submission carried no pages. Client error: nothing was written.
    #[error("At least one page is required")]
    EmptySubmission,

    /// Share-code (QR) generation failed.
    #[error("Failed to generate share code: {detail}")]
    ShareCode { detail: String },

    /// The storage backend failed. See [`StoreError`] for the detail.
    #[error(transparent)]
    Store(#[from] StoreError),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failures from the album storage backends.
///
/// `read_record` maps *positive absence* (filesystem `NotFound`, remote
/// HTTP 404) to `Ok(None)` before any of these can surface; every variant
/// here is a real failure that must not be mistaken for "no such album".
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem read/write failed.
    #[error("Album store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The remote blob request could not be completed.
    #[error("Blob store request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote blob store answered with an unexpected status.
    #[error("Blob store returned HTTP {status} for '{key}'")]
    UnexpectedStatus { key: String, status: u16 },

    /// An album record could not be serialised, or a stored record is
    /// malformed. Malformed is an error, not "not found": the record exists.
    #[error("Album record JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_submission_display() {
        let e = BookleafError::EmptySubmission;
        assert_eq!(e.to_string(), "At least one page is required");
    }

    #[test]
    fn corrupt_archive_display() {
        let e = BookleafError::CorruptArchive {
            name: "photos.zip".into(),
            detail: "invalid central directory".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("photos.zip"), "got: {msg}");
        assert!(msg.contains("central directory"), "got: {msg}");
    }

    #[test]
    fn unsupported_format_display_carries_hint() {
        let e = BookleafError::UnsupportedImageFormat {
            name: "IMG_0001.heic".into(),
            hint: "Rebuild with --features heif to decode HEIC payloads.".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("IMG_0001.heic"));
        assert!(msg.contains("--features heif"));
    }

    #[test]
    fn unexpected_status_display() {
        let e = StoreError::UnexpectedStatus {
            key: "books/a1b2c3d4.json".into(),
            status: 503,
        };
        let msg = e.to_string();
        assert!(msg.contains("503"));
        assert!(msg.contains("books/a1b2c3d4.json"));
    }

    #[test]
    fn store_error_wraps_transparently() {
        let inner = StoreError::UnexpectedStatus {
            key: "books/x.json".into(),
            status: 500,
        };
        let outer = BookleafError::from(inner);
        assert!(outer.to_string().contains("HTTP 500"));
    }

    #[test]
    fn page_render_display() {
        let e = BookleafError::PageRender {
            name: "deck.pdf".into(),
            page: 3,
            detail: "bitmap allocation failed".into(),
        };
        assert!(e.to_string().contains("page 3"));
        assert!(e.to_string().contains("deck.pdf"));
    }
}
