//! # bookleaf
//!
//! Turn folders of photos, PDF documents, and ZIP archives into shareable
//! digital flipbook albums.
//!
//! ## Why this crate?
//!
//! People don't upload tidy input. They drag in phone photos that are only
//! upright because of an EXIF tag, a 40-page scanned PDF, and a ZIP with all
//! of the above mixed together. This crate flattens that mess into one
//! uniform page sequence — web-ready JPEGs with thumbnails, deterministic
//! ordering, orientation metadata — and publishes it as an immutable album
//! behind a short share URL with a scannable QR code.
//!
//! ## Pipeline Overview
//!
//! ```text
//! uploads (images / PDFs / ZIPs)
//!  │
//!  ├─ 1. Classify  content type + filename → image / document / archive
//!  ├─ 2. Expand    unpack ZIP entries, sort everything by name
//!  ├─ 3. Normalize EXIF rotation, long-edge cap, JPEG + thumbnail   (images)
//!  ├─ 4. Rasterize render pages via pdfium (CPU-bound, spawn_blocking) (PDFs)
//!  ├─ 5. Extract   optional best-effort page text
//!  ├─ 6. Assemble  indices 0..N-1, dominant orientation, spreads
//!  └─ 7. Publish   immutable record + share URL + QR code
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bookleaf::{
//!     build_pages, publish_album, AlbumStore, CreateAlbumRequest, PublishConfig,
//!     StudioConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let files = bookleaf::studio::load_input_files(&[
//!         "holiday-1.jpg".into(),
//!         "holiday-2.jpg".into(),
//!     ])
//!     .await?;
//!
//!     let output = build_pages(files, &StudioConfig::default()).await?;
//!
//!     let store = AlbumStore::from_env();
//!     let response = publish_album(
//!         &store,
//!         CreateAlbumRequest {
//!             title: "Holiday".into(),
//!             pages: output.pages,
//!         },
//!         &PublishConfig::default(),
//!     )
//!     .await?;
//!     println!("published at {}", response.short_url);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `bookleaf` binary (clap + anyhow + indicatif + tracing-subscriber) |
//! | `ocr`   | off     | [`TesseractTextExtractor`](pipeline::ocr::TesseractTextExtractor) for page text (needs tesseract + leptonica) |
//! | `heif`  | off     | Decode HEIC/HEIF phone photos (needs libheif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! bookleaf = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod album;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod publish;
pub mod qr;
pub mod store;
pub mod stream;
pub mod studio;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use album::{
    AlbumMetadata, AlbumRecord, CreateAlbumRequest, CreateAlbumResponse, Orientation, Page,
};
pub use config::{PublishConfig, PublishConfigBuilder, StudioConfig, StudioConfigBuilder};
pub use error::{BookleafError, StoreError};
pub use pipeline::ocr::{TextExtractionError, TextExtractor};
pub use pipeline::{FileKind, InputFile};
pub use progress::{NoopProgress, SharedProgress, StudioProgressCallback};
pub use publish::{publish_album, read_album, DEFAULT_TITLE};
pub use store::AlbumStore;
pub use stream::{build_page_stream, PageStream};
pub use studio::{build_pages, build_pages_from_paths, BatchOutput, BatchSummary};

#[cfg(feature = "ocr")]
pub use pipeline::ocr::TesseractTextExtractor;
