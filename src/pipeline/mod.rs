//! Pipeline stages for turning uploaded files into album pages.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. a different text-extraction engine) without
//! touching other stages.
//!
//! ## Data Flow
//!
//! ```text
//! classify ──▶ expand ──▶ normalize / rasterize ──▶ ocr ──▶ assemble
//! (kind)       (unzip)    (pixels → JPEG pair)      (text)   (order)
//! ```
//!
//! 1. [`classify`]  — decide per file: archive, document, image, or skip
//! 2. [`expand`]    — flatten ZIP archives into standalone files; the
//!    post-expansion filename sort IS the page order
//! 3. [`normalize`] — EXIF-correct, cap, and encode raster images; runs in
//!    `spawn_blocking` because pixel work is CPU-bound
//! 4. [`rasterize`] — render PDF pages through pdfium, also on a blocking
//!    thread
//! 5. [`ocr`]       — optional best-effort text extraction per page
//! 6. [`assemble`]  — order indices, dominant orientation, two-up spreads
//!
//! [`encode`] holds the shared JPEG/PNG/data-URL helpers used by stages 3–4
//! and by the share-code generator.

pub mod assemble;
pub mod classify;
pub mod encode;
pub mod expand;
pub mod normalize;
pub mod ocr;
pub mod rasterize;

pub use classify::FileKind;

/// One file submitted to the pipeline: a name, an optional declared content
/// type, and the raw payload.
///
/// Archive entries become `InputFile`s of their own during expansion, with
/// the content type inferred from the entry name.
#[derive(Clone)]
pub struct InputFile {
    /// Filename as submitted (directories already stripped for archive
    /// entries).
    pub name: String,
    /// Declared content type, when the submitter provided one.
    pub content_type: Option<String>,
    /// Raw payload bytes.
    pub bytes: Vec<u8>,
}

impl InputFile {
    pub fn new(name: impl Into<String>, content_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type,
            bytes,
        }
    }

    /// Classify this file by its declared content type and name.
    pub fn kind(&self) -> FileKind {
        classify::classify(self.content_type.as_deref(), &self.name)
    }
}

impl std::fmt::Debug for InputFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputFile")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("bytes", &format_args!("{} bytes", self.bytes.len()))
            .finish()
    }
}
