//! File classification: decide which pipeline stage handles each input.
//!
//! Categories are tested in a fixed order — archive, document, image — and
//! the first match wins. Both the declared content type and the filename
//! extension count, so a ZIP uploaded with a generic
//! `application/octet-stream` type still expands, and a JPEG with no declared
//! type still normalises. Anything that matches nothing is [`FileKind::Unsupported`]
//! and gets skipped with a warning instead of failing the batch.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pipeline category of an input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// ZIP archive; expanded into its entries.
    Archive,
    /// PDF document; rasterised page by page.
    Document,
    /// Raster image; normalised into a single page.
    Image,
    /// Everything else; skipped with a warning.
    Unsupported,
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FileKind::Archive => "archive",
            FileKind::Document => "document",
            FileKind::Image => "image",
            FileKind::Unsupported => "unsupported",
        };
        f.write_str(s)
    }
}

const ZIP_CONTENT_TYPES: &[&str] = &["application/zip", "application/x-zip-compressed"];

const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "webp", "gif", "bmp", "tif", "tiff", "heic",
];

/// Classify a file by declared content type and filename.
///
/// The name check is case-insensitive (`photo.JPG` is an image).
pub fn classify(content_type: Option<&str>, name: &str) -> FileKind {
    let lower = name.to_ascii_lowercase();
    let ctype = content_type.unwrap_or("").to_ascii_lowercase();

    if ZIP_CONTENT_TYPES.contains(&ctype.as_str()) || lower.ends_with(".zip") {
        return FileKind::Archive;
    }
    if ctype == "application/pdf" || lower.ends_with(".pdf") {
        return FileKind::Document;
    }
    if ctype.starts_with("image/")
        || IMAGE_EXTENSIONS
            .iter()
            .any(|ext| has_extension(&lower, ext))
    {
        return FileKind::Image;
    }
    FileKind::Unsupported
}

/// Infer a content type for an archive entry from its (already lowercased or
/// mixed-case) filename. Returns `None` for unknown extensions so the entry
/// falls through to extension-based classification — and, for genuinely
/// unknown types, into the skipped tier rather than a doomed decode attempt.
pub fn guess_mime_from_name(name: &str) -> Option<&'static str> {
    let lower = name.to_ascii_lowercase();
    let ext = lower.rsplit_once('.').map(|(_, ext)| ext)?;
    match ext {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "tif" | "tiff" => Some("image/tiff"),
        "heic" => Some("image/heic"),
        "pdf" => Some("application/pdf"),
        "zip" => Some("application/zip"),
        _ => None,
    }
}

fn has_extension(lower_name: &str, ext: &str) -> bool {
    lower_name
        .rsplit_once('.')
        .is_some_and(|(_, e)| e == ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zip_by_content_type() {
        assert_eq!(
            classify(Some("application/zip"), "upload.bin"),
            FileKind::Archive
        );
        assert_eq!(
            classify(Some("application/x-zip-compressed"), "upload"),
            FileKind::Archive
        );
    }

    #[test]
    fn zip_by_extension() {
        assert_eq!(classify(None, "photos.zip"), FileKind::Archive);
        assert_eq!(classify(None, "PHOTOS.ZIP"), FileKind::Archive);
    }

    #[test]
    fn pdf_by_type_or_extension() {
        assert_eq!(classify(Some("application/pdf"), "x"), FileKind::Document);
        assert_eq!(classify(None, "Deck.PDF"), FileKind::Document);
    }

    #[test]
    fn image_by_type_or_extension() {
        assert_eq!(classify(Some("image/webp"), "x"), FileKind::Image);
        assert_eq!(classify(None, "photo.JPG"), FileKind::Image);
        assert_eq!(classify(None, "scan.tiff"), FileKind::Image);
        assert_eq!(classify(None, "IMG_0001.heic"), FileKind::Image);
    }

    #[test]
    fn archive_wins_over_image() {
        // First category to match decides, so a mislabelled archive expands.
        assert_eq!(classify(Some("image/jpeg"), "album.zip"), FileKind::Archive);
    }

    #[test]
    fn document_wins_over_image_type() {
        assert_eq!(
            classify(Some("application/pdf"), "scan.jpg.pdf"),
            FileKind::Document
        );
    }

    #[test]
    fn unknown_is_unsupported() {
        assert_eq!(classify(None, "notes.txt"), FileKind::Unsupported);
        assert_eq!(classify(Some("text/plain"), "notes.txt"), FileKind::Unsupported);
        assert_eq!(classify(None, "README"), FileKind::Unsupported);
    }

    #[test]
    fn guess_mime_known_extensions() {
        assert_eq!(guess_mime_from_name("a.jpg"), Some("image/jpeg"));
        assert_eq!(guess_mime_from_name("a.JPEG"), Some("image/jpeg"));
        assert_eq!(guess_mime_from_name("a.png"), Some("image/png"));
        assert_eq!(guess_mime_from_name("a.tif"), Some("image/tiff"));
        assert_eq!(guess_mime_from_name("deck.pdf"), Some("application/pdf"));
        assert_eq!(guess_mime_from_name("inner.zip"), Some("application/zip"));
    }

    #[test]
    fn guess_mime_unknown_is_none() {
        assert_eq!(guess_mime_from_name("notes.txt"), None);
        assert_eq!(guess_mime_from_name("no_extension"), None);
    }

    #[test]
    fn extension_must_be_a_suffix_segment() {
        // "jpgthing" must not count as a .jpg; only the last dot segment does.
        assert_eq!(classify(None, "photo.jpgthing"), FileKind::Unsupported);
    }
}
