//! PDF rasterisation: render every page to an encoded JPEG pair via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! `tokio::task::spawn_blocking` moves the whole document loop onto a
//! dedicated blocking-pool thread, so Tokio worker threads never stall during
//! CPU-heavy rendering.
//!
//! ## Density
//!
//! PDF geometry is expressed in points, 72 per inch. Rendering at
//! `render_dpi / 72` times the page's point dimensions gives a predictable
//! density regardless of physical page size; the thumbnail is then bounded by
//! the same never-upscale rule the normaliser uses.

use crate::config::StudioConfig;
use crate::error::BookleafError;
use crate::pipeline::encode;
use crate::pipeline::normalize::bounded_dimensions;
use image::imageops::FilterType;
use pdfium_render::prelude::*;
use tracing::{debug, info};

/// One rasterised document page, already encoded.
#[derive(Debug)]
pub struct RasterPage {
    /// Display name: `{stem}-{n}` with a 1-based page number.
    pub name: String,
    /// 1-based page number within the source document.
    pub page_number: usize,
    pub width: u32,
    pub height: u32,
    pub image_jpeg: Vec<u8>,
    pub thumbnail_jpeg: Vec<u8>,
}

/// Rasterise every page of a PDF on a blocking thread.
///
/// A corrupt document is fatal; a zero-page document yields an empty list.
pub async fn rasterize_document(
    name: &str,
    bytes: Vec<u8>,
    config: &StudioConfig,
) -> Result<Vec<RasterPage>, BookleafError> {
    let name = name.to_string();
    let config = config.clone();
    tokio::task::spawn_blocking(move || rasterize_blocking(&name, &bytes, &config))
        .await
        .map_err(|e| BookleafError::Internal(format!("Render task panicked: {e}")))?
}

/// Blocking implementation of document rasterisation.
pub fn rasterize_blocking(
    name: &str,
    bytes: &[u8],
    config: &StudioConfig,
) -> Result<Vec<RasterPage>, BookleafError> {
    let pdfium = bind_pdfium()?;

    let document =
        pdfium
            .load_pdf_from_byte_slice(bytes, None)
            .map_err(|e| BookleafError::CorruptDocument {
                name: name.to_string(),
                detail: format!("{e:?}"),
            })?;

    let total = document.pages().len() as usize;
    info!("Document '{}' loaded: {} pages", name, total);

    let stem = document_stem(name);
    let mut pages = Vec::with_capacity(total);

    for (idx, page) in document.pages().iter().enumerate() {
        let page_number = idx + 1;
        let render_err = |detail: String| BookleafError::PageRender {
            name: name.to_string(),
            page: page_number,
            detail,
        };

        let (pixel_width, pixel_height) = scaled_pixel_size(
            page.width().value,
            page.height().value,
            config.render_dpi,
        );
        let render_config = PdfRenderConfig::new()
            .set_target_width(pixel_width)
            .set_target_height(pixel_height);

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| render_err(format!("{e:?}")))?;
        let image = bitmap.as_image();
        debug!(
            "Rendered '{}' page {} -> {}x{} px",
            name,
            page_number,
            image.width(),
            image.height()
        );

        let image_jpeg =
            encode::encode_jpeg(&image, config.page_quality).map_err(|e| render_err(e.to_string()))?;

        let (tw, th) =
            bounded_dimensions(image.width(), image.height(), config.thumbnail_long_edge);
        let thumbnail_jpeg = if (tw, th) == (image.width(), image.height()) {
            encode::encode_jpeg(&image, config.thumbnail_quality)
        } else {
            encode::encode_jpeg(
                &image.resize_exact(tw, th, FilterType::Lanczos3),
                config.thumbnail_quality,
            )
        }
        .map_err(|e| render_err(e.to_string()))?;

        pages.push(RasterPage {
            name: format!("{stem}-{page_number}"),
            page_number,
            width: image.width(),
            height: image.height(),
            image_jpeg,
            thumbnail_jpeg,
        });
    }

    Ok(pages)
}

fn bind_pdfium() -> Result<Pdfium, BookleafError> {
    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|e| BookleafError::PdfEngineUnavailable(format!("{e:?}")))?;
    Ok(Pdfium::new(bindings))
}

/// Pixel dimensions for a page of `points_w` x `points_h` points rendered at
/// `dpi` (points are 72 per inch).
fn scaled_pixel_size(points_w: f32, points_h: f32, dpi: u32) -> (i32, i32) {
    let scale = dpi as f32 / 72.0;
    (
        (points_w * scale).round() as i32,
        (points_h * scale).round() as i32,
    )
}

/// Strip a case-insensitive `.pdf` suffix for page naming.
pub(crate) fn document_stem(name: &str) -> String {
    let lower = name.to_ascii_lowercase();
    if lower.ends_with(".pdf") {
        // The suffix is pure ASCII, so the byte offset is a char boundary.
        name[..name.len() - 4].to_string()
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stem_strips_pdf_suffix_case_insensitively() {
        assert_eq!(document_stem("deck.pdf"), "deck");
        assert_eq!(document_stem("Deck.PDF"), "Deck");
        assert_eq!(document_stem("archive.Pdf"), "archive");
    }

    #[test]
    fn stem_keeps_other_names_intact() {
        assert_eq!(document_stem("notes.pdf.bak"), "notes.pdf.bak");
        assert_eq!(document_stem("deck"), "deck");
        assert_eq!(document_stem("a.b.pdf"), "a.b");
    }

    #[test]
    fn stem_handles_non_ascii_names() {
        assert_eq!(document_stem("émissions.pdf"), "émissions");
        assert_eq!(document_stem("写真集.PDF"), "写真集");
    }

    #[test]
    fn letter_page_at_192_dpi() {
        // US Letter is 612x792 points.
        assert_eq!(scaled_pixel_size(612.0, 792.0, 192), (1632, 2112));
    }

    #[test]
    fn a4_page_at_default_density() {
        let (w, h) = scaled_pixel_size(595.2, 841.9, 192);
        assert_eq!((w, h), (1587, 2245));
    }

    #[test]
    fn seventy_two_dpi_is_identity() {
        assert_eq!(scaled_pixel_size(500.0, 500.0, 72), (500, 500));
    }
}
