//! Image encoding: `DynamicImage` → JPEG/PNG bytes and data URLs.
//!
//! Album records carry page payloads inline as `data:` URLs so a record is
//! fully self-contained — one JSON read renders a whole album with no
//! side-car object fetches. Pages are JPEG (photographic content, quality
//! pinned by config); the share code is PNG (hard black/white edges, and
//! JPEG ringing around QR modules costs scanners real error-correction
//! margin).

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder};
use std::io::Cursor;
use tracing::debug;

/// Encode an image as JPEG at the given quality (1–100).
///
/// The image is flattened to RGB8 first: JPEG has no alpha channel, and
/// PNG/GIF sources routinely decode with one.
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let rgb = img.to_rgb8();
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut buf), quality);
    encoder.write_image(
        rgb.as_raw(),
        rgb.width(),
        rgb.height(),
        ExtendedColorType::Rgb8,
    )?;
    debug!(
        "Encoded {}x{} JPEG at q{}: {} bytes",
        rgb.width(),
        rgb.height(),
        quality,
        buf.len()
    );
    Ok(buf)
}

/// Encode an image as PNG.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(buf)
}

/// Wrap encoded bytes as a `data:` URL.
pub fn to_data_url(bytes: &[u8], mime: &str) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}
