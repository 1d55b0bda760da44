//! Image normalisation: decode, EXIF-correct, cap, and encode a JPEG pair.
//!
//! Phones routinely store pixels sideways and record the real orientation in
//! EXIF; browsers honour it, naive pixel pipelines don't. Orientation is read
//! from the *source* bytes (re-encoding strips metadata, so reading it any
//! later would lose the correction) and applied before any scaling, so the
//! recorded width/height and the orientation category always describe what a
//! viewer will actually see.
//!
//! Pixel work is CPU-bound; [`normalize_image`] pushes it onto a blocking
//! thread the same way the rasteriser does.

use crate::album::Orientation;
use crate::config::StudioConfig;
use crate::error::BookleafError;
use crate::pipeline::{encode, InputFile};
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use std::io::Cursor;
use tracing::{debug, warn};

/// A fully normalised image: final dimensions plus the encoded JPEG pair.
#[derive(Debug)]
pub struct NormalizedImage {
    pub width: u32,
    pub height: u32,
    pub orientation: Orientation,
    /// Full-size JPEG, long edge capped, quality per config.
    pub image_jpeg: Vec<u8>,
    /// Thumbnail JPEG, long edge capped at the thumbnail bound.
    pub thumbnail_jpeg: Vec<u8>,
}

/// Normalise one raster image on a blocking thread.
pub async fn normalize_image(
    file: InputFile,
    config: &StudioConfig,
) -> Result<NormalizedImage, BookleafError> {
    let config = config.clone();
    tokio::task::spawn_blocking(move || normalize_blocking(&file, &config))
        .await
        .map_err(|e| BookleafError::Internal(format!("Join error: {e}")))?
}

/// Synchronous core of [`normalize_image`].
pub fn normalize_blocking(
    file: &InputFile,
    config: &StudioConfig,
) -> Result<NormalizedImage, BookleafError> {
    // The threshold looks at the payload as submitted; the budget applies to
    // what we encode from it.
    let oversized = file.bytes.len() as u64 > config.recompress_threshold_bytes;

    let orientation_value = read_exif_orientation(&file.bytes);
    let decoded = decode_image(file)?;
    let upright = apply_exif_orientation(decoded, orientation_value);
    let scaled = scale_to_long_edge(upright, config.target_long_edge);

    let image_jpeg = encode_with_budget(&scaled, config, oversized, &file.name)?;

    let (tw, th) = bounded_dimensions(
        scaled.width(),
        scaled.height(),
        config.thumbnail_long_edge,
    );
    let thumbnail_jpeg = if (tw, th) == (scaled.width(), scaled.height()) {
        encode::encode_jpeg(&scaled, config.thumbnail_quality)
    } else {
        encode::encode_jpeg(
            &scaled.resize_exact(tw, th, FilterType::Lanczos3),
            config.thumbnail_quality,
        )
    }
    .map_err(|e| BookleafError::PageEncode {
        name: file.name.clone(),
        detail: e.to_string(),
    })?;

    debug!(
        "Normalised '{}': {}x{} (EXIF {}), {} bytes full, {} bytes thumb",
        file.name,
        scaled.width(),
        scaled.height(),
        orientation_value,
        image_jpeg.len(),
        thumbnail_jpeg.len()
    );

    Ok(NormalizedImage {
        width: scaled.width(),
        height: scaled.height(),
        orientation: Orientation::from_dimensions(scaled.width(), scaled.height()),
        image_jpeg,
        thumbnail_jpeg,
    })
}

/// Scale `(width, height)` so the long edge fits `max_edge`, preserving
/// aspect ratio with round-to-nearest. Never upscales.
pub(crate) fn bounded_dimensions(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
    let long = width.max(height);
    if long <= max_edge {
        return (width, height);
    }
    let scale = max_edge as f64 / long as f64;
    let w = ((width as f64 * scale).round() as u32).max(1);
    let h = ((height as f64 * scale).round() as u32).max(1);
    (w, h)
}

fn scale_to_long_edge(img: DynamicImage, max_edge: u32) -> DynamicImage {
    let (w, h) = bounded_dimensions(img.width(), img.height(), max_edge);
    if (w, h) == (img.width(), img.height()) {
        img
    } else {
        img.resize_exact(w, h, FilterType::Lanczos3)
    }
}

/// Read the EXIF orientation value (1–8) from raw image bytes.
///
/// Anything that goes wrong — no EXIF segment, corrupt IFD, out-of-range
/// value — means "1" (leave the pixels alone). An unreadable tag must never
/// fail the page.
fn read_exif_orientation(bytes: &[u8]) -> u32 {
    let mut cursor = Cursor::new(bytes);
    match exif::Reader::new().read_from_container(&mut cursor) {
        Ok(data) => data
            .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
            .filter(|v| (1..=8).contains(v))
            .unwrap_or(1),
        Err(e) => {
            debug!("No EXIF orientation ({e}); defaulting to 1");
            1
        }
    }
}

/// Apply the rotation/flip a given EXIF orientation value calls for, so the
/// result displays upright with no metadata.
fn apply_exif_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}

fn decode_image(file: &InputFile) -> Result<DynamicImage, BookleafError> {
    if is_heif(file) {
        return decode_heif(file);
    }
    let reader = ImageReader::new(Cursor::new(file.bytes.as_slice()))
        .with_guessed_format()
        .map_err(|e| BookleafError::ImageDecode {
            name: file.name.clone(),
            detail: e.to_string(),
        })?;
    reader.decode().map_err(|e| BookleafError::ImageDecode {
        name: file.name.clone(),
        detail: e.to_string(),
    })
}

fn is_heif(file: &InputFile) -> bool {
    let ctype = file
        .content_type
        .as_deref()
        .unwrap_or("")
        .to_ascii_lowercase();
    let lower = file.name.to_ascii_lowercase();
    ctype == "image/heic"
        || ctype == "image/heif"
        || lower.ends_with(".heic")
        || lower.ends_with(".heif")
}

#[cfg(feature = "heif")]
fn decode_heif(file: &InputFile) -> Result<DynamicImage, BookleafError> {
    use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

    let decode_err = |detail: String| BookleafError::ImageDecode {
        name: file.name.clone(),
        detail,
    };

    let lib = LibHeif::new();
    let ctx = HeifContext::read_from_bytes(&file.bytes).map_err(|e| decode_err(e.to_string()))?;
    let handle = ctx
        .primary_image_handle()
        .map_err(|e| decode_err(e.to_string()))?;
    let decoded = lib
        .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgb), None)
        .map_err(|e| decode_err(e.to_string()))?;

    let planes = decoded.planes();
    let plane = planes
        .interleaved
        .ok_or_else(|| decode_err("no interleaved RGB plane".into()))?;
    let (width, height) = (plane.width, plane.height);
    let stride = plane.stride;
    let row_bytes = width as usize * 3;
    let mut raw = Vec::with_capacity(row_bytes * height as usize);
    for y in 0..height as usize {
        raw.extend_from_slice(&plane.data[y * stride..y * stride + row_bytes]);
    }
    let rgb = image::RgbImage::from_raw(width, height, raw)
        .ok_or_else(|| decode_err("HEIF plane size mismatch".into()))?;
    Ok(DynamicImage::ImageRgb8(rgb))
}

#[cfg(not(feature = "heif"))]
fn decode_heif(file: &InputFile) -> Result<DynamicImage, BookleafError> {
    Err(BookleafError::UnsupportedImageFormat {
        name: file.name.clone(),
        hint: "This build cannot decode HEIC/HEIF payloads. \
               Rebuild with --features heif (requires libheif)."
            .into(),
    })
}

fn encode_with_budget(
    img: &DynamicImage,
    config: &StudioConfig,
    oversized: bool,
    name: &str,
) -> Result<Vec<u8>, BookleafError> {
    let encode_err = |e: image::ImageError| BookleafError::PageEncode {
        name: name.to_string(),
        detail: e.to_string(),
    };

    let mut quality = config.page_quality;
    let mut bytes = encode::encode_jpeg(img, quality).map_err(encode_err)?;
    if !oversized {
        return Ok(bytes);
    }

    while bytes.len() as u64 > config.recompress_budget_bytes
        && quality > config.min_recompress_quality
    {
        quality = quality
            .saturating_sub(8)
            .max(config.min_recompress_quality);
        bytes = encode::encode_jpeg(img, quality).map_err(encode_err)?;
        debug!(
            "Recompressed '{}' at q{}: {} bytes (budget {})",
            name,
            quality,
            bytes.len(),
            config.recompress_budget_bytes
        );
    }
    if bytes.len() as u64 > config.recompress_budget_bytes {
        warn!(
            "Page '{}' is {} bytes, still over the {} byte budget at the quality floor ({})",
            name,
            bytes.len(),
            config.recompress_budget_bytes,
            quality
        );
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn jpeg_input(name: &str, width: u32, height: u32) -> InputFile {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        }));
        let bytes = encode::encode_jpeg(&img, 95).unwrap();
        InputFile::new(name, Some("image/jpeg".into()), bytes)
    }

    fn two_pixel() -> DynamicImage {
        // [red, blue] left to right
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        img.put_pixel(1, 0, Rgb([0, 0, 255]));
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn orientation_1_is_a_no_op() {
        let out = apply_exif_orientation(two_pixel(), 1).to_rgb8();
        assert_eq!(out.get_pixel(0, 0), &Rgb([255, 0, 0]));
        assert_eq!(out.get_pixel(1, 0), &Rgb([0, 0, 255]));
    }

    #[test]
    fn orientation_2_mirrors_horizontally() {
        let out = apply_exif_orientation(two_pixel(), 2).to_rgb8();
        assert_eq!(out.get_pixel(0, 0), &Rgb([0, 0, 255]));
        assert_eq!(out.get_pixel(1, 0), &Rgb([255, 0, 0]));
    }

    #[test]
    fn orientation_3_rotates_180() {
        let out = apply_exif_orientation(two_pixel(), 3).to_rgb8();
        assert_eq!(out.get_pixel(0, 0), &Rgb([0, 0, 255]));
        assert_eq!(out.get_pixel(1, 0), &Rgb([255, 0, 0]));
    }

    #[test]
    fn orientation_6_rotates_90_clockwise() {
        let out = apply_exif_orientation(two_pixel(), 6).to_rgb8();
        assert_eq!((out.width(), out.height()), (1, 2));
        // Left pixel of the source becomes the top.
        assert_eq!(out.get_pixel(0, 0), &Rgb([255, 0, 0]));
        assert_eq!(out.get_pixel(0, 1), &Rgb([0, 0, 255]));
    }

    #[test]
    fn orientation_8_rotates_270_clockwise() {
        let out = apply_exif_orientation(two_pixel(), 8).to_rgb8();
        assert_eq!((out.width(), out.height()), (1, 2));
        assert_eq!(out.get_pixel(0, 0), &Rgb([0, 0, 255]));
        assert_eq!(out.get_pixel(0, 1), &Rgb([255, 0, 0]));
    }

    #[test]
    fn out_of_range_orientation_is_a_no_op() {
        let out = apply_exif_orientation(two_pixel(), 9).to_rgb8();
        assert_eq!(out.get_pixel(0, 0), &Rgb([255, 0, 0]));
    }

    #[test]
    fn unreadable_exif_defaults_to_1() {
        assert_eq!(read_exif_orientation(b"definitely not an image"), 1);
    }

    #[test]
    fn plain_jpeg_without_exif_defaults_to_1() {
        let file = jpeg_input("plain.jpg", 8, 8);
        assert_eq!(read_exif_orientation(&file.bytes), 1);
    }

    #[test]
    fn bounded_dimensions_cap_the_long_edge() {
        assert_eq!(bounded_dimensions(4000, 1000, 2048), (2048, 512));
        assert_eq!(bounded_dimensions(1000, 4000, 480), (120, 480));
        assert_eq!(bounded_dimensions(3000, 2000, 2048), (2048, 1365));
    }

    #[test]
    fn bounded_dimensions_never_upscale() {
        assert_eq!(bounded_dimensions(100, 50, 2048), (100, 50));
        assert_eq!(bounded_dimensions(480, 480, 480), (480, 480));
    }

    #[test]
    fn landscape_input_yields_landscape_page() {
        let file = jpeg_input("wide.jpg", 100, 50);
        let out = normalize_blocking(&file, &StudioConfig::default()).unwrap();
        assert_eq!((out.width, out.height), (100, 50));
        assert_eq!(out.orientation, Orientation::Landscape);
        assert_eq!(&out.image_jpeg[..2], &[0xFF, 0xD8]);
        assert_eq!(&out.thumbnail_jpeg[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn square_input_yields_square_page() {
        let file = jpeg_input("sq.jpg", 64, 64);
        let out = normalize_blocking(&file, &StudioConfig::default()).unwrap();
        assert_eq!(out.orientation, Orientation::Square);
    }

    #[test]
    fn long_edge_is_capped_without_distortion() {
        let file = jpeg_input("big.jpg", 3000, 1000);
        let out = normalize_blocking(&file, &StudioConfig::default()).unwrap();
        assert_eq!((out.width, out.height), (2048, 683));
        assert_eq!(out.orientation, Orientation::Landscape);
    }

    #[test]
    fn small_images_are_never_upscaled() {
        let file = jpeg_input("tiny.jpg", 30, 20);
        let out = normalize_blocking(&file, &StudioConfig::default()).unwrap();
        assert_eq!((out.width, out.height), (30, 20));
    }

    #[test]
    fn thumbnail_respects_its_own_bound() {
        let file = jpeg_input("wide.jpg", 1600, 400);
        let out = normalize_blocking(&file, &StudioConfig::default()).unwrap();
        // Full size untouched (under 2048), thumbnail capped at 480 wide.
        assert_eq!((out.width, out.height), (1600, 400));
        let thumb = image::load_from_memory(&out.thumbnail_jpeg).unwrap();
        assert_eq!((thumb.width(), thumb.height()), (480, 120));
    }

    fn noisy_jpeg(name: &str, width: u32, height: u32) -> InputFile {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([
                ((x * 37 + y * 11) % 256) as u8,
                ((x * 13 + y * 101) % 256) as u8,
                ((x * 71 + y * 3) % 256) as u8,
            ])
        }));
        let bytes = encode::encode_jpeg(&img, 95).unwrap();
        InputFile::new(name, Some("image/jpeg".into()), bytes)
    }

    #[test]
    fn tight_budget_steps_quality_down() {
        let file = noisy_jpeg("n.jpg", 300, 300);
        // Threshold of 100 bytes marks any real JPEG oversized.
        let generous = StudioConfig::builder()
            .recompress_threshold_bytes(100)
            .recompress_budget_bytes(10 * 1024 * 1024)
            .build()
            .unwrap();
        let tight = StudioConfig::builder()
            .recompress_threshold_bytes(100)
            .recompress_budget_bytes(200)
            .build()
            .unwrap();

        let kept = normalize_blocking(&file, &generous).unwrap();
        let squeezed = normalize_blocking(&file, &tight).unwrap();
        // The tight run walks to the quality floor; on noisy input that is
        // strictly smaller than the q88 encoding.
        assert!(
            squeezed.image_jpeg.len() < kept.image_jpeg.len(),
            "floor ({}) should be smaller than q88 ({})",
            squeezed.image_jpeg.len(),
            kept.image_jpeg.len()
        );
        // Over budget at the floor is tolerated; the page must still decode.
        let decoded = image::load_from_memory(&squeezed.image_jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (300, 300));
    }

    #[test]
    fn payload_under_threshold_skips_the_ladder() {
        let file = noisy_jpeg("n.jpg", 300, 300);
        // Same tiny budget, but the threshold is far above the payload size,
        // so the ladder must not run at all.
        let config = StudioConfig::builder()
            .recompress_threshold_bytes(50 * 1024 * 1024)
            .recompress_budget_bytes(200)
            .build()
            .unwrap();
        let untouched = normalize_blocking(&file, &config).unwrap();

        let oversized = StudioConfig::builder()
            .recompress_threshold_bytes(100)
            .recompress_budget_bytes(200)
            .build()
            .unwrap();
        let squeezed = normalize_blocking(&file, &oversized).unwrap();
        assert!(untouched.image_jpeg.len() > squeezed.image_jpeg.len());
    }

    #[test]
    fn garbage_bytes_fail_decode() {
        let file = InputFile::new("bad.jpg", Some("image/jpeg".into()), b"garbage".to_vec());
        let err = normalize_blocking(&file, &StudioConfig::default()).unwrap_err();
        match err {
            BookleafError::ImageDecode { name, .. } => assert_eq!(name, "bad.jpg"),
            other => panic!("expected ImageDecode, got: {other}"),
        }
    }

    #[cfg(not(feature = "heif"))]
    #[test]
    fn heic_without_the_feature_is_a_clear_error() {
        let file = InputFile::new("IMG_1.heic", Some("image/heic".into()), vec![0u8; 16]);
        let err = normalize_blocking(&file, &StudioConfig::default()).unwrap_err();
        match err {
            BookleafError::UnsupportedImageFormat { hint, .. } => {
                assert!(hint.contains("heif"), "hint should name the feature: {hint}")
            }
            other => panic!("expected UnsupportedImageFormat, got: {other}"),
        }
    }

    #[tokio::test]
    async fn async_wrapper_delegates() {
        let file = jpeg_input("a.jpg", 40, 30);
        let out = normalize_image(file, &StudioConfig::default()).await.unwrap();
        assert_eq!((out.width, out.height), (40, 30));
    }
}
