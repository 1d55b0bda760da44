//! Share-code generation: QR matrix rendered to a margin-exact PNG.
//!
//! The `qrcode` crate computes the module matrix; rasterisation happens here
//! because the bundled renderer only offers the QR standard's 4-module quiet
//! zone, and the share code ships with a 1-module margin at a fixed pixel
//! target.
//! Error-correction level H keeps codes scannable from a phone screen at an
//! angle, photographed with glare, or printed small.

use crate::config::PublishConfig;
use crate::error::BookleafError;
use crate::pipeline::encode;
use image::{DynamicImage, Rgb, RgbImage};
use qrcode::{EcLevel, QrCode};
use tracing::debug;

// Module colours as published: near-black #111111 on white.
const DARK: Rgb<u8> = Rgb([0x11, 0x11, 0x11]);
const LIGHT: Rgb<u8> = Rgb([0xFF, 0xFF, 0xFF]);

/// Render a QR code for `url` as PNG bytes.
///
/// The module size is the largest whole number of pixels that keeps the
/// total edge (matrix plus margin on both sides) within
/// [`PublishConfig::qr_pixels`], so the output edge lands at or just under
/// the target and every module stays pixel-aligned.
pub fn share_code_png(url: &str, config: &PublishConfig) -> Result<Vec<u8>, BookleafError> {
    let share_err = |detail: String| BookleafError::ShareCode { detail };

    let code =
        QrCode::with_error_correction_level(url, EcLevel::H).map_err(|e| share_err(e.to_string()))?;

    let modules = code.width() as u32;
    let total_modules = modules + 2 * config.qr_margin_modules;
    let module_px = (config.qr_pixels / total_modules).max(1);
    let edge = total_modules * module_px;

    let colors = code.to_colors();
    let mut img = RgbImage::from_pixel(edge, edge, LIGHT);
    for (i, color) in colors.iter().enumerate() {
        if *color == qrcode::Color::Dark {
            let mx = (i as u32 % modules + config.qr_margin_modules) * module_px;
            let my = (i as u32 / modules + config.qr_margin_modules) * module_px;
            for dy in 0..module_px {
                for dx in 0..module_px {
                    img.put_pixel(mx + dx, my + dy, DARK);
                }
            }
        }
    }
    debug!(
        "Share code for '{}': {} modules, {} px/module, {}x{} px",
        url, modules, module_px, edge, edge
    );

    encode::encode_png(&DynamicImage::ImageRgb8(img)).map_err(|e| share_err(e.to_string()))
}
