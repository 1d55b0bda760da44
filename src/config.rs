//! Configuration types for page building and album publishing.
//!
//! All pipeline behaviour is controlled through [`StudioConfig`], built via
//! its [`StudioConfigBuilder`]; the publish-time knobs (share URL origin, QR
//! geometry) live in [`PublishConfig`]. Keeping every knob in one struct makes
//! it trivial to share configs across threads and to see, in one place, why
//! two runs produced different pages.
//!
//! The defaults reproduce the published behaviour exactly: long edge 2048,
//! thumbnails at 480, JPEG qualities 88/75, PDF rasterisation at 192 DPI.
//! Override them only when you know the viewer on the other end can take it.

use crate::error::BookleafError;
use crate::pipeline::ocr::TextExtractor;
use crate::progress::SharedProgress;
use std::fmt;
use std::sync::Arc;

/// Configuration for building pages out of a batch of input files.
///
/// Built via [`StudioConfig::builder()`] or using [`StudioConfig::default()`].
///
/// # Example
/// ```rust
/// use bookleaf::StudioConfig;
///
/// let config = StudioConfig::builder()
///     .render_dpi(150)
///     .target_long_edge(1600)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct StudioConfig {
    /// Maximum long edge of a full-size page in pixels. Default: 2048.
    ///
    /// 2048 keeps a full-screen page sharp on laptop and tablet displays while
    /// the base64 payload of a typical photo stays near 300–600 KB. Sources
    /// smaller than this are never upscaled.
    pub target_long_edge: u32,

    /// Maximum long edge of a page thumbnail in pixels. Default: 480.
    pub thumbnail_long_edge: u32,

    /// JPEG quality for full-size pages, 1–100. Default: 88.
    pub page_quality: u8,

    /// JPEG quality for thumbnails, 1–100. Default: 75.
    pub thumbnail_quality: u8,

    /// Density recorded on produced pages, in DPI. Default: 300.
    ///
    /// Purely descriptive metadata carried into the album record; it does not
    /// drive any resampling.
    pub nominal_dpi: u32,

    /// Rasterisation density for PDF pages, in DPI. Range: 72–400. Default: 192.
    ///
    /// PDF geometry is expressed in 72-per-inch points, so pages render at a
    /// scale of `render_dpi / 72`. 192 resolves body text cleanly; the long
    /// edge cap still bounds the worst-case bitmap for poster-sized pages.
    pub render_dpi: u32,

    /// Input payloads larger than this get the tighter recompression budget.
    /// Default: 4 MiB.
    pub recompress_threshold_bytes: u64,

    /// Target byte size for pages built from oversized payloads. Default: 3 MiB.
    ///
    /// The encoder steps quality down from [`page_quality`](Self::page_quality)
    /// until the output fits or [`min_recompress_quality`](Self::min_recompress_quality)
    /// is reached.
    pub recompress_budget_bytes: u64,

    /// Quality floor for the recompression ladder, 1–100. Default: 40.
    pub min_recompress_quality: u8,

    /// Input files larger than this are skipped with a warning. Default: 100 MiB.
    pub max_file_bytes: u64,

    /// Per-page text extractor. `None` disables extraction entirely.
    ///
    /// Extraction is strictly best-effort: failures and whitespace-only output
    /// leave the page without text and never fail the batch.
    pub text_extractor: Option<Arc<dyn TextExtractor>>,

    /// Progress callback for batch/file/page events. `None` stays silent.
    pub progress: Option<SharedProgress>,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            target_long_edge: 2048,
            thumbnail_long_edge: 480,
            page_quality: 88,
            thumbnail_quality: 75,
            nominal_dpi: 300,
            render_dpi: 192,
            recompress_threshold_bytes: 4 * 1024 * 1024,
            recompress_budget_bytes: 3 * 1024 * 1024,
            min_recompress_quality: 40,
            max_file_bytes: 100 * 1024 * 1024,
            text_extractor: None,
            progress: None,
        }
    }
}

impl fmt::Debug for StudioConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StudioConfig")
            .field("target_long_edge", &self.target_long_edge)
            .field("thumbnail_long_edge", &self.thumbnail_long_edge)
            .field("page_quality", &self.page_quality)
            .field("thumbnail_quality", &self.thumbnail_quality)
            .field("nominal_dpi", &self.nominal_dpi)
            .field("render_dpi", &self.render_dpi)
            .field("recompress_threshold_bytes", &self.recompress_threshold_bytes)
            .field("recompress_budget_bytes", &self.recompress_budget_bytes)
            .field("min_recompress_quality", &self.min_recompress_quality)
            .field("max_file_bytes", &self.max_file_bytes)
            .field(
                "text_extractor",
                &self.text_extractor.as_ref().map(|_| "<dyn TextExtractor>"),
            )
            .field("progress", &self.progress.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

impl StudioConfig {
    /// Create a new builder for `StudioConfig`.
    pub fn builder() -> StudioConfigBuilder {
        StudioConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`StudioConfig`].
#[derive(Debug)]
pub struct StudioConfigBuilder {
    config: StudioConfig,
}

impl StudioConfigBuilder {
    pub fn target_long_edge(mut self, px: u32) -> Self {
        self.config.target_long_edge = px.max(100);
        self
    }

    pub fn thumbnail_long_edge(mut self, px: u32) -> Self {
        self.config.thumbnail_long_edge = px.max(16);
        self
    }

    pub fn page_quality(mut self, q: u8) -> Self {
        self.config.page_quality = q.clamp(1, 100);
        self
    }

    pub fn thumbnail_quality(mut self, q: u8) -> Self {
        self.config.thumbnail_quality = q.clamp(1, 100);
        self
    }

    pub fn nominal_dpi(mut self, dpi: u32) -> Self {
        self.config.nominal_dpi = dpi.max(1);
        self
    }

    pub fn render_dpi(mut self, dpi: u32) -> Self {
        self.config.render_dpi = dpi.clamp(72, 400);
        self
    }

    pub fn recompress_threshold_bytes(mut self, bytes: u64) -> Self {
        self.config.recompress_threshold_bytes = bytes;
        self
    }

    pub fn recompress_budget_bytes(mut self, bytes: u64) -> Self {
        self.config.recompress_budget_bytes = bytes;
        self
    }

    pub fn min_recompress_quality(mut self, q: u8) -> Self {
        self.config.min_recompress_quality = q.clamp(1, 100);
        self
    }

    pub fn max_file_bytes(mut self, bytes: u64) -> Self {
        self.config.max_file_bytes = bytes;
        self
    }

    pub fn text_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.config.text_extractor = Some(extractor);
        self
    }

    pub fn progress(mut self, callback: SharedProgress) -> Self {
        self.config.progress = Some(callback);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<StudioConfig, BookleafError> {
        let c = &self.config;
        if c.thumbnail_long_edge > c.target_long_edge {
            return Err(BookleafError::InvalidConfig(format!(
                "Thumbnail long edge ({}) must not exceed the page long edge ({})",
                c.thumbnail_long_edge, c.target_long_edge
            )));
        }
        if c.min_recompress_quality > c.page_quality {
            return Err(BookleafError::InvalidConfig(format!(
                "Quality floor ({}) must not exceed the page quality ({})",
                c.min_recompress_quality, c.page_quality
            )));
        }
        Ok(self.config)
    }
}

/// Configuration for publishing an album: share URL origin and QR geometry.
///
/// # Example
/// ```rust
/// use bookleaf::PublishConfig;
///
/// let config = PublishConfig::builder()
///     .base_url("https://albums.example.com")
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct PublishConfig {
    /// Origin for share URLs; the album lands at `{base_url}/book/{slug}`.
    /// Default: `http://localhost:3000`.
    pub base_url: String,

    /// Target edge length of the share-code PNG in pixels. Default: 512.
    ///
    /// The actual edge is the nearest whole multiple of the QR module size,
    /// so it can come out slightly under the target.
    pub qr_pixels: u32,

    /// Quiet-zone width around the share code in modules. Default: 1.
    pub qr_margin_modules: u32,

    /// How many slugs to try before giving up on a publish. Default: 4.
    ///
    /// An 8-character URL-safe slug collides with probability ~2⁻⁴⁸ per pair;
    /// the retry exists so a collision degrades to a re-roll instead of a
    /// silently overwritten album.
    pub max_slug_attempts: u32,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            qr_pixels: 512,
            qr_margin_modules: 1,
            max_slug_attempts: 4,
        }
    }
}

impl PublishConfig {
    /// Create a new builder for `PublishConfig`.
    pub fn builder() -> PublishConfigBuilder {
        PublishConfigBuilder {
            config: Self::default(),
        }
    }

    /// Default configuration with the share origin taken from the
    /// `BOOKLEAF_BASE_URL` environment variable when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("BOOKLEAF_BASE_URL") {
            if !url.trim().is_empty() {
                config.base_url = url.trim().trim_end_matches('/').to_string();
            }
        }
        config
    }
}

/// Builder for [`PublishConfig`].
#[derive(Debug)]
pub struct PublishConfigBuilder {
    config: PublishConfig,
}

impl PublishConfigBuilder {
    /// Share URL origin. Trailing slashes are stripped so slug joining never
    /// doubles them.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into().trim().trim_end_matches('/').to_string();
        self
    }

    pub fn qr_pixels(mut self, px: u32) -> Self {
        self.config.qr_pixels = px.clamp(64, 4096);
        self
    }

    pub fn qr_margin_modules(mut self, modules: u32) -> Self {
        self.config.qr_margin_modules = modules.min(8);
        self
    }

    pub fn max_slug_attempts(mut self, attempts: u32) -> Self {
        self.config.max_slug_attempts = attempts.max(1);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PublishConfig, BookleafError> {
        if self.config.base_url.is_empty() {
            return Err(BookleafError::InvalidConfig(
                "Base URL must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}
