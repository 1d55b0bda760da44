//! Best-effort page text extraction behind a pluggable seam.
//!
//! The pipeline does not care which engine reads the pixels; it hands one
//! page's full-resolution JPEG to a [`TextExtractor`] and accepts whatever
//! comes back. Extraction is strictly best-effort: an engine error or
//! whitespace-only output leaves the page without text, logged at `warn!`,
//! and never fails the page or the batch. Albums are perfectly usable
//! without text — it only powers search and accessibility.
//!
//! The default build ships no engine. Enable the `ocr` feature for
//! [`TesseractTextExtractor`], or implement the trait over any other engine
//! (a remote OCR service, a different binding) and inject it through
//! [`crate::config::StudioConfigBuilder::text_extractor`].

use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

/// An engine failure during text extraction. Always non-fatal to the batch.
#[derive(Debug, Error)]
#[error("text extraction failed: {0}")]
pub struct TextExtractionError(pub String);

/// Extracts text from one rendered page.
pub trait TextExtractor: Send + Sync {
    /// Extract text from a page's full-resolution JPEG payload.
    fn extract_text(&self, jpeg: &[u8]) -> Result<String, TextExtractionError>;
}

/// Run the extractor on a blocking thread and fold every failure mode into
/// `None`. Kept text is stored verbatim (engines emit meaningful trailing
/// newlines); only the emptiness test trims.
pub async fn extract_best_effort(
    extractor: Arc<dyn TextExtractor>,
    page_name: &str,
    jpeg: Vec<u8>,
) -> Option<String> {
    let name = page_name.to_string();
    let joined = tokio::task::spawn_blocking(move || extractor.extract_text(&jpeg)).await;
    match joined {
        Ok(Ok(text)) => {
            if text.trim().is_empty() {
                None
            } else {
                Some(text)
            }
        }
        Ok(Err(e)) => {
            warn!("Text extraction failed for '{name}': {e}");
            None
        }
        Err(e) => {
            warn!("Text extraction task failed for '{name}': {e}");
            None
        }
    }
}

/// Tesseract-backed extractor (feature `ocr`).
///
/// Tesseract's C API is stateful and not thread-safe, so the engine lives
/// behind a `Mutex`; with the pipeline's sequential page processing the lock
/// is uncontended.
#[cfg(feature = "ocr")]
pub struct TesseractTextExtractor {
    engine: std::sync::Mutex<leptess::LepTess>,
}

#[cfg(feature = "ocr")]
impl TesseractTextExtractor {
    /// Create an extractor for the given language code (e.g. `"eng"`).
    ///
    /// Fails when the tessdata for the language is not installed.
    pub fn new(language: &str) -> Result<Self, TextExtractionError> {
        let engine = leptess::LepTess::new(None, language)
            .map_err(|e| TextExtractionError(e.to_string()))?;
        Ok(Self {
            engine: std::sync::Mutex::new(engine),
        })
    }
}

#[cfg(feature = "ocr")]
impl TextExtractor for TesseractTextExtractor {
    fn extract_text(&self, jpeg: &[u8]) -> Result<String, TextExtractionError> {
        let mut engine = self
            .engine
            .lock()
            .map_err(|_| TextExtractionError("tesseract engine mutex poisoned".into()))?;
        engine
            .set_image_from_mem(jpeg)
            .map_err(|e| TextExtractionError(e.to_string()))?;
        engine
            .get_utf8_text()
            .map_err(|e| TextExtractionError(e.to_string()))
    }
}
