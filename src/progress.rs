//! Progress-callback trait for batch-processing events.
//!
//! Inject an [`Arc<dyn StudioProgressCallback>`] via
//! [`crate::config::StudioConfigBuilder::progress`] to receive real-time
//! events as the pipeline works through a batch.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers can
//! forward events to a Tokio broadcast channel, a WebSocket, a status line in
//! a UI, or a terminal progress bar — without the library knowing anything
//! about how the host application communicates. (Callers that want pages
//! themselves as they are produced should use [`crate::stream::build_page_stream`]
//! instead; the callback carries only event metadata.)
//!
//! # Example
//!
//! ```rust
//! use bookleaf::{StudioProgressCallback, StudioConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     pages: Arc<AtomicUsize>,
//! }
//!
//! impl StudioProgressCallback for CountingCallback {
//!     fn on_page_ready(&self, index: usize, name: &str) {
//!         let done = self.pages.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("page {done}: #{index} '{name}'");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     pages: Arc::new(AtomicUsize::new(0)),
//! });
//!
//! let config = StudioConfig::builder()
//!     .progress(counter as Arc<dyn StudioProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::pipeline::FileKind;
use std::sync::Arc;

/// Called by the pipeline as it works through a batch.
///
/// Implementations must be `Send + Sync`; files are processed sequentially,
/// but per-file pixel work runs on blocking worker threads, so events can
/// arrive from a different thread than the one that started the batch. All
/// methods have default no-op implementations so callers only override what
/// they care about.
pub trait StudioProgressCallback: Send + Sync {
    /// Called once after archive expansion, before any file is processed.
    ///
    /// # Arguments
    /// * `file_count` — number of expanded files about to be processed
    fn on_batch_start(&self, file_count: usize) {
        let _ = file_count;
    }

    /// Called just before a file enters its pipeline stage.
    fn on_file_start(&self, name: &str, kind: FileKind) {
        let _ = (name, kind);
    }

    /// Called when a file is skipped without failing the batch
    /// (unsupported type, nested archive, oversized payload).
    fn on_file_skipped(&self, name: &str, reason: &str) {
        let _ = (name, reason);
    }

    /// Called when a page has been fully produced (encoded, text extracted).
    ///
    /// # Arguments
    /// * `index` — the page's running order index (0-based)
    /// * `name`  — the page name as it will appear in the album
    fn on_page_ready(&self, index: usize, name: &str) {
        let _ = (index, name);
    }

    /// Called once after the last file has been attempted.
    ///
    /// # Arguments
    /// * `page_count`    — pages produced by the batch
    /// * `skipped_count` — files skipped along the way
    fn on_batch_complete(&self, page_count: usize, skipped_count: usize) {
        let _ = (page_count, skipped_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgress;

impl StudioProgressCallback for NoopProgress {}

/// Convenience alias matching the type stored in [`crate::config::StudioConfig`].
pub type SharedProgress = Arc<dyn StudioProgressCallback>;
