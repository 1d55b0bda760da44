//! Streaming page building: emit pages as they are produced.
//!
//! ## Why stream?
//!
//! A batch with a thick PDF or a hundred photos takes a while. A stream-based
//! API lets callers show each page the moment it exists (an upload screen
//! filling in thumbnails one by one) instead of staring at a spinner until
//! [`crate::studio::build_pages`] returns.
//!
//! Unlike some streaming APIs there is no out-of-order mode: files are
//! processed strictly sequentially, so pages arrive already in their final
//! index order, identical to what the eager API would return.

use std::pin::Pin;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::Stream;
use tracing::{debug, info, warn};

use crate::album::Page;
use crate::config::StudioConfig;
use crate::error::BookleafError;
use crate::pipeline::{expand, InputFile};
use crate::studio::{self, FileOutcome};

/// A boxed stream of produced pages.
///
/// Ends after the last page, or after a single `Err` item when the batch
/// fails mid-way.
pub type PageStream = Pin<Box<dyn Stream<Item = Result<Page, BookleafError>> + Send>>;

/// Bounded so a slow consumer applies backpressure to the producer task
/// instead of buffering a whole album of data URLs.
const PAGE_CHANNEL_CAPACITY: usize = 8;

/// Build album pages from a batch, streaming each page as it is ready.
///
/// Archive expansion happens before the stream is returned, so a corrupt
/// archive fails this call directly. After that, fatal mid-batch errors
/// (an image that will not decode, a corrupt document) arrive as the final
/// `Err` item and end the stream; skipped files simply produce no items.
///
/// # Example
/// ```rust,no_run
/// use bookleaf::{build_page_stream, InputFile, StudioConfig};
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes = std::fs::read("photo.jpg")?;
/// let files = vec![InputFile::new("photo.jpg", None, bytes)];
/// let mut pages = build_page_stream(files, StudioConfig::default()).await?;
/// while let Some(page) = pages.next().await {
///     match page {
///         Ok(p) => println!("page {}: {} ({}x{})", p.index, p.name, p.width, p.height),
///         Err(e) => eprintln!("batch failed: {e}"),
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub async fn build_page_stream(
    inputs: Vec<InputFile>,
    config: StudioConfig,
) -> Result<PageStream, BookleafError> {
    info!("Starting streaming batch: {} files", inputs.len());

    // Expansion failures are fatal before anything can stream.
    let expanded = expand::expand_files(inputs).await?;

    if let Some(ref cb) = config.progress {
        cb.on_batch_start(expanded.len());
    }

    let (tx, rx) = mpsc::channel::<Result<Page, BookleafError>>(PAGE_CHANNEL_CAPACITY);

    tokio::spawn(async move {
        let mut produced: usize = 0;
        let mut skipped: usize = 0;

        for file in expanded {
            match studio::process_file(file, produced as u32, &config).await {
                Ok(FileOutcome::Pages(pages)) => {
                    for page in pages {
                        studio::emit_page(&config, &page);
                        produced += 1;
                        if tx.send(Ok(page)).await.is_err() {
                            debug!("Page stream receiver dropped; stopping batch");
                            return;
                        }
                    }
                }
                Ok(FileOutcome::Skipped) => skipped += 1,
                Err(e) => {
                    warn!("Streaming batch failed: {}", e);
                    let _ = tx.send(Err(e)).await;
                    return;
                }
            }
        }

        if produced == 0 {
            warn!("Batch produced no pages ({} files skipped)", skipped);
        }
        if let Some(ref cb) = config.progress {
            cb.on_batch_complete(produced, skipped);
        }
        debug!(
            "Streaming batch complete: {} pages, {} skipped",
            produced, skipped
        );
    });

    Ok(Box::pin(ReceiverStream::new(rx)))
}
