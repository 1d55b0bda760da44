//! Publishing: turn a batch of processed pages into an immutable, shareable
//! album, and read albums back by slug.
//!
//! # Why two identifiers?
//!
//! Every album gets a 12-character `id` (identity, shown in API responses)
//! and an 8-character `slug` (the lookup key baked into the share URL). The
//! slug is the only thing a viewer ever presents, so the record is keyed by
//! slug alone; the id exists so a future dashboard can reference albums
//! without leaking their share links.
//!
//! Publishing is all-or-nothing: the entire record, share URL and QR code
//! included, is computed before the store sees a single byte. A failed
//! publish leaves no partial album behind.

use chrono::Utc;
use nanoid::nanoid;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::album::{AlbumMetadata, AlbumRecord, CreateAlbumRequest, CreateAlbumResponse};
use crate::config::PublishConfig;
use crate::error::BookleafError;
use crate::pipeline::{assemble, encode};
use crate::qr;
use crate::store::AlbumStore;

/// Title used when the request title is empty or whitespace.
pub const DEFAULT_TITLE: &str = "Untitled Album";

const ALBUM_ID_LEN: usize = 12;
const SLUG_LEN: usize = 8;

/// Slugs are nanoid output: URL-safe, no dots, no separators. Anything else
/// never names a record, so lookups reject it without touching the store.
static SLUG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").expect("slug pattern is valid"));

// ── Publish ─────────────────────────────────────────────────────────────────

/// Publish `request` as a new album in `store`.
///
/// Derived metadata (page count, dominant orientation, spreads, cover
/// thumbnail) is computed here from the final page order, never taken from
/// the caller. Returns [`BookleafError::EmptySubmission`] for a pageless
/// request before anything is written.
pub async fn publish_album(
    store: &AlbumStore,
    request: CreateAlbumRequest,
    config: &PublishConfig,
) -> Result<CreateAlbumResponse, BookleafError> {
    if request.pages.is_empty() {
        return Err(BookleafError::EmptySubmission);
    }

    let title = normalize_title(&request.title);
    let id = nanoid!(ALBUM_ID_LEN);
    let slug = allocate_slug(store, config).await?;
    let created_at = Utc::now();

    let pages = request.pages;
    let dominant_orientation = assemble::dominant_orientation(&pages);
    let double_page_spreads = assemble::build_spreads(&pages);
    let thumbnail = pages[0].thumbnail_data.clone();

    let short_url = format!("{}/book/{}", config.base_url, slug);
    let qr_png = qr::share_code_png(&short_url, config)?;
    let qr_data_url = encode::to_data_url(&qr_png, "image/png");

    let metadata = AlbumMetadata {
        id: id.clone(),
        title,
        created_at,
        page_count: pages.len(),
        dominant_orientation,
        double_page_spreads,
        short_url: short_url.clone(),
        slug: slug.clone(),
        thumbnail,
    };
    let record = AlbumRecord {
        metadata: metadata.clone(),
        pages,
    };

    store.write_record(&slug, &record).await?;
    info!(
        "Published '{}' as {} ({} pages, {})",
        metadata.title, short_url, metadata.page_count, metadata.dominant_orientation
    );

    Ok(CreateAlbumResponse {
        id,
        slug,
        short_url,
        qr_data_url,
        metadata,
    })
}

fn normalize_title(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        DEFAULT_TITLE.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Roll fresh slugs until one is unclaimed. An 8-character nanoid collides
/// about once per 10^14 albums, so the loop exists for correctness rather
/// than expectation; hitting the attempt cap means the store is lying to us.
async fn allocate_slug(
    store: &AlbumStore,
    config: &PublishConfig,
) -> Result<String, BookleafError> {
    for attempt in 1..=config.max_slug_attempts {
        let slug = nanoid!(SLUG_LEN);
        if !store.record_exists(&slug).await? {
            return Ok(slug);
        }
        warn!(
            "Slug '{}' already taken (attempt {}/{})",
            slug, attempt, config.max_slug_attempts
        );
    }
    Err(BookleafError::Internal(format!(
        "could not allocate a free slug after {} attempts",
        config.max_slug_attempts
    )))
}

// ── Read ────────────────────────────────────────────────────────────────────

/// Look up a published album by slug.
///
/// `Ok(None)` means the album positively does not exist, including slugs
/// that could never name a record. Store failures (I/O, HTTP, a record that
/// will not parse) propagate as errors so callers can distinguish "dead
/// link" from "storage trouble".
pub async fn read_album(
    store: &AlbumStore,
    slug: &str,
) -> Result<Option<AlbumRecord>, BookleafError> {
    if !SLUG_PATTERN.is_match(slug) {
        debug!("Rejecting malformed slug '{}'", slug);
        return Ok(None);
    }
    Ok(store.read_record(slug).await?)
}
