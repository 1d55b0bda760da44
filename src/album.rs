//! Album domain types: pages, metadata, records, and the publish API shapes.
//!
//! Everything here serialises as camelCase JSON. The on-disk/record shape is
//! the public contract of the store: a record produced by one backend must
//! read back identically through the other, and a viewer that consumes the
//! JSON sees `pageCount`, `dominantOrientation`, `doublePageSpreads` and
//! friends, with page payloads carried inline as data URLs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Orientation category of a page, derived from its final pixel dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
    Square,
}

impl Orientation {
    /// Classify final dimensions. Width equal to height is square, wider than
    /// tall is landscape, everything else is portrait.
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        if width == height {
            Orientation::Square
        } else if width > height {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Orientation::Portrait => "portrait",
            Orientation::Landscape => "landscape",
            Orientation::Square => "square",
        };
        f.write_str(s)
    }
}

/// One fully processed page of an album.
///
/// `image_data` and `thumbnail_data` are `data:image/jpeg;base64,…` URLs;
/// the record is self-contained and needs no side-car files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    /// Random identifier, unique within the album.
    pub id: String,
    /// 0-based position in reading order.
    pub index: u32,
    /// Display name: the source filename, or `{stem}-{n}` for document pages.
    pub name: String,
    /// Final width in pixels, after orientation correction and scaling.
    pub width: u32,
    /// Final height in pixels.
    pub height: u32,
    /// Nominal density recorded for the page.
    pub dpi: u32,
    /// Orientation category of the final dimensions.
    pub orientation: Orientation,
    /// Full-size JPEG payload as a data URL.
    pub image_data: String,
    /// Thumbnail JPEG payload as a data URL.
    pub thumbnail_data: String,
    /// Extracted page text, when an extractor ran and produced something.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ocr_text: Option<String>,
}

/// Album metadata: everything about a published album except the pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumMetadata {
    /// Random album identifier (12 characters, URL-safe).
    pub id: String,
    /// Display title, already trimmed and defaulted.
    pub title: String,
    /// Publish timestamp.
    pub created_at: DateTime<Utc>,
    /// Number of pages in the album.
    pub page_count: usize,
    /// Majority orientation across the pages; drives the viewer's layout.
    pub dominant_orientation: Orientation,
    /// Greedy consecutive page-index pairs for two-up display.
    pub double_page_spreads: Vec<(u32, u32)>,
    /// Full share URL (`{base}/book/{slug}`).
    pub short_url: String,
    /// The lookup key (8 characters, URL-safe).
    pub slug: String,
    /// First page's thumbnail data URL, for link previews and listings.
    pub thumbnail: String,
}

/// A complete published album: metadata plus pages, exactly as stored.
///
/// Records are immutable once written; there is no update or delete shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumRecord {
    #[serde(flatten)]
    pub metadata: AlbumMetadata,
    pub pages: Vec<Page>,
}

/// Input to [`crate::publish::publish_album`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAlbumRequest {
    /// Requested title; trimmed by the publisher, placeholder when empty.
    pub title: String,
    /// Pages in final reading order, as produced by the pipeline.
    pub pages: Vec<Page>,
}

/// Output of [`crate::publish::publish_album`].
///
/// Carries no page payloads: the caller already holds the pages, and the
/// metadata is enough to render a confirmation screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAlbumResponse {
    pub id: String,
    pub slug: String,
    /// Full share URL for the published album.
    pub short_url: String,
    /// Share-code PNG as a `data:image/png;base64,…` URL.
    pub qr_data_url: String,
    pub metadata: AlbumMetadata,
}
