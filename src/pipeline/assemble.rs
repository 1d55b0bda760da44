//! Page sequence assembly: order indices, dominant orientation, spreads.
//!
//! Pure functions over the page list, used both when a batch finishes and
//! again at publish time so the stored metadata is always derived from the
//! pages actually being stored, not from whatever the client computed.

use crate::album::{Orientation, Page};

/// Re-number pages to exactly `0..N-1` in their current order.
pub fn assign_page_indices(pages: &mut [Page]) {
    for (i, page) in pages.iter_mut().enumerate() {
        page.index = i as u32;
    }
}

/// Majority orientation across the pages.
///
/// Ties break in a fixed order — portrait, then landscape, then square — so
/// a 2/2 portrait-landscape album always lays out as portrait. An empty list
/// defaults to portrait; publishers reject empty submissions before this
/// matters.
pub fn dominant_orientation(pages: &[Page]) -> Orientation {
    let mut portrait = 0usize;
    let mut landscape = 0usize;
    let mut square = 0usize;
    for page in pages {
        match page.orientation {
            Orientation::Portrait => portrait += 1,
            Orientation::Landscape => landscape += 1,
            Orientation::Square => square += 1,
        }
    }

    let mut best = Orientation::Portrait;
    let mut count = portrait;
    if landscape > count {
        best = Orientation::Landscape;
        count = landscape;
    }
    if square > count {
        best = Orientation::Square;
    }
    best
}

/// Greedy consecutive pairing of page indices for two-up display:
/// `[(i0,i1), (i2,i3), …]`. An odd trailing page stays unpaired.
pub fn build_spreads(pages: &[Page]) -> Vec<(u32, u32)> {
    pages
        .chunks_exact(2)
        .map(|pair| (pair[0].index, pair[1].index))
        .collect()
}
