//! # Pagination Engine
//!
//! Partitions one continuously rendered raster into discrete pages. The
//! input is just the raster's pixel dimensions and a target page geometry;
//! the output is an ordered list of page-draw instructions that a file
//! writer executes. No drawing happens here, which is what makes the
//! algorithm unit-testable without a renderer.
//!
//! The raster is scaled to the page's usable width. If the scaled height
//! fits one page's content band, the plan is a single full placement.
//! Otherwise the raster is cut into full-width horizontal bands of
//! `pixels_per_page` source rows each. Slice boundaries come from one
//! monotone boundary function, so the bands are pairwise disjoint and union
//! to exactly `[0, H)` — no row drawn twice, none omitted.
//!
//! Non-first pages reserve a continuation-header band at the top of the
//! content area and shift their image placement down by its height. Every
//! page reserves the footer band.

use serde::{Deserialize, Serialize};

/// Physical page dimensions and reserved bands, in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageGeometry {
    pub page_width: f64,
    pub page_height: f64,
    pub margin: f64,
    /// Height of the footer band drawn on every page.
    pub footer_band: f64,
    /// Height of the `"<title> (continued)"` band on non-first pages.
    pub continuation_header: f64,
}

impl PageGeometry {
    /// A4 portrait with 10mm margin and 10mm bands, the product default.
    pub fn a4_portrait() -> Self {
        Self {
            page_width: 210.0,
            page_height: 297.0,
            margin: 10.0,
            footer_band: 10.0,
            continuation_header: 10.0,
        }
    }

    pub fn usable_width(&self) -> f64 {
        self.page_width - 2.0 * self.margin
    }

    /// Page height minus margins and the footer band.
    pub fn usable_content_height(&self) -> f64 {
        self.page_height - 2.0 * self.margin - self.footer_band
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::a4_portrait()
    }
}

/// One page's draw instruction: which source band to crop and where to
/// place it on the page. Source coordinates are raster pixels; destination
/// coordinates are page millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSlice {
    pub index: usize,
    pub source_y: u32,
    pub source_height: u32,
    pub dest_x: f64,
    pub dest_y: f64,
    pub dest_width: f64,
    pub dest_height: f64,
    /// Whether this page carries the continuation-header band.
    pub continuation_header: bool,
}

/// The full partition of a raster into pages.
#[derive(Debug, Clone, PartialEq)]
pub struct PagePlan {
    pub total_pages: usize,
    /// Source pixel rows per page in the multi-page case; 0 when the whole
    /// raster fits one page.
    pub pixels_per_page: f64,
    pub slices: Vec<PageSlice>,
}

/// Partition a raster of `raster_width` x `raster_height` pixels into
/// pages of the given geometry.
///
/// A zero-dimension raster yields a single empty page. Rasters obtained
/// through [`crate::raster::Raster`] always have nonzero dimensions.
pub fn paginate(raster_width: u32, raster_height: u32, geometry: &PageGeometry) -> PagePlan {
    if raster_width == 0 || raster_height == 0 {
        return PagePlan {
            total_pages: 1,
            pixels_per_page: 0.0,
            slices: Vec::new(),
        };
    }

    let usable_width = geometry.usable_width();
    let usable_content_height = geometry.usable_content_height();
    // mm of page per source pixel row once scaled to the usable width.
    let scale = usable_width / raster_width as f64;
    let scaled_height = raster_height as f64 * scale;

    if scaled_height <= usable_content_height {
        return PagePlan {
            total_pages: 1,
            pixels_per_page: 0.0,
            slices: vec![PageSlice {
                index: 0,
                source_y: 0,
                source_height: raster_height,
                dest_x: geometry.margin,
                dest_y: geometry.margin,
                dest_width: usable_width,
                dest_height: scaled_height,
                continuation_header: false,
            }],
        };
    }

    // Source rows that fit one page's content band. Clamped to a whole row
    // minimum so a pathological geometry cannot produce zero-height bands.
    let pixels_per_page =
        (usable_content_height / scaled_height * raster_height as f64).max(1.0);
    let total_pages = (raster_height as f64 / pixels_per_page).ceil() as usize;

    let slices = slice_rows(raster_height, pixels_per_page)
        .into_iter()
        .enumerate()
        .map(|(index, (source_y, source_height))| {
            let continuation_header = index > 0;
            PageSlice {
                index,
                source_y,
                source_height,
                dest_x: geometry.margin,
                dest_y: geometry.margin
                    + if continuation_header {
                        geometry.continuation_header
                    } else {
                        0.0
                    },
                dest_width: usable_width,
                dest_height: source_height as f64 * scale,
                continuation_header,
            }
        })
        .collect();

    PagePlan {
        total_pages,
        pixels_per_page,
        slices,
    }
}

/// Cut `[0, height)` into consecutive `(start, len)` bands of roughly
/// `pixels_per_page` rows. Both ends of every band come from the same
/// monotone boundary sequence, so the bands partition the range exactly.
/// Floor boundaries keep every band non-empty: for `pixels_per_page >= 1`
/// consecutive floors differ by at least one row, and the final boundary
/// is strictly below `height`.
fn slice_rows(height: u32, pixels_per_page: f64) -> Vec<(u32, u32)> {
    let total = (height as f64 / pixels_per_page).ceil() as usize;
    let boundary = |i: usize| -> u32 { (i as f64 * pixels_per_page) as u32 };

    (0..total)
        .map(|i| {
            let start = boundary(i);
            let end = if i + 1 == total { height } else { boundary(i + 1) };
            (start, end - start)
        })
        .collect()
}
