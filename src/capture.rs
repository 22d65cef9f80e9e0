use std::path::{Path, PathBuf};

use image::{imageops, RgbaImage};
use tokio::time::sleep;
use tracing::{debug, info};

use crate::config::WaitPolicy;
use crate::error::Result;
use crate::hide;
use crate::page::Page;

/// The preload scroll gives up once the last measured height passes this
/// ceiling.
const MAX_PRELOAD_HEIGHT: u32 = 10_000;

/// One viewport-sized region of the document, in document coordinates.
/// `right - left` and `bottom - top` never exceed the viewport dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRect {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

/// Options for one full-page capture.
#[derive(Debug, Clone)]
pub struct CaptureOptions {
    /// Directory the stitched image is written into. Must already exist.
    pub save_path: PathBuf,
    pub image_name: String,
    /// Elements to hide before tiling begins, as `id=<value>` /
    /// `class=<value>` selectors.
    pub hide: Vec<String>,
    /// Scroll to the bottom until the page height stabilizes before
    /// capturing, for pages that load content as they scroll.
    pub preload_scroll: bool,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            save_path: PathBuf::from("."),
            image_name: "full_screenshot.png".to_string(),
            hide: Vec::new(),
            preload_scroll: false,
        }
    }
}

impl CaptureOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.save_path = path.into();
        self
    }

    pub fn image_name(mut self, name: impl Into<String>) -> Self {
        self.image_name = name.into();
        self
    }

    pub fn hide(mut self, selectors: Vec<String>) -> Self {
        self.hide = selectors;
        self
    }

    pub fn preload_scroll(mut self, preload: bool) -> Self {
        self.preload_scroll = preload;
        self
    }
}

/// Generate the ordered list of capture rectangles covering a
/// `total_width` x `total_height` document with viewport-sized tiles.
///
/// Rectangles are row-major (left-to-right, then top-to-bottom); the last
/// column and row are clamped to the document edge, so together they cover
/// the full extent with no gaps. The list is empty if either viewport
/// dimension is zero.
pub fn tile_rects(
    total_width: u32,
    total_height: u32,
    viewport_width: u32,
    viewport_height: u32,
) -> Vec<TileRect> {
    if viewport_width == 0 || viewport_height == 0 {
        return Vec::new();
    }

    let mut rects = Vec::new();
    let mut top = 0;
    while top < total_height {
        let bottom = top.saturating_add(viewport_height).min(total_height);
        let mut left = 0;
        while left < total_width {
            let right = left.saturating_add(viewport_width).min(total_width);
            rects.push(TileRect { left, top, right, bottom });
            left = left.saturating_add(viewport_width);
        }
        top = top.saturating_add(viewport_height);
    }
    rects
}

/// Where the tile captured for `rect` lands in the stitched canvas.
///
/// When the rectangle's row would run past the document bottom, the vertical
/// offset is clamped to `total_height - viewport_height` so the final row
/// aligns with the true bottom edge instead of leaving a gap (saturating at
/// zero for documents shorter than one viewport). The horizontal offset
/// deliberately gets no matching right-edge clamp, even though columns tile
/// the same way.
pub fn paste_offset(rect: TileRect, total_height: u32, viewport_height: u32) -> (u32, u32) {
    if rect.top.saturating_add(viewport_height) > total_height {
        (rect.left, total_height.saturating_sub(viewport_height))
    } else {
        (rect.left, rect.top)
    }
}

/// Drives a page through scroll/settle/capture cycles and stitches the
/// viewport tiles into one full-page image.
///
/// The engine borrows the session for the duration of one capture and never
/// closes it. All tiles are held in memory; nothing touches the filesystem
/// until the final stitched image is saved.
#[derive(Debug, Clone, Default)]
pub struct StitchEngine {
    wait: WaitPolicy,
}

impl StitchEngine {
    pub fn new(wait: WaitPolicy) -> Self {
        Self { wait }
    }

    /// Capture the page the session is currently on as one stitched image
    /// and return the path it was saved to.
    pub async fn capture(&self, page: &Page, opts: &CaptureOptions) -> Result<PathBuf> {
        if opts.preload_scroll {
            self.scroll_until_stable(page).await?;
        }

        page.scroll_to(0, 0).await?;
        sleep(self.wait.initial_settle).await;

        // Hide once, up front, so hidden elements stay hidden on every tile.
        hide::hide_elements(page, &opts.hide).await;

        let metrics = page.metrics().await?;
        let rects = tile_rects(
            metrics.total_width,
            metrics.total_height,
            metrics.viewport_width,
            metrics.viewport_height,
        );
        info!(
            total_width = metrics.total_width,
            total_height = metrics.total_height,
            viewport_width = metrics.viewport_width,
            viewport_height = metrics.viewport_height,
            tiles = rects.len(),
            "starting tiled capture"
        );

        let mut stitched = RgbaImage::new(metrics.total_width, metrics.total_height);

        for (index, rect) in rects.iter().enumerate() {
            if index > 0 {
                page.scroll_to(rect.left, rect.top).await?;
                sleep(self.wait.tile_settle).await;
            }

            let png = page.screenshot().await?;
            let tile = image::load_from_memory(&png)?.into_rgba8();
            let (x, y) = paste_offset(*rect, metrics.total_height, metrics.viewport_height);
            debug!(tile = index, x, y, "pasting tile");
            imageops::replace(&mut stitched, &tile, i64::from(x), i64::from(y));
        }

        let output = resolve_output(&opts.save_path, &opts.image_name)?;
        stitched.save(&output)?;
        info!(path = %output.display(), "saved stitched screenshot");
        Ok(output)
    }

    /// Repeatedly scroll to the bottom and wait until the measured page
    /// height stops changing, or the previously measured height passes
    /// [`MAX_PRELOAD_HEIGHT`].
    async fn scroll_until_stable(&self, page: &Page) -> Result<()> {
        let mut settled_height = 0;
        loop {
            let height = page.scroll_height().await?;
            if height == settled_height || settled_height > MAX_PRELOAD_HEIGHT {
                break;
            }
            page.scroll_to(0, height).await?;
            sleep(self.wait.preload_wait).await;
            settled_height = height;
        }
        Ok(())
    }
}

fn resolve_output(save_path: &Path, image_name: &str) -> Result<PathBuf> {
    Ok(std::path::absolute(save_path.join(image_name))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_counts_are_ceil_and_last_edges_are_exact() {
        for &(total_height, viewport_height) in
            &[(1u32, 1000u32), (999, 1000), (1000, 1000), (1001, 1000), (2500, 1000), (3000, 1000)]
        {
            let rects = tile_rects(800, total_height, 800, viewport_height);
            assert_eq!(rects.len() as u32, total_height.div_ceil(viewport_height));
            assert_eq!(rects.last().unwrap().bottom, total_height);
        }

        for &(total_width, viewport_width) in
            &[(1u32, 800u32), (799, 800), (800, 800), (801, 800), (2000, 800)]
        {
            let rects = tile_rects(total_width, 500, viewport_width, 500);
            assert_eq!(rects.len() as u32, total_width.div_ceil(viewport_width));
            assert_eq!(rects.last().unwrap().right, total_width);
        }
    }

    #[test]
    fn rects_are_row_major() {
        let rects = tile_rects(2000, 2500, 800, 1000);
        assert_eq!(
            rects,
            vec![
                TileRect { left: 0, top: 0, right: 800, bottom: 1000 },
                TileRect { left: 800, top: 0, right: 1600, bottom: 1000 },
                TileRect { left: 1600, top: 0, right: 2000, bottom: 1000 },
                TileRect { left: 0, top: 1000, right: 800, bottom: 2000 },
                TileRect { left: 800, top: 1000, right: 1600, bottom: 2000 },
                TileRect { left: 1600, top: 1000, right: 2000, bottom: 2000 },
                TileRect { left: 0, top: 2000, right: 800, bottom: 2500 },
                TileRect { left: 800, top: 2000, right: 1600, bottom: 2500 },
                TileRect { left: 1600, top: 2000, right: 2000, bottom: 2500 },
            ]
        );
    }

    #[test]
    fn generator_is_deterministic() {
        assert_eq!(tile_rects(1280, 2500, 1280, 1000), tile_rects(1280, 2500, 1280, 1000));
    }

    #[test]
    fn degenerate_document_yields_one_full_rect() {
        let rects = tile_rects(640, 480, 1280, 1000);
        assert_eq!(rects, vec![TileRect { left: 0, top: 0, right: 640, bottom: 480 }]);
    }

    #[test]
    fn zero_viewport_yields_no_rects() {
        assert!(tile_rects(1280, 2500, 0, 1000).is_empty());
        assert!(tile_rects(1280, 2500, 1280, 0).is_empty());
    }

    #[test]
    fn exact_multiple_needs_no_bottom_clamp() {
        // 1280x3000 document, 1280x1000 viewport: three full-width bands.
        let rects = tile_rects(1280, 3000, 1280, 1000);
        assert_eq!(rects.len(), 3);
        let tops: Vec<u32> = rects.iter().map(|r| r.top).collect();
        assert_eq!(tops, vec![0, 1000, 2000]);

        for rect in rects {
            assert_eq!(paste_offset(rect, 3000, 1000), (rect.left, rect.top));
        }
    }

    #[test]
    fn bottom_overflow_clamps_vertical_offset() {
        // 1280x2500 document, 1280x1000 viewport: the third band's naive
        // bottom would be 3000, so its offset clamps to 2500 - 1000.
        let rects = tile_rects(1280, 2500, 1280, 1000);
        let tops: Vec<u32> = rects.iter().map(|r| r.top).collect();
        assert_eq!(tops, vec![0, 1000, 2000]);
        assert_eq!(paste_offset(rects[2], 2500, 1000), (0, 1500));
    }

    #[test]
    fn short_document_offset_saturates_to_zero() {
        let rect = TileRect { left: 0, top: 0, right: 1280, bottom: 600 };
        assert_eq!(paste_offset(rect, 600, 1000), (0, 0));
    }

    #[test]
    fn horizontal_offset_is_never_clamped() {
        // The last column overflows the right edge; its offset is still the
        // rect's own left.
        let rects = tile_rects(2000, 1000, 1280, 1000);
        assert_eq!(rects[1].left, 1280);
        assert_eq!(paste_offset(rects[1], 1000, 1000), (1280, 0));
    }

    #[test]
    fn offsets_plus_viewport_cover_canvas_without_gaps() {
        for &(w, h, vw, vh) in &[
            (13u32, 27u32, 5u32, 10u32),
            (40, 40, 8, 8),
            (7, 31, 9, 10),
            (1280, 2500, 1280, 1000),
        ] {
            let mut covered = vec![false; (w * h) as usize];
            for rect in tile_rects(w, h, vw, vh) {
                let (x, y) = paste_offset(rect, h, vh);
                // Pasting clips at the canvas edge, as imageops::replace does.
                for py in y..(y + vh).min(h) {
                    for px in x..(x + vw).min(w) {
                        covered[(py * w + px) as usize] = true;
                    }
                }
                if h >= vh {
                    assert!(y + vh <= h, "vertical paste out of bounds at {rect:?}");
                }
            }
            assert!(covered.iter().all(|&c| c), "gap in coverage for {w}x{h} @ {vw}x{vh}");
        }
    }
}
