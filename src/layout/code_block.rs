//! Code listing detection from filled rectangles.
//!
//! Code listings in the book layout sit on a shaded background, so every
//! sufficiently large filled rectangle is taken as a candidate listing.
//! Thin rule lines and small icons fall below the size thresholds.

use crate::config::OverflowConfig;
use crate::geometry::Rect;
use serde::Serialize;

/// A filled rectangle that passed the size filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CodeBlock {
    /// Bounds of the block
    pub bounds: Rect,
}

impl CodeBlock {
    /// Right edge of the block, the boundary for block-based scans.
    pub fn right_edge(&self) -> f64 {
        self.bounds.x1
    }

    /// Check if a baseline lies within the block's vertical span.
    pub fn contains_y(&self, y: f64) -> bool {
        self.bounds.contains_y(y)
    }

    /// Check if a point lies within the block (edges inclusive).
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.bounds.x0 && x <= self.bounds.x1 && self.contains_y(y)
    }
}

/// Find candidate code blocks among the rectangles on a page.
///
/// A rectangle is kept if it is filled, wider than `min_block_width` and
/// taller than `min_block_height`. Blocks come back in input order. No
/// deduplication is done: overlapping rectangles each yield a block and are
/// scanned independently.
///
/// # Examples
///
/// ```
/// use listing_overflow::config::OverflowConfig;
/// use listing_overflow::geometry::Rect;
/// use listing_overflow::layout::locate_code_blocks;
///
/// let rects = vec![
///     Rect::filled(50.0, 100.0, 400.0, 300.0), // listing background
///     Rect::filled(50.0, 320.0, 400.0, 321.0), // rule line
/// ];
/// let blocks = locate_code_blocks(&rects, &OverflowConfig::default());
/// assert_eq!(blocks.len(), 1);
/// ```
pub fn locate_code_blocks(rects: &[Rect], config: &OverflowConfig) -> Vec<CodeBlock> {
    rects
        .iter()
        .filter(|r| r.filled)
        .filter(|r| r.width() > config.min_block_width && r.height() > config.min_block_height)
        .map(|r| CodeBlock { bounds: *r })
        .collect()
}

/// Index of the block a page-wide line at baseline `y` runs out of.
///
/// Among the blocks whose vertical span contains `y`, this is the one with
/// the rightmost edge; text past the page boundary has to cross it. Ties go
/// to the earlier block.
pub fn containing_block(blocks: &[CodeBlock], y: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (index, block) in blocks.iter().enumerate() {
        if !block.contains_y(y) {
            continue;
        }
        if best.map_or(true, |(_, edge)| block.right_edge() > edge) {
            best = Some((index, block.right_edge()));
        }
    }
    best.map(|(index, _)| index)
}
