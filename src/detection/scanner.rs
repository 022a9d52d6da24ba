//! Character-level overflow measurement.
//!
//! Both scan types share one algorithm and differ only in the boundary and
//! the vertical filter:
//!
//! ```text
//! characters
//!     ↓ ASCII filter, blank glyphs dropped
//!     ↓ vertical filter (exclusion band, or block y-range)
//! lines grouped by rounded baseline
//!     ↓ overflow = rightmost x1 - boundary
//! RawOverflow (if overflow > epsilon)
//! ```

use crate::config::OverflowConfig;
use crate::layout::{CodeBlock, Line, group_into_lines};
use crate::layout::text_block::Character;
use serde::{Deserialize, Serialize};

/// Which boundary a detection was measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DetectionMethod {
    /// Measured against the page text boundary
    CoordinateBased,
    /// Measured against a code block's right edge
    RectBased,
}

/// An unfiltered overflow candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawOverflow {
    /// Rounded baseline of the offending line
    pub y_position: f64,
    /// Characters whose right edge passes the boundary
    pub overflow_text: String,
    /// Rightmost glyph edge minus the boundary, in points
    pub overflow_amount: f64,
    /// Number of characters on the line
    pub char_count: usize,
    /// Boundary this was measured against
    pub method: DetectionMethod,
    /// Index of the code block containing the line, if any
    pub containing_block: Option<usize>,
}

/// Measures how far text lines extend past a boundary.
#[derive(Debug, Clone)]
pub struct OverflowScanner {
    page_epsilon: f64,
    block_epsilon: f64,
    exclusion_band: f64,
    line_tolerance: f64,
}

impl OverflowScanner {
    /// Create a scanner from the relevant configuration options.
    pub fn new(config: &OverflowConfig) -> Self {
        Self {
            page_epsilon: config.page_boundary_epsilon_pt,
            block_epsilon: config.block_boundary_epsilon_pt,
            exclusion_band: config.vertical_exclusion_band_pt,
            line_tolerance: config.line_tolerance_pt,
        }
    }

    /// Scan a whole page against its text boundary.
    ///
    /// Characters inside the top and bottom exclusion bands are skipped so
    /// running heads and page numbers never register. With `ascii_only`,
    /// non-ASCII glyphs (CJK body text, for example) are dropped before lines
    /// are built.
    pub fn scan_against_boundary(
        &self,
        characters: &[Character],
        boundary: f64,
        page_height: f64,
        ascii_only: bool,
    ) -> Vec<RawOverflow> {
        let top = self.exclusion_band;
        let bottom = page_height - self.exclusion_band;

        let candidates = characters
            .iter()
            .filter(|c| !c.is_blank())
            .filter(|c| !ascii_only || c.is_ascii())
            .filter(|c| c.y0 >= top && c.y0 <= bottom);

        let lines = group_into_lines(candidates, self.line_tolerance);
        self.measure(&lines, boundary, self.page_epsilon, DetectionMethod::CoordinateBased, None)
    }

    /// Scan the characters of one code block against the block's right edge.
    ///
    /// Only ASCII characters with `block.y0 <= y0 <= block.y1` and
    /// `x0 >= block.x0` take part.
    pub fn scan_against_block(
        &self,
        characters: &[Character],
        block: &CodeBlock,
        block_index: usize,
    ) -> Vec<RawOverflow> {
        self.scan_block_excluding(characters, block, block_index, &[])
    }

    /// Scan every located block on a page.
    ///
    /// A glyph that starts inside another block (and not inside this one) is
    /// left to that block, so a line never spans two blocks.
    pub fn scan_blocks(&self, characters: &[Character], blocks: &[CodeBlock]) -> Vec<RawOverflow> {
        blocks
            .iter()
            .enumerate()
            .flat_map(|(index, block)| self.scan_block_excluding(characters, block, index, blocks))
            .collect()
    }

    fn scan_block_excluding(
        &self,
        characters: &[Character],
        block: &CodeBlock,
        block_index: usize,
        blocks: &[CodeBlock],
    ) -> Vec<RawOverflow> {
        let owned_elsewhere = |c: &Character| {
            !block.contains(c.x0, c.y0)
                && blocks
                    .iter()
                    .enumerate()
                    .any(|(j, other)| j != block_index && other.contains(c.x0, c.y0))
        };

        let candidates = characters
            .iter()
            .filter(|c| !c.is_blank() && c.is_ascii())
            .filter(|c| block.contains_y(c.y0) && c.x0 >= block.bounds.x0)
            .filter(|c| !owned_elsewhere(c));

        let lines = group_into_lines(candidates, self.line_tolerance);
        self.measure(
            &lines,
            block.right_edge(),
            self.block_epsilon,
            DetectionMethod::RectBased,
            Some(block_index),
        )
    }

    fn measure(
        &self,
        lines: &[Line<'_>],
        boundary: f64,
        epsilon: f64,
        method: DetectionMethod,
        containing_block: Option<usize>,
    ) -> Vec<RawOverflow> {
        lines
            .iter()
            .filter_map(|line| {
                let overflow_amount = line.right_edge() - boundary;
                if overflow_amount <= epsilon {
                    return None;
                }
                log::trace!(
                    "{:?} candidate at y={:.1}: {:.2}pt past {:.2}",
                    method,
                    line.y_position,
                    overflow_amount,
                    boundary
                );
                Some(RawOverflow {
                    y_position: line.y_position,
                    overflow_text: line.text_beyond(boundary),
                    overflow_amount,
                    char_count: line.len(),
                    method,
                    containing_block,
                })
            })
            .collect()
    }
}
