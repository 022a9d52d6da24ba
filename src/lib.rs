// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::too_many_arguments)]
#![allow(clippy::unnecessary_map_or)]
// Allow unused for tests
#![cfg_attr(test, allow(dead_code))]

//! # Listing Overflow
//!
//! Detects code-listing text that overflows its printed boundary in a
//! two-sided technical book layout.
//!
//! The engine works on pages that are already parsed into geometric
//! primitives (page size, filled rectangles, positioned characters). It does
//! not read PDFs, rasterize or OCR pages.
//!
//! ## How it works
//!
//! - **Page geometry**: the text boundary is the page width minus the right
//!   margin for the page's parity (odd and even pages differ).
//! - **Code blocks**: large filled rectangles are the shaded backgrounds of
//!   code listings.
//! - **Scanning**: characters are grouped into lines by baseline and each
//!   line is measured twice, against the page boundary and against the right
//!   edge of the code block it sits in.
//! - **Classification**: an ordered list of named rules suppresses noise
//!   such as page numbers, leader dots and stray dingbats.
//! - **Aggregation**: both strategies are merged per page; an overflow seen
//!   by both at the same baseline is a high-confidence finding.
//!
//! ## Quick Start
//!
//! ```
//! use listing_overflow::config::OverflowConfig;
//! use listing_overflow::geometry::Rect;
//! use listing_overflow::layout::{Character, PageContent};
//! use listing_overflow::pipeline::{BatchScanner, OverflowPipeline};
//!
//! # fn main() -> Result<(), listing_overflow::Error> {
//! let config = OverflowConfig::new().with_margins(10.0, 20.0);
//! let pipeline = OverflowPipeline::with_config(config)?;
//!
//! let page = PageContent::new(1, 515.9, 728.5)
//!     .with_rects(vec![Rect::filled(50.0, 100.0, 480.0, 300.0)])
//!     .with_characters(vec![Character::new("x", 482.0, 490.0, 150.0)]);
//!
//! let report = BatchScanner::new(pipeline).scan(&vec![page])?;
//! assert_eq!(report.stats.pages_with_overflow, 1);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Error handling
pub mod error;

// Configuration
pub mod config;

// Page geometry and layout primitives
pub mod geometry;
pub mod layout;

// Scanning, classification and fusion
pub mod detection;

// Per-page pipeline and batch scanning
pub mod pipeline;

// Re-exports
pub use config::{DetectionProfile, OverflowConfig};
pub use detection::{
    DetectionMethod, DocumentStats, OverflowEvent, PageResult, ScanStage, SuppressionRule,
};
pub use error::{Error, Result};
pub use layout::{Character, PageContent};
pub use pipeline::{BatchScanner, DetectionStrategy, DocumentReport, OverflowPipeline};

// Internal utilities
pub(crate) mod utils {
    //! Internal utility functions for the library.

    use std::cmp::Ordering;

    /// Safely compare two floating point numbers, handling NaN cases.
    ///
    /// NaN values are treated as equal to each other and greater than all other values.
    /// This ensures that sorting operations never panic due to NaN comparisons.
    #[inline]
    pub fn safe_float_cmp(a: f64, b: f64) -> Ordering {
        match (a.is_nan(), b.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater, // NaN > all numbers
            (false, true) => Ordering::Less,    // all numbers < NaN
            (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        }
    }

}

// Version info
/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
