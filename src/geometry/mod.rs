//! Page geometry for overflow detection.
//!
//! This module provides the rectangle primitive reported by the extraction
//! layer and the text-area boundary of a printed page. Coordinates are in
//! points with the origin at the top-left corner of the page, y growing
//! downward.

use crate::config::OverflowConfig;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Points per millimetre (72 pt per inch, 25.4 mm per inch).
pub const PT_PER_MM: f64 = 72.0 / 25.4;

/// Convert millimetres to points.
///
/// # Examples
///
/// ```
/// use listing_overflow::geometry::mm_to_pt;
///
/// assert!((mm_to_pt(25.4) - 72.0).abs() < 1e-9);
/// ```
pub fn mm_to_pt(mm: f64) -> f64 {
    mm * PT_PER_MM
}

/// A rectangle as reported by the extraction layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge
    pub x0: f64,
    /// Top edge
    pub y0: f64,
    /// Right edge
    pub x1: f64,
    /// Bottom edge
    pub y1: f64,
    /// Whether the rectangle is painted with a fill
    #[serde(default)]
    pub filled: bool,
}

impl Rect {
    /// Create a filled rectangle from two corner points.
    ///
    /// # Examples
    ///
    /// ```
    /// use listing_overflow::geometry::Rect;
    ///
    /// let rect = Rect::filled(50.0, 100.0, 400.0, 300.0);
    /// assert_eq!(rect.width(), 350.0);
    /// assert_eq!(rect.height(), 200.0);
    /// ```
    pub fn filled(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            x0,
            y0,
            x1,
            y1,
            filled: true,
        }
    }

    /// Create an unfilled (stroked only) rectangle.
    pub fn stroked(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            filled: false,
            ..Self::filled(x0, y0, x1, y1)
        }
    }

    /// Width of the rectangle.
    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    /// Height of the rectangle.
    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    /// Check if a y-coordinate lies within the rectangle's vertical span (inclusive).
    pub fn contains_y(&self, y: f64) -> bool {
        y >= self.y0 && y <= self.y1
    }
}

/// Page parity in a two-sided layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Parity {
    /// Odd page number (recto)
    Odd,
    /// Even page number (verso)
    Even,
}

impl Parity {
    /// Parity of a 1-based page number.
    pub fn of(page_number: u32) -> Self {
        if page_number % 2 == 1 {
            Parity::Odd
        } else {
            Parity::Even
        }
    }

    /// The configured right margin for this parity, in millimetres.
    pub fn right_margin_mm(&self, config: &OverflowConfig) -> f64 {
        match self {
            Parity::Odd => config.odd_right_margin_mm,
            Parity::Even => config.even_right_margin_mm,
        }
    }
}

/// Resolves the printed text-area boundary of a page.
pub struct PageGeometry;

impl PageGeometry {
    /// X-coordinate past which body text is not expected on this page.
    ///
    /// Returns `page_width - margin_pt`, where the margin depends on the
    /// parity of `page_number`.
    ///
    /// # Errors
    ///
    /// * [`Error::Configuration`] if the margin for this parity is not positive.
    /// * [`Error::PageGeometry`] if the page number is 0, the width is not a
    ///   positive finite number, or the width does not exceed the margin.
    ///
    /// # Examples
    ///
    /// ```
    /// use listing_overflow::config::OverflowConfig;
    /// use listing_overflow::geometry::PageGeometry;
    ///
    /// let config = OverflowConfig::new().with_margins(10.0, 20.0);
    /// let boundary = PageGeometry::boundary_for(515.9, 1, &config).unwrap();
    /// assert!((boundary - 487.5535).abs() < 1e-4);
    /// ```
    pub fn boundary_for(page_width: f64, page_number: u32, config: &OverflowConfig) -> Result<f64> {
        let margin_mm = Parity::of(page_number).right_margin_mm(config);
        if !(margin_mm.is_finite() && margin_mm > 0.0) {
            return Err(Error::Configuration(format!(
                "right margin for {:?} pages must be positive, got {}",
                Parity::of(page_number),
                margin_mm
            )));
        }

        if page_number == 0 {
            return Err(Error::PageGeometry {
                page: 0,
                reason: "page numbers are 1-based".to_string(),
            });
        }

        if !(page_width.is_finite() && page_width > 0.0) {
            return Err(Error::PageGeometry {
                page: page_number,
                reason: format!("width must be positive, got {}", page_width),
            });
        }

        let margin_pt = mm_to_pt(margin_mm);
        if page_width <= margin_pt {
            return Err(Error::PageGeometry {
                page: page_number,
                reason: format!(
                    "width {:.2}pt is not larger than margin {:.2}pt",
                    page_width, margin_pt
                ),
            });
        }

        Ok(page_width - margin_pt)
    }
}
