//! Per-page primitives handed over by the extraction layer.
//!
//! A [`PageContent`] is everything the engine needs to know about one page:
//! its size, the rectangles painted on it and the positioned characters.
//! It is immutable for the duration of a scan.

use crate::error::{Error, Result};
use crate::geometry::{Parity, Rect};
use serde::{Deserialize, Serialize};

/// A positioned character.
///
/// `text` is usually a single codepoint but ligatures and combining
/// sequences arrive as several. `y0` is the baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    /// The character text
    pub text: String,
    /// Left edge of the glyph
    pub x0: f64,
    /// Right edge of the glyph
    pub x1: f64,
    /// Baseline
    pub y0: f64,
}

impl Character {
    /// Create a new character.
    pub fn new(text: impl Into<String>, x0: f64, x1: f64, y0: f64) -> Self {
        Self {
            text: text.into(),
            x0,
            x1,
            y0,
        }
    }

    /// Whether every codepoint is ASCII.
    pub fn is_ascii(&self) -> bool {
        self.text.is_ascii()
    }

    /// Whether the glyph carries no ink (spaces, tabs, empty text).
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Everything extracted from a single page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageContent {
    /// Page number (1-based)
    pub page_number: u32,
    /// Page width in points
    pub width: f64,
    /// Page height in points
    pub height: f64,
    /// Rectangles painted on the page
    #[serde(default)]
    pub rects: Vec<Rect>,
    /// Characters on the page
    #[serde(default)]
    pub characters: Vec<Character>,
}

impl PageContent {
    /// Create an empty page.
    pub fn new(page_number: u32, width: f64, height: f64) -> Self {
        Self {
            page_number,
            width,
            height,
            rects: Vec::new(),
            characters: Vec::new(),
        }
    }

    /// Add rectangles to the page.
    pub fn with_rects(mut self, rects: Vec<Rect>) -> Self {
        self.rects = rects;
        self
    }

    /// Add characters to the page.
    pub fn with_characters(mut self, characters: Vec<Character>) -> Self {
        self.characters = characters;
        self
    }

    /// Parity of this page.
    pub fn parity(&self) -> Parity {
        Parity::of(self.page_number)
    }

    /// Check that the page height is usable.
    ///
    /// Width is checked when the text boundary is resolved.
    pub fn validate_dimensions(&self) -> Result<()> {
        if self.height.is_finite() && self.height > 0.0 {
            Ok(())
        } else {
            Err(Error::PageGeometry {
                page: self.page_number,
                reason: format!("height must be positive, got {}", self.height),
            })
        }
    }

    /// Check every character for malformed coordinates.
    pub fn validate_characters(&self) -> Result<()> {
        for (index, ch) in self.characters.iter().enumerate() {
            if !(ch.x0.is_finite() && ch.x1.is_finite() && ch.y0.is_finite()) {
                return Err(self.bad_character(index, "non-finite coordinate"));
            }
            if ch.x1 < ch.x0 {
                return Err(self.bad_character(
                    index,
                    &format!("x1 {:.2} is left of x0 {:.2}", ch.x1, ch.x0),
                ));
            }
            if ch.text.is_empty() {
                return Err(self.bad_character(index, "empty text"));
            }
        }
        Ok(())
    }

    fn bad_character(&self, index: usize, reason: &str) -> Error {
        Error::CharacterExtraction {
            page: self.page_number,
            reason: format!("character {}: {}", index, reason),
        }
    }
}
