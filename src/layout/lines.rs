//! Grouping characters into text lines.
//!
//! Characters whose baselines round to the same bucket form one line. Lines
//! only live for the duration of the scan that built them.

use crate::layout::text_block::Character;
use crate::utils::safe_float_cmp;
use std::collections::BTreeMap;

/// Characters sharing a rounded baseline, ordered left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct Line<'a> {
    /// Rounded baseline of the line
    pub y_position: f64,
    /// Characters sorted by `x0`
    pub characters: Vec<&'a Character>,
}

impl<'a> Line<'a> {
    /// Rightmost glyph edge on the line.
    pub fn right_edge(&self) -> f64 {
        self.characters
            .iter()
            .map(|c| c.x1)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Concatenated text of the whole line.
    pub fn text(&self) -> String {
        self.characters.iter().map(|c| c.text.as_str()).collect()
    }

    /// Concatenated text of the characters whose right edge passes `boundary`.
    pub fn text_beyond(&self, boundary: f64) -> String {
        self.characters
            .iter()
            .filter(|c| c.x1 > boundary)
            .map(|c| c.text.as_str())
            .collect()
    }

    /// Number of characters on the line.
    pub fn len(&self) -> usize {
        self.characters.len()
    }

    /// Whether the line holds no characters.
    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }
}

/// Group characters into lines by baseline.
///
/// Baselines are bucketed with `round(y0 / tolerance)`, so with the default
/// tolerance of 1pt this is `round(y0)`. Lines come back top to bottom, and
/// characters within a line left to right.
///
/// Bucket edges sit halfway between multiples of the tolerance, so two glyphs
/// closer together than `tolerance` can still land on different lines when
/// an edge falls between them.
///
/// # Examples
///
/// ```
/// use listing_overflow::layout::{group_into_lines, Character};
///
/// let chars = vec![
///     Character::new("b", 20.0, 25.0, 100.2),
///     Character::new("a", 10.0, 15.0, 99.8),
///     Character::new("c", 10.0, 15.0, 120.0),
/// ];
/// let lines = group_into_lines(chars.iter(), 1.0);
/// assert_eq!(lines.len(), 2);
/// assert_eq!(lines[0].text(), "ab");
/// ```
pub fn group_into_lines<'a, I>(characters: I, tolerance: f64) -> Vec<Line<'a>>
where
    I: IntoIterator<Item = &'a Character>,
{
    let mut buckets: BTreeMap<i64, Vec<&'a Character>> = BTreeMap::new();
    for ch in characters {
        let key = (ch.y0 / tolerance).round() as i64;
        buckets.entry(key).or_default().push(ch);
    }

    buckets
        .into_iter()
        .map(|(key, mut chars)| {
            // stable sort keeps extraction order for glyphs stacked at one x0
            chars.sort_by(|a, b| safe_float_cmp(a.x0, b.x0));
            Line {
                y_position: key as f64 * tolerance,
                characters: chars,
            }
        })
        .collect()
}
