//! False-positive suppression for raw overflow candidates.
//!
//! Each [`SuppressionRule`] is an independent predicate over a
//! [`RawOverflow`]. A candidate is suppressed if any rule matches, so the
//! order of the rules never changes the verdict, only which rule gets
//! credited. The default order runs the cheap checks first.

use crate::config::OverflowConfig;
use crate::detection::scanner::RawOverflow;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

lazy_static! {
    /// Glyph references leaked from the content stream instead of Unicode text
    static ref RE_GLYPH_MARKER: Regex =
        Regex::new(r"\(cid:\d+\)|/uni[0-9A-Fa-f]{4,6}").unwrap();

    /// Placeholders the typesetter leaves for images and rules
    static ref RE_STRUCTURAL_MARKER: Regex = Regex::new(
        r"(?i)^\s*(?:<!--\s*(?:image|figure|graphic|rule)\b.*-->|\[(?:image|figure|graphic|rule)\b[^\]]*\]|<(?:image|figure|graphic|rule)\s*/?>)\s*$"
    )
    .unwrap();

    /// Dot leaders between a TOC/index entry and its page number
    static ref RE_LEADER_DOTS: Regex =
        Regex::new(r"(?:\.\s?){4,}|\x{2026}{2,}|(?:\x{00B7}\s?){3,}").unwrap();
}

/// A named false-positive predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuppressionRule {
    /// Overflow at or below the measurement-noise floor
    NegligibleMagnitude,
    /// Embedded glyph-id reference such as `(cid:42)`
    GlyphIdMarker,
    /// One to three digits, a page number caught past the margin
    BarePageNumber,
    /// Only non-Latin printable characters
    NonLatinOnly,
    /// Known non-overflow text such as installer-script references
    KnownPattern,
    /// One or two stray symbols that are not meaningful in code
    ShortSymbolNoise,
    /// Image or rule placeholder tags
    StructuralMarker,
    /// TOC or index leader dots
    LeaderDots,
}

impl SuppressionRule {
    /// All rules in default evaluation order.
    pub const ALL: [SuppressionRule; 8] = [
        SuppressionRule::NegligibleMagnitude,
        SuppressionRule::GlyphIdMarker,
        SuppressionRule::BarePageNumber,
        SuppressionRule::NonLatinOnly,
        SuppressionRule::KnownPattern,
        SuppressionRule::ShortSymbolNoise,
        SuppressionRule::StructuralMarker,
        SuppressionRule::LeaderDots,
    ];

    /// Stable snake_case name, used in logs and reports.
    pub fn name(&self) -> &'static str {
        match self {
            Self::NegligibleMagnitude => "negligible_magnitude",
            Self::GlyphIdMarker => "glyph_id_marker",
            Self::BarePageNumber => "bare_page_number",
            Self::NonLatinOnly => "non_latin_only",
            Self::KnownPattern => "known_pattern",
            Self::ShortSymbolNoise => "short_symbol_noise",
            Self::StructuralMarker => "structural_marker",
            Self::LeaderDots => "leader_dots",
        }
    }
}

/// Decides which raw candidates are noise.
#[derive(Debug, Clone)]
pub struct FalsePositiveClassifier {
    rules: Vec<SuppressionRule>,
    min_significant_overflow: f64,
    protected_symbols: BTreeSet<String>,
    known_patterns: Vec<String>,
    known_pattern_min_len: usize,
}

impl FalsePositiveClassifier {
    /// Create a classifier running every rule in default order.
    pub fn new(config: &OverflowConfig) -> Self {
        Self {
            rules: SuppressionRule::ALL.to_vec(),
            min_significant_overflow: config.min_significant_overflow_pt,
            protected_symbols: config.protected_symbols.clone(),
            known_patterns: config.known_non_overflow_patterns.clone(),
            known_pattern_min_len: config.known_pattern_min_len,
        }
    }

    /// Replace the rule list, e.g. to compare runs with a rule disabled.
    pub fn with_rules(mut self, rules: Vec<SuppressionRule>) -> Self {
        self.rules = rules;
        self
    }

    /// The rules this classifier evaluates, in order.
    pub fn rules(&self) -> &[SuppressionRule] {
        &self.rules
    }

    /// First rule that suppresses the candidate, if any.
    pub fn classify(&self, raw: &RawOverflow) -> Option<SuppressionRule> {
        self.rules.iter().copied().find(|rule| self.matches(*rule, raw))
    }

    /// Whether any rule suppresses the candidate.
    pub fn is_suppressed(&self, raw: &RawOverflow) -> bool {
        self.classify(raw).is_some()
    }

    /// Evaluate a single rule.
    pub fn matches(&self, rule: SuppressionRule, raw: &RawOverflow) -> bool {
        let text = raw.overflow_text.trim();
        match rule {
            SuppressionRule::NegligibleMagnitude => {
                raw.overflow_amount <= self.min_significant_overflow
            },
            SuppressionRule::GlyphIdMarker => RE_GLYPH_MARKER.is_match(text),
            SuppressionRule::BarePageNumber => is_bare_page_number(text),
            SuppressionRule::NonLatinOnly => is_non_latin_only(text),
            SuppressionRule::KnownPattern => {
                text.chars().count() >= self.known_pattern_min_len
                    && self.known_patterns.iter().any(|p| text.contains(p.as_str()))
            },
            SuppressionRule::ShortSymbolNoise => self.is_short_symbol_noise(text),
            SuppressionRule::StructuralMarker => RE_STRUCTURAL_MARKER.is_match(text),
            SuppressionRule::LeaderDots => RE_LEADER_DOTS.is_match(text),
        }
    }

    fn is_short_symbol_noise(&self, text: &str) -> bool {
        let len = text.chars().count();
        if len == 0 || len > 2 || self.protected_symbols.contains(text) {
            return false;
        }
        text.chars().all(|c| {
            let mut buf = [0u8; 4];
            !c.is_alphanumeric() && !self.protected_symbols.contains(&*c.encode_utf8(&mut buf))
        })
    }
}

fn is_bare_page_number(text: &str) -> bool {
    !text.is_empty() && text.len() <= 3 && text.bytes().all(|b| b.is_ascii_digit())
}

fn is_non_latin_only(text: &str) -> bool {
    let mut printable = text.chars().filter(|c| !c.is_whitespace() && !c.is_control()).peekable();
    printable.peek().is_some() && printable.all(|c| c as u32 > 127)
}
