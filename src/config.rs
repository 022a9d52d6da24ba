//! Configuration for overflow detection.
//!
//! Every tunable of the engine lives in [`OverflowConfig`]. Margins are layout
//! policy supplied by the caller; the engine never derives them. Thresholds
//! can be tuned per run, or taken from a [`DetectionProfile`] preset.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Default symbols that stay meaningful when they are all that overflows.
///
/// A lone `)` or `;` past the edge is a real code overflow, a stray dingbat
/// is not.
pub const DEFAULT_PROTECTED_SYMBOLS: &[&str] = &[
    "\"", "'", "(", ")", "[", "]", "{", "}", "<", ">", ";", ":", ",", ".", "!", "?", "=", "+",
    "-", "*", "/", "%", "&", "|", ");", "),", "};", "];", "))", "]]", "}}", "->", "=>",
    "==", "!=", "<=", ">=", "&&", "||", "::", "++", "--", "+=", "-=",
];

/// Default substrings of lines that look like overflow but never are.
pub const DEFAULT_KNOWN_PATTERNS: &[&str] = &["install.sh", "setup.sh", "install.ps1", "get-pip.py"];

/// Overflow detection configuration.
///
/// Deserializes from JSON with every field optional; missing fields take
/// their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverflowConfig {
    /// Right margin of odd (recto) pages in millimetres.
    pub odd_right_margin_mm: f64,
    /// Right margin of even (verso) pages in millimetres.
    pub even_right_margin_mm: f64,
    /// A filled rectangle must be wider than this (pt) to count as a code block.
    pub min_block_width: f64,
    /// A filled rectangle must be taller than this (pt) to count as a code block.
    pub min_block_height: f64,
    /// Minimum overflow (pt) past the page text boundary.
    pub page_boundary_epsilon_pt: f64,
    /// Minimum overflow (pt) past a code block's right edge.
    pub block_boundary_epsilon_pt: f64,
    /// Measurement-noise floor (pt) applied by the classifier.
    pub min_significant_overflow_pt: f64,
    /// 1-2 character strings exempt from short-symbol suppression.
    pub protected_symbols: BTreeSet<String>,
    /// Height (pt) of the top and bottom strips skipped by page-boundary scans.
    pub vertical_exclusion_band_pt: f64,
    /// Baseline bucket size (pt) used to group characters into lines.
    pub line_tolerance_pt: f64,
    /// Maximum baseline distance (pt) for cross-confirming two events.
    pub cross_confirmation_tolerance_pt: f64,
    /// Substrings that mark a line as a known non-overflow.
    pub known_non_overflow_patterns: Vec<String>,
    /// Known patterns only suppress text at least this many characters long.
    pub known_pattern_min_len: usize,
    /// Restrict page-boundary scans to ASCII characters.
    pub ascii_only: bool,
}

impl Default for OverflowConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl OverflowConfig {
    /// Create a configuration with default thresholds.
    pub fn new() -> Self {
        Self {
            odd_right_margin_mm: 10.0,
            even_right_margin_mm: 20.0,
            min_block_width: 100.0,
            min_block_height: 20.0,
            page_boundary_epsilon_pt: 0.1,
            block_boundary_epsilon_pt: 0.5,
            min_significant_overflow_pt: 0.5,
            protected_symbols: DEFAULT_PROTECTED_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            vertical_exclusion_band_pt: 30.0,
            line_tolerance_pt: 1.0,
            cross_confirmation_tolerance_pt: 2.0,
            known_non_overflow_patterns: DEFAULT_KNOWN_PATTERNS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            known_pattern_min_len: 8,
            ascii_only: true,
        }
    }

    /// Set both parity margins.
    pub fn with_margins(mut self, odd_mm: f64, even_mm: f64) -> Self {
        self.odd_right_margin_mm = odd_mm;
        self.even_right_margin_mm = even_mm;
        self
    }

    /// Set the code block size thresholds.
    pub fn with_block_size(mut self, min_width: f64, min_height: f64) -> Self {
        self.min_block_width = min_width;
        self.min_block_height = min_height;
        self
    }

    /// Set the page and block epsilons.
    pub fn with_epsilons(mut self, page_pt: f64, block_pt: f64) -> Self {
        self.page_boundary_epsilon_pt = page_pt;
        self.block_boundary_epsilon_pt = block_pt;
        self
    }

    /// Set the classifier's noise floor.
    pub fn with_min_significant_overflow(mut self, pt: f64) -> Self {
        self.min_significant_overflow_pt = pt;
        self
    }

    /// Set the header/footer exclusion band.
    pub fn with_vertical_exclusion_band(mut self, pt: f64) -> Self {
        self.vertical_exclusion_band_pt = pt;
        self
    }

    /// Replace the protected symbol set.
    pub fn with_protected_symbols<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.protected_symbols = symbols.into_iter().map(Into::into).collect();
        self
    }

    /// Enable or disable the ASCII filter for page-boundary scans.
    pub fn with_ascii_only(mut self, enable: bool) -> Self {
        self.ascii_only = enable;
        self
    }

    /// Load a configuration from JSON, filling unspecified fields with defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: OverflowConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Check every option, failing fast before any page is scanned.
    pub fn validate(&self) -> Result<()> {
        require_positive("odd_right_margin_mm", self.odd_right_margin_mm)?;
        require_positive("even_right_margin_mm", self.even_right_margin_mm)?;
        require_non_negative("min_block_width", self.min_block_width)?;
        require_non_negative("min_block_height", self.min_block_height)?;
        require_non_negative("page_boundary_epsilon_pt", self.page_boundary_epsilon_pt)?;
        require_non_negative("block_boundary_epsilon_pt", self.block_boundary_epsilon_pt)?;
        require_non_negative("min_significant_overflow_pt", self.min_significant_overflow_pt)?;
        require_non_negative("vertical_exclusion_band_pt", self.vertical_exclusion_band_pt)?;
        require_positive("line_tolerance_pt", self.line_tolerance_pt)?;
        require_non_negative(
            "cross_confirmation_tolerance_pt",
            self.cross_confirmation_tolerance_pt,
        )?;

        for symbol in &self.protected_symbols {
            let len = symbol.chars().count();
            if !(1..=2).contains(&len) {
                return Err(Error::Configuration(format!(
                    "protected symbol {:?} must be 1 or 2 characters, got {}",
                    symbol, len
                )));
            }
        }

        if self.known_non_overflow_patterns.iter().any(|p| p.is_empty()) {
            return Err(Error::Configuration(
                "known_non_overflow_patterns must not contain empty strings".to_string(),
            ));
        }

        Ok(())
    }
}

fn require_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::Configuration(format!("{} must be positive, got {}", name, value)))
    }
}

fn require_non_negative(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(Error::Configuration(format!("{} must be non-negative, got {}", name, value)))
    }
}

/// Threshold presets for common detection runs.
///
/// All presets share the same margins; only the sensitivity changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionProfile {
    /// Balanced defaults
    Standard,
    /// Catch sub-point overflows, accepting more noise
    /// Used when proofing final print files.
    Strict,
    /// Only report overflows that are visible at a glance
    Lenient,
}

impl DetectionProfile {
    /// Create the configuration for this profile.
    pub fn create_config(&self) -> OverflowConfig {
        match self {
            Self::Standard => OverflowConfig::default(),
            Self::Strict => OverflowConfig {
                page_boundary_epsilon_pt: 0.05,
                block_boundary_epsilon_pt: 0.25,
                min_significant_overflow_pt: 0.1,
                vertical_exclusion_band_pt: 20.0,
                ..OverflowConfig::default()
            },
            Self::Lenient => OverflowConfig {
                page_boundary_epsilon_pt: 0.5,
                block_boundary_epsilon_pt: 1.0,
                min_significant_overflow_pt: 1.0,
                vertical_exclusion_band_pt: 40.0,
                known_pattern_min_len: 4,
                ..OverflowConfig::default()
            },
        }
    }
}
