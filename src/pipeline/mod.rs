//! Per-page overflow detection pipeline.
//!
//! ```text
//! PageContent
//!     ↓
//! [PageGeometry] (text boundary)      [locate_code_blocks] (code blocks)
//!     ↓                                    ↓
//! [OverflowScanner] page boundary     [OverflowScanner] each block edge
//!     ↓                                    ↓
//! [FalsePositiveClassifier] ───────────────┘
//!     ↓
//! [DetectionAggregator]
//!     ↓
//! PageResult
//! ```
//!
//! Every step is a pure function over the page's primitives, so a page can
//! be scanned on any thread and scanning it twice gives identical results.
//! A failing page never aborts the caller: its [`PageResult`] carries the
//! error and the stage it reached.

pub mod batch;

pub use batch::{BatchScanner, CancellationToken, DocumentReport, PageSource};

use crate::config::OverflowConfig;
use crate::detection::{
    DetectionAggregator, FalsePositiveClassifier, OverflowEvent, OverflowScanner, PageResult,
    RawOverflow, ScanStage, SuppressionRule,
};
use crate::error::Result;
use crate::geometry::PageGeometry;
use crate::layout::{PageContent, containing_block, locate_code_blocks};
use std::collections::BTreeMap;

/// A way of finding overflow on a page.
///
/// The geometric pipeline in this crate is one strategy. Scanned pages
/// without a text layer need a different one (OCR-based, for example) that
/// reports through the same [`PageResult`] contract.
pub trait DetectionStrategy: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Scan one page. Failures are reported inside the result.
    fn detect(&self, page: &PageContent) -> PageResult;
}

/// The geometric overflow detector.
///
/// Runs the coordinate-based and rect-based scans on a page and fuses them.
#[derive(Debug, Clone)]
pub struct OverflowPipeline {
    config: OverflowConfig,
    scanner: OverflowScanner,
    classifier: FalsePositiveClassifier,
    aggregator: DetectionAggregator,
}

impl OverflowPipeline {
    /// Create a pipeline with the default configuration.
    pub fn new() -> Self {
        let config = OverflowConfig::default();
        debug_assert!(config.validate().is_ok(), "default configuration must validate");
        Self::build(config)
    }

    /// Create a pipeline with a custom configuration.
    ///
    /// Fails with [`crate::Error::Configuration`] before anything is scanned
    /// if the configuration is invalid.
    pub fn with_config(config: OverflowConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: OverflowConfig) -> Self {
        Self {
            scanner: OverflowScanner::new(&config),
            classifier: FalsePositiveClassifier::new(&config),
            aggregator: DetectionAggregator::new(config.cross_confirmation_tolerance_pt),
            config,
        }
    }

    /// Replace the false-positive classifier.
    pub fn with_classifier(mut self, classifier: FalsePositiveClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Get the current configuration.
    pub fn config(&self) -> &OverflowConfig {
        &self.config
    }

    /// Scan one page.
    pub fn scan_page(&self, page: &PageContent) -> PageResult {
        let mut stage = ScanStage::Unscanned;
        match self.run(page, &mut stage) {
            Ok(result) => result,
            Err(err) => {
                log::warn!("Page {} failed at {:?}: {}", page.page_number, stage, err);
                PageResult::failed(page.page_number, stage, err)
            },
        }
    }

    fn run(&self, page: &PageContent, stage: &mut ScanStage) -> Result<PageResult> {
        page.validate_dimensions()?;
        let boundary = PageGeometry::boundary_for(page.width, page.page_number, &self.config)?;
        *stage = stage.next();

        let blocks = locate_code_blocks(&page.rects, &self.config);
        log::debug!(
            "Page {}: boundary {:.2}pt, {} code blocks",
            page.page_number,
            boundary,
            blocks.len()
        );
        *stage = stage.next();

        page.validate_characters()?;
        let mut coordinate_raw = self.scanner.scan_against_boundary(
            &page.characters,
            boundary,
            page.height,
            self.config.ascii_only,
        );
        for raw in &mut coordinate_raw {
            raw.containing_block = containing_block(&blocks, raw.y_position);
        }
        let rect_raw = self.scanner.scan_blocks(&page.characters, &blocks);
        *stage = stage.next();

        let mut suppressed = BTreeMap::new();
        let coordinate_events = self.filter(page.page_number, coordinate_raw, &mut suppressed);
        let rect_events = self.filter(page.page_number, rect_raw, &mut suppressed);
        *stage = stage.next();

        let result = self
            .aggregator
            .aggregate(page.page_number, coordinate_events, rect_events)
            .with_suppressed(suppressed);
        *stage = stage.next();

        // aggregated -> reported
        *stage = stage.next();
        Ok(result)
    }

    fn filter(
        &self,
        page_number: u32,
        raws: Vec<RawOverflow>,
        suppressed: &mut BTreeMap<SuppressionRule, usize>,
    ) -> Vec<OverflowEvent> {
        raws.into_iter()
            .filter_map(|raw| match self.classifier.classify(&raw) {
                Some(rule) => {
                    log::trace!(
                        "Page {}: suppressed {:?} at y={:.1} ({})",
                        page_number,
                        raw.overflow_text,
                        raw.y_position,
                        rule.name()
                    );
                    *suppressed.entry(rule).or_insert(0) += 1;
                    None
                },
                None => Some(OverflowEvent::from(raw)),
            })
            .collect()
    }
}

impl Default for OverflowPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectionStrategy for OverflowPipeline {
    fn name(&self) -> &'static str {
        "geometric"
    }

    fn detect(&self, page: &PageContent) -> PageResult {
        self.scan_page(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DetectionProfile;
    use crate::detection::DetectionMethod;
    use crate::error::Error;
    use crate::geometry::Rect;
    use crate::layout::Character;

    fn line(text: &str, x0: f64, y0: f64) -> Vec<Character> {
        text.chars()
            .enumerate()
            .map(|(i, c)| {
                let x = x0 + i as f64 * 6.0;
                Character::new(c.to_string(), x, x + 6.0, y0)
            })
            .collect()
    }

    #[test]
    fn test_default_and_preset_configs_accepted() {
        assert!(OverflowPipeline::with_config(OverflowConfig::default()).is_ok());
        for profile in [
            DetectionProfile::Standard,
            DetectionProfile::Strict,
            DetectionProfile::Lenient,
        ] {
            let pipeline = OverflowPipeline::with_config(profile.create_config());
            assert!(pipeline.is_ok(), "{:?}", profile);
        }
        let from_json = OverflowConfig::from_json_str("{}").unwrap();
        let pipeline = OverflowPipeline::with_config(from_json).unwrap();
        assert_eq!(pipeline.config(), OverflowPipeline::new().config());
    }

    #[test]
    fn test_side_by_side_blocks_confirm_against_own_block() {
        // left block edge at 250, right block edge at 470; both overflow on y=150
        let mut chars = line(&"x".repeat(32), 64.0, 150.0);
        chars.extend(line("let value = compute(alpha, beta);", 297.0, 150.0));
        let page = PageContent::new(1, 515.9, 728.5)
            .with_rects(vec![
                Rect::filled(50.0, 100.0, 250.0, 300.0),
                Rect::filled(260.0, 100.0, 470.0, 300.0),
            ])
            .with_characters(chars);

        let result = OverflowPipeline::new().scan_page(&page);
        assert_eq!(result.events_by(DetectionMethod::RectBased).count(), 2);
        assert_eq!(result.events[0].containing_block, Some(1));
        assert_eq!(result.high_confidence.len(), 1);

        let merge = &result.high_confidence[0];
        assert_eq!(result.events[merge.rect_event].containing_block, Some(1));
        assert!((merge.rect_amount - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_config_rejected_upfront() {
        let config = OverflowConfig::new().with_margins(-1.0, 20.0);
        assert!(matches!(OverflowPipeline::with_config(config), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_clean_page() {
        let page = PageContent::new(1, 515.9, 728.5).with_characters(line("fn main() {}", 60.0, 200.0));
        let result = OverflowPipeline::new().scan_page(&page);
        assert!(result.error.is_none());
        assert!(!result.has_overflow());
    }

    #[test]
    fn test_code_overflow_confirmed_by_both_strategies() {
        // odd page boundary = 515.9 - 28.35 = 487.55; block edge at 480
        let page = PageContent::new(1, 515.9, 728.5)
            .with_rects(vec![Rect::filled(50.0, 100.0, 480.0, 300.0)])
            .with_characters(line("let value = compute(alpha, beta);", 300.0, 150.0));

        let result = OverflowPipeline::new().scan_page(&page);
        assert_eq!(result.events_by(DetectionMethod::CoordinateBased).count(), 1);
        assert_eq!(result.events_by(DetectionMethod::RectBased).count(), 1);
        assert_eq!(result.high_confidence.len(), 1);
        assert_eq!(result.events[0].containing_block, Some(0));
    }

    #[test]
    fn test_suppressed_counts_recorded() {
        let page = PageContent::new(1, 515.9, 728.5).with_characters(line("42", 480.0, 200.0));
        let result = OverflowPipeline::new().scan_page(&page);
        assert!(!result.has_overflow());
        assert_eq!(result.suppressed.get(&SuppressionRule::BarePageNumber), Some(&1));
    }

    #[test]
    fn test_geometry_failure_recorded() {
        let page = PageContent::new(2, 10.0, 728.5);
        let result = OverflowPipeline::new().scan_page(&page);
        let failure = result.error.expect("page should fail");
        assert_eq!(failure.stage, ScanStage::Unscanned);
        assert!(matches!(failure.error, Error::PageGeometry { page: 2, .. }));
    }

    #[test]
    fn test_character_failure_recorded_at_blocks_stage() {
        let page = PageContent::new(3, 515.9, 728.5)
            .with_characters(vec![Character::new("x", f64::INFINITY, 10.0, 100.0)]);
        let result = OverflowPipeline::new().scan_page(&page);
        let failure = result.error.expect("page should fail");
        assert_eq!(failure.stage, ScanStage::BlocksLocated);
        assert!(matches!(failure.error, Error::CharacterExtraction { page: 3, .. }));
    }

    #[test]
    fn test_strategy_trait() {
        let strategy: Box<dyn DetectionStrategy> = Box::new(OverflowPipeline::new());
        assert_eq!(strategy.name(), "geometric");
        let page = PageContent::new(1, 515.9, 728.5);
        assert_eq!(strategy.detect(&page).page_number, 1);
    }
}
