//! Integration tests for batch scanning over whole documents.

use listing_overflow::config::{DetectionProfile, OverflowConfig};
use listing_overflow::detection::{DetectionMethod, DocumentStats, PageResult, ScanStage};
use listing_overflow::geometry::Rect;
use listing_overflow::layout::{Character, PageContent};
use listing_overflow::pipeline::{
    BatchScanner, CancellationToken, DetectionStrategy, OverflowPipeline, PageSource,
};
use listing_overflow::{Error, Result};
use std::io::Write;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ============================================================================
// Helper Functions
// ============================================================================

fn line_ending_at(text: &str, x1: f64, y0: f64) -> Vec<Character> {
    let x0 = x1 - text.chars().count() as f64 * 6.0;
    text.chars()
        .enumerate()
        .map(|(i, c)| {
            let x = x0 + i as f64 * 6.0;
            Character::new(c.to_string(), x, x + 6.0, y0)
        })
        .collect()
}

fn clean_page(number: u32) -> PageContent {
    PageContent::new(number, 515.9, 728.5)
        .with_characters(line_ending_at("fn main() {}", 200.0, 300.0))
}

fn overflowing_page(number: u32) -> PageContent {
    PageContent::new(number, 515.9, 728.5)
        .with_rects(vec![Rect::filled(50.0, 100.0, 430.0, 300.0)])
        .with_characters(line_ending_at("let value = compute(alpha, beta);", 500.0, 150.0))
}

/// A ten page book with overflow on every third page and one broken page.
fn book() -> Vec<PageContent> {
    (1..=10)
        .map(|n| match n {
            7 => PageContent::new(7, 0.0, 728.5),
            n if n % 3 == 0 => overflowing_page(n),
            n => clean_page(n),
        })
        .collect()
}

/// Source whose page loads fail with a configurable error.
struct FlakySource {
    pages: Vec<PageContent>,
    broken_index: usize,
    error: Error,
}

impl PageSource for FlakySource {
    fn page_count(&self) -> Result<usize> {
        Ok(self.pages.len())
    }

    fn load_page(&self, index: usize) -> Result<PageContent> {
        if index == self.broken_index {
            Err(self.error.clone())
        } else {
            Ok(self.pages[index].clone())
        }
    }
}

/// Source that cannot be opened.
struct UnopenableSource;

impl PageSource for UnopenableSource {
    fn page_count(&self) -> Result<usize> {
        Err(Error::DocumentOpen("not a PDF".to_string()))
    }

    fn load_page(&self, _index: usize) -> Result<PageContent> {
        unreachable!("page_count failed")
    }
}

/// Source that requests cancellation while a given page is loading.
struct CancellingSource {
    pages: Vec<PageContent>,
    cancel_at: usize,
    token: CancellationToken,
}

impl PageSource for CancellingSource {
    fn page_count(&self) -> Result<usize> {
        Ok(self.pages.len())
    }

    fn load_page(&self, index: usize) -> Result<PageContent> {
        if index == self.cancel_at {
            self.token.cancel();
        }
        Ok(self.pages[index].clone())
    }
}

// ============================================================================
// Error Isolation
// ============================================================================

mod error_isolation {
    use super::*;

    #[test]
    fn test_degenerate_page_recorded_and_batch_continues() {
        init_logging();
        let report = BatchScanner::new(OverflowPipeline::new()).scan(&book()).unwrap();

        assert!(!report.cancelled);
        assert_eq!(report.pages.len(), 10);
        assert_eq!(report.stats.pages_scanned, 10);
        assert_eq!(report.stats.pages_with_overflow, 3);
        assert_eq!(report.stats.errors_count, 1);

        let failures = report.failed_pages();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].page_number, 7);
        assert!(matches!(failures[0].error, Error::PageGeometry { page: 7, .. }));
    }

    #[test]
    fn test_page_level_load_failure_recorded() {
        let source = FlakySource {
            pages: book(),
            broken_index: 1,
            error: Error::CharacterExtraction {
                page: 2,
                reason: "glyph widths missing".to_string(),
            },
        };
        let report = BatchScanner::new(OverflowPipeline::new()).scan(&source).unwrap();

        assert_eq!(report.stats.pages_scanned, 10);
        assert_eq!(report.stats.errors_count, 2);
        let failed: Vec<u32> = report.failed_pages().iter().map(|f| f.page_number).collect();
        assert_eq!(failed, vec![2, 7]);
        assert_eq!(report.failed_pages()[0].stage, ScanStage::Unscanned);
    }

    #[test]
    fn test_non_page_level_failure_aborts() {
        let source = FlakySource {
            pages: book(),
            broken_index: 4,
            error: Error::Io("connection reset".to_string()),
        };
        let result = BatchScanner::new(OverflowPipeline::new()).scan(&source);
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_unopenable_document_aborts() {
        let result = BatchScanner::new(OverflowPipeline::new()).scan(&UnopenableSource);
        assert!(matches!(result, Err(Error::DocumentOpen(_))));
    }

    #[test]
    fn test_invalid_config_fails_before_scanning() {
        let config = OverflowConfig::new().with_epsilons(-0.1, 0.5);
        assert!(matches!(OverflowPipeline::with_config(config), Err(Error::Configuration(_))));
    }
}

// ============================================================================
// Cancellation
// ============================================================================

mod cancellation {
    use super::*;

    #[test]
    fn test_cancel_stops_between_pages() {
        let token = CancellationToken::new();
        let source = CancellingSource {
            pages: book(),
            cancel_at: 3,
            token: token.clone(),
        };
        let report = BatchScanner::new(OverflowPipeline::new())
            .with_cancellation(token)
            .scan(&source)
            .unwrap();

        assert!(report.cancelled);
        // the page that was loading when cancel arrived still finishes
        assert_eq!(report.pages.len(), 4);
        assert_eq!(report.stats.pages_scanned, 4);
        assert_eq!(report.pages.last().map(|p| p.page_number), Some(4));
    }

    #[test]
    fn test_uncancelled_token_scans_everything() {
        let token = CancellationToken::new();
        let report = BatchScanner::new(OverflowPipeline::new())
            .with_cancellation(token.clone())
            .scan(&book())
            .unwrap();
        assert!(!report.cancelled);
        assert!(!token.is_cancelled());
        assert_eq!(report.pages.len(), 10);
    }
}

// ============================================================================
// Statistics
// ============================================================================

mod statistics {
    use super::*;

    #[test]
    fn test_stats_match_pages() {
        let report = BatchScanner::new(OverflowPipeline::new()).scan(&book()).unwrap();
        let stats = &report.stats;

        let events: usize = report.pages.iter().map(|p| p.events.len()).sum();
        assert_eq!(stats.total_overflow_events, events);
        assert_eq!(
            stats.events_for(DetectionMethod::CoordinateBased)
                + stats.events_for(DetectionMethod::RectBased),
            events
        );
        assert_eq!(stats.high_confidence_merges, 3);
        assert_eq!(report.pages_with_overflow().count(), 3);
    }

    #[test]
    fn test_split_reduction_matches_whole() {
        let pipeline = OverflowPipeline::new();
        let pages: Vec<PageResult> = book().iter().map(|p| pipeline.scan_page(p)).collect();

        let whole: DocumentStats = pages.iter().sum();
        let (front, back) = pages.split_at(4);
        let front: DocumentStats = front.iter().sum();
        let back: DocumentStats = back.iter().sum();

        assert_eq!(back.clone().merge(front.clone()), whole);
        assert_eq!(front.merge(back), whole);
    }

    #[test]
    fn test_report_serializes() {
        let report = BatchScanner::new(OverflowPipeline::new()).scan(&book()).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["stats"]["pages_scanned"], 10);
        assert_eq!(json["stats"]["failed_pages"][0]["page_number"], 7);
        assert!(json["stats"]["failed_pages"][0]["error"].as_str().unwrap().contains("page 7"));
    }
}

// ============================================================================
// Strategies
// ============================================================================

mod strategies {
    use super::*;

    /// Stand-in for an image-based detector on pages without a text layer.
    struct NothingFound;

    impl DetectionStrategy for NothingFound {
        fn name(&self) -> &'static str {
            "nothing"
        }

        fn detect(&self, page: &PageContent) -> PageResult {
            let blank = PageContent::new(page.page_number, page.width, page.height);
            OverflowPipeline::new().scan_page(&blank)
        }
    }

    #[test]
    fn test_custom_strategy_reports_through_same_contract() {
        let scanner = BatchScanner::new(NothingFound);
        assert_eq!(scanner.strategy().name(), "nothing");
        let report = scanner.scan(&book()).unwrap();
        assert_eq!(report.stats.pages_with_overflow, 0);
        assert_eq!(report.stats.errors_count, 1);
    }

    #[test]
    fn test_profiles_change_sensitivity() {
        // 0.3pt past the block edge: seen by strict, not by standard
        let page = PageContent::new(1, 515.9, 728.5)
            .with_rects(vec![Rect::filled(50.0, 100.0, 430.0, 300.0)])
            .with_characters(line_ending_at("let x = y;", 430.3, 150.0));

        let strict =
            OverflowPipeline::with_config(DetectionProfile::Strict.create_config()).unwrap();
        let standard =
            OverflowPipeline::with_config(DetectionProfile::Standard.create_config()).unwrap();
        assert!(strict.scan_page(&page).has_overflow());
        assert!(!standard.scan_page(&page).has_overflow());
    }
}

// ============================================================================
// Parallel Scanning
// ============================================================================

#[cfg(feature = "parallel")]
mod parallel {
    use super::*;

    #[test]
    fn test_parallel_matches_serial() {
        let pages: Vec<PageContent> = (0..40)
            .flat_map(|_| book())
            .enumerate()
            .map(|(i, mut p)| {
                p.page_number = i as u32 + 1;
                p
            })
            .collect();

        let scanner = BatchScanner::new(OverflowPipeline::new());
        let serial = scanner.scan(&pages).unwrap();
        let parallel = scanner.scan_parallel(&pages).unwrap();

        assert_eq!(serial, parallel);
        assert_eq!(parallel.stats.pages_scanned, 400);
        assert!(parallel.pages.windows(2).all(|w| w[0].page_number < w[1].page_number));
    }

    #[test]
    fn test_parallel_pre_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        let report = BatchScanner::new(OverflowPipeline::new())
            .with_cancellation(token)
            .scan_parallel(&book())
            .unwrap();
        assert!(report.cancelled);
        assert!(report.pages.is_empty());
    }
}

// ============================================================================
// Configuration Files
// ============================================================================

mod config_files {
    use super::*;

    #[test]
    fn test_load_partial_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "odd_right_margin_mm": 15.0, "protected_symbols": [")", ";"] }}"#
        )
        .unwrap();

        let config = OverflowConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.odd_right_margin_mm, 15.0);
        assert_eq!(config.even_right_margin_mm, 20.0);
        assert_eq!(config.protected_symbols.len(), 2);
        assert!(OverflowPipeline::with_config(config).is_ok());
    }

    #[test]
    fn test_invalid_values_in_file_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "even_right_margin_mm": 0.0 }}"#).unwrap();
        let result = OverflowConfig::from_json_file(file.path());
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_malformed_file_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "odd_right_margin_mm = 10").unwrap();
        let result = OverflowConfig::from_json_file(file.path());
        assert!(matches!(result, Err(Error::Parse(_))));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = OverflowConfig::from_json_file(dir.path().join("overflow.json"));
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
