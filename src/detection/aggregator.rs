//! Fusion of coordinate-based and rect-based detections.
//!
//! The two strategies see the same defect from different angles: one
//! measures against the page text boundary, the other against the code
//! block's own edge. An overflow that both report on the same baseline is a
//! high-confidence finding.
//!
//! Document statistics are plain values. Each page produces its own
//! [`DocumentStats`] and callers combine them with [`DocumentStats::merge`],
//! which is associative and commutative, so pages can be scanned in any
//! order or in parallel.

use crate::detection::classifier::SuppressionRule;
use crate::detection::scanner::{DetectionMethod, RawOverflow};
use crate::error::Error;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::iter::Sum;

/// Pipeline stage of a page scan.
///
/// Stages advance strictly in declaration order. A failure at any stage
/// jumps straight to [`ScanStage::Reported`] with the failing stage recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ScanStage {
    /// Nothing done yet
    Unscanned,
    /// Text boundary computed
    GeometryResolved,
    /// Code blocks found
    BlocksLocated,
    /// Raw candidates measured
    CharsScanned,
    /// False positives removed
    Filtered,
    /// Strategies merged
    Aggregated,
    /// Terminal
    Reported,
}

impl ScanStage {
    /// The stage that follows this one.
    pub fn next(self) -> ScanStage {
        match self {
            Self::Unscanned => Self::GeometryResolved,
            Self::GeometryResolved => Self::BlocksLocated,
            Self::BlocksLocated => Self::CharsScanned,
            Self::CharsScanned => Self::Filtered,
            Self::Filtered => Self::Aggregated,
            Self::Aggregated | Self::Reported => Self::Reported,
        }
    }
}

/// A page that could not be scanned.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageFailure {
    /// Page number (1-based)
    pub page_number: u32,
    /// Last stage reached before the failure
    pub stage: ScanStage,
    /// What went wrong
    #[serde(serialize_with = "serialize_error")]
    pub error: Error,
}

fn serialize_error<S: Serializer>(error: &Error, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&error.to_string())
}

/// A retained overflow detection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverflowEvent {
    /// Rounded baseline of the offending line
    pub y_position: f64,
    /// Characters past the boundary
    pub overflow_text: String,
    /// Distance past the boundary, in points
    pub overflow_amount: f64,
    /// Number of characters on the line
    pub char_count: usize,
    /// Boundary this was measured against
    pub method: DetectionMethod,
    /// Index of the code block containing the line, if any
    pub containing_block: Option<usize>,
}

impl OverflowEvent {
    /// Whether the line sits inside a located code block.
    pub fn in_code_block(&self) -> bool {
        self.containing_block.is_some()
    }
}

impl From<RawOverflow> for OverflowEvent {
    fn from(raw: RawOverflow) -> Self {
        Self {
            y_position: raw.y_position,
            overflow_text: raw.overflow_text,
            overflow_amount: raw.overflow_amount,
            char_count: raw.char_count,
            method: raw.method,
            containing_block: raw.containing_block,
        }
    }
}

/// An overflow confirmed by both strategies.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighConfidenceMerge {
    /// Baseline of the coordinate-based event
    pub y_position: f64,
    /// Index of the coordinate-based event in [`PageResult::events`]
    pub coordinate_event: usize,
    /// Index of the rect-based event in [`PageResult::events`]
    pub rect_event: usize,
    /// Overflow past the page text boundary
    pub coordinate_amount: f64,
    /// Overflow past the code block edge
    pub rect_amount: f64,
}

/// Outcome of scanning a single page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageResult {
    /// Page number (1-based)
    pub page_number: u32,
    /// Retained events, coordinate-based first
    pub events: Vec<OverflowEvent>,
    /// Events confirmed by both strategies
    pub high_confidence: Vec<HighConfidenceMerge>,
    /// How many raw candidates each rule suppressed
    pub suppressed: BTreeMap<SuppressionRule, usize>,
    /// Set if the page could not be scanned
    pub error: Option<PageFailure>,
}

impl PageResult {
    /// Result for a page that failed at `stage`.
    pub fn failed(page_number: u32, stage: ScanStage, error: Error) -> Self {
        Self {
            page_number,
            events: Vec::new(),
            high_confidence: Vec::new(),
            suppressed: BTreeMap::new(),
            error: Some(PageFailure {
                page_number,
                stage,
                error,
            }),
        }
    }

    /// Whether any overflow survived filtering.
    pub fn has_overflow(&self) -> bool {
        !self.events.is_empty()
    }

    /// Events found by one strategy.
    pub fn events_by(&self, method: DetectionMethod) -> impl Iterator<Item = &OverflowEvent> {
        self.events.iter().filter(move |e| e.method == method)
    }

    /// Attach suppression counts gathered while filtering.
    pub fn with_suppressed(mut self, suppressed: BTreeMap<SuppressionRule, usize>) -> Self {
        self.suppressed = suppressed;
        self
    }
}

/// Merges per-strategy events into page results.
#[derive(Debug, Clone)]
pub struct DetectionAggregator {
    tolerance: f64,
}

impl DetectionAggregator {
    /// Create an aggregator that pairs events at most `tolerance` points apart.
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    /// Combine both strategies' events for one page.
    ///
    /// Every coordinate-based event that lies inside a code block is paired
    /// with the nearest unused rect-based event from the same block within
    /// tolerance (the earlier one on ties). Each event takes part in at most
    /// one merge.
    pub fn aggregate(
        &self,
        page_number: u32,
        coordinate_events: Vec<OverflowEvent>,
        rect_events: Vec<OverflowEvent>,
    ) -> PageResult {
        let offset = coordinate_events.len();
        let mut used = vec![false; rect_events.len()];
        let mut high_confidence = Vec::new();

        for (i, coord) in coordinate_events.iter().enumerate() {
            if !coord.in_code_block() {
                continue;
            }

            let mut best: Option<(usize, f64)> = None;
            for (j, rect) in rect_events.iter().enumerate() {
                let distance = (coord.y_position - rect.y_position).abs();
                if used[j]
                    || rect.containing_block != coord.containing_block
                    || distance > self.tolerance
                {
                    continue;
                }
                if best.map_or(true, |(_, d)| distance < d) {
                    best = Some((j, distance));
                }
            }

            if let Some((j, _)) = best {
                used[j] = true;
                high_confidence.push(HighConfidenceMerge {
                    y_position: coord.y_position,
                    coordinate_event: i,
                    rect_event: offset + j,
                    coordinate_amount: coord.overflow_amount,
                    rect_amount: rect_events[j].overflow_amount,
                });
            }
        }

        let mut events = coordinate_events;
        events.extend(rect_events);

        log::debug!(
            "Page {}: {} events, {} high-confidence",
            page_number,
            events.len(),
            high_confidence.len()
        );

        PageResult {
            page_number,
            events,
            high_confidence,
            suppressed: BTreeMap::new(),
            error: None,
        }
    }

    /// Fold a page outcome into running statistics.
    pub fn fold(&self, stats: DocumentStats, page: &PageResult) -> DocumentStats {
        stats.merge(DocumentStats::from_page(page))
    }
}

/// Counters over a set of scanned pages.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DocumentStats {
    /// Pages attempted, including failed ones
    pub pages_scanned: usize,
    /// Pages with at least one retained event
    pub pages_with_overflow: usize,
    /// Retained events across all pages
    pub total_overflow_events: usize,
    /// Retained events per strategy
    pub events_by_method: BTreeMap<DetectionMethod, usize>,
    /// Events confirmed by both strategies
    pub high_confidence_merges: usize,
    /// Raw candidates suppressed, per rule
    pub suppressed_by_rule: BTreeMap<SuppressionRule, usize>,
    /// Pages that failed
    pub errors_count: usize,
    /// Details of the failed pages, ordered by page number
    pub failed_pages: Vec<PageFailure>,
}

impl DocumentStats {
    /// Statistics of a single page.
    pub fn from_page(page: &PageResult) -> Self {
        let mut events_by_method = BTreeMap::new();
        for event in &page.events {
            *events_by_method.entry(event.method).or_insert(0) += 1;
        }

        Self {
            pages_scanned: 1,
            pages_with_overflow: usize::from(page.has_overflow()),
            total_overflow_events: page.events.len(),
            events_by_method,
            high_confidence_merges: page.high_confidence.len(),
            suppressed_by_rule: page.suppressed.clone(),
            errors_count: usize::from(page.error.is_some()),
            failed_pages: page.error.iter().cloned().collect(),
        }
    }

    /// Combine two sets of statistics.
    pub fn merge(mut self, other: DocumentStats) -> DocumentStats {
        self.pages_scanned += other.pages_scanned;
        self.pages_with_overflow += other.pages_with_overflow;
        self.total_overflow_events += other.total_overflow_events;
        self.high_confidence_merges += other.high_confidence_merges;
        self.errors_count += other.errors_count;

        for (method, count) in other.events_by_method {
            *self.events_by_method.entry(method).or_insert(0) += count;
        }
        for (rule, count) in other.suppressed_by_rule {
            *self.suppressed_by_rule.entry(rule).or_insert(0) += count;
        }

        self.failed_pages.extend(other.failed_pages);
        self.failed_pages.sort_by(|a, b| {
            (a.page_number, a.stage)
                .cmp(&(b.page_number, b.stage))
                .then_with(|| a.error.to_string().cmp(&b.error.to_string()))
        });
        self
    }

    /// Retained events found by one strategy.
    pub fn events_for(&self, method: DetectionMethod) -> usize {
        self.events_by_method.get(&method).copied().unwrap_or(0)
    }
}

impl Sum for DocumentStats {
    fn sum<I: Iterator<Item = DocumentStats>>(iter: I) -> Self {
        iter.fold(DocumentStats::default(), DocumentStats::merge)
    }
}

impl<'a> Sum<&'a PageResult> for DocumentStats {
    fn sum<I: Iterator<Item = &'a PageResult>>(iter: I) -> Self {
        iter.map(DocumentStats::from_page).sum()
    }
}
