//! Batch scanning over the pages of a document.
//!
//! Pages are independent, so a batch is a map over pages followed by a
//! reduction of [`DocumentStats`]. Cancellation is checked between pages,
//! never inside one.

use crate::detection::{DocumentStats, PageFailure, PageResult, ScanStage};
use crate::error::{Error, Result};
use crate::layout::PageContent;
use crate::pipeline::DetectionStrategy;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Supplies page primitives from an opened document.
///
/// The document handle stays owned by the implementor. The scanner only
/// borrows it for the duration of a call.
pub trait PageSource: Sync {
    /// Number of pages.
    ///
    /// An error here means the document could not be opened and aborts the
    /// batch; it should be [`crate::Error::DocumentOpen`].
    fn page_count(&self) -> Result<usize>;

    /// Primitives of the page at `index` (0-based).
    ///
    /// Page-level errors are recorded and the batch continues. Any other
    /// error aborts the batch.
    fn load_page(&self, index: usize) -> Result<PageContent>;
}

impl PageSource for [PageContent] {
    fn page_count(&self) -> Result<usize> {
        Ok(self.len())
    }

    fn load_page(&self, index: usize) -> Result<PageContent> {
        Ok(self[index].clone())
    }
}

impl PageSource for Vec<PageContent> {
    fn page_count(&self) -> Result<usize> {
        self.as_slice().page_count()
    }

    fn load_page(&self, index: usize) -> Result<PageContent> {
        self.as_slice().load_page(index)
    }
}

/// Shared flag for aborting a batch between pages.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Pages already in progress finish.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Outcome of a batch scan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentReport {
    /// Per-page results ordered by page number
    pub pages: Vec<PageResult>,
    /// Statistics over `pages`
    pub stats: DocumentStats,
    /// Whether the batch stopped early
    pub cancelled: bool,
}

impl DocumentReport {
    fn from_pages(mut pages: Vec<PageResult>, cancelled: bool) -> Self {
        pages.sort_by_key(|p| p.page_number);
        let stats = pages.iter().sum();
        Self {
            pages,
            stats,
            cancelled,
        }
    }

    /// Pages that could not be scanned.
    pub fn failed_pages(&self) -> &[PageFailure] {
        &self.stats.failed_pages
    }

    /// Pages with at least one retained overflow.
    pub fn pages_with_overflow(&self) -> impl Iterator<Item = &PageResult> {
        self.pages.iter().filter(|p| p.has_overflow())
    }
}

/// Drives a detection strategy over every page of a source.
pub struct BatchScanner<S: DetectionStrategy> {
    strategy: S,
    cancellation: CancellationToken,
}

impl<S: DetectionStrategy> BatchScanner<S> {
    /// Create a scanner around a strategy.
    pub fn new(strategy: S) -> Self {
        Self {
            strategy,
            cancellation: CancellationToken::new(),
        }
    }

    /// Use an externally controlled cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// The strategy in use.
    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Scan every page in order.
    ///
    /// Fails only if the document cannot be opened or the source reports a
    /// non-page-level error. Failed pages are listed in the report.
    pub fn scan<P: PageSource + ?Sized>(&self, source: &P) -> Result<DocumentReport> {
        let count = source.page_count()?;
        log::info!("Scanning {} pages with {} strategy", count, self.strategy.name());

        let mut pages = Vec::with_capacity(count);
        for index in 0..count {
            if self.cancellation.is_cancelled() {
                log::info!("Scan cancelled after {} of {} pages", pages.len(), count);
                return Ok(DocumentReport::from_pages(pages, true));
            }
            pages.push(self.scan_one(source, index)?);
        }

        let report = DocumentReport::from_pages(pages, false);
        log_summary(&report);
        Ok(report)
    }

    /// Scan pages on the rayon thread pool.
    ///
    /// Produces the same report as [`BatchScanner::scan`] unless cancelled.
    #[cfg(feature = "parallel")]
    pub fn scan_parallel<P: PageSource + ?Sized>(&self, source: &P) -> Result<DocumentReport> {
        let count = source.page_count()?;
        log::info!(
            "Scanning {} pages in parallel with {} strategy",
            count,
            self.strategy.name()
        );

        let results: Vec<Option<PageResult>> = (0..count)
            .into_par_iter()
            .map(|index| {
                if self.cancellation.is_cancelled() {
                    Ok(None)
                } else {
                    self.scan_one(source, index).map(Some)
                }
            })
            .collect::<Result<_>>()?;

        let pages: Vec<PageResult> = results.into_iter().flatten().collect();
        let cancelled = pages.len() < count;
        let report = DocumentReport::from_pages(pages, cancelled);
        log_summary(&report);
        Ok(report)
    }

    fn scan_one<P: PageSource + ?Sized>(&self, source: &P, index: usize) -> Result<PageResult> {
        match source.load_page(index) {
            Ok(page) => Ok(self.strategy.detect(&page)),
            Err(err) if err.is_page_level() => {
                let page_number = page_number_for(index)?;
                log::warn!("Page {} could not be loaded: {}", page_number, err);
                Ok(PageResult::failed(page_number, ScanStage::Unscanned, err))
            },
            Err(err) => Err(err),
        }
    }
}

/// 1-based page number of the page at `index`.
fn page_number_for(index: usize) -> Result<u32> {
    u32::try_from(index)
        .ok()
        .and_then(|n| n.checked_add(1))
        .ok_or_else(|| {
            Error::DocumentOpen(format!("page index {} exceeds the supported page range", index))
        })
}

fn log_summary(report: &DocumentReport) {
    log::info!(
        "Scanned {} pages: {} with overflow, {} events, {} failed",
        report.stats.pages_scanned,
        report.stats.pages_with_overflow,
        report.stats.total_overflow_events,
        report.stats.errors_count
    );
}
