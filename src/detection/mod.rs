//! Overflow detection building blocks.
//!
//! - [`scanner`]: measures text lines against a boundary
//! - [`classifier`]: suppresses spurious candidates
//! - [`aggregator`]: fuses both strategies and keeps statistics

pub mod aggregator;
pub mod classifier;
pub mod scanner;

pub use aggregator::{
    DetectionAggregator, DocumentStats, HighConfidenceMerge, OverflowEvent, PageFailure,
    PageResult, ScanStage,
};
pub use classifier::{FalsePositiveClassifier, SuppressionRule};
pub use scanner::{DetectionMethod, OverflowScanner, RawOverflow};
