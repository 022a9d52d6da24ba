//! Layout primitives for overflow detection.
//!
//! This module turns raw page primitives into the structures the scanners
//! work on:
//! - Characters and per-page content from the extraction layer
//! - Text lines grouped by baseline
//! - Code blocks located from filled rectangles

pub mod code_block;
pub mod lines;
pub mod text_block;

// Re-export main types
pub use code_block::{CodeBlock, containing_block, locate_code_blocks};
pub use lines::{Line, group_into_lines};
pub use text_block::{Character, PageContent};
