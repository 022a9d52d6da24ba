//! Error types for the overflow detection engine.
//!
//! Failures fall into two groups. Configuration and document-open errors are
//! fatal to a whole run and propagate to the caller. Page geometry and
//! character extraction errors are isolated to one page: the page is recorded
//! as failed and the batch continues.

/// Result type alias for overflow detection operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while scanning pages for overflow.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// Invalid margins, thresholds or protected symbols
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// The upstream extraction layer could not hand over a document
    #[error("Failed to open document: {0}")]
    DocumentOpen(String),

    /// Degenerate page dimensions
    #[error("Invalid geometry on page {page}: {reason}")]
    PageGeometry {
        /// Page number (1-based, 0 if unknown)
        page: u32,
        /// What was wrong with the page
        reason: String,
    },

    /// Malformed per-character data
    #[error("Malformed character data on page {page}: {reason}")]
    CharacterExtraction {
        /// Page number (1-based)
        page: u32,
        /// What was wrong with the characters
        reason: String,
    },

    /// Configuration document could not be decoded
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    /// Configuration file could not be read
    #[error("IO error: {0}")]
    Io(String),
}

impl Error {
    /// Whether this error only affects the page it was raised for.
    ///
    /// Page-level errors are recorded in the page result and the batch
    /// continues. Everything else aborts the run.
    pub fn is_page_level(&self) -> bool {
        matches!(self, Error::PageGeometry { .. } | Error::CharacterExtraction { .. })
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Parse(err.to_string())
    }
}
