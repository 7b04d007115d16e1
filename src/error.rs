//! Structured error types for ledger-sheet.
//!
//! The table layout core has exactly two failure modes, both caller errors.
//! Everything above it (request parsing, fonts, images, I/O) is folded into
//! [`SheetError`], which also knows how it maps onto a response status.

use thiserror::Error;

/// Validation failures of [`crate::layout::layout_table`].
///
/// Neither is retryable: the caller has to supply corrected input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    /// A row's cell count does not match the column count.
    #[error("row {row} has {found} cells, expected {expected}")]
    MalformedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    /// Page, margin, row or column measurements cannot hold a table.
    #[error("invalid table geometry: {0}")]
    InvalidGeometry(String),
}

/// The unified error type returned by the public rendering API.
#[derive(Debug, Error)]
pub enum SheetError {
    /// The request body is well-formed JSON but not a usable request.
    #[error("{0}")]
    Request(String),

    /// The request body (or a config file) failed to parse.
    #[error("failed to parse JSON: {source}{}", hint_suffix(.hint))]
    Json {
        source: serde_json::Error,
        hint: String,
    },

    #[error(transparent)]
    Layout(#[from] LayoutError),

    /// A font could not be loaded, parsed, or embedded.
    #[error("font error: {0}")]
    Font(String),

    /// The logo could not be loaded or decoded.
    #[error("image error: {0}")]
    Image(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn hint_suffix(hint: &str) -> String {
    if hint.is_empty() {
        String::new()
    } else {
        format!("\n  Hint: {}", hint)
    }
}

impl SheetError {
    /// Status code used when this error terminates a request.
    ///
    /// Input problems are the caller's fault (400); anything that goes wrong
    /// while producing the document is ours (500).
    pub fn status_code(&self) -> u16 {
        match self {
            SheetError::Request(_) | SheetError::Json { .. } | SheetError::Layout(_) => 400,
            SheetError::Font(_) | SheetError::Image(_) | SheetError::Io(_) => 500,
        }
    }
}

impl From<serde_json::Error> for SheetError {
    fn from(e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "Check for trailing commas, missing quotes, or unescaped characters.".to_string()
            }
            serde_json::error::Category::Data => {
                "The JSON is valid but doesn't match the expected shape. Check field names and types."
                    .to_string()
            }
            serde_json::error::Category::Eof => {
                "Unexpected end of input. Is the JSON truncated?".to_string()
            }
            serde_json::error::Category::Io => String::new(),
        };
        SheetError::Json { source: e, hint }
    }
}
