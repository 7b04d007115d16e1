//! # ledger-sheet
//!
//! Paginated shop balance sheets as PDF.
//!
//! A balance sheet is a table of fixed-height rows: ordinal, shop name,
//! balance. The interesting part is pagination. Rows are never sliced after
//! the fact; each one is placed *into* a page by a cursor that knows where
//! the bottom margin is, and every page gets its own header band and its own
//! zebra striping.
//!
//! ## Architecture
//!
//! ```text
//! Request JSON  { "shops": [...] }
//!       ↓
//!   [model]    — request, rows, column specs
//!       ↓
//!   [layout]   — table geometry: page breaks, row offsets, cell offsets
//!       ↓
//!   [sheet]    — title block, header bands, rows, totals, page numbers
//!       ↓          (text shaped by [text] against the fonts in [font])
//!   [pdf]      — serialize to PDF bytes
//!       ↓
//!   [handler]  — status code and download headers
//! ```
//!
//! Everything configurable lives in one immutable [`RenderConfig`], passed
//! down the pipeline on each call.

pub mod config;
pub mod error;
pub mod font;
pub mod handler;
pub mod image_loader;
pub mod layout;
pub mod model;
pub mod pdf;
pub mod sheet;
pub mod style;
pub mod text;

pub use config::RenderConfig;
pub use error::{LayoutError, SheetError};
pub use handler::{handle, render_balance_sheet, PdfDocument, Response};
pub use layout::{layout_table, TableGeometry, TableLayout};
pub use model::{BalanceSheetRequest, ColumnSpec, Row};

/// Render a request body such as `{"shops": ["Alpha", "Beta"]}` to PDF bytes.
pub fn render_json(json: &str, config: &RenderConfig) -> Result<Vec<u8>, SheetError> {
    let request = BalanceSheetRequest::from_json(json)?;
    Ok(render_balance_sheet(&request, config)?.bytes)
}
