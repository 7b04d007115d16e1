//! # Table Layout
//!
//! The geometric core of ledger-sheet. Given column specs and rows, compute
//! where every cell goes and where pages break, without knowing anything
//! about fonts, colors or PDF.
//!
//! ## How it works
//!
//! 1. Column offsets are the exclusive prefix sum of the column widths,
//!    computed once and shared by the header and every data row.
//! 2. A cursor starts at the top margin of page 0.
//! 3. Before placing a row, ask: does `cursor + row_height` cross
//!    `page_height - bottom_margin`? If so, emit a page break and reset
//!    the cursor to the top margin.
//! 4. Place the row, tag it with its shading parity on the current page,
//!    advance the cursor.
//!
//! The header band is not part of the body. It sits directly above the top
//! margin line on every page, so a page holds
//! `floor((page_height - top_margin - bottom_margin) / row_height)` rows.
//!
//! Validation is eager: [`layout_table`] checks the geometry and every row
//! before anything is yielded, so a failing call never produces partial
//! output. Placement itself is lazy, see [`TableLayout::iter`].

pub mod page;
pub mod page_break;

pub use page::{DrawCommand, LayoutElement, LayoutPage, PositionedGlyph, Stroke, TextLine};

use crate::error::LayoutError;
use crate::model::{ColumnSpec, Row};
use page_break::{decide_row_break, rows_per_page, BreakDecision};

/// Which side of the table column 0 sits on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ColumnDirection {
    #[default]
    LeftToRight,
    /// Column 0 hugs the right edge; used for Arabic and Hebrew sheets.
    RightToLeft,
}

impl ColumnDirection {
    pub fn is_rtl(self) -> bool {
        matches!(self, ColumnDirection::RightToLeft)
    }
}

/// Vertical page geometry for a table. All values are in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableGeometry {
    pub page_height: f64,
    pub top_margin: f64,
    pub bottom_margin: f64,
    pub row_height: f64,
    /// Height of the header band drawn above the top margin line.
    pub header_height: f64,
    pub direction: ColumnDirection,
}

impl TableGeometry {
    /// Geometry with a header as tall as a data row, laid out left to right.
    pub fn new(page_height: f64, top_margin: f64, bottom_margin: f64, row_height: f64) -> Self {
        Self {
            page_height,
            top_margin,
            bottom_margin,
            row_height,
            header_height: row_height,
            direction: ColumnDirection::LeftToRight,
        }
    }

    pub fn with_header_height(mut self, header_height: f64) -> Self {
        self.header_height = header_height;
        self
    }

    pub fn with_direction(mut self, direction: ColumnDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Lowest y a row's bottom edge may reach.
    pub fn body_bottom(&self) -> f64 {
        self.page_height - self.bottom_margin
    }

    /// Height available to data rows on one page.
    pub fn body_height(&self) -> f64 {
        self.page_height - self.top_margin - self.bottom_margin
    }

    fn validate(&self) -> Result<(), LayoutError> {
        let named = [
            ("page height", self.page_height),
            ("top margin", self.top_margin),
            ("bottom margin", self.bottom_margin),
            ("row height", self.row_height),
            ("header height", self.header_height),
        ];
        for (name, value) in named {
            if !value.is_finite() || value <= 0.0 {
                return Err(LayoutError::InvalidGeometry(format!(
                    "{} must be a positive number, got {}",
                    name, value
                )));
            }
        }

        if self.top_margin + self.bottom_margin >= self.page_height {
            return Err(LayoutError::InvalidGeometry(format!(
                "margins {} + {} leave no room on a page of height {}",
                self.top_margin, self.bottom_margin, self.page_height
            )));
        }

        let body = self.body_height();
        if self.row_height > body {
            return Err(LayoutError::InvalidGeometry(format!(
                "row height {} exceeds the printable height {}",
                self.row_height, body
            )));
        }
        if self.header_height > body {
            return Err(LayoutError::InvalidGeometry(format!(
                "header height {} exceeds the printable height {}",
                self.header_height, body
            )));
        }
        if self.header_height > self.top_margin {
            return Err(LayoutError::InvalidGeometry(format!(
                "header height {} does not fit above the top margin {}",
                self.header_height, self.top_margin
            )));
        }
        Ok(())
    }
}

/// Shading parity of a row, counted from the first row of its page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowParity {
    Even,
    Odd,
}

impl RowParity {
    fn of(slot: usize) -> Self {
        if slot % 2 == 0 {
            RowParity::Even
        } else {
            RowParity::Odd
        }
    }
}

/// One cell of a placed row (or of the header).
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedCell<'a> {
    pub column: usize,
    pub text: &'a str,
    /// Sum of the widths of all preceding columns.
    pub offset: f64,
    /// Physical distance from the table's left edge. Equals `offset` for
    /// left-to-right tables and is mirrored for right-to-left ones.
    pub x: f64,
    pub width: f64,
}

/// A row with absolute coordinates, ready to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedRow<'a> {
    /// Position of the row in the input.
    pub index: usize,
    pub page_index: usize,
    /// Distance of the row's top edge from the top of the page.
    pub y: f64,
    /// Distance of the row's top edge from the top margin line.
    pub offset_y: f64,
    pub height: f64,
    pub parity: RowParity,
    pub cells: Vec<PlacedCell<'a>>,
}

/// The header band, identical on every page.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedHeader<'a> {
    pub y: f64,
    pub height: f64,
    pub cells: Vec<PlacedCell<'a>>,
}

/// What the layout produces, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutEvent<'a> {
    /// The following rows belong to a new page.
    PageBreak { page_index: usize },
    Row(PlacedRow<'a>),
}

/// A validated table, ready to be placed row by row.
#[derive(Debug, Clone)]
pub struct TableLayout<'a> {
    columns: &'a [ColumnSpec],
    rows: &'a [Row],
    geometry: TableGeometry,
    offsets: Vec<f64>,
    table_width: f64,
    rows_per_page: usize,
}

/// Validate `columns`, `rows` and `geometry` and prepare the table for placement.
///
/// Fails with [`LayoutError::InvalidGeometry`] when there are no columns, a
/// column width is not positive, the margins leave no body, or the body is
/// shorter than one row or than the header band. The header band is drawn
/// between the page top and the top margin line, so a `header_height` taller
/// than `top_margin` is rejected as well; [`TableGeometry::new`] makes the
/// header as tall as a row, so a top margin under one row needs
/// [`TableGeometry::with_header_height`].
///
/// Fails with [`LayoutError::MalformedRow`] for the first row whose cell
/// count differs from the column count.
pub fn layout_table<'a>(
    columns: &'a [ColumnSpec],
    rows: &'a [Row],
    geometry: &TableGeometry,
) -> Result<TableLayout<'a>, LayoutError> {
    if columns.is_empty() {
        return Err(LayoutError::InvalidGeometry(
            "at least one column is required".to_string(),
        ));
    }
    for (i, column) in columns.iter().enumerate() {
        if !column.width.is_finite() || column.width <= 0.0 {
            return Err(LayoutError::InvalidGeometry(format!(
                "column {} ('{}') has non-positive width {}",
                i, column.label, column.width
            )));
        }
    }
    geometry.validate()?;

    for (i, row) in rows.iter().enumerate() {
        if row.len() != columns.len() {
            return Err(LayoutError::MalformedRow {
                row: i,
                expected: columns.len(),
                found: row.len(),
            });
        }
    }

    let mut offsets = Vec::with_capacity(columns.len());
    let mut running = 0.0;
    for column in columns {
        offsets.push(running);
        running += column.width;
    }

    Ok(TableLayout {
        columns,
        rows,
        geometry: *geometry,
        offsets,
        table_width: running,
        rows_per_page: rows_per_page(geometry.body_height(), geometry.row_height),
    })
}

impl<'a> TableLayout<'a> {
    pub fn geometry(&self) -> &TableGeometry {
        &self.geometry
    }

    pub fn columns(&self) -> &'a [ColumnSpec] {
        self.columns
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Sum of all column widths.
    pub fn table_width(&self) -> f64 {
        self.table_width
    }

    pub fn rows_per_page(&self) -> usize {
        self.rows_per_page
    }

    /// Number of pages the rows occupy. An empty table still has one page.
    pub fn page_count(&self) -> usize {
        if self.rows.is_empty() {
            1
        } else {
            self.rows.len().div_ceil(self.rows_per_page)
        }
    }

    /// Exclusive prefix sums of the column widths.
    pub fn column_offsets(&self) -> &[f64] {
        &self.offsets
    }

    /// The header cells, placed directly above the top margin line.
    pub fn header(&self) -> PlacedHeader<'a> {
        PlacedHeader {
            y: self.geometry.top_margin - self.geometry.header_height,
            height: self.geometry.header_height,
            cells: self.place_cells(self.columns.iter().map(|c| c.label.as_str())),
        }
    }

    /// Lazily place every row, interleaved with page breaks.
    pub fn iter(&self) -> PlacedRows<'_, 'a> {
        PlacedRows {
            layout: self,
            next_row: 0,
            page_index: 0,
            slot: 0,
        }
    }

    /// Only the placed rows, without page break markers.
    pub fn placed_rows(&self) -> impl Iterator<Item = PlacedRow<'a>> + '_ {
        self.iter().filter_map(|event| match event {
            LayoutEvent::Row(row) => Some(row),
            LayoutEvent::PageBreak { .. } => None,
        })
    }

    fn place_cells<I>(&self, texts: I) -> Vec<PlacedCell<'a>>
    where
        I: Iterator<Item = &'a str>,
    {
        texts
            .zip(self.columns.iter().zip(&self.offsets))
            .enumerate()
            .map(|(column, (text, (spec, &offset)))| {
                let x = match self.geometry.direction {
                    ColumnDirection::LeftToRight => offset,
                    ColumnDirection::RightToLeft => self.table_width - offset - spec.width,
                };
                PlacedCell {
                    column,
                    text,
                    offset,
                    x,
                    width: spec.width,
                }
            })
            .collect()
    }
}

impl<'l, 'a> IntoIterator for &'l TableLayout<'a> {
    type Item = LayoutEvent<'a>;
    type IntoIter = PlacedRows<'l, 'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator returned by [`TableLayout::iter`].
#[derive(Debug, Clone)]
pub struct PlacedRows<'l, 'a> {
    layout: &'l TableLayout<'a>,
    next_row: usize,
    page_index: usize,
    /// Rows already placed on the current page.
    slot: usize,
}

impl<'l, 'a> Iterator for PlacedRows<'l, 'a> {
    type Item = LayoutEvent<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let layout = self.layout;
        let row = layout.rows.get(self.next_row)?;
        let geometry = &layout.geometry;

        // Derive the cursor from the slot instead of accumulating it, so
        // repeated additions of a fractional row height cannot drift.
        let cursor = geometry.top_margin + self.slot as f64 * geometry.row_height;
        if self.slot > 0
            && decide_row_break(cursor, geometry.row_height, geometry.body_bottom())
                == BreakDecision::NewPage
        {
            self.page_index += 1;
            self.slot = 0;
            return Some(LayoutEvent::PageBreak {
                page_index: self.page_index,
            });
        }

        let placed = PlacedRow {
            index: self.next_row,
            page_index: self.page_index,
            y: cursor,
            offset_y: cursor - geometry.top_margin,
            height: geometry.row_height,
            parity: RowParity::of(self.slot),
            cells: layout.place_cells(row.cells.iter().map(String::as_str)),
        };
        self.next_row += 1;
        self.slot += 1;
        Some(LayoutEvent::Row(placed))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let layout = self.layout;
        let remaining_rows = layout.rows.len() - self.next_row;
        let remaining_breaks = layout.page_count().saturating_sub(1 + self.page_index);
        let n = remaining_rows + remaining_breaks;
        (n, Some(n))
    }
}

impl ExactSizeIterator for PlacedRows<'_, '_> {}
