//! # Sheet Composer
//!
//! Turns a balance sheet request into drawable pages. The table geometry
//! comes from [`layout_table`]; this module only decides what each placed
//! band looks like: the title block on the first page, the header band on
//! every page, zebra-striped rows, the totals band and page numbers.
//!
//! All coordinates are points from the top-left corner of the page.

use crate::config::RenderConfig;
use crate::error::SheetError;
use crate::font::FontContext;
use crate::image_loader::LoadedImage;
use crate::layout::page_break::fits_after;
use crate::layout::{
    layout_table, DrawCommand, LayoutElement, LayoutEvent, LayoutPage, PlacedCell, RowParity,
    Stroke, TableLayout,
};
use crate::model::BalanceSheetRequest;
use crate::style::{Color, Direction, TextAlign, TextStyle};
use crate::text::TextLayout;

/// Baseline of the title, from the top of the first page.
const TITLE_BASELINE: f64 = 50.0;
/// Baseline of the company name and the generation date.
const SUBTITLE_BASELINE: f64 = 80.0;
/// The logo is scaled to fit a square of this size.
const LOGO_BOX: f64 = 60.0;
const LOGO_TOP: f64 = 10.0;
const HEADER_BORDER_WIDTH: f64 = 1.0;
/// Gap between the last row and the totals band.
const TOTALS_GAP: f64 = 5.0;

/// Lay out the whole sheet.
///
/// Fails only when the configured geometry cannot hold the table; a request
/// with no shops still produces one page with the title block, the header
/// band and a zero total.
pub fn compose(
    request: &BalanceSheetRequest,
    config: &RenderConfig,
    fonts: &FontContext,
    logo: Option<&LoadedImage>,
) -> Result<Vec<LayoutPage>, SheetError> {
    let rows = request.rows();
    let table = layout_table(&config.columns, &rows, &config.geometry())?;

    let (page_width, _) = config.page.dimensions();
    let right_edge = config.margins.left + table.table_width();
    if right_edge > page_width {
        log::warn!(
            "table is {:.1}pt wide and overflows the {:.1}pt page",
            table.table_width(),
            page_width
        );
    }

    let mut composer = Composer {
        config,
        table: &table,
        text: TextLayout::new(fonts),
        pages: Vec::with_capacity(table.page_count()),
    };

    composer.new_page();
    composer.title_block(logo);
    for event in &table {
        match event {
            LayoutEvent::PageBreak { page_index } => {
                log::trace!("page break before page {}", page_index + 1);
                composer.new_page();
            }
            LayoutEvent::Row(row) => composer.row(row.y, row.height, row.parity, &row.cells),
        }
    }
    composer.totals(request);
    if config.show_page_numbers {
        composer.page_numbers();
    }

    let substituted = composer.text.substitutions();
    if substituted > 0 {
        log::warn!(
            "{} character(s) are not available in font '{}' and were replaced",
            substituted,
            fonts.family()
        );
    }
    log::debug!(
        "composed {} shop(s) onto {} page(s), {} rows per page",
        table.row_count(),
        composer.pages.len(),
        table.rows_per_page()
    );

    Ok(composer.pages)
}

struct Composer<'c, 't> {
    config: &'c RenderConfig,
    table: &'t TableLayout<'t>,
    text: TextLayout<'c>,
    pages: Vec<LayoutPage>,
}

impl Composer<'_, '_> {
    fn left(&self) -> f64 {
        self.config.margins.left
    }

    fn rtl(&self) -> bool {
        self.config.direction.is_rtl()
    }

    fn text_direction(&self) -> Direction {
        if self.rtl() {
            Direction::Rtl
        } else {
            Direction::Auto
        }
    }

    /// Open a page and draw the header band on it.
    fn new_page(&mut self) {
        let (width, height) = self.config.page.dimensions();
        self.pages.push(LayoutPage::new(width, height));
        self.header();
    }

    fn push(&mut self, element: LayoutElement) {
        if let Some(page) = self.pages.last_mut() {
            page.elements.push(element);
        }
    }

    fn rect(&mut self, x: f64, y: f64, width: f64, height: f64, fill: Option<Color>, border: Option<Stroke>) {
        self.push(LayoutElement {
            x,
            y,
            width,
            height,
            draw: DrawCommand::Rect {
                background: fill,
                border,
            },
        });
    }

    fn vertical_line(&mut self, x: f64, y: f64, height: f64, stroke: Stroke) {
        self.push(LayoutElement {
            x,
            y,
            width: 0.0,
            height,
            draw: DrawCommand::Line { stroke },
        });
    }

    /// Draw `content` with its baseline at `baseline`, aligned inside
    /// `[left, left + available)`.
    fn text(&mut self, content: &str, style: &TextStyle, left: f64, available: f64, align: TextAlign, baseline: f64) {
        if content.is_empty() {
            return;
        }
        let key = self.text.fonts().key(style.bold);
        let mut line = self.text.line(content, &key, style.size, self.text_direction());
        line.x = align.place(left, available, line.width);
        line.y = baseline;
        self.push(LayoutElement {
            x: line.x,
            y: baseline - style.size,
            width: line.width,
            height: style.size,
            draw: DrawCommand::Text {
                line,
                color: style.color,
            },
        });
    }

    /// Title, company name, generation date and logo on the first page.
    fn title_block(&mut self, logo: Option<&LoadedImage>) {
        let theme = &self.config.theme;
        let (title_style, company_style, date_style) = (theme.title, theme.company, theme.date);
        let left = self.left();
        let width = self.table.table_width();
        let (near, far) = if self.rtl() {
            (TextAlign::Right, TextAlign::Left)
        } else {
            (TextAlign::Left, TextAlign::Right)
        };

        let title = self.config.title.clone();
        let company = self.config.company.clone();
        let generated = self.config.generated_label();
        self.text(&title, &title_style, left, width, near, TITLE_BASELINE);
        self.text(&company, &company_style, left, width, near, SUBTITLE_BASELINE);
        self.text(&generated, &date_style, left, width, far, SUBTITLE_BASELINE);

        if let Some(image) = logo {
            let (w, h) = image.fit(LOGO_BOX, LOGO_BOX);
            let x = if self.rtl() { left } else { left + width - w };
            self.push(LayoutElement {
                x,
                y: LOGO_TOP,
                width: w,
                height: h,
                draw: DrawCommand::Image {
                    image: image.clone(),
                },
            });
        }
    }

    fn header(&mut self) {
        let header = self.table.header();
        let theme = &self.config.theme;
        let style = theme.header;
        let fill = theme.header_background;
        let border = Stroke::new(theme.header_border, HEADER_BORDER_WIDTH);

        for cell in &header.cells {
            let x = self.left() + cell.x;
            self.rect(x, header.y, cell.width, header.height, Some(fill), Some(border));
        }
        let baseline = header.y + header.height - self.config.theme.baseline_offset;
        self.cell_texts(&header.cells, &style, baseline);
    }

    fn row(&mut self, y: f64, height: f64, parity: RowParity, cells: &[PlacedCell<'_>]) {
        let theme = &self.config.theme;
        let fill = match parity {
            RowParity::Even => theme.even_row,
            RowParity::Odd => theme.odd_row,
        };
        let grid = Stroke::new(theme.grid, theme.grid_width);
        let style = theme.body;
        let baseline = y + height - theme.baseline_offset;

        let left = self.left();
        self.rect(left, y, self.table.table_width(), height, Some(fill), Some(grid));
        // Separators between neighbouring columns, wherever the mirroring put them.
        let mut edges: Vec<f64> = cells.iter().map(|c| c.x).filter(|&x| x > 0.0).collect();
        edges.sort_by(f64::total_cmp);
        for edge in edges {
            self.vertical_line(left + edge, y, height, grid);
        }
        self.cell_texts(cells, &style, baseline);
    }

    fn cell_texts(&mut self, cells: &[PlacedCell<'_>], style: &TextStyle, baseline: f64) {
        let padding = self.config.theme.cell_padding;
        let align = if self.rtl() {
            TextAlign::Right
        } else {
            TextAlign::Left
        };
        for cell in cells {
            let left = self.left() + cell.x + padding;
            let available = (cell.width - 2.0 * padding).max(0.0);
            self.text(cell.text, style, left, available, align, baseline);
        }
    }

    /// `Total Shops: N` below the last row, on a fresh page if it would
    /// cross the bottom margin.
    fn totals(&mut self, request: &BalanceSheetRequest) {
        let geometry = *self.table.geometry();
        let rows_on_last_page = self.table.row_count() - (self.pages.len() - 1) * self.table.rows_per_page();
        let mut top = geometry.top_margin + rows_on_last_page as f64 * geometry.row_height + TOTALS_GAP;
        if !fits_after(top, geometry.row_height, geometry.body_bottom()) {
            log::debug!("totals band moves to a new page");
            self.new_page();
            top = geometry.top_margin + TOTALS_GAP;
        }

        let theme = &self.config.theme;
        let (style, fill, padding) = (theme.footer, theme.footer_background, theme.cell_padding);
        let left = self.left();
        let width = self.table.table_width();
        self.rect(left, top, width, geometry.row_height, Some(fill), None);

        let baseline = top + geometry.row_height - TOTALS_GAP;
        let label = format!("Total Shops: {}", request.shops.len());
        let inner = (width - 2.0 * padding).max(0.0);
        let (near, far) = if self.rtl() {
            (TextAlign::Right, TextAlign::Left)
        } else {
            (TextAlign::Left, TextAlign::Right)
        };
        self.text(&label, &style, left + padding, inner, near, baseline);
        if let Some(total) = request.total_balance() {
            self.text(&format!("{:.2}", total), &style, left + padding, inner, far, baseline);
        }
    }

    /// `Page X of Y`, centered in the bottom margin of every page.
    fn page_numbers(&mut self) {
        let style = self.config.theme.page_number;
        let key = self.text.fonts().key(style.bold);
        let count = self.pages.len();
        for (i, page) in self.pages.iter_mut().enumerate() {
            let mut line = self.text.line(
                &format!("Page {} of {}", i + 1, count),
                &key,
                style.size,
                Direction::Ltr,
            );
            line.x = TextAlign::Center.place(0.0, page.width, line.width);
            line.y = page.height - self.config.margins.bottom / 2.0;
            page.elements.push(LayoutElement {
                x: line.x,
                y: line.y - style.size,
                width: line.width,
                height: style.size,
                draw: DrawCommand::Text {
                    line,
                    color: style.color,
                },
            });
        }
    }
}
