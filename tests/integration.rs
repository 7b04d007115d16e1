//! Integration tests for the ledger-sheet rendering pipeline.
//!
//! These tests exercise the full path from request JSON to PDF output.
//! They verify:
//! - the table layout paginates exactly as the geometry dictates
//! - composed pages carry headers, shading, totals and page numbers
//! - PDF output is structurally valid and contains the drawn text
//! - the request handler answers with the right status and headers

use std::path::PathBuf;

use ledger_sheet::config::{FontSource, RenderConfig};
use ledger_sheet::font::FontContext;
use ledger_sheet::layout::{
    layout_table, ColumnDirection, LayoutEvent, LayoutPage, RowParity, TableGeometry,
};
use ledger_sheet::model::{BalanceSheetRequest, ColumnSpec, Row};
use ledger_sheet::sheet::compose;
use ledger_sheet::style::Direction;
use ledger_sheet::text::TextLayout;
use ledger_sheet::{handle, render_balance_sheet, render_json, LayoutError, SheetError};

// ─── Helpers ────────────────────────────────────────────────────

fn columns() -> Vec<ColumnSpec> {
    vec![
        ColumnSpec::new("No.", 40.0),
        ColumnSpec::new("Shop Name", 200.0),
        ColumnSpec::new("Balance", 100.0),
    ]
}

fn rows(n: usize) -> Vec<Row> {
    (1..=n)
        .map(|i| Row::new([i.to_string(), format!("Shop {}", i), "0.00".to_string()]))
        .collect()
}

fn geometry() -> TableGeometry {
    TableGeometry::new(800.0, 100.0, 50.0, 25.0)
}

fn shops(n: usize) -> BalanceSheetRequest {
    BalanceSheetRequest::new((1..=n).map(|i| format!("Shop {}", i)))
}

fn config() -> RenderConfig {
    RenderConfig {
        generated_on: time::Date::from_calendar_date(2025, time::Month::June, 30).ok(),
        ..RenderConfig::default()
    }
}

fn compose_default(n: usize) -> Vec<LayoutPage> {
    compose(&shops(n), &config(), &FontContext::new(), None).unwrap()
}

fn page_texts(page: &LayoutPage) -> Vec<String> {
    page.text_lines().map(|l| l.text()).collect()
}

fn render_to_pdf(n: usize) -> Vec<u8> {
    render_balance_sheet(&shops(n), &config()).unwrap().bytes
}

fn assert_valid_pdf(bytes: &[u8]) {
    assert!(bytes.len() > 50, "PDF too small to be valid");
    assert!(bytes.starts_with(b"%PDF-1.7"), "Missing PDF header");
    assert!(
        bytes.windows(5).any(|w| w == b"%%EOF"),
        "Missing %%EOF marker"
    );
    assert!(
        bytes.windows(4).any(|w| w == b"xref"),
        "Missing xref table"
    );
    assert!(
        bytes.windows(7).any(|w| w == b"trailer"),
        "Missing trailer"
    );
}

fn count(bytes: &[u8], needle: &[u8]) -> usize {
    bytes.windows(needle.len()).filter(|w| *w == needle).count()
}

/// Inflate every Flate stream in the file.
fn decoded_streams(bytes: &[u8]) -> Vec<String> {
    let open = b">>\nstream\n";
    let close = b"\nendstream";
    let mut out = Vec::new();
    let mut i = 0;
    while let Some(start) = bytes[i..].windows(open.len()).position(|w| w == open) {
        let data_start = i + start + open.len();
        let Some(len) = bytes[data_start..]
            .windows(close.len())
            .position(|w| w == close)
        else {
            break;
        };
        let data = &bytes[data_start..data_start + len];
        if let Ok(raw) = miniz_oxide::inflate::decompress_to_vec_zlib(data) {
            out.push(String::from_utf8_lossy(&raw).into_owned());
        }
        i = data_start + len;
    }
    out
}

// ─── Table Layout ───────────────────────────────────────────────

#[test]
fn test_thirty_rows_span_two_pages() {
    let cols = columns();
    let data = rows(30);
    let table = layout_table(&cols, &data, &geometry()).unwrap();
    assert_eq!(table.rows_per_page(), 26);
    assert_eq!(table.page_count(), 2);

    let events: Vec<_> = table.iter().collect();
    assert_eq!(events.len(), 31);
    assert_eq!(events[26], LayoutEvent::PageBreak { page_index: 1 });

    let placed: Vec<_> = table.placed_rows().collect();
    assert_eq!(placed[25].page_index, 0);
    assert_eq!(placed[25].y, 100.0 + 25.0 * 25.0);
    assert_eq!(placed[26].page_index, 1);
    assert_eq!(placed[26].y, 100.0);
    assert_eq!(placed[26].offset_y, 0.0);
    assert_eq!(placed[26].parity, RowParity::Even);
    assert_eq!(placed[27].parity, RowParity::Odd);
}

#[test]
fn test_cell_offsets_are_prefix_sums() {
    let cols = columns();
    let data = rows(1);
    let table = layout_table(&cols, &data, &geometry()).unwrap();
    let row = table.placed_rows().next().unwrap();
    let offsets: Vec<f64> = row.cells.iter().map(|c| c.offset).collect();
    assert_eq!(offsets, vec![0.0, 40.0, 240.0]);
    assert_eq!(row.cells[1].text, "Shop 1");
}

#[test]
fn test_no_row_crosses_bottom_margin() {
    let cols = columns();
    let data = rows(200);
    let geometry = TableGeometry::new(842.0, 150.0, 60.0, 17.3);
    let table = layout_table(&cols, &data, &geometry).unwrap();
    let mut placed = 0;
    for row in table.placed_rows() {
        assert!(row.y >= 150.0);
        assert!(row.y + row.height <= 842.0 - 60.0 + 1e-9);
        placed += 1;
    }
    assert_eq!(placed, 200);
}

#[test]
fn test_malformed_row_fails_before_anything_is_placed() {
    let cols = columns();
    let mut data = rows(5);
    data[3].cells.pop();
    let err = layout_table(&cols, &data, &geometry()).unwrap_err();
    assert_eq!(
        err,
        LayoutError::MalformedRow {
            row: 3,
            expected: 3,
            found: 2
        }
    );
}

#[test]
fn test_margins_swallowing_the_page_are_rejected() {
    let cols = columns();
    let data = rows(1);
    let cramped = TableGeometry::new(140.0, 100.0, 50.0, 25.0);
    assert!(matches!(
        layout_table(&cols, &data, &cramped),
        Err(LayoutError::InvalidGeometry(_))
    ));
}

#[test]
fn test_rtl_mirrors_physical_positions_only() {
    let cols = columns();
    let data = rows(1);
    let rtl = geometry().with_direction(ColumnDirection::RightToLeft);
    let table = layout_table(&cols, &data, &rtl).unwrap();
    let row = table.placed_rows().next().unwrap();
    let xs: Vec<f64> = row.cells.iter().map(|c| c.x).collect();
    let offsets: Vec<f64> = row.cells.iter().map(|c| c.offset).collect();
    assert_eq!(xs, vec![300.0, 100.0, 0.0]);
    assert_eq!(offsets, vec![0.0, 40.0, 240.0]);
}

// ─── Sheet Composition ──────────────────────────────────────────

#[test]
fn test_every_page_has_a_header_and_a_number() {
    let pages = compose_default(60);
    assert_eq!(pages.len(), 3);
    for (i, page) in pages.iter().enumerate() {
        let texts = page_texts(page);
        for label in ["No.", "Shop Name", "Balance"] {
            assert!(texts.contains(&label.to_string()), "page {} lacks '{}'", i, label);
        }
        assert!(texts.contains(&format!("Page {} of 3", i + 1)));
    }
}

#[test]
fn test_every_shop_appears_exactly_once() {
    let pages = compose_default(75);
    let all: Vec<String> = pages.iter().flat_map(page_texts).collect();
    for i in 1..=75 {
        let name = format!("Shop {}", i);
        assert_eq!(all.iter().filter(|t| **t == name).count(), 1, "{}", name);
    }
    assert_eq!(
        all.iter().filter(|t| t.starts_with("Total Shops")).count(),
        1
    );
}

#[test]
fn test_zero_shops_still_render_one_page() {
    let pages = compose_default(0);
    assert_eq!(pages.len(), 1);
    assert!(page_texts(&pages[0]).contains(&"Total Shops: 0".to_string()));
}

// ─── PDF Output ─────────────────────────────────────────────────

#[test]
fn test_small_sheet_produces_valid_pdf() {
    let bytes = render_to_pdf(3);
    assert_valid_pdf(&bytes);
    assert_eq!(count(&bytes, b"/Type /Page /Parent"), 1);
}

#[test]
fn test_page_objects_match_layout() {
    let bytes = render_to_pdf(60);
    assert_valid_pdf(&bytes);
    assert_eq!(count(&bytes, b"/Type /Page /Parent"), 3);
    assert_eq!(count(&bytes, b"/Count 3"), 1);
}

#[test]
fn test_content_streams_carry_the_text() {
    let bytes = render_to_pdf(2);
    let streams = decoded_streams(&bytes).join("\n");
    assert!(streams.contains("(SHOPS BALANCE SHEET) Tj"));
    assert!(streams.contains("(Generated: 6/30/2025) Tj"));
    assert!(streams.contains("(Shop 2) Tj"));
    assert!(streams.contains("(Total Shops: 2) Tj"));
    // Header band background.
    assert!(streams.contains("0.900 0.900 0.900 rg"));
}

#[test]
fn test_standard_fonts_are_not_embedded() {
    let bytes = render_to_pdf(1);
    let text = String::from_utf8_lossy(&bytes);
    assert!(text.contains("/BaseFont /Helvetica-Bold"));
    assert!(!text.contains("/FontFile2"));
    assert!(text.contains("/Title (SHOPS BALANCE SHEET)"));
}

#[test]
fn test_render_json_entry_point() {
    let bytes = render_json(r#"{"shops": ["Alpha", "Beta", "Gamma"]}"#, &config()).unwrap();
    assert_valid_pdf(&bytes);

    let err = render_json(r#"{"stores": []}"#, &config()).unwrap_err();
    assert!(matches!(err, SheetError::Request(ref m) if m == "Shops array is required"));
}

#[test]
fn test_config_file_changes_the_sheet() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sheet.json");
    std::fs::write(
        &path,
        r#"{ "title": "MONTHLY BALANCES", "showPageNumbers": false, "rowHeight": 40 }"#,
    )
    .unwrap();
    let config = RenderConfig::from_json_file(&path).unwrap();
    let pages = compose(&shops(20), &config, &FontContext::new(), None).unwrap();
    // 632pt of body at 40pt per row: 15 rows per page.
    assert_eq!(pages.len(), 2);
    let texts = page_texts(&pages[0]);
    assert!(texts.contains(&"MONTHLY BALANCES".to_string()));
    assert!(!texts.iter().any(|t| t.starts_with("Page ")));
}

// ─── Handler ────────────────────────────────────────────────────

#[test]
fn test_handler_round_trip() {
    let resp = handle("POST", br#"{"shops": ["Alpha"]}"#, &config());
    assert_eq!(resp.status, 200);
    assert_eq!(resp.header("Content-Type"), Some("application/pdf"));
    assert_valid_pdf(&resp.body);
}

#[test]
fn test_handler_rejections() {
    assert_eq!(handle("PUT", b"{}", &config()).status, 405);
    let resp = handle("POST", br#"{"shops": null}"#, &config());
    assert_eq!(resp.status, 400);
    let body: serde_json::Value = serde_json::from_slice(&resp.body).unwrap();
    assert_eq!(body["error"], "Shops array is required");
}

#[test]
fn test_bad_geometry_config_is_reported() {
    let config = RenderConfig {
        row_height: 5000.0,
        ..config()
    };
    let resp = handle("POST", br#"{"shops": ["Alpha"]}"#, &config);
    assert_eq!(resp.status, 400);
    let body: serde_json::Value = serde_json::from_slice(&resp.body).unwrap();
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("invalid table geometry"));
}

// ─── Embedded Fonts ─────────────────────────────────────────────

const ARABIC_SHOPS: [&str; 3] = ["سوق الخضار", "Alpha", "مخبز 12"];

/// Find a system TTF that covers the Arabic shop names. Returns None if
/// none is installed.
fn load_arabic_font() -> Option<PathBuf> {
    let paths = [
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/noto/NotoSansArabic-Regular.ttf",
        "/System/Library/Fonts/Supplemental/Arial.ttf",
        "/Library/Fonts/Arial Unicode.ttf",
    ];
    for path in &paths {
        let Ok(data) = std::fs::read(path) else {
            continue;
        };
        let Ok(face) = ttf_parser::Face::parse(&data, 0) else {
            continue;
        };
        let covered = ARABIC_SHOPS
            .iter()
            .flat_map(|s| s.chars())
            .filter(|c| !c.is_whitespace())
            .all(|c| face.glyph_index(c).is_some());
        if covered {
            return Some(PathBuf::from(path));
        }
    }
    None
}

fn rtl_config(font: PathBuf) -> RenderConfig {
    RenderConfig {
        font: FontSource::File(font),
        direction: ColumnDirection::RightToLeft,
        ..config()
    }
}

#[test]
fn test_custom_font_embeds_cid_objects() {
    let font = match load_arabic_font() {
        Some(path) => path,
        None => {
            eprintln!("Skipping: no Arabic TTF font found");
            return;
        }
    };

    let doc = render_balance_sheet(&BalanceSheetRequest::new(ARABIC_SHOPS), &rtl_config(font))
        .unwrap();
    assert_valid_pdf(&doc.bytes);
    let text = String::from_utf8_lossy(&doc.bytes);
    assert!(text.contains("/Subtype /Type0"));
    assert!(text.contains("/Encoding /Identity-H"));
    assert!(text.contains("/Subtype /CIDFontType2"));
    assert!(text.contains("/CIDToGIDMap /Identity"));
    assert!(text.contains("/FontFile2"));
    assert!(text.contains("/Length1"));
    assert!(text.contains("/ToUnicode"));
    assert!(text.contains("/W ["));
    assert!(!text.contains("/BaseFont /Helvetica"));
    // Regular and bold text share one embedded face.
    assert_eq!(count(&doc.bytes, b"/Subtype /Type0"), 1);
}

#[test]
fn test_arabic_names_are_shaped_and_extractable() {
    let font = match load_arabic_font() {
        Some(path) => path,
        None => {
            eprintln!("Skipping: no Arabic TTF font found");
            return;
        }
    };

    let face_data = std::fs::read(&font).unwrap();
    let face = ttf_parser::Face::parse(&face_data, 0).unwrap();
    let fonts = FontSource::File(font.clone()).load().unwrap();
    assert!(fonts.is_custom());

    let layout = TextLayout::new(&fonts);
    let line = layout.line(ARABIC_SHOPS[0], &fonts.key(false), 11.0, Direction::Rtl);
    assert_eq!(layout.substitutions(), 0);
    // Visual order: the last letter is drawn first.
    assert_eq!(line.glyphs.first().map(|g| g.text.as_str()), Some("ر"));
    assert_eq!(line.glyphs.last().map(|g| g.text.as_str()), Some("س"));
    let pen: f64 = line.glyphs.iter().map(|g| g.x_advance).sum();
    assert!((line.width - pen).abs() < 1e-9);

    // A trailing mark is positioned by GPOS but does not widen the line.
    if face.glyph_index('\u{064C}').is_some() {
        let base = layout.line("ب", &fonts.key(false), 11.0, Direction::Rtl);
        let marked = layout.line("بٌ", &fonts.key(false), 11.0, Direction::Rtl);
        let pen: f64 = marked.glyphs.iter().map(|g| g.x_advance).sum();
        assert!((marked.width - pen).abs() < 1e-9);
        assert!(marked.width >= base.width - 1e-9);
    }

    // Joining forms replace at least one nominal glyph.
    let reshaped = line.glyphs.iter().any(|g| {
        let mut chars = g.text.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) if !ch.is_whitespace() => {
                face.glyph_index(ch).map(|id| id.0) != Some(g.glyph_id)
            }
            _ => false,
        }
    });
    assert!(reshaped, "no contextual forms in {:?}", line.glyphs);

    let doc = render_balance_sheet(&BalanceSheetRequest::new(ARABIC_SHOPS), &rtl_config(font))
        .unwrap();
    let text = String::from_utf8_lossy(&doc.bytes);
    let streams = decoded_streams(&doc.bytes).join("\n");

    let seen = line.glyphs.last().unwrap();
    let hex = format!("{:04X}", seen.glyph_id);
    assert!(streams.contains(&hex), "glyph {} not drawn", hex);
    assert!(streams.contains(&format!("<{}> <0633>", hex)));
    assert!(streams.contains("beginbfchar"));
    assert!(text.contains(&format!(" {} [", seen.glyph_id)));
}
