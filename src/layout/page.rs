//! Positioned drawing primitives produced by the sheet composer and consumed
//! by the PDF writer. Coordinates are in points from the top-left corner of
//! the page; the writer flips them into PDF space.

use crate::font::FontKey;
use crate::image_loader::LoadedImage;
use crate::style::Color;

/// A fully laid-out page ready for PDF serialization.
#[derive(Debug, Clone)]
pub struct LayoutPage {
    pub width: f64,
    pub height: f64,
    pub elements: Vec<LayoutElement>,
}

impl LayoutPage {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            elements: Vec::new(),
        }
    }

    /// All text drawn on this page, one entry per line, in drawing order.
    pub fn text_lines(&self) -> impl Iterator<Item = &TextLine> {
        self.elements.iter().filter_map(|e| match &e.draw {
            DrawCommand::Text { line, .. } => Some(line),
            _ => None,
        })
    }
}

/// A positioned element on a page.
#[derive(Debug, Clone)]
pub struct LayoutElement {
    /// Top-left corner (for lines: the start point).
    pub x: f64,
    pub y: f64,
    /// Extent of the box (for lines: the delta to the end point).
    pub width: f64,
    pub height: f64,
    pub draw: DrawCommand,
}

/// Outline paint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub color: Color,
    pub width: f64,
}

impl Stroke {
    pub fn new(color: Color, width: f64) -> Self {
        Self { color, width }
    }
}

/// What to actually draw for this element.
#[derive(Debug, Clone)]
pub enum DrawCommand {
    /// A rectangle with optional fill and outline.
    Rect {
        background: Option<Color>,
        border: Option<Stroke>,
    },
    /// A straight line from (x, y) to (x + width, y + height).
    Line { stroke: Stroke },
    /// A single line of text.
    Text { line: TextLine, color: Color },
    /// A raster image scaled into the element box.
    Image { image: LoadedImage },
}

/// One line of text in visual order.
#[derive(Debug, Clone)]
pub struct TextLine {
    /// Left edge of the first glyph.
    pub x: f64,
    /// Baseline, measured from the top of the page.
    pub y: f64,
    pub width: f64,
    pub font: FontKey,
    pub font_size: f64,
    pub glyphs: Vec<PositionedGlyph>,
}

impl TextLine {
    /// The logical text covered by the glyphs, in visual order.
    pub fn text(&self) -> String {
        self.glyphs.iter().map(|g| g.text.as_str()).collect()
    }
}

/// A glyph with its horizontal position relative to the line start.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedGlyph {
    /// For standard fonts the WinAnsi code, for embedded fonts the real
    /// glyph id produced by shaping.
    pub glyph_id: u16,
    pub x_offset: f64,
    pub x_advance: f64,
    /// Source characters this glyph stands for. Empty for the trailing
    /// glyphs of a multi-glyph cluster.
    pub text: String,
}
