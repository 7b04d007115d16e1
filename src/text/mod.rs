//! # Text Layout
//!
//! Turns a string into a single [`TextLine`] of positioned glyphs. Sheet
//! cells never wrap, so there is no line breaking here: one string, one line.
//!
//! Two paths:
//! - standard fonts map characters to WinAnsi codes and measure with the
//!   AFM tables;
//! - embedded fonts split the text into BiDi runs, shape each run with
//!   rustybuzz and lay the runs out in visual order.

pub mod bidi;
pub mod shaping;

use std::cell::Cell;

use crate::font::{FontContext, FontData, FontKey};
use crate::layout::{PositionedGlyph, TextLine};
use crate::style::Direction;

/// Byte written for characters a standard font cannot show.
const SUBSTITUTE: u8 = b'?';

/// Lays out text lines against one font context.
///
/// Counts characters that could not be drawn (outside WinAnsi for standard
/// fonts, missing from the face for embedded ones) so the caller can warn
/// once per render instead of once per glyph.
pub struct TextLayout<'f> {
    fonts: &'f FontContext,
    substitutions: Cell<usize>,
}

impl<'f> TextLayout<'f> {
    pub fn new(fonts: &'f FontContext) -> Self {
        Self {
            fonts,
            substitutions: Cell::new(0),
        }
    }

    pub fn fonts(&self) -> &'f FontContext {
        self.fonts
    }

    /// Number of characters replaced so far.
    pub fn substitutions(&self) -> usize {
        self.substitutions.get()
    }

    /// Lay out `text` as one line starting at x = 0 with its baseline at
    /// y = 0. The caller moves it into place.
    pub fn line(&self, text: &str, key: &FontKey, font_size: f64, direction: Direction) -> TextLine {
        let (glyphs, width) = match self.fonts.resolve(key) {
            FontData::Standard(font) => {
                let metrics = font.metrics();
                let mut x = 0.0;
                let mut glyphs = Vec::with_capacity(text.len());
                for ch in text.chars() {
                    let (code, shown) = match unicode_to_winansi(ch) {
                        Some(code) => (code, ch),
                        None => {
                            self.substitutions.set(self.substitutions.get() + 1);
                            (SUBSTITUTE, SUBSTITUTE as char)
                        }
                    };
                    let advance = metrics.char_width(shown, font_size);
                    glyphs.push(PositionedGlyph {
                        glyph_id: code as u16,
                        x_offset: x,
                        x_advance: advance,
                        text: ch.to_string(),
                    });
                    x += advance;
                }
                (glyphs, x)
            }
            FontData::Custom(font) => {
                let scale = font_size / font.metrics.units_per_em as f64;
                let mut x = 0.0;
                let mut glyphs = Vec::new();
                for (start, end, rtl) in visual_runs(text, direction) {
                    let run_text = &text[start..end];
                    let Some(shaped) = shaping::shape_run(run_text, &font.data, rtl) else {
                        log::warn!("could not shape {:?} with font '{}'", run_text, key.family);
                        continue;
                    };
                    let texts = shaping::cluster_texts(run_text, &shaped);
                    for (glyph, cluster_text) in shaped.iter().zip(texts) {
                        if glyph.glyph_id == 0 {
                            self.substitutions.set(self.substitutions.get() + 1);
                        }
                        let advance = glyph.x_advance as f64 * scale;
                        glyphs.push(PositionedGlyph {
                            glyph_id: glyph.glyph_id,
                            x_offset: x + glyph.x_offset as f64 * scale,
                            x_advance: advance,
                            text: cluster_text,
                        });
                        x += advance;
                    }
                }
                (glyphs, x)
            }
        };

        TextLine {
            x: 0.0,
            y: 0.0,
            width: width.max(0.0),
            font: key.clone(),
            font_size,
            glyphs,
        }
    }
}

/// Byte ranges of `text` in visual order, each with its direction.
/// Pure left-to-right text skips the BiDi pass and stays one run.
fn visual_runs(text: &str, direction: Direction) -> Vec<(usize, usize, bool)> {
    if text.is_empty() {
        return Vec::new();
    }
    if bidi::is_pure_ltr(text, direction) {
        return vec![(0, text.len(), false)];
    }
    let runs = bidi::analyze_bidi(text, direction);
    let levels: Vec<_> = runs.iter().map(|r| r.level).collect();
    bidi::visual_order(&levels)
        .into_iter()
        .map(|idx| {
            let run = &runs[idx];
            (run.start, run.end, run.is_rtl())
        })
        .collect()
}

/// Map a Unicode character to its WinAnsiEncoding (Windows-1252) byte.
pub fn unicode_to_winansi(ch: char) -> Option<u8> {
    let cp = ch as u32;
    if (0x20..=0x7E).contains(&cp) || (0xA0..=0xFF).contains(&cp) {
        return Some(cp as u8);
    }
    match cp {
        0x20AC => Some(0x80), // €
        0x201A => Some(0x82),
        0x0192 => Some(0x83),
        0x201E => Some(0x84),
        0x2026 => Some(0x85), // …
        0x2020 => Some(0x86),
        0x2021 => Some(0x87),
        0x02C6 => Some(0x88),
        0x2030 => Some(0x89),
        0x0160 => Some(0x8A),
        0x2039 => Some(0x8B),
        0x0152 => Some(0x8C),
        0x017D => Some(0x8E),
        0x2018 => Some(0x91),
        0x2019 => Some(0x92),
        0x201C => Some(0x93),
        0x201D => Some(0x94),
        0x2022 => Some(0x95),
        0x2013 => Some(0x96),
        0x2014 => Some(0x97),
        0x02DC => Some(0x98),
        0x2122 => Some(0x99), // ™
        0x0161 => Some(0x9A),
        0x203A => Some(0x9B),
        0x0153 => Some(0x9C),
        0x017E => Some(0x9E),
        0x0178 => Some(0x9F),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_line_is_measured() {
        let fonts = FontContext::new();
        let layout = TextLayout::new(&fonts);
        let line = layout.line("Shop", &fonts.key(false), 10.0, Direction::Ltr);
        assert_eq!(line.glyphs.len(), 4);
        assert_eq!(line.text(), "Shop");
        // S 667 + h 556 + o 556 + p 556
        assert!((line.width - 23.35).abs() < 1e-9);
        assert_eq!(line.glyphs[0].glyph_id, b'S' as u16);
        assert!((line.glyphs[1].x_offset - 6.67).abs() < 1e-9);
        assert_eq!(layout.substitutions(), 0);
    }

    #[test]
    fn outside_winansi_is_substituted() {
        let fonts = FontContext::new();
        let layout = TextLayout::new(&fonts);
        let line = layout.line("سوق 1", &fonts.key(false), 10.0, Direction::Ltr);
        assert_eq!(layout.substitutions(), 3);
        assert_eq!(line.glyphs[0].glyph_id, b'?' as u16);
        // Text is kept for extraction even when the glyph is not.
        assert_eq!(line.text(), "سوق 1");
    }

    #[test]
    fn empty_line() {
        let fonts = FontContext::new();
        let layout = TextLayout::new(&fonts);
        let line = layout.line("", &fonts.key(true), 12.0, Direction::Rtl);
        assert!(line.glyphs.is_empty());
        assert_eq!(line.width, 0.0);
        assert!(line.font.is_bold());
    }

    #[test]
    fn latin_text_is_a_single_run() {
        assert_eq!(visual_runs("Shop 12", Direction::Auto), vec![(0, 7, false)]);
        assert_eq!(visual_runs("Shop 12", Direction::Ltr), vec![(0, 7, false)]);
        assert!(visual_runs("", Direction::Auto).is_empty());
    }

    #[test]
    fn arabic_runs_are_reordered() {
        // "abc " then three Arabic letters (6 bytes).
        let text = "abc \u{0633}\u{0648}\u{0642}";
        let runs = visual_runs(text, Direction::Ltr);
        assert!(runs.iter().any(|&(_, _, rtl)| rtl));
        assert_eq!(runs.first(), Some(&(0, 4, false)));
        assert_eq!(runs.last().map(|r| r.1), Some(text.len()));

        // A forced RTL paragraph puts the trailing Arabic run first.
        let runs = visual_runs(text, Direction::Rtl);
        assert!(runs[0].2);
    }

    #[test]
    fn winansi_mapping() {
        assert_eq!(unicode_to_winansi('A'), Some(0x41));
        assert_eq!(unicode_to_winansi('é'), Some(0xE9));
        assert_eq!(unicode_to_winansi('€'), Some(0x80));
        assert_eq!(unicode_to_winansi('\u{2014}'), Some(0x97));
        assert_eq!(unicode_to_winansi('ق'), None);
        assert_eq!(unicode_to_winansi('\n'), None);
    }
}
