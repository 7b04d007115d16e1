//! # Font Management
//!
//! Resolving font keys to font data, and measuring with it.
//!
//! Without configuration every sheet is drawn in Helvetica, one of the
//! standard PDF fonts that need no embedding. Scripts outside WinAnsi
//! (Arabic in particular) need a real TrueType font; it is registered on the
//! [`FontContext`] that is passed down the pipeline, never installed globally.

pub mod metrics;

pub use metrics::StandardFontMetrics;
use std::collections::HashMap;

use crate::error::SheetError;
use crate::text::shaping::{shape_run, shaped_width};

/// Family name of the built-in fallback.
pub const DEFAULT_FAMILY: &str = "Helvetica";

#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct FontKey {
    pub family: String,
    pub weight: u32,
}

impl FontKey {
    pub fn new(family: impl Into<String>, weight: u32) -> Self {
        Self {
            family: family.into(),
            weight: snap_weight(weight),
        }
    }

    pub fn is_bold(&self) -> bool {
        self.weight >= 700
    }
}

/// Weights snap to regular (400) or bold (700).
fn snap_weight(weight: u32) -> u32 {
    if weight >= 600 {
        700
    } else {
        400
    }
}

#[derive(Debug, Clone)]
pub enum FontData {
    /// A standard PDF font. No embedding needed.
    Standard(StandardFont),
    /// A TrueType/OpenType font that gets embedded.
    Custom(CustomFont),
}

/// The standard fonts a sheet uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
}

impl StandardFont {
    /// The PDF name for this font.
    pub fn pdf_name(&self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
        }
    }
}

/// Raw bytes of an embeddable font plus the metrics the PDF writer needs.
#[derive(Debug, Clone)]
pub struct CustomFont {
    pub data: Vec<u8>,
    pub metrics: CustomFontMetrics,
}

/// Global metrics parsed from a TrueType/OpenType font via ttf-parser.
#[derive(Debug, Clone, Copy)]
pub struct CustomFontMetrics {
    pub units_per_em: u16,
    pub ascender: i16,
    pub descender: i16,
    pub cap_height: i16,
    /// x_min, y_min, x_max, y_max in font units.
    pub bbox: [i16; 4],
}

impl CustomFont {
    /// Parse `data` and keep it for embedding.
    pub fn from_bytes(family: &str, data: Vec<u8>) -> Result<Self, SheetError> {
        let face = ttf_parser::Face::parse(&data, 0).map_err(|e| {
            SheetError::Font(format!("Failed to parse font data for '{}': {}", family, e))
        })?;
        let bbox = face.global_bounding_box();
        let metrics = CustomFontMetrics {
            units_per_em: face.units_per_em(),
            ascender: face.ascender(),
            descender: face.descender(),
            cap_height: face.capital_height().unwrap_or(face.ascender()),
            bbox: [bbox.x_min, bbox.y_min, bbox.x_max, bbox.y_max],
        };
        Ok(Self { data, metrics })
    }

    /// Advance width of a glyph in font units.
    pub fn glyph_advance(&self, glyph_id: u16) -> u16 {
        ttf_parser::Face::parse(&self.data, 0)
            .ok()
            .and_then(|face| face.glyph_hor_advance(ttf_parser::GlyphId(glyph_id)))
            .unwrap_or(0)
    }
}

static HELVETICA: FontData = FontData::Standard(StandardFont::Helvetica);
static HELVETICA_BOLD: FontData = FontData::Standard(StandardFont::HelveticaBold);

/// A font registry that maps family + weight to font data.
#[derive(Debug, Clone)]
pub struct FontRegistry {
    fonts: HashMap<FontKey, FontData>,
}

impl Default for FontRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FontRegistry {
    pub fn new() -> Self {
        let mut fonts = HashMap::new();
        fonts.insert(
            FontKey::new(DEFAULT_FAMILY, 400),
            FontData::Standard(StandardFont::Helvetica),
        );
        fonts.insert(
            FontKey::new(DEFAULT_FAMILY, 700),
            FontData::Standard(StandardFont::HelveticaBold),
        );
        Self { fonts }
    }

    /// Look up a font, falling back to Helvetica of the same weight.
    pub fn resolve(&self, key: &FontKey) -> &FontData {
        if let Some(font) = self.fonts.get(key) {
            return font;
        }
        let fallback = if key.is_bold() {
            &HELVETICA_BOLD
        } else {
            &HELVETICA
        };
        self.fonts
            .get(&FontKey::new(DEFAULT_FAMILY, key.weight))
            .unwrap_or(fallback)
    }

    pub fn register(&mut self, key: FontKey, font: CustomFont) {
        self.fonts.insert(key, FontData::Custom(font));
    }

    pub fn contains(&self, key: &FontKey) -> bool {
        self.fonts.contains_key(key)
    }
}

/// Shared font context used by text layout and PDF serialization.
#[derive(Debug, Clone)]
pub struct FontContext {
    registry: FontRegistry,
    family: String,
}

impl Default for FontContext {
    fn default() -> Self {
        Self::new()
    }
}

impl FontContext {
    /// A context that draws everything in Helvetica.
    pub fn new() -> Self {
        Self {
            registry: FontRegistry::new(),
            family: DEFAULT_FAMILY.to_string(),
        }
    }

    /// A context that draws everything in the given TrueType font.
    ///
    /// The same face serves regular and bold text.
    pub fn with_custom_font(family: &str, data: Vec<u8>) -> Result<Self, SheetError> {
        let font = CustomFont::from_bytes(family, data)?;
        let mut registry = FontRegistry::new();
        registry.register(FontKey::new(family, 400), font.clone());
        registry.register(FontKey::new(family, 700), font);
        Ok(Self {
            registry,
            family: family.to_string(),
        })
    }

    /// Family used for all text on the sheet.
    pub fn family(&self) -> &str {
        &self.family
    }

    /// Key of the sheet font at the given weight.
    pub fn key(&self, bold: bool) -> FontKey {
        FontKey::new(self.family.clone(), if bold { 700 } else { 400 })
    }

    pub fn resolve(&self, key: &FontKey) -> &FontData {
        self.registry.resolve(key)
    }

    /// Width of `text` in points, shaped left to right for embedded fonts.
    pub fn measure(&self, text: &str, key: &FontKey, font_size: f64) -> f64 {
        match self.resolve(key) {
            FontData::Standard(font) => font.metrics().measure_string(text, font_size),
            FontData::Custom(font) => shape_run(text, &font.data, false)
                .map(|glyphs| shaped_width(&glyphs, font.metrics.units_per_em, font_size))
                .unwrap_or(0.0),
        }
    }

    /// Whether text in this context goes through an embedded font.
    pub fn is_custom(&self) -> bool {
        matches!(self.resolve(&self.key(false)), FontData::Custom(_))
    }

    pub fn registry(&self) -> &FontRegistry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_context_is_helvetica() {
        let ctx = FontContext::new();
        assert_eq!(ctx.family(), "Helvetica");
        assert!(!ctx.is_custom());
        assert!(matches!(
            ctx.resolve(&ctx.key(true)),
            FontData::Standard(StandardFont::HelveticaBold)
        ));
    }

    #[test]
    fn unknown_family_falls_back() {
        let ctx = FontContext::new();
        let data = ctx.resolve(&FontKey::new("Amiri", 400));
        assert!(matches!(data, FontData::Standard(StandardFont::Helvetica)));
    }

    #[test]
    fn weights_snap() {
        assert_eq!(FontKey::new("X", 800).weight, 700);
        assert_eq!(FontKey::new("X", 500).weight, 400);
        assert!(FontKey::new("X", 650).is_bold());
    }

    #[test]
    fn garbage_font_data_is_a_font_error() {
        let err = FontContext::with_custom_font("Broken", vec![0, 1, 2, 3]).unwrap_err();
        assert!(matches!(err, SheetError::Font(ref m) if m.contains("Broken")));
    }

    #[test]
    fn measure_standard() {
        let ctx = FontContext::new();
        let w = ctx.measure("No.", &ctx.key(true), 12.0);
        // N 722 + o 611 + . 278
        assert!((w - 19.332).abs() < 1e-9);
    }

    #[test]
    fn pdf_names() {
        assert_eq!(StandardFont::Helvetica.pdf_name(), "Helvetica");
        assert_eq!(StandardFont::HelveticaBold.pdf_name(), "Helvetica-Bold");
    }
}
