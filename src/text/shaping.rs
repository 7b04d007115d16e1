//! # OpenType Shaping
//!
//! Wraps rustybuzz to shape runs of text set in an embedded font. Arabic shop
//! names need this: the contextual forms (initial, medial, final) only exist
//! as glyph substitutions in the font's GSUB table.
//!
//! Standard PDF fonts bypass shaping entirely. They use WinAnsi encoding and
//! have no GSUB/GPOS tables.

/// A single glyph produced by OpenType shaping.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapedGlyph {
    /// Real glyph ID from GSUB (not a Unicode codepoint).
    pub glyph_id: u16,
    /// Byte offset, within the shaped run, of the first character this glyph
    /// covers. Ligatures cover several characters; decompositions produce
    /// several glyphs with the same cluster.
    pub cluster: usize,
    /// Horizontal advance in font units.
    pub x_advance: i32,
    /// Horizontal offset from GPOS (kerning, mark positioning).
    pub x_offset: i32,
}

/// Shape one directional run.
///
/// Glyphs come back in visual order: for `rtl` runs the first glyph is the
/// rightmost character. Returns `None` if the font data can't be parsed.
pub fn shape_run(text: &str, font_data: &[u8], rtl: bool) -> Option<Vec<ShapedGlyph>> {
    let face = rustybuzz::Face::from_slice(font_data, 0)?;
    let mut buffer = rustybuzz::UnicodeBuffer::new();
    buffer.push_str(text);
    buffer.set_direction(if rtl {
        rustybuzz::Direction::RightToLeft
    } else {
        rustybuzz::Direction::LeftToRight
    });
    buffer.guess_segment_properties();

    let output = rustybuzz::shape(&face, &[], buffer);

    let glyphs = output
        .glyph_infos()
        .iter()
        .zip(output.glyph_positions())
        .map(|(info, pos)| ShapedGlyph {
            glyph_id: info.glyph_id as u16,
            cluster: info.cluster as usize,
            x_advance: pos.x_advance,
            x_offset: pos.x_offset,
        })
        .collect();

    Some(glyphs)
}

/// Total advance width of shaped glyphs in points.
pub fn shaped_width(glyphs: &[ShapedGlyph], units_per_em: u16, font_size: f64) -> f64 {
    let scale = font_size / units_per_em as f64;
    glyphs.iter().map(|g| g.x_advance as f64 * scale).sum()
}

/// The slice of `text` each glyph stands for.
///
/// The first glyph of a cluster carries the whole cluster text, any further
/// glyphs of the same cluster get an empty string. Cluster ends are found by
/// sorting the distinct cluster starts, so the result is right for both
/// visual directions.
pub fn cluster_texts(text: &str, glyphs: &[ShapedGlyph]) -> Vec<String> {
    let mut starts: Vec<usize> = glyphs
        .iter()
        .map(|g| g.cluster)
        .filter(|&c| c <= text.len() && text.is_char_boundary(c))
        .collect();
    starts.sort_unstable();
    starts.dedup();

    let mut seen = vec![false; starts.len()];
    glyphs
        .iter()
        .map(|g| match starts.binary_search(&g.cluster) {
            Ok(i) if !seen[i] => {
                seen[i] = true;
                let end = starts.get(i + 1).copied().unwrap_or(text.len());
                text[g.cluster..end].to_string()
            }
            _ => String::new(),
        })
        .collect()
}
