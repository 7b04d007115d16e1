//! # Style
//!
//! Colors, text direction and the visual theme of a balance sheet. The theme
//! defaults reproduce the classic sheet: navy title, grey header band,
//! faint zebra striping.

use serde::{Deserialize, Serialize};

/// An RGB color with components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);

    pub const fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    pub const fn gray(v: f64) -> Self {
        Self { r: v, g: v, b: v }
    }
}

/// Paragraph direction for text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Ltr,
    Rtl,
    /// Detect from the first strong character.
    Auto,
}

/// Horizontal alignment of a text line inside its box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

impl TextAlign {
    /// X of the line start for a line of `width` aligned inside `[left, left + available)`.
    pub fn place(self, left: f64, available: f64, width: f64) -> f64 {
        match self {
            TextAlign::Left => left,
            TextAlign::Center => left + (available - width) / 2.0,
            TextAlign::Right => left + available - width,
        }
    }
}

/// Font size and color for one kind of text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    pub size: f64,
    pub color: Color,
    #[serde(default)]
    pub bold: bool,
}

impl TextStyle {
    pub const fn new(size: f64, color: Color, bold: bool) -> Self {
        Self { size, color, bold }
    }
}

/// Everything about how a sheet looks, apart from its geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Theme {
    pub title: TextStyle,
    pub company: TextStyle,
    pub date: TextStyle,
    pub header: TextStyle,
    pub body: TextStyle,
    pub footer: TextStyle,
    pub page_number: TextStyle,
    pub header_background: Color,
    pub header_border: Color,
    pub even_row: Color,
    pub odd_row: Color,
    pub grid: Color,
    pub grid_width: f64,
    pub footer_background: Color,
    /// Horizontal inset of cell text from the cell edge.
    pub cell_padding: f64,
    /// Distance of the text baseline above the bottom of its band.
    pub baseline_offset: f64,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            title: TextStyle::new(20.0, Color::rgb(0.0, 0.0, 0.5), true),
            company: TextStyle::new(14.0, Color::gray(0.3), false),
            date: TextStyle::new(12.0, Color::gray(0.5), false),
            header: TextStyle::new(12.0, Color::BLACK, true),
            body: TextStyle::new(11.0, Color::BLACK, false),
            footer: TextStyle::new(12.0, Color::rgb(0.0, 0.0, 0.5), true),
            page_number: TextStyle::new(9.0, Color::gray(0.5), false),
            header_background: Color::gray(0.9),
            header_border: Color::BLACK,
            even_row: Color::WHITE,
            odd_row: Color::gray(0.98),
            grid: Color::gray(0.8),
            grid_width: 0.5,
            footer_background: Color::gray(0.95),
            cell_padding: 10.0,
            baseline_offset: 7.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_places_line() {
        assert_eq!(TextAlign::Left.place(10.0, 100.0, 40.0), 10.0);
        assert_eq!(TextAlign::Center.place(10.0, 100.0, 40.0), 40.0);
        assert_eq!(TextAlign::Right.place(10.0, 100.0, 40.0), 70.0);
    }

    #[test]
    fn partial_theme_json_keeps_defaults() {
        let theme: Theme = serde_json::from_str(r#"{ "cellPadding": 4 }"#).unwrap();
        assert_eq!(theme.cell_padding, 4.0);
        assert_eq!(theme.title.size, 20.0);
        assert_eq!(theme.odd_row, Color::gray(0.98));
    }
}
