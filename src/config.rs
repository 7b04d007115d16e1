//! # Render Configuration
//!
//! Everything about a sheet that is not the shop list: page size, margins,
//! columns, headings, font and theme. A [`RenderConfig`] is an immutable value
//! handed to the composer on every call; nothing is read from process-wide
//! state, so two renders with different fonts can run side by side.
//!
//! Every field has a default, and a JSON config file only needs the keys it
//! changes:
//!
//! ```json
//! { "direction": "RightToLeft", "font": { "file": "fonts/Amiri-Regular.ttf" } }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use time::Date;

use crate::error::SheetError;
use crate::font::FontContext;
use crate::layout::{ColumnDirection, TableGeometry};
use crate::model::{ColumnSpec, Metadata, PageSize};
use crate::style::Theme;

/// Top, bottom and left page margins in points.
///
/// The table starts at the top margin line; everything above it belongs to
/// the title block and the header band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetMargins {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Default for SheetMargins {
    fn default() -> Self {
        Self {
            top: 150.0,
            bottom: 60.0,
            left: 50.0,
        }
    }
}

/// Where the sheet font comes from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FontSource {
    /// Helvetica, not embedded. Latin text only.
    #[default]
    Standard,
    /// A TrueType/OpenType file embedded in the PDF.
    File(PathBuf),
}

impl FontSource {
    /// Build the font context for this source, reading the file if needed.
    pub fn load(&self) -> Result<FontContext, SheetError> {
        match self {
            FontSource::Standard => Ok(FontContext::new()),
            FontSource::File(path) => {
                let data = std::fs::read(path).map_err(|e| {
                    SheetError::Font(format!("failed to read '{}': {}", path.display(), e))
                })?;
                let family = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("Embedded");
                log::debug!("loaded font '{}' ({} bytes)", family, data.len());
                FontContext::with_custom_font(family, data)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderConfig {
    pub page: PageSize,
    pub margins: SheetMargins,
    pub row_height: f64,
    pub header_height: f64,
    pub columns: Vec<ColumnSpec>,
    pub direction: ColumnDirection,
    pub title: String,
    pub company: String,
    pub font: FontSource,
    /// Path, data URI or base64 of the logo drawn top-right on page one.
    pub logo: Option<String>,
    pub show_page_numbers: bool,
    pub theme: Theme,
    /// Suggested download name, used in `Content-Disposition`.
    pub filename: String,
    pub metadata: Metadata,
    /// Date printed as "Generated: M/D/YYYY". Today (UTC) when unset.
    #[serde(skip)]
    pub generated_on: Option<Date>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            page: PageSize::A4,
            margins: SheetMargins::default(),
            row_height: 25.0,
            header_height: 25.0,
            columns: vec![
                ColumnSpec::new("No.", 50.0),
                ColumnSpec::new("Shop Name", 300.0),
                ColumnSpec::new("Balance", 150.0),
            ],
            direction: ColumnDirection::LeftToRight,
            title: "SHOPS BALANCE SHEET".to_string(),
            company: "Company Name Here".to_string(),
            font: FontSource::Standard,
            logo: None,
            show_page_numbers: true,
            theme: Theme::default(),
            filename: "shops-balance.pdf".to_string(),
            metadata: Metadata::default(),
            generated_on: None,
        }
    }
}

impl RenderConfig {
    /// Read a JSON config file. Missing keys keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SheetError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Vertical table geometry derived from the page and margins.
    pub fn geometry(&self) -> TableGeometry {
        let (_, page_height) = self.page.dimensions();
        TableGeometry::new(
            page_height,
            self.margins.top,
            self.margins.bottom,
            self.row_height,
        )
        .with_header_height(self.header_height)
        .with_direction(self.direction)
    }

    /// The date to print, falling back to today.
    pub fn generated_on(&self) -> Date {
        self.generated_on
            .unwrap_or_else(|| time::OffsetDateTime::now_utc().date())
    }

    /// `Generated: M/D/YYYY`.
    pub fn generated_label(&self) -> String {
        let date = self.generated_on();
        format!(
            "Generated: {}/{}/{}",
            u8::from(date.month()),
            date.day(),
            date.year()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Month;

    #[test]
    fn defaults_match_classic_sheet() {
        let config = RenderConfig::default();
        let geometry = config.geometry();
        assert_eq!(geometry.page_height, 842.0);
        assert_eq!(geometry.top_margin, 150.0);
        assert_eq!(geometry.bottom_margin, 60.0);
        assert_eq!(geometry.row_height, 25.0);
        assert_eq!(geometry.header_height, 25.0);
        assert_eq!(config.columns.iter().map(|c| c.width).sum::<f64>(), 500.0);
        assert!(config.show_page_numbers);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: RenderConfig = serde_json::from_str(
            r#"{
                "direction": "RightToLeft",
                "rowHeight": 20,
                "margins": { "top": 120 },
                "font": { "file": "fonts/Amiri.ttf" }
            }"#,
        )
        .unwrap();
        assert!(config.direction.is_rtl());
        assert_eq!(config.row_height, 20.0);
        assert_eq!(config.margins.top, 120.0);
        assert_eq!(config.margins.bottom, 60.0);
        assert_eq!(config.font, FontSource::File(PathBuf::from("fonts/Amiri.ttf")));
        assert_eq!(config.title, "SHOPS BALANCE SHEET");
    }

    #[test]
    fn generated_label_format() {
        let config = RenderConfig {
            generated_on: Some(Date::from_calendar_date(2024, Month::March, 5).unwrap()),
            ..RenderConfig::default()
        };
        assert_eq!(config.generated_label(), "Generated: 3/5/2024");
    }

    #[test]
    fn from_json_file_reads_and_reports() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sheet.json");
        std::fs::write(&path, r#"{ "company": "Acme Traders" }"#).unwrap();
        let config = RenderConfig::from_json_file(&path).unwrap();
        assert_eq!(config.company, "Acme Traders");

        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            RenderConfig::from_json_file(&path),
            Err(SheetError::Json { .. })
        ));
        assert!(matches!(
            RenderConfig::from_json_file(dir.path().join("missing.json")),
            Err(SheetError::Io(_))
        ));
    }

    #[test]
    fn missing_font_file_is_font_error() {
        let source = FontSource::File(PathBuf::from("/nonexistent/Amiri.ttf"));
        assert!(matches!(source.load(), Err(SheetError::Font(_))));
        assert!(!FontSource::Standard.load().unwrap().is_custom());
    }
}
