//! # Data Model
//!
//! The input side of the pipeline. A balance sheet request is nothing more
//! than a list of shop names (and, optionally, their balances). It is turned
//! into [`Row`]s that share their geometry with an ordered list of
//! [`ColumnSpec`]s.

use serde::{Deserialize, Serialize};

use crate::error::SheetError;

/// One vertical slot of the table: fixed width in points and a header label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub width: f64,
    pub label: String,
}

impl ColumnSpec {
    pub fn new(label: impl Into<String>, width: f64) -> Self {
        Self {
            width,
            label: label.into(),
        }
    }
}

/// One data record, rendered as a single horizontal band.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Row {
    pub cells: Vec<String>,
}

impl Row {
    pub fn new<I, S>(cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cells: cells.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// The body of a balance sheet request: `{ "shops": ["..."] }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BalanceSheetRequest {
    pub shops: Vec<String>,
    /// Per-shop balances. When absent every balance renders as `0.00`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balances: Option<Vec<f64>>,
}

impl BalanceSheetRequest {
    pub fn new<I, S>(shops: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            shops: shops.into_iter().map(Into::into).collect(),
            balances: None,
        }
    }

    /// Parse a request body.
    ///
    /// Syntax errors surface as [`SheetError::Json`]; a body without a
    /// `shops` array is a [`SheetError::Request`].
    pub fn from_json(body: &str) -> Result<Self, SheetError> {
        let value: serde_json::Value = serde_json::from_str(body)?;
        match value.get("shops") {
            Some(serde_json::Value::Array(_)) => {}
            _ => return Err(SheetError::Request("Shops array is required".to_string())),
        }
        let request: BalanceSheetRequest = serde_json::from_value(value)?;
        request.validate()?;
        Ok(request)
    }

    fn validate(&self) -> Result<(), SheetError> {
        if let Some(balances) = &self.balances {
            if balances.len() != self.shops.len() {
                return Err(SheetError::Request(format!(
                    "Balances array has {} entries but there are {} shops",
                    balances.len(),
                    self.shops.len()
                )));
            }
        }
        Ok(())
    }

    /// The table rows: ordinal, shop name, balance.
    pub fn rows(&self) -> Vec<Row> {
        self.shops
            .iter()
            .enumerate()
            .map(|(i, shop)| {
                let balance = self
                    .balances
                    .as_ref()
                    .and_then(|b| b.get(i))
                    .copied()
                    .unwrap_or(0.0);
                Row::new([(i + 1).to_string(), shop.clone(), format!("{:.2}", balance)])
            })
            .collect()
    }

    /// Sum of all balances, if any were supplied.
    pub fn total_balance(&self) -> Option<f64> {
        self.balances.as_ref().map(|b| b.iter().sum())
    }
}

/// Document metadata embedded in the PDF Info dictionary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
}

/// Standard page sizes in points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum PageSize {
    /// A4 rounded to whole points.
    #[default]
    A4,
    Letter,
    Legal,
    Custom {
        width: f64,
        height: f64,
    },
}

impl PageSize {
    /// Returns (width, height) in points.
    pub fn dimensions(&self) -> (f64, f64) {
        match self {
            PageSize::A4 => (595.0, 842.0),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Legal => (612.0, 1008.0),
            PageSize::Custom { width, height } => (*width, *height),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_number_shops_from_one() {
        let req = BalanceSheetRequest::new(["Alpha", "Beta"]);
        let rows = req.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].cells, vec!["1", "Alpha", "0.00"]);
        assert_eq!(rows[1].cells, vec!["2", "Beta", "0.00"]);
    }

    #[test]
    fn balances_are_formatted() {
        let req = BalanceSheetRequest {
            shops: vec!["A".into(), "B".into()],
            balances: Some(vec![12.5, -3.0]),
        };
        let rows = req.rows();
        assert_eq!(rows[0].cells[2], "12.50");
        assert_eq!(rows[1].cells[2], "-3.00");
        assert_eq!(req.total_balance(), Some(9.5));
    }

    #[test]
    fn missing_shops_is_a_request_error() {
        let err = BalanceSheetRequest::from_json(r#"{"names": []}"#).unwrap_err();
        assert!(matches!(err, SheetError::Request(ref m) if m == "Shops array is required"));

        let err = BalanceSheetRequest::from_json(r#"{"shops": "Alpha"}"#).unwrap_err();
        assert!(matches!(err, SheetError::Request(_)));
    }

    #[test]
    fn malformed_body_is_a_json_error() {
        let err = BalanceSheetRequest::from_json("{\"shops\": [").unwrap_err();
        assert!(matches!(err, SheetError::Json { .. }));
    }

    #[test]
    fn non_string_shop_is_a_json_error() {
        let err = BalanceSheetRequest::from_json(r#"{"shops": [1, 2]}"#).unwrap_err();
        assert!(matches!(err, SheetError::Json { .. }));
    }

    #[test]
    fn balance_length_mismatch() {
        let err =
            BalanceSheetRequest::from_json(r#"{"shops": ["a", "b"], "balances": [1.0]}"#)
                .unwrap_err();
        assert!(matches!(err, SheetError::Request(_)));
    }

    #[test]
    fn page_sizes() {
        assert_eq!(PageSize::A4.dimensions(), (595.0, 842.0));
        assert_eq!(
            PageSize::Custom {
                width: 100.0,
                height: 200.0
            }
            .dimensions(),
            (100.0, 200.0)
        );
    }
}
