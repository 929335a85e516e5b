// ============================================================
// Layer 3 — Student Record Types
// ============================================================
// The raw, untyped shape of student data as it arrives from a
// CSV upload or a prediction request: a column name mapped to a
// number, a string, or nothing at all.
//
// Nothing here knows about encoders or tensors. These types are
// what the preprocessing pipeline consumes.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Column names that identify a student and are never used as features.
pub const IDENTIFIER_COLUMNS: [&str; 2] = ["student_name", "roll_no"];

/// Column holding the label in training data.
pub const DEFAULT_TARGET_COLUMN: &str = "dropout_risk";

/// Columns treated as categorical by default. Every other
/// non-identifier, non-target column is numeric.
pub const DEFAULT_CATEGORICAL_COLUMNS: [&str; 5] =
    ["gender", "location", "parent_occupation", "class", "income"];

/// One raw cell value.
///
/// `untagged` lets a JSON request body deserialize directly:
///   65.5   → Number
///   "Low"  → Text
///   null   → Missing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Number(f64),
    Text(String),
    Missing,
}

impl FeatureValue {
    /// Interpret a CSV cell: empty → Missing, finite number → Number, else Text.
    /// "NaN" and "inf" stay Text, so a numeric column holding them fails to fit.
    pub fn parse_cell(cell: &str) -> Self {
        let trimmed = cell.trim();
        if trimmed.is_empty() {
            return Self::Missing;
        }
        match parse_finite(trimmed) {
            Some(n) => Self::Number(n),
            None    => Self::Text(trimmed.to_string()),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// Numeric view. Text is parsed if it looks like a number.
    /// Non-finite values have no numeric view.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n).filter(|n| n.is_finite()),
            Self::Text(s)   => parse_finite(s.trim()),
            Self::Missing   => None,
        }
    }

    /// Categorical view. Numbers are rendered with `Display`,
    /// so `8.0` and `"8"` map to the same category.
    pub fn as_category(&self) -> Option<String> {
        match self {
            Self::Number(n) => Some(n.to_string()),
            Self::Text(s)   => Some(s.trim().to_string()),
            Self::Missing   => None,
        }
    }
}

// f64::from_str accepts "NaN", "inf" and "infinity".
fn parse_finite(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|n| n.is_finite())
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s)   => write!(f, "{s}"),
            Self::Missing   => write!(f, "<missing>"),
        }
    }
}

impl From<f64> for FeatureValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for FeatureValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// A single student's features, keyed by column name.
/// This is the "feature dictionary" the request layer hands us.
pub type FeatureMap = BTreeMap<String, FeatureValue>;

/// A table of raw student rows with a fixed column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows:    Vec<Vec<FeatureValue>>,
}

impl RawTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns, rows: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Append a row. Short rows are padded with `Missing`, long rows truncated.
    pub fn push_row(&mut self, mut row: Vec<FeatureValue>) {
        row.resize(self.columns.len(), FeatureValue::Missing);
        self.rows.push(row);
    }

    /// All values of one column, in row order.
    pub fn column(&self, index: usize) -> impl Iterator<Item = &FeatureValue> + '_ {
        self.rows.iter().map(move |r| &r[index])
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cell() {
        assert_eq!(FeatureValue::parse_cell(" 65.5 "), FeatureValue::Number(65.5));
        assert_eq!(FeatureValue::parse_cell("Rural"), FeatureValue::Text("Rural".into()));
        assert_eq!(FeatureValue::parse_cell("   "), FeatureValue::Missing);
    }

    #[test]
    fn test_non_finite_text_is_not_a_number() {
        for cell in ["NaN", "nan", "inf", "-inf", "infinity"] {
            assert_eq!(FeatureValue::parse_cell(cell), FeatureValue::Text(cell.into()));
            assert_eq!(FeatureValue::Text(cell.into()).as_number(), None);
        }
        assert_eq!(FeatureValue::Number(f64::NAN).as_number(), None);
        assert_eq!(FeatureValue::Number(f64::NEG_INFINITY).as_number(), None);
        assert_eq!(FeatureValue::Text(" 7.5 ".into()).as_number(), Some(7.5));
    }

    #[test]
    fn test_json_request_shapes() {
        let json = r#"{"attendance": 65.5, "income": "Low", "marks": null}"#;
        let map: FeatureMap = serde_json::from_str(json).unwrap();
        assert_eq!(map["attendance"], FeatureValue::Number(65.5));
        assert_eq!(map["income"], FeatureValue::Text("Low".into()));
        assert!(map["marks"].is_missing());
    }

    #[test]
    fn test_number_and_text_share_category() {
        assert_eq!(FeatureValue::Number(8.0).as_category(), Some("8".to_string()));
        assert_eq!(FeatureValue::Text("8".into()).as_category(), Some("8".to_string()));
    }

    #[test]
    fn test_push_row_pads_short_rows() {
        let mut t = RawTable::new(vec!["a".into(), "b".into()]);
        t.push_row(vec![FeatureValue::Number(1.0)]);
        assert_eq!(t.rows[0].len(), 2);
        assert!(t.rows[0][1].is_missing());
        assert_eq!(t.column(0).next(), Some(&FeatureValue::Number(1.0)));
    }
}
