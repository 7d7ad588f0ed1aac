use std::fmt;

use serde::{Deserialize, Serialize};

use crate::analyzer::sla::SlaOutcome;

/// One spreadsheet cell as handed over by the extraction layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        CellValue::Text(s.into())
    }

    /// True for empty cells and whitespace-only text.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(n) => n.is_nan(),
            CellValue::Bool(_) => false,
        }
    }

    /// Trimmed string form. Whole numbers lose their trailing ".0" so that
    /// ticket numbers typed as numeric cells read back as "1042", not "1042.0".
    pub fn to_trimmed_string(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.trim().to_string(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Number(n) if !n.is_finite() => String::new(),
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                format!("{}", *n as i64)
            }
            CellValue::Number(n) => n.to_string(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s.to_string())
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

/// A data row keyed by the exact header text of the file it came from.
/// Header order is preserved; on duplicate headers the first one wins.
#[derive(Debug, Clone, Default)]
pub struct RawRow {
    cells: Vec<(String, CellValue)>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<CellValue>,
    {
        let mut row = RawRow::new();
        for (k, v) in pairs {
            row.insert(k, v);
        }
        row
    }

    pub fn insert(&mut self, header: impl Into<String>, value: impl Into<CellValue>) {
        let header = header.into();
        if self.cells.iter().any(|(h, _)| *h == header) {
            return;
        }
        self.cells.push((header, value.into()));
    }

    pub fn get(&self, header: &str) -> Option<&CellValue> {
        self.cells.iter().find(|(h, _)| h == header).map(|(_, v)| v)
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> + Clone {
        self.cells.iter().map(|(h, _)| h.as_str())
    }

    /// A row with no non-blank cell is skipped by the pipeline.
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|(_, v)| v.is_blank())
    }
}

/// Two-dimensional cell grid: first row is the header, the rest is data.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    pub fn new(rows: Vec<Vec<CellValue>>) -> Self {
        RawTable { rows }
    }

    /// Convenience for tests and text sources: every non-empty string becomes a text cell.
    pub fn from_strings(rows: &[&[&str]]) -> Self {
        RawTable {
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| CellValue::from(*c)).collect())
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Header names, trimmed. `None` when the first row has no usable name.
    pub fn header(&self) -> Option<Vec<String>> {
        let first = self.rows.first()?;
        let names: Vec<String> = first.iter().map(CellValue::to_trimmed_string).collect();
        if names.iter().all(|n| n.is_empty()) {
            return None;
        }
        Some(names)
    }

    pub fn data_rows(&self) -> &[Vec<CellValue>] {
        self.rows.get(1..).unwrap_or(&[])
    }
}

/// Canonical ticket (incident or service request) after validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Ticket {
    pub number: String,
    pub opened: String,
    pub short_description: String,
    pub caller: String,
    pub priority: String,
    pub state: String,
    pub category: String,
    pub subcategory: String,
    pub assignment_group: String,
    pub assigned_to: String,
    pub updated: String,
    pub updated_by: String,
    pub closed: String,
    pub business_impact: String,
    pub comments_and_work_notes: String,
    pub request_item: String,
    pub requested_for_name: String,
    /// Attached by the SLA engine after ingestion.
    #[serde(rename = "SLA", skip_serializing_if = "Option::is_none")]
    pub sla: Option<SlaOutcome>,
}

/// One violated rule on one row. `row` uses spreadsheet numbering:
/// the header is row 1, the first data row is row 2.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    pub row: usize,
    pub column: String,
    pub value: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(row: usize, column: &str, value: &str, reason: &str) -> Self {
        ValidationError {
            row,
            column: column.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}: {} {}", self.row, self.column, self.reason)?;
        if !self.value.is_empty() {
            write!(f, " (value: {})", self.value)?;
        }
        Ok(())
    }
}

/// Output of `ingest`: accepted tickets plus everything the operator should see.
#[derive(Debug, Clone)]
pub struct IngestOutput {
    pub records: Vec<Ticket>,
    pub errors: Vec<ValidationError>,
    pub total_rows_processed: usize,
    pub blank_rows: usize,
    pub detected_columns: Vec<String>,
    pub missing_optional_columns: Vec<String>,
    pub parse_duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_cell_drops_trailing_zero() {
        assert_eq!(CellValue::Number(1042.0).to_trimmed_string(), "1042");
        assert_eq!(CellValue::Number(1.5).to_trimmed_string(), "1.5");
        assert_eq!(CellValue::Number(f64::NAN).to_trimmed_string(), "");
    }

    #[test]
    fn test_raw_row_first_duplicate_wins() {
        let row = RawRow::from_pairs([("Number", "INC1"), ("Number", "INC2")]);
        assert_eq!(row.get("Number"), Some(&CellValue::text("INC1")));
        assert_eq!(row.headers().count(), 1);
    }

    #[test]
    fn test_raw_row_blank() {
        let row = RawRow::from_pairs([("Number", ""), ("Opened", "   ")]);
        assert!(row.is_blank());
        let row = RawRow::from_pairs([("Number", ""), ("Opened", "x")]);
        assert!(!row.is_blank());
    }

    #[test]
    fn test_header_requires_a_name() {
        let table = RawTable::from_strings(&[&["", " "], &["a", "b"]]);
        assert!(table.header().is_none());
        let table = RawTable::from_strings(&[&[" Number ", "Opened"]]);
        assert_eq!(table.header().unwrap(), vec!["Number", "Opened"]);
        assert!(table.data_rows().is_empty());
    }

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::new(6, "Opened", "32/13/2025", "invalid date");
        assert_eq!(err.to_string(), "row 6: Opened invalid date (value: 32/13/2025)");
        let err = ValidationError::new(3, "Number", "", "required");
        assert_eq!(err.to_string(), "row 3: Number required");
    }
}
