//! Typed in-memory tables and the per-column coercion policy.
//!
//! ROW IDENTITY: a Record's `position` is its 0-based index among the data
//! rows of the sheet at load time. It is assigned once, here, and is the
//! only handle later writes may use to address the row. The backing sheet
//! row is always `position + SHEET_ROW_OFFSET`.

use crate::types::{RowPosition, SheetRow};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Sheets are 1-based and row 1 holds the header, so data position 0 is row 2.
pub const SHEET_ROW_OFFSET: SheetRow = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDateTime),
}

impl CellValue {
    /// Comparable text form. Whole numbers render without a fraction so a
    /// numeric id read back as `123.0` still matches the query "123".
    pub fn as_text(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(s) => s.clone(),
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Self::Number(n) => n.to_string(),
            Self::Date(d) => d.to_string(),
        }
    }

    pub fn as_number(&self) -> f64 {
        match self {
            Self::Number(n) => *n,
            _ => 0.0,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Date(d) => Some(*d),
            _ => None,
        }
    }
}

/// How the loader turns the raw cell text of one column into a CellValue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ColumnKind {
    Text,
    /// Unparsable or blank values become 0.
    Numeric,
    /// Rows whose value does not match `format` are dropped.
    Date { format: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnRule {
    pub name:     String,
    pub kind:     ColumnKind,
    /// A missing required column aborts the load with an empty table.
    pub required: bool,
}

/// The coercion policy for one sheet, declared once per reader.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub rules:   Vec<ColumnRule>,
    /// Sort loaded rows by this date column, oldest first.
    pub sort_by: Option<String>,
}

impl ColumnSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str) -> Self {
        self.rules.push(ColumnRule { name: name.into(), kind: ColumnKind::Text, required: false });
        self
    }

    pub fn numeric(mut self, name: &str) -> Self {
        self.rules.push(ColumnRule { name: name.into(), kind: ColumnKind::Numeric, required: false });
        self
    }

    pub fn date(mut self, name: &str, format: &str) -> Self {
        self.rules.push(ColumnRule {
            name: name.into(),
            kind: ColumnKind::Date { format: format.into() },
            required: false,
        });
        self
    }

    /// Mark the most recently added rule as required.
    pub fn required(mut self) -> Self {
        if let Some(last) = self.rules.last_mut() {
            last.required = true;
        }
        self
    }

    pub fn sorted_by(mut self, name: &str) -> Self {
        self.sort_by = Some(name.into());
        self
    }

    pub fn rule(&self, name: &str) -> Option<&ColumnRule> {
        self.rules.iter().find(|r| r.name == name)
    }
}

/// Guess a value for a column the `ColumnSpec` has no rule for.
/// Mirrors how the sheet API hands back numeric-looking cells as numbers.
pub fn infer_cell(raw: &str) -> CellValue {
    if raw.is_empty() {
        return CellValue::Empty;
    }
    match raw.trim().parse::<f64>() {
        Ok(n) if n.is_finite() => CellValue::Number(n),
        _ => CellValue::Text(raw.to_string()),
    }
}

/// Numeric coercion that fails soft to zero. Accepts a decimal comma.
pub fn coerce_numeric(raw: &str) -> f64 {
    let trimmed = raw.trim();
    trimmed
        .parse::<f64>()
        .or_else(|_| trimmed.replace(',', ".").parse::<f64>())
        .ok()
        .filter(|n| n.is_finite())
        .unwrap_or(0.0)
}

pub fn coerce_date(raw: &str, format: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw.trim(), format).ok()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub position: RowPosition,
    pub values:   Vec<CellValue>,
}

impl Record {
    pub fn sheet_row(&self) -> SheetRow {
        self.position as SheetRow + SHEET_ROW_OFFSET
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub records: Vec<Record>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns, records: Vec::new() }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn value<'a>(&self, record: &'a Record, column: &str) -> Option<&'a CellValue> {
        self.column_index(column).and_then(|i| record.values.get(i))
    }

    /// A table with the same columns holding only the records `keep` accepts.
    /// Positions are carried over untouched.
    pub fn filter(&self, mut keep: impl FnMut(&Record) -> bool) -> Table {
        Table {
            columns: self.columns.clone(),
            records: self.records.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }
}
