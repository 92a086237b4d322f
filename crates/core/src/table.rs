//! Tabular report results.

use chrono::NaiveDate;
use serde::Serialize;

pub use crate::types::round2;

/// One scalar of a result row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    Int(i64),
    Number(f64),
    Date(NaiveDate),
    Empty,
}

impl Cell {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(n) => Some(*n as f64),
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Number(_))
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for Cell {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<usize> for Cell {
    fn from(n: usize) -> Self {
        Self::Int(n as i64)
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<NaiveDate> for Cell {
    fn from(d: NaiveDate) -> Self {
        Self::Date(d)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Empty, Into::into)
    }
}

/// Ordered rows over a fixed column list.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TabularResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl TabularResult {
    pub fn new(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row. Short rows are padded with [`Cell::Empty`]; extra
    /// cells are dropped.
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        debug_assert_eq!(row.len(), self.columns.len(), "row width mismatch");
        row.resize(self.columns.len(), Cell::Empty);
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&Cell> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)
    }

    pub fn column_values<'a>(&'a self, column: &str) -> Option<impl Iterator<Item = &'a Cell> + 'a> {
        let idx = self.column_index(column)?;
        Some(self.rows.iter().filter_map(move |r| r.get(idx)))
    }

    /// A column is numeric when it has at least one number and nothing but
    /// numbers or blanks.
    pub fn is_numeric_column(&self, idx: usize) -> bool {
        let mut seen = false;
        for cell in self.rows.iter().filter_map(|r| r.get(idx)) {
            match cell {
                Cell::Int(_) | Cell::Number(_) => seen = true,
                Cell::Empty => {}
                _ => return false,
            }
        }
        seen
    }
}

/// A named table inside an exported document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sheet {
    pub name: String,
    pub table: TabularResult,
}

impl Sheet {
    pub fn new(name: impl Into<String>, table: TabularResult) -> Self {
        Self {
            name: name.into(),
            table,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_by_column_name() {
        let mut t = TabularResult::new(&["client", "revenue"]);
        t.push_row(vec!["Acme".into(), 12.5.into()]);
        assert_eq!(t.get(0, "revenue"), Some(&Cell::Number(12.5)));
        assert_eq!(t.get(0, "missing"), None);
        assert_eq!(t.get(1, "client"), None);
    }

    #[test]
    fn numeric_column_ignores_blanks() {
        let mut t = TabularResult::new(&["name", "change"]);
        t.push_row(vec!["a".into(), Cell::Empty]);
        t.push_row(vec!["b".into(), (-12.0).into()]);
        assert!(t.is_numeric_column(1));
        assert!(!t.is_numeric_column(0));
    }

    #[test]
    fn option_converts_to_empty() {
        let none: Option<f64> = None;
        assert_eq!(Cell::from(none), Cell::Empty);
        assert_eq!(Cell::from(Some(3_i64)), Cell::Int(3));
    }
}
