//! The authoritative in-memory table state.
//!
//! `Dataset` owns both the ordered column registry and the row store. Every
//! rendered view (table grid, axis selectors, chart, correlation panel) is a
//! projection of this struct; nothing reads table structure back out of the
//! UI. Mutators uphold one invariant throughout: each row carries a value for
//! exactly the registered value columns, and `Date` is always the first
//! column.

use chrono::{Local, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// The fixed identity of the date column. Never renamed, never removed,
/// always first in the registry.
pub const DATE_COLUMN: &str = "Date";

/// Format accepted for date cells and used on the wire.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

lazy_static! {
    /// Shape gate for date input; calendar validity is checked by chrono
    /// afterwards, so `2024-13-40` passes here and fails the parse.
    static ref DATE_SHAPE: Regex = Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap();
    static ref VARIABLE_NAME: Regex = Regex::new(r"^Variable (\d+)$").unwrap();
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DatasetError {
    #[error("row index {0} is out of bounds")]
    RowOutOfBounds(usize),
    #[error("no column named '{0}'")]
    UnknownColumn(String),
    #[error("'{0}' is not a valid date (expected YYYY-MM-DD)")]
    InvalidDate(String),
    #[error("'{0}' is not a number")]
    InvalidNumber(String),
    #[error("column name cannot be empty")]
    EmptyColumnName,
    #[error("the '{DATE_COLUMN}' column cannot be renamed")]
    DateColumnImmutable,
    #[error("a column named '{0}' already exists")]
    DuplicateColumn(String),
    #[error("row is missing a value for column '{0}'")]
    MissingValue(String),
}

/// A single committed cell value, kept around for rollback records.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Date(NaiveDate),
    Number(f64),
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            CellValue::Number(n) => write!(f, "{n}"),
        }
    }
}

/// Record of an accepted cell edit: what was there before, what is there now.
///
/// The previous value is what gets written back if the backend rejects the
/// table replace that carried this edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellEdit {
    pub row: usize,
    pub column: String,
    pub previous: CellValue,
    pub applied: CellValue,
}

/// Result of a rename request that was not rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameOutcome {
    Renamed { from: String, to: String },
    /// Candidate equals the current name after trimming; explicitly a no-op.
    Unchanged,
}

/// One record: a calendar date plus one number per value column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub date: NaiveDate,
    values: HashMap<String, f64>,
}

impl Row {
    pub fn new(date: NaiveDate, values: HashMap<String, f64>) -> Self {
        Self { date, values }
    }

    /// Value for a column; `Date` is not addressable here.
    pub fn value(&self, column: &str) -> Option<f64> {
        self.values.get(column).copied()
    }

    pub fn values(&self) -> &HashMap<String, f64> {
        &self.values
    }

    fn set(&mut self, column: &str, value: f64) {
        self.values.insert(column.to_string(), value);
    }

    fn rename_key(&mut self, from: &str, to: &str) {
        if let Some(v) = self.values.remove(from) {
            self.values.insert(to.to_string(), v);
        }
    }
}

/// The table: ordered column registry plus row store.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Row>,
    /// Monotonic counter feeding `Variable {n}` names. Never reused, even
    /// across renames; reset only when the whole table is replaced.
    next_variable: u32,
}

impl Default for Dataset {
    fn default() -> Self {
        let columns = Self::default_columns();
        let next_variable = next_variable_counter(&columns);
        Self {
            columns,
            rows: Vec::new(),
            next_variable,
        }
    }
}

impl Dataset {
    pub fn default_columns() -> Vec<String> {
        vec![
            DATE_COLUMN.to_string(),
            "Variable 1".to_string(),
            "Variable 2".to_string(),
        ]
    }

    /// All column identifiers, `Date` first.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Column identifiers excluding `Date`.
    pub fn value_columns(&self) -> &[String] {
        &self.columns[1..]
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Strict date parse: shape first, then calendar validity.
    pub fn parse_date(raw: &str) -> Result<NaiveDate, DatasetError> {
        let raw = raw.trim();
        if !DATE_SHAPE.is_match(raw) {
            return Err(DatasetError::InvalidDate(raw.to_string()));
        }
        NaiveDate::parse_from_str(raw, DATE_FORMAT)
            .map_err(|_| DatasetError::InvalidDate(raw.to_string()))
    }

    /// Parse a finite number from raw cell input.
    pub fn parse_number(raw: &str) -> Result<f64, DatasetError> {
        let raw = raw.trim();
        match raw.parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(n),
            _ => Err(DatasetError::InvalidNumber(raw.to_string())),
        }
    }

    /// Append a row built from raw entry-line input.
    ///
    /// An empty date defaults to today's local calendar date; a malformed
    /// non-empty date is rejected. Missing or unparseable numeric entries
    /// coerce to `0.0` — the entry line is forgiving where cell edits are
    /// strict.
    pub fn add_row(
        &mut self,
        date_raw: &str,
        entries: &HashMap<String, String>,
    ) -> Result<(), DatasetError> {
        let date = if date_raw.trim().is_empty() {
            Local::now().date_naive()
        } else {
            Self::parse_date(date_raw)?
        };

        let mut values = HashMap::with_capacity(self.value_columns().len());
        for column in self.value_columns() {
            let value = entries
                .get(column)
                .and_then(|raw| Self::parse_number(raw).ok())
                .unwrap_or(0.0);
            values.insert(column.clone(), value);
        }

        self.rows.push(Row::new(date, values));
        Ok(())
    }

    /// Commit a single cell edit, returning the rollback record on success.
    ///
    /// Rejected input leaves the row untouched; the caller redisplays the
    /// last known-good value simply by re-projecting.
    pub fn set_cell(
        &mut self,
        row_index: usize,
        column: &str,
        raw: &str,
    ) -> Result<CellEdit, DatasetError> {
        if !self.has_column(column) {
            return Err(DatasetError::UnknownColumn(column.to_string()));
        }
        let row = self
            .rows
            .get_mut(row_index)
            .ok_or(DatasetError::RowOutOfBounds(row_index))?;

        let (previous, applied) = if column == DATE_COLUMN {
            let date = Self::parse_date(raw)?;
            let previous = CellValue::Date(row.date);
            row.date = date;
            (previous, CellValue::Date(date))
        } else {
            let number = Self::parse_number(raw)?;
            let previous = CellValue::Number(
                row.value(column)
                    .ok_or_else(|| DatasetError::MissingValue(column.to_string()))?,
            );
            row.set(column, number);
            (previous, CellValue::Number(number))
        };

        Ok(CellEdit {
            row: row_index,
            column: column.to_string(),
            previous,
            applied,
        })
    }

    /// Write a previously-committed value back, undoing an optimistic edit.
    pub fn revert_cell(&mut self, edit: &CellEdit) -> Result<(), DatasetError> {
        let row = self
            .rows
            .get_mut(edit.row)
            .ok_or(DatasetError::RowOutOfBounds(edit.row))?;
        match edit.previous {
            CellValue::Date(d) => row.date = d,
            CellValue::Number(n) => {
                if !row.values.contains_key(&edit.column) {
                    return Err(DatasetError::UnknownColumn(edit.column.clone()));
                }
                row.set(&edit.column, n);
            }
        }
        Ok(())
    }

    /// Synthesize and register a fresh `Variable {n}` column.
    ///
    /// Every existing row gains the new column at `0.0`. The counter only
    /// moves forward, so identifiers are never reused.
    pub fn add_column(&mut self) -> String {
        let name = loop {
            let candidate = format!("Variable {}", self.next_variable);
            self.next_variable += 1;
            if !self.has_column(&candidate) {
                break candidate;
            }
        };
        self.columns.push(name.clone());
        for row in &mut self.rows {
            row.set(&name, 0.0);
        }
        name
    }

    /// Rename a column everywhere it is referenced in the table.
    ///
    /// The candidate is trimmed first. Empty, `Date`, and collisions with a
    /// *different* existing column are rejected; a candidate equal to the
    /// current name short-circuits as [`RenameOutcome::Unchanged`]. Axis
    /// repointing is the caller's job — the table does not know about chart
    /// state.
    pub fn rename_column(
        &mut self,
        from: &str,
        candidate: &str,
    ) -> Result<RenameOutcome, DatasetError> {
        if from == DATE_COLUMN {
            return Err(DatasetError::DateColumnImmutable);
        }
        if !self.has_column(from) {
            return Err(DatasetError::UnknownColumn(from.to_string()));
        }

        let to = candidate.trim();
        if to.is_empty() {
            return Err(DatasetError::EmptyColumnName);
        }
        if to == from {
            return Ok(RenameOutcome::Unchanged);
        }
        if to == DATE_COLUMN {
            return Err(DatasetError::DateColumnImmutable);
        }
        if self.has_column(to) {
            return Err(DatasetError::DuplicateColumn(to.to_string()));
        }

        for column in &mut self.columns {
            if column == from {
                *column = to.to_string();
                break;
            }
        }
        for row in &mut self.rows {
            row.rename_key(from, to);
        }

        Ok(RenameOutcome::Renamed {
            from: from.to_string(),
            to: to.to_string(),
        })
    }

    /// Replace the whole table: registry and rows together.
    ///
    /// This is the single path where the column *set* may change shape
    /// (import, hydration, clear, reset). Rows missing a value for any
    /// registered column are rejected; the variable counter is rebuilt from
    /// the incoming names.
    pub fn replace_all(
        &mut self,
        columns: Vec<String>,
        rows: Vec<Row>,
    ) -> Result<(), DatasetError> {
        if columns.first().map(String::as_str) != Some(DATE_COLUMN) {
            return Err(DatasetError::UnknownColumn(DATE_COLUMN.to_string()));
        }
        for row in &rows {
            for column in &columns[1..] {
                if row.value(column).is_none() {
                    return Err(DatasetError::MissingValue(column.clone()));
                }
            }
        }
        self.next_variable = next_variable_counter(&columns);
        self.columns = columns;
        self.rows = rows;
        Ok(())
    }

    /// True when every row's key set equals the registry's value columns.
    pub fn is_consistent(&self) -> bool {
        if self.columns.first().map(String::as_str) != Some(DATE_COLUMN) {
            return false;
        }
        let expected = self.value_columns();
        self.rows.iter().all(|row| {
            row.values.len() == expected.len()
                && expected.iter().all(|c| row.values.contains_key(c))
        })
    }
}

/// Counter value that keeps generated names ahead of every `Variable {n}`
/// already present.
fn next_variable_counter(columns: &[String]) -> u32 {
    columns
        .iter()
        .filter_map(|c| VARIABLE_NAME.captures(c))
        .filter_map(|caps| caps[1].parse::<u32>().ok())
        .max()
        .map_or(1, |n| n + 1)
}
