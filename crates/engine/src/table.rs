//! Table - the population frame a model is evaluated against
//!
//! A table is an ordered set of named, typed columns of equal length.
//! Row identity is the row index and never changes for a given table;
//! partitioning (`slice`, `take`) builds new tables.

use std::io::Read;
use std::ops::Range;

use rustc_hash::FxHashMap;

use crate::error::LmError;

// =============================================================================
// Scalar: a borrowed view of one cell
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar<'a> {
    Missing,
    Number(f64),
    Text(&'a str),
    Boolean(bool),
}

impl<'a> Scalar<'a> {
    pub fn is_missing(&self) -> bool {
        matches!(self, Scalar::Missing)
    }

    /// Numeric view: numbers as-is, booleans as 1/0.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) => Some(*n),
            Scalar::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Scalar::Missing => "missing",
            Scalar::Number(_) => "number",
            Scalar::Text(_) => "text",
            Scalar::Boolean(_) => "boolean",
        }
    }
}

// =============================================================================
// Column
// =============================================================================

/// Typed column storage. Missing numbers are NaN; text and boolean cells use `None`.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Number(Vec<f64>),
    Text(Vec<Option<String>>),
    Boolean(Vec<Option<bool>>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Number(v) => v.len(),
            Column::Text(v) => v.len(),
            Column::Boolean(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cell at `row`. Out-of-range rows read as missing.
    pub fn get(&self, row: usize) -> Scalar<'_> {
        match self {
            Column::Number(v) => match v.get(row) {
                Some(n) if !n.is_nan() => Scalar::Number(*n),
                _ => Scalar::Missing,
            },
            Column::Text(v) => match v.get(row) {
                Some(Some(s)) => Scalar::Text(s),
                _ => Scalar::Missing,
            },
            Column::Boolean(v) => match v.get(row) {
                Some(Some(b)) => Scalar::Boolean(*b),
                _ => Scalar::Missing,
            },
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Column::Number(_) => "number",
            Column::Text(_) => "text",
            Column::Boolean(_) => "boolean",
        }
    }

    fn slice(&self, range: Range<usize>) -> Column {
        match self {
            Column::Number(v) => Column::Number(v[range].to_vec()),
            Column::Text(v) => Column::Text(v[range].to_vec()),
            Column::Boolean(v) => Column::Boolean(v[range].to_vec()),
        }
    }

    fn take(&self, rows: &[usize]) -> Column {
        match self {
            Column::Number(v) => Column::Number(rows.iter().map(|&r| v[r]).collect()),
            Column::Text(v) => Column::Text(rows.iter().map(|&r| v[r].clone()).collect()),
            Column::Boolean(v) => Column::Boolean(rows.iter().map(|&r| v[r]).collect()),
        }
    }
}

impl From<Vec<f64>> for Column {
    fn from(v: Vec<f64>) -> Self {
        Column::Number(v)
    }
}

impl From<Vec<i64>> for Column {
    fn from(v: Vec<i64>) -> Self {
        Column::Number(v.into_iter().map(|n| n as f64).collect())
    }
}

impl From<Vec<i32>> for Column {
    fn from(v: Vec<i32>) -> Self {
        Column::Number(v.into_iter().map(f64::from).collect())
    }
}

impl From<Vec<&str>> for Column {
    fn from(v: Vec<&str>) -> Self {
        Column::Text(v.into_iter().map(|s| Some(s.to_string())).collect())
    }
}

impl From<Vec<String>> for Column {
    fn from(v: Vec<String>) -> Self {
        Column::Text(v.into_iter().map(Some).collect())
    }
}

impl From<Vec<Option<String>>> for Column {
    fn from(v: Vec<Option<String>>) -> Self {
        Column::Text(v)
    }
}

impl From<Vec<bool>> for Column {
    fn from(v: Vec<bool>) -> Self {
        Column::Boolean(v.into_iter().map(Some).collect())
    }
}

impl From<Vec<Option<bool>>> for Column {
    fn from(v: Vec<Option<bool>>) -> Self {
        Column::Boolean(v)
    }
}

// =============================================================================
// Table
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct Table {
    names: Vec<String>,
    columns: Vec<Column>,
    /// Column name -> position in `columns`
    index: FxHashMap<String, usize>,
    rows: usize,
}

impl Table {
    /// Empty table; the first column added fixes the row count.
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with `rows` rows and no columns yet.
    pub fn with_row_count(rows: usize) -> Self {
        Self { rows, ..Self::default() }
    }

    pub fn with_column(mut self, name: &str, column: impl Into<Column>) -> Result<Self, LmError> {
        self.push_column(name, column)?;
        Ok(self)
    }

    pub fn push_column(&mut self, name: &str, column: impl Into<Column>) -> Result<(), LmError> {
        let column = column.into();
        if self.index.contains_key(name) {
            return Err(LmError::DuplicateColumn(name.to_string()));
        }
        if self.columns.is_empty() && self.rows == 0 {
            self.rows = column.len();
        } else if column.len() != self.rows {
            return Err(LmError::ColumnLength {
                column: name.to_string(),
                expected: self.rows,
                found: column.len(),
            });
        }
        self.index.insert(name.to_string(), self.columns.len());
        self.names.push(name.to_string());
        self.columns.push(column);
        Ok(())
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(|s| s.as_str())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.column_index(name).map(|i| &self.columns[i])
    }

    /// Column by position, as returned by `column_index`.
    pub fn column_at(&self, index: usize) -> &Column {
        &self.columns[index]
    }

    /// Rows `range.start..range.end`, clamped to the table.
    pub fn slice(&self, range: Range<usize>) -> Table {
        let end = range.end.min(self.rows);
        let start = range.start.min(end);
        self.rebuild(end - start, |c| c.slice(start..end))
    }

    /// New table made of the given rows, in the given order.
    ///
    /// # Panics
    ///
    /// Panics if any row index is out of range.
    pub fn take(&self, rows: &[usize]) -> Table {
        self.rebuild(rows.len(), |c| c.take(rows))
    }

    fn rebuild(&self, rows: usize, f: impl Fn(&Column) -> Column) -> Table {
        Table {
            names: self.names.clone(),
            columns: self.columns.iter().map(f).collect(),
            index: self.index.clone(),
            rows,
        }
    }

    /// Load a table from CSV with a header row.
    ///
    /// Column types are inferred: a column whose non-empty cells all parse as
    /// numbers is numeric, one whose non-empty cells are all `True`/`False`
    /// (any case) is boolean, anything else is text. Empty cells are missing.
    pub fn from_csv<R: Read>(reader: R) -> Result<Table, LmError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| LmError::Csv(e.to_string()))?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let mut raw: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
        for record in reader.records() {
            let record = record.map_err(|e| LmError::Csv(e.to_string()))?;
            for (i, cells) in raw.iter_mut().enumerate() {
                cells.push(record.get(i).unwrap_or("").to_string());
            }
        }

        let mut table = Table::new();
        for (name, cells) in headers.iter().zip(raw) {
            table.push_column(name, infer_column(cells))?;
        }
        Ok(table)
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn infer_column(cells: Vec<String>) -> Column {
    let filled = || cells.iter().filter(|c| !c.is_empty());

    if filled().next().is_some() && filled().all(|c| c.parse::<f64>().is_ok()) {
        return Column::Number(
            cells.iter().map(|c| c.parse::<f64>().unwrap_or(f64::NAN)).collect(),
        );
    }
    if filled().next().is_some() && filled().all(|c| parse_bool(c).is_some()) {
        return Column::Boolean(cells.iter().map(|c| parse_bool(c)).collect());
    }
    Column::Text(
        cells
            .into_iter()
            .map(|c| if c.is_empty() { None } else { Some(c) })
            .collect(),
    )
}
