//! In-memory sheet tables with a typed schema descriptor.
//!
//! A [`Table`] is created per sheet load, transformed by value and dropped
//! once its charts are drawn. Cells are [`Value`]s; every column carries a
//! [`ColumnKind`] inferred at load time.

use chrono::NaiveDate;
use indexmap::IndexSet;
use opsgraph_common::{date_from_number, format_number, parse_report_date, OpsGraphError, Result};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A single cell.
#[derive(Debug, Clone)]
pub enum Value {
    /// Blank cell.
    Null,
    /// Numeric cell.
    Number(f64),
    /// Text cell.
    Text(String),
    /// Calendar date.
    Date(NaiveDate),
}

impl Value {
    /// Numeric view of the cell; text is parsed when it looks like a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Null | Self::Date(_) => None,
        }
    }

    /// Date view of the cell.
    ///
    /// Numbers are read as `YYYYMMDD` or spreadsheet serials, text as
    /// `YYYYMMDD` or ISO dates.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(d) => Some(*d),
            Self::Number(n) => date_from_number(*n),
            Self::Text(s) => parse_report_date(s),
            Self::Null => None,
        }
    }

    /// Whether the cell is blank.
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    const fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Number(_) => 1,
            Self::Date(_) => 2,
            Self::Text(_) => 3,
        }
    }
}

fn normalized(n: f64) -> f64 {
    if n == 0.0 {
        0.0
    } else {
        n
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => normalized(*a).total_cmp(&normalized(*b)),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Date(a), Self::Date(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Self::Null => {}
            Self::Number(n) => normalized(*n).to_bits().hash(state),
            Self::Text(s) => s.hash(state),
            Self::Date(d) => d.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Number(n) => f.write_str(&format_number(*n)),
            Self::Text(s) => f.write_str(s),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

/// Inferred column kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Every non-blank cell is numeric.
    Number,
    /// Free text or mixed content.
    Text,
    /// Calendar dates.
    Date,
}

/// Column descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Header text.
    pub name: String,
    /// Inferred kind.
    pub kind: ColumnKind,
}

impl Column {
    /// Creates a column descriptor.
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Ordered column descriptors answering column-presence queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    /// Creates a schema from ordered columns.
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    /// Columns in sheet order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the schema has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Whether a column with this name exists.
    pub fn has(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    /// Whether every named column exists.
    pub fn has_all(&self, names: &[&str]) -> bool {
        names.iter().all(|n| self.has(n))
    }

    /// Position of a column.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Position of a column, or a schema error naming it.
    pub fn require(&self, name: &str) -> Result<usize> {
        self.index_of(name)
            .ok_or_else(|| OpsGraphError::missing_column(name))
    }

    /// Kind of a column.
    pub fn kind_of(&self, name: &str) -> Option<ColumnKind> {
        self.index_of(name).map(|i| self.columns[i].kind)
    }

    /// Column names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

/// Borrowed view of one row.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    schema: &'a Schema,
    values: &'a [Value],
}

impl<'a> Row<'a> {
    /// Cell by column name.
    pub fn get(&self, name: &str) -> Option<&'a Value> {
        self.schema.index_of(name).and_then(|i| self.values.get(i))
    }

    /// Numeric cell; blanks, text and absent columns read as 0.
    pub fn num(&self, name: &str) -> f64 {
        self.get(name).and_then(Value::as_f64).unwrap_or(0.0)
    }

    /// Cell rendered as text; absent columns read as empty.
    pub fn text(&self, name: &str) -> String {
        self.get(name).map(ToString::to_string).unwrap_or_default()
    }

    /// Date cell.
    pub fn date(&self, name: &str) -> Option<NaiveDate> {
        self.get(name).and_then(Value::as_date)
    }

    /// All cells in column order.
    pub const fn values(&self) -> &'a [Value] {
        self.values
    }
}

/// A named, schema-carrying table.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    schema: Schema,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Creates a table; rows are padded or truncated to the schema width.
    pub fn new(name: impl Into<String>, schema: Schema, mut rows: Vec<Vec<Value>>) -> Self {
        let width = schema.len();
        for row in &mut rows {
            row.resize(width, Value::Null);
        }
        Self {
            name: name.into(),
            schema,
            rows,
        }
    }

    /// Creates a table from `(name, kind)` pairs.
    pub fn build(name: &str, columns: &[(&str, ColumnKind)], rows: Vec<Vec<Value>>) -> Self {
        let schema = Schema::new(columns.iter().map(|(n, k)| Column::new(*n, *k)).collect());
        Self::new(name, schema, rows)
    }

    /// Sheet (or derived table) name used in diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Schema descriptor.
    pub const fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Shorthand for `schema().has(name)`.
    pub fn has(&self, name: &str) -> bool {
        self.schema.has(name)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row views in order.
    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(|values| Row {
            schema: &self.schema,
            values,
        })
    }

    /// Row view by position.
    pub fn row(&self, index: usize) -> Option<Row<'_>> {
        self.rows.get(index).map(|values| Row {
            schema: &self.schema,
            values,
        })
    }

    /// Raw cell storage.
    pub fn raw_rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// All cells of a column.
    pub fn column(&self, name: &str) -> Result<Vec<&Value>> {
        let idx = self.schema.require(name)?;
        Ok(self.rows.iter().map(|r| &r[idx]).collect())
    }

    /// A column as numbers, blanks and text reading as 0.
    pub fn numbers(&self, name: &str) -> Result<Vec<f64>> {
        let idx = self.schema.require(name)?;
        Ok(self
            .rows
            .iter()
            .map(|r| r[idx].as_f64().unwrap_or(0.0))
            .collect())
    }

    /// A column rendered as text.
    pub fn texts(&self, name: &str) -> Result<Vec<String>> {
        let idx = self.schema.require(name)?;
        Ok(self.rows.iter().map(|r| r[idx].to_string()).collect())
    }

    /// Sum of a numeric column.
    pub fn sum(&self, name: &str) -> Result<f64> {
        Ok(self.numbers(name)?.iter().sum())
    }

    /// Largest number in a column, if any cell is numeric.
    pub fn max_number(&self, name: &str) -> Result<Option<f64>> {
        let idx = self.schema.require(name)?;
        Ok(self
            .rows
            .iter()
            .filter_map(|r| r[idx].as_f64())
            .reduce(f64::max))
    }

    /// Latest date in a column, if any cell is a date.
    pub fn max_date(&self, name: &str) -> Result<Option<NaiveDate>> {
        let idx = self.schema.require(name)?;
        Ok(self.rows.iter().filter_map(|r| r[idx].as_date()).max())
    }

    /// Distinct values in first-seen order.
    pub fn distinct(&self, name: &str) -> Result<Vec<Value>> {
        let idx = self.schema.require(name)?;
        let seen: IndexSet<&Value> = self.rows.iter().map(|r| &r[idx]).collect();
        Ok(seen.into_iter().cloned().collect())
    }

    /// Rows satisfying the predicate.
    pub fn filter<F>(&self, mut predicate: F) -> Self
    where
        F: FnMut(&Row<'_>) -> bool,
    {
        let rows = self
            .rows
            .iter()
            .filter(|values| {
                predicate(&Row {
                    schema: &self.schema,
                    values,
                })
            })
            .cloned()
            .collect();
        Self {
            name: self.name.clone(),
            schema: self.schema.clone(),
            rows,
        }
    }

    /// Stable sort by one column.
    pub fn sorted_by(&self, name: &str, ascending: bool) -> Result<Self> {
        let idx = self.schema.require(name)?;
        let mut rows = self.rows.clone();
        rows.sort_by(|a, b| {
            let ord = a[idx].cmp(&b[idx]);
            if ascending {
                ord
            } else {
                ord.reverse()
            }
        });
        Ok(Self {
            name: self.name.clone(),
            schema: self.schema.clone(),
            rows,
        })
    }

    /// First `n` rows.
    #[must_use]
    pub fn head(&self, n: usize) -> Self {
        Self {
            name: self.name.clone(),
            schema: self.schema.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// Last `n` rows.
    #[must_use]
    pub fn tail(&self, n: usize) -> Self {
        let skip = self.rows.len().saturating_sub(n);
        Self {
            name: self.name.clone(),
            schema: self.schema.clone(),
            rows: self.rows[skip..].to_vec(),
        }
    }

    /// Replaces a column, or appends it when absent.
    pub fn with_column(mut self, name: &str, kind: ColumnKind, values: Vec<Value>) -> Result<Self> {
        if values.len() != self.rows.len() {
            return Err(OpsGraphError::schema(format!(
                "column '{name}' has {} values for {} rows",
                values.len(),
                self.rows.len()
            )));
        }
        match self.schema.index_of(name) {
            Some(idx) => {
                self.schema.columns[idx].kind = kind;
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                self.schema.columns.push(Column::new(name, kind));
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(self)
    }

    /// Computes a column from each row.
    pub fn derive<F>(self, name: &str, kind: ColumnKind, f: F) -> Result<Self>
    where
        F: Fn(&Row<'_>) -> Value,
    {
        let values = self.rows().map(|row| f(&row)).collect();
        self.with_column(name, kind, values)
    }

    /// Keeps only the named columns, in the given order.
    pub fn select(&self, names: &[&str]) -> Result<Self> {
        let indices = names
            .iter()
            .map(|n| self.schema.require(n))
            .collect::<Result<Vec<_>>>()?;
        let schema = Schema::new(indices.iter().map(|&i| self.schema.columns[i].clone()).collect());
        let rows = self
            .rows
            .iter()
            .map(|r| indices.iter().map(|&i| r[i].clone()).collect())
            .collect();
        Ok(Self {
            name: self.name.clone(),
            schema,
            rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::build(
            "sample",
            &[("day", ColumnKind::Number), ("code", ColumnKind::Text), ("wau", ColumnKind::Number)],
            vec![
                vec![20_240_102.0.into(), "b".into(), 5.0.into()],
                vec![20_240_101.0.into(), "a".into(), 7.0.into()],
                vec![20_240_103.0.into(), "b".into(), Value::Null],
            ],
        )
    }

    #[test]
    fn test_schema_queries() {
        let table = sample();
        assert!(table.schema().has("wau"));
        assert!(!table.schema().has("backdiamond"));
        assert!(table.schema().has_all(&["day", "code"]));
        assert_eq!(table.schema().index_of("code"), Some(1));
        let err = table.schema().require("backdiamond").unwrap_err();
        assert!(err.is_schema_gap());
    }

    #[test]
    fn test_numbers_treat_blanks_as_zero() {
        assert_eq!(sample().numbers("wau").unwrap(), vec![5.0, 7.0, 0.0]);
        assert_eq!(sample().sum("wau").unwrap(), 12.0);
    }

    #[test]
    fn test_row_accessors() {
        let table = sample();
        let row = table.row(1).unwrap();
        assert_eq!(row.text("code"), "a");
        assert_eq!(row.num("wau"), 7.0);
        assert_eq!(row.num("missing"), 0.0);
        assert_eq!(row.date("day"), NaiveDate::from_ymd_opt(2024, 1, 1));
    }

    #[test]
    fn test_distinct_keeps_first_seen_order() {
        let codes = sample().distinct("code").unwrap();
        assert_eq!(codes, vec![Value::from("b"), Value::from("a")]);
    }

    #[test]
    fn test_sort_head_tail() {
        let sorted = sample().sorted_by("day", true).unwrap();
        assert_eq!(sorted.texts("code").unwrap(), vec!["a", "b", "b"]);
        assert_eq!(sorted.head(1).len(), 1);
        assert_eq!(sorted.tail(2).texts("code").unwrap(), vec!["b", "b"]);
        assert_eq!(sorted.tail(10).len(), 3);
    }

    #[test]
    fn test_with_column_replaces_and_appends() {
        let table = sample()
            .with_column("wau", ColumnKind::Number, vec![1.0.into(), 2.0.into(), 3.0.into()])
            .unwrap()
            .derive("double", ColumnKind::Number, |r| Value::Number(r.num("wau") * 2.0))
            .unwrap();
        assert_eq!(table.numbers("double").unwrap(), vec![2.0, 4.0, 6.0]);
        assert_eq!(table.schema().len(), 4);
        assert!(sample()
            .with_column("x", ColumnKind::Number, vec![1.0.into()])
            .is_err());
    }

    #[test]
    fn test_value_ordering_and_equality() {
        assert_eq!(Value::Number(-0.0), Value::Number(0.0));
        assert!(Value::Null < Value::Number(-1e9));
        assert!(Value::Number(2.0) < Value::Number(10.0));
        assert_eq!(Value::Number(202_401.0).to_string(), "202401");
        assert_eq!(Value::Text("7".into()).as_f64(), Some(7.0));
    }

    #[test]
    fn test_select() {
        let table = sample().select(&["wau", "day"]).unwrap();
        assert_eq!(table.schema().names().collect::<Vec<_>>(), vec!["wau", "day"]);
        assert!(sample().select(&["nope"]).is_err());
    }
}
