//! Cleaners applied between raw cells and typed tables.

use crate::table::{Column, ColumnKind, Row, Schema, Table, Value};
use opsgraph_common::{format_number, Result, NULL_SENTINEL};
use tracing::debug;

/// Whether a cell holds the warehouse null token.
pub fn is_null_token(value: &Value) -> bool {
    matches!(value, Value::Text(s) if s.trim() == NULL_SENTINEL)
}

/// Replaces every null token with numeric 0 and returns how many were replaced.
///
/// Running it twice changes nothing the second time.
pub fn substitute_nulls(rows: &mut [Vec<Value>]) -> usize {
    let mut replaced = 0;
    for cell in rows.iter_mut().flatten() {
        if is_null_token(cell) {
            *cell = Value::Number(0.0);
            replaced += 1;
        }
    }
    replaced
}

/// Infers the kind of a column from its non-blank cells.
pub fn infer_kind<'a, I>(values: I) -> ColumnKind
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut numbers = 0usize;
    let mut dates = 0usize;
    let mut other = 0usize;
    for value in values {
        match value {
            Value::Null => {}
            Value::Number(_) => numbers += 1,
            Value::Date(_) => dates += 1,
            Value::Text(_) => other += 1,
        }
    }
    match (numbers, dates, other) {
        (n, 0, 0) if n > 0 => ColumnKind::Number,
        (0, d, 0) if d > 0 => ColumnKind::Date,
        _ => ColumnKind::Text,
    }
}

/// Coerces a cell to the column kind.
///
/// Text columns render numbers the way the sheet prints them, so mixed
/// columns such as payment-tier indices compare as text.
pub fn coerce(value: Value, kind: ColumnKind) -> Value {
    match (kind, value) {
        (ColumnKind::Text, Value::Number(n)) => Value::Text(format_number(n)),
        (ColumnKind::Text, Value::Date(d)) => Value::Text(d.format("%Y-%m-%d").to_string()),
        (_, value) => value,
    }
}

/// Null substitution followed by kind inference and coercion.
pub fn clean_rows(sheet: &str, headers: Vec<String>, mut rows: Vec<Vec<Value>>) -> Table {
    let replaced = substitute_nulls(&mut rows);
    let width = headers.len();
    for row in &mut rows {
        row.resize(width, Value::Null);
    }

    let columns: Vec<Column> = headers
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let kind = infer_kind(rows.iter().map(|r| &r[i]));
            Column::new(name, kind)
        })
        .collect();

    let rows = rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .zip(&columns)
                .map(|(value, column)| coerce(value, column.kind))
                .collect()
        })
        .collect();

    debug!(sheet, replaced, "Substituted null tokens");
    Table::new(sheet, Schema::new(columns), rows)
}

/// Converts a column to dates; cells that do not parse become blank.
pub fn parse_dates(table: Table, source: &str, target: &str) -> Result<Table> {
    table.schema().require(source)?;
    table.derive(target, ColumnKind::Date, |row: &Row<'_>| {
        row.date(source).map_or(Value::Null, Value::Date)
    })
}

/// Drops rows whose text in `column` equals `label`.
pub fn exclude_label(table: &Table, column: &str, label: &str) -> Result<Table> {
    table.schema().require(column)?;
    let kept = table.filter(|row| row.text(column).trim() != label);
    debug!(
        sheet = table.name(),
        dropped = table.len() - kept.len(),
        label,
        "Excluded rows"
    );
    Ok(kept)
}
