//! Cohort aggregation, ratio derivation and pivoting.

use crate::table::{Column, ColumnKind, Schema, Table, Value};
use opsgraph_common::{safe_ratio, Result};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Derived ratio column names shared by the report sections.
pub mod ratios {
    /// Paying users over active users.
    pub const PAY_RATE: &str = "payrate";
    /// Sales over active users.
    pub const ARPU: &str = "arpu";
    /// Sales over paying users.
    pub const ARPPU: &str = "arppu";
    /// Participants over active users.
    pub const PARTICIPATION: &str = "pr";
    /// Total diamonds over participants.
    pub const AVG_DIAMOND: &str = "avgdiamond";
}

/// Groups by `dims` (sorted by key) and sums each present metric.
///
/// Metric columns the table lacks are skipped; a missing dimension is an
/// error.
pub fn aggregate(table: &Table, dims: &[&str], metrics: &[&str]) -> Result<Table> {
    let dim_idx = dims
        .iter()
        .map(|d| table.schema().require(d))
        .collect::<Result<Vec<_>>>()?;

    let present: Vec<&str> = metrics
        .iter()
        .copied()
        .filter(|m| {
            let has = table.has(m);
            if !has {
                debug!(sheet = table.name(), metric = *m, "Skipping absent metric");
            }
            has
        })
        .collect();
    let metric_idx: Vec<usize> = present
        .iter()
        .filter_map(|m| table.schema().index_of(m))
        .collect();

    let mut groups: BTreeMap<Vec<Value>, Vec<f64>> = BTreeMap::new();
    for row in table.raw_rows() {
        let key: Vec<Value> = dim_idx.iter().map(|&i| row[i].clone()).collect();
        let sums = groups.entry(key).or_insert_with(|| vec![0.0; metric_idx.len()]);
        for (sum, &i) in sums.iter_mut().zip(&metric_idx) {
            *sum += row[i].as_f64().unwrap_or(0.0);
        }
    }

    let mut columns: Vec<Column> = dim_idx
        .iter()
        .map(|&i| table.schema().columns()[i].clone())
        .collect();
    columns.extend(present.iter().map(|m| Column::new(*m, ColumnKind::Number)));

    let rows = groups
        .into_iter()
        .map(|(mut key, sums)| {
            key.extend(sums.into_iter().map(Value::Number));
            key
        })
        .collect();

    Ok(Table::new(table.name(), Schema::new(columns), rows))
}

/// Adds `name = numerator / denominator` when both columns exist.
///
/// A zero denominator yields 0 for that row; a denominator summing to zero
/// yields 0 everywhere.
pub fn derive_ratio(table: Table, name: &str, numerator: &str, denominator: &str) -> Result<Table> {
    if !table.schema().has_all(&[numerator, denominator]) {
        debug!(sheet = table.name(), ratio = name, "Ratio inputs absent, not derived");
        return Ok(table);
    }
    let all_zero = table.sum(denominator)? == 0.0;
    table.derive(name, ColumnKind::Number, |row| {
        if all_zero {
            Value::Number(0.0)
        } else {
            Value::Number(safe_ratio(row.num(numerator), row.num(denominator)))
        }
    })
}

/// Sets `name` to the sum of whichever `parts` exist.
///
/// Leaves the table untouched when none of them exist.
pub fn sum_columns(table: Table, name: &str, parts: &[&str]) -> Result<Table> {
    let present: Vec<&str> = parts.iter().copied().filter(|p| table.has(p)).collect();
    if present.is_empty() {
        return Ok(table);
    }
    table.derive(name, ColumnKind::Number, |row| {
        Value::Number(present.iter().map(|p| row.num(p)).sum())
    })
}

/// Subtracts `subtrahend` from `target` in place when `subtrahend` exists.
pub fn subtract_if_present(table: Table, target: &str, subtrahend: &str) -> Result<Table> {
    if !table.has(subtrahend) {
        debug!(sheet = table.name(), column = subtrahend, "Column absent, no subtraction");
        return Ok(table);
    }
    table.schema().require(target)?;
    table.derive(target, ColumnKind::Number, |row| {
        Value::Number(row.num(target) - row.num(subtrahend))
    })
}

/// Order of pivot categories.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryOrder {
    /// Sorted by value.
    #[default]
    Natural,
    /// Numeric descending, e.g. newest registration cohort first.
    NumericDescending,
    /// The given labels first, in order; anything else after, sorted.
    Canonical(Vec<String>),
}

/// A dense `index × category` matrix of summed values.
#[derive(Debug, Clone, PartialEq)]
pub struct Pivot {
    /// Sorted index values (x axis).
    pub index: Vec<Value>,
    /// Category labels in display order.
    pub categories: Vec<String>,
    /// `cells[i][c]` for index `i` and category `c`; missing pairs are 0.
    pub cells: Vec<Vec<f64>>,
}

impl Pivot {
    /// Values of one category along the index.
    pub fn column(&self, category: &str) -> Option<Vec<f64>> {
        let c = self.categories.iter().position(|k| k == category)?;
        Some(self.cells.iter().map(|row| row[c]).collect())
    }

    /// Per-index totals across categories.
    pub fn row_totals(&self) -> Vec<f64> {
        self.cells.iter().map(|row| row.iter().sum()).collect()
    }

    /// Index labels read from another column of the source table.
    ///
    /// Used when the index sorts correctly (week id) but is shown as
    /// something else (`MM-DD`). Index values without a row keep their own text.
    pub fn index_labels_from(&self, table: &Table, index: &str, label: &str) -> Vec<String> {
        self.index
            .iter()
            .map(|value| {
                table
                    .rows()
                    .find(|row| row.get(index) == Some(value))
                    .map_or_else(|| value.to_string(), |row| row.text(label))
            })
            .collect()
    }

    /// Category series in display order.
    pub fn series(&self) -> Vec<(String, Vec<f64>)> {
        self.categories
            .iter()
            .enumerate()
            .map(|(c, name)| (name.clone(), self.cells.iter().map(|row| row[c]).collect()))
            .collect()
    }
}

/// Pivots `value` into an `index × category` matrix, summing duplicates.
pub fn pivot(
    table: &Table,
    index: &str,
    category: &str,
    value: &str,
    order: &CategoryOrder,
) -> Result<Pivot> {
    table.schema().require(index)?;
    table.schema().require(category)?;
    table.schema().require(value)?;

    let mut sums: BTreeMap<(Value, String), f64> = BTreeMap::new();
    let mut index_values = BTreeSet::new();
    let mut category_values = BTreeSet::new();
    for row in table.rows() {
        let Some(idx) = row.get(index).cloned() else {
            continue;
        };
        let cat = row.text(category);
        index_values.insert(idx.clone());
        category_values.insert(cat.clone());
        *sums.entry((idx, cat)).or_insert(0.0) += row.num(value);
    }

    let categories = order_categories(category_values.into_iter().collect(), order);
    let index: Vec<Value> = index_values.into_iter().collect();
    let cells = index
        .iter()
        .map(|i| {
            categories
                .iter()
                .map(|c| sums.get(&(i.clone(), c.clone())).copied().unwrap_or(0.0))
                .collect()
        })
        .collect();

    Ok(Pivot {
        index,
        categories,
        cells,
    })
}

fn order_categories(mut found: Vec<String>, order: &CategoryOrder) -> Vec<String> {
    match order {
        CategoryOrder::Natural => found,
        CategoryOrder::NumericDescending => {
            found.sort_by(|a, b| {
                let (x, y) = (a.trim().parse::<f64>().ok(), b.trim().parse::<f64>().ok());
                match (x, y) {
                    (Some(x), Some(y)) => y.total_cmp(&x),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => a.cmp(b),
                }
            });
            found
        }
        CategoryOrder::Canonical(canonical) => {
            let mut ordered: Vec<String> = canonical
                .iter()
                .filter(|c| found.contains(c))
                .cloned()
                .collect();
            ordered.extend(found.into_iter().filter(|f| !canonical.contains(f)));
            ordered
        }
    }
}
