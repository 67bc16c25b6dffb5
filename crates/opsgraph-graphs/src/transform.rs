//! Rank-and-bucket transform and date ranking.
//!
//! Long-tail entities (channels, spend activities, acquisition sources) are
//! ranked by a summed metric over a recent window. Everything past the
//! cut-off is relabelled as one "others" entity before re-aggregation.

use crate::aggregate::aggregate;
use crate::table::{ColumnKind, Table, Value};
use chrono::Duration;
use indexmap::IndexMap;
use opsgraph_common::{OpsGraphError, Result};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Rows considered when ranking.
#[derive(Debug, Clone, PartialEq)]
pub enum Window {
    /// Every row.
    All,
    /// The last `count` periods of a numeric period column: `period > max - count`.
    LastPeriods {
        /// Period column, e.g. `weekid`.
        column: String,
        /// Number of periods kept.
        count: u32,
    },
    /// A trailing day range: `max - days <= date <= max`.
    TrailingDays {
        /// Date column, e.g. `day`.
        column: String,
        /// Width of the range in days.
        days: i64,
    },
}

impl Window {
    /// Last `count` periods of `column`.
    pub fn last_periods(column: &str, count: u32) -> Self {
        Self::LastPeriods {
            column: column.to_string(),
            count,
        }
    }

    /// Trailing `days` of `column`.
    pub fn trailing_days(column: &str, days: i64) -> Self {
        Self::TrailingDays {
            column: column.to_string(),
            days,
        }
    }
}

/// Which ranks collapse into the others bucket.
///
/// Each call site states its cut-off literally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankCutoff {
    /// `rank > n` is bucketed.
    Above(usize),
    /// `rank >= n` is bucketed.
    AtOrAbove(usize),
}

impl RankCutoff {
    /// Whether a 1-based rank is bucketed.
    pub const fn buckets(self, rank: usize) -> bool {
        match self {
            Self::Above(n) => rank > n,
            Self::AtOrAbove(n) => rank >= n,
        }
    }

    /// Number of entities kept.
    pub const fn retained(self) -> usize {
        match self {
            Self::Above(n) => n,
            Self::AtOrAbove(n) => n.saturating_sub(1),
        }
    }
}

/// One ranked entity.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedEntity {
    /// Group key as text.
    pub key: String,
    /// Metric summed over the window.
    pub total: f64,
    /// 1-based rank, descending by total, ties by first appearance.
    pub rank: usize,
}

/// Parameters of one rank-and-bucket call.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketRule {
    /// Column holding the entity key.
    pub group_key: String,
    /// Column ranked on.
    pub metric: String,
    /// Rows considered when ranking.
    pub window: Window,
    /// Ranks that collapse.
    pub cutoff: RankCutoff,
    /// Replacement key for collapsed entities.
    pub others_label: String,
    /// Output group-by columns.
    pub dims: Vec<String>,
    /// Output summed columns.
    pub metrics: Vec<String>,
}

impl BucketRule {
    /// Starts a rule ranking `group_key` by `metric`.
    pub fn new(group_key: &str, metric: &str) -> Self {
        Self {
            group_key: group_key.to_string(),
            metric: metric.to_string(),
            window: Window::All,
            cutoff: RankCutoff::Above(9),
            others_label: "others".to_string(),
            dims: vec![group_key.to_string()],
            metrics: vec![metric.to_string()],
        }
    }

    /// Sets the ranking window.
    #[must_use]
    pub fn window(mut self, window: Window) -> Self {
        self.window = window;
        self
    }

    /// Sets the cut-off.
    #[must_use]
    pub const fn cutoff(mut self, cutoff: RankCutoff) -> Self {
        self.cutoff = cutoff;
        self
    }

    /// Sets the others label.
    #[must_use]
    pub fn others_label(mut self, label: &str) -> Self {
        self.others_label = label.to_string();
        self
    }

    /// Sets the output dimensions.
    #[must_use]
    pub fn dims(mut self, dims: &[&str]) -> Self {
        self.dims = dims.iter().map(|d| (*d).to_string()).collect();
        self
    }

    /// Sets the summed metrics.
    #[must_use]
    pub fn metrics(mut self, metrics: &[&str]) -> Self {
        self.metrics = metrics.iter().map(|m| (*m).to_string()).collect();
        self
    }
}

/// Restricts a table to a window.
pub fn window_rows(table: &Table, window: &Window) -> Result<Table> {
    match window {
        Window::All => Ok(table.clone()),
        Window::LastPeriods { column, count } => {
            let Some(max) = table.max_number(column)? else {
                return Ok(table.filter(|_| false));
            };
            let floor = max - f64::from(*count);
            Ok(table.filter(|row| row.get(column).and_then(Value::as_f64).is_some_and(|p| p > floor)))
        }
        Window::TrailingDays { column, days } => {
            let Some(max) = table.max_date(column)? else {
                return Ok(table.filter(|_| false));
            };
            let start = max - Duration::days(*days);
            Ok(table.filter(|row| row.date(column).is_some_and(|d| d >= start && d <= max)))
        }
    }
}

/// Ranks entities by summed metric, descending, ties in first-seen order.
pub fn rank_groups(table: &Table, key: &str, metric: &str) -> Result<Vec<RankedEntity>> {
    table.schema().require(key)?;
    table.schema().require(metric)?;

    let mut totals: IndexMap<String, f64> = IndexMap::new();
    for row in table.rows() {
        *totals.entry(row.text(key)).or_insert(0.0) += row.num(metric);
    }

    let mut ranked: Vec<(String, f64)> = totals.into_iter().collect();
    // sort_by is stable, which gives the "first" tie-break
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    Ok(ranked
        .into_iter()
        .enumerate()
        .map(|(i, (key, total))| RankedEntity {
            key,
            total,
            rank: i + 1,
        })
        .collect())
}

/// Relabels entities past the cut-off (or unranked) with the others label.
///
/// Returns the full input with the group key rewritten as text.
pub fn relabel_long_tail(table: &Table, rule: &BucketRule) -> Result<Table> {
    let windowed = window_rows(table, &rule.window)?;
    let ranks: HashMap<String, usize> = rank_groups(&windowed, &rule.group_key, &rule.metric)?
        .into_iter()
        .map(|e| (e.key, e.rank))
        .collect();

    let relabelled = table.clone().derive(&rule.group_key, ColumnKind::Text, |row| {
        let key = row.text(&rule.group_key);
        match ranks.get(&key) {
            Some(&rank) if !rule.cutoff.buckets(rank) => Value::Text(key),
            _ => Value::Text(rule.others_label.clone()),
        }
    })?;

    debug!(
        sheet = table.name(),
        key = rule.group_key.as_str(),
        ranked = ranks.len(),
        kept = ranks.values().filter(|&&r| !rule.cutoff.buckets(r)).count(),
        "Bucketed long tail"
    );
    Ok(relabelled)
}

/// Ranks, relabels the long tail and re-aggregates every given row.
///
/// The window only selects which rows feed the ranking; callers that want
/// windowed output trim the input with [`window_rows`] first.
pub fn bucket(table: &Table, rule: &BucketRule) -> Result<Table> {
    if rule.dims.is_empty() {
        return Err(OpsGraphError::validation("bucket needs at least one output dimension"));
    }
    let relabelled = relabel_long_tail(table, rule)?;
    let dims: Vec<&str> = rule.dims.iter().map(String::as_str).collect();
    let metrics: Vec<&str> = rule.metrics.iter().map(String::as_str).collect();
    aggregate(&relabelled, &dims, &metrics)
}

/// Adds a dense descending rank of a date column: the latest date is 1.
#[allow(clippy::cast_precision_loss)]
pub fn dense_rank_dates(table: Table, date_column: &str, rank_column: &str) -> Result<Table> {
    table.schema().require(date_column)?;
    let distinct: BTreeSet<_> = table.rows().filter_map(|r| r.date(date_column)).collect();
    let ranks: HashMap<_, usize> = distinct
        .into_iter()
        .rev()
        .enumerate()
        .map(|(i, d)| (d, i + 1))
        .collect();

    table.derive(rank_column, ColumnKind::Number, |row| {
        row.date(date_column)
            .and_then(|d| ranks.get(&d))
            .map_or(Value::Null, |&r| Value::Number(r as f64))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn channels(codes: u32, weeks: u32) -> Table {
        let mut rows = Vec::new();
        for week in 1..=weeks {
            for code in 0..codes {
                rows.push(vec![
                    Value::Number(f64::from(week)),
                    Value::Text(format!("ch{code:02}")),
                    Value::Number(f64::from((codes - code) * 100)),
                    Value::Number(f64::from((codes - code) * 10)),
                ]);
            }
        }
        Table::build(
            "KPI_CHANNEL",
            &[
                ("weekid", ColumnKind::Number),
                ("affcode", ColumnKind::Text),
                ("wau", ColumnKind::Number),
                ("wnu", ColumnKind::Number),
            ],
            rows,
        )
    }

    fn channel_rule() -> BucketRule {
        BucketRule::new("affcode", "wau")
            .window(Window::last_periods("weekid", 6))
            .cutoff(RankCutoff::Above(9))
            .dims(&["weekid", "affcode"])
            .metrics(&["wau", "wnu"])
    }

    #[test]
    fn test_cutoff_boundaries() {
        assert!(!RankCutoff::Above(9).buckets(9));
        assert!(RankCutoff::Above(9).buckets(10));
        assert!(!RankCutoff::AtOrAbove(10).buckets(9));
        assert!(RankCutoff::AtOrAbove(10).buckets(10));
        assert_eq!(RankCutoff::AtOrAbove(9).retained(), 8);
        assert_eq!(RankCutoff::Above(9).retained(), 9);
    }

    #[test]
    fn test_window_last_periods() {
        let table = channels(2, 10);
        let windowed = window_rows(&table, &Window::last_periods("weekid", 6)).unwrap();
        let weeks = windowed.distinct("weekid").unwrap();
        assert_eq!(weeks.len(), 6);
        assert_eq!(weeks[0], Value::Number(5.0));
    }

    #[test]
    fn test_window_trailing_days() {
        let table = Table::build(
            "days",
            &[("day", ColumnKind::Number)],
            (0..100)
                .map(|i| {
                    let d = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(i);
                    vec![Value::Date(d)]
                })
                .collect(),
        );
        let windowed = window_rows(&table, &Window::trailing_days("day", 90)).unwrap();
        assert_eq!(windowed.len(), 91);
    }

    #[test]
    fn test_twenty_channels_keep_nine() {
        let table = channels(20, 8);
        let rule = channel_rule();
        let windowed = window_rows(&table, &rule.window).unwrap();
        let out = bucket(&windowed, &rule).unwrap();

        let codes: BTreeSet<String> = out.texts("affcode").unwrap().into_iter().collect();
        assert_eq!(codes.len(), 10);
        assert!(codes.contains("ch08"));
        assert!(!codes.contains("ch09"));
        assert!(codes.contains("others"));

        // ch09..ch19 carry wau (20 - code) * 100 per week
        let expected: f64 = (9..20u32).map(|c| f64::from((20 - c) * 100)).sum();
        let week_eight = out.filter(|r| r.num("weekid") == 8.0 && r.text("affcode") == "others");
        assert_eq!(week_eight.len(), 1);
        assert_eq!(week_eight.sum("wau").unwrap(), expected);
    }

    #[test]
    fn test_unranked_groups_go_to_others() {
        let mut table = channels(3, 8);
        let late = Table::build(
            "extra",
            &[
                ("weekid", ColumnKind::Number),
                ("affcode", ColumnKind::Text),
                ("wau", ColumnKind::Number),
                ("wnu", ColumnKind::Number),
            ],
            vec![vec![1.0.into(), "legacy".into(), 1e6.into(), 0.0.into()]],
        );
        let mut rows = table.raw_rows().to_vec();
        rows.extend(late.raw_rows().iter().cloned());
        table = Table::new("KPI_CHANNEL", table.schema().clone(), rows);

        let out = bucket(&table, &channel_rule()).unwrap();
        let codes: BTreeSet<String> = out.texts("affcode").unwrap().into_iter().collect();
        assert!(!codes.contains("legacy"));
        assert!(codes.contains("others"));
    }

    #[test]
    fn test_ties_break_by_first_seen() {
        let table = Table::build(
            "ties",
            &[("k", ColumnKind::Text), ("m", ColumnKind::Number)],
            vec![
                vec!["b".into(), 5.0.into()],
                vec!["a".into(), 5.0.into()],
                vec!["c".into(), 9.0.into()],
            ],
        );
        let ranked = rank_groups(&table, "k", "m").unwrap();
        let keys: Vec<_> = ranked.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["c", "b", "a"]);
        assert_eq!(ranked[2].rank, 3);
    }

    #[test]
    fn test_dense_rank_dates() {
        let d = |day: u32| Value::Number(f64::from(20_240_100 + day));
        let table = Table::build(
            "act",
            &[("day", ColumnKind::Number)],
            vec![vec![d(1)], vec![d(8)], vec![d(8)], vec![d(15)], vec![Value::Null]],
        );
        let ranked = dense_rank_dates(table, "day", "row_number").unwrap();
        assert_eq!(ranked.numbers("row_number").unwrap(), vec![3.0, 2.0, 2.0, 1.0, 0.0]);
    }

    proptest! {
        #[test]
        fn prop_bucket_conserves_total_and_keeps_top_k(
            values in prop::collection::vec(0u32..1_000, 1..40),
            cutoff in 1usize..12,
        ) {
            let rows: Vec<Vec<Value>> = values
                .iter()
                .enumerate()
                .map(|(i, v)| vec![Value::Text(format!("k{}", i % 15)), Value::Number(f64::from(*v))])
                .collect();
            let table = Table::build("p", &[("k", ColumnKind::Text), ("m", ColumnKind::Number)], rows);
            let rule = BucketRule::new("k", "m").cutoff(RankCutoff::Above(cutoff)).others_label("others");
            let out = bucket(&table, &rule).unwrap();

            let before = table.sum("m").unwrap();
            let after = out.sum("m").unwrap();
            prop_assert!((before - after).abs() < 1e-6);

            let groups = table.distinct("k").unwrap().len();
            let named = out.texts("k").unwrap().into_iter().filter(|k| k != "others").count();
            prop_assert_eq!(named, groups.min(cutoff));
        }
    }
}
