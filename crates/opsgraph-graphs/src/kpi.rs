//! KPI section: weekly and daily KPIs, acquisition channels and
//! registration cohorts.

use crate::aggregate::{aggregate, derive_ratio, pivot, ratios, CategoryOrder, Pivot};
use crate::figure::{ChartPanel, Figure, Marker, Panel, Series, ValueFormat};
use crate::manager::{ReportContext, SectionOutcome};
use crate::table::Table;
use crate::traits::ReportSection;
use crate::transform::{bucket, window_rows, BucketRule, RankCutoff, Window};
use crate::utils::{inches, short_date_label};
use opsgraph_common::{OpsGraphError, Result, SectionId};

/// Weekly KPI sheet.
pub const WEEKLY_SHEET: &str = "KPI_WKLY";
/// Daily KPI sheet.
pub const DAILY_SHEET: &str = "KPI_DAILY";
/// Weekly users per acquisition channel.
pub const CHANNEL_SHEET: &str = "KPI_CHANNEL";
/// Weekly users per registration month.
pub const USER_SHEET: &str = "KPI_USER";

const WEEKLY_ROWS: usize = 15;
const DAILY_ROWS: usize = 31;
const CHANNEL_WEEKS: u32 = 6;
const USER_WEEKS: u32 = 15;
const WAU_COLOR: usize = 2;

/// Weekly and daily KPI charts.
pub struct KpiSection;

impl ReportSection for KpiSection {
    fn id(&self) -> SectionId {
        SectionId::Kpi
    }

    fn description(&self) -> &'static str {
        "active users, revenue, channels and registration cohorts"
    }

    fn generate(&self, ctx: &ReportContext<'_>, outcome: &mut SectionOutcome) -> Result<()> {
        if let Some(weekly) = ctx.load(WEEKLY_SHEET, None, outcome) {
            ctx.emit(outcome, "kpi_weekly_overview.jpg", || weekly_overview(&weekly));
        }
        if let Some(daily) = ctx.load(DAILY_SHEET, None, outcome) {
            ctx.emit(outcome, "kpi_daily_dau_revenue.jpg", || daily_overview(&daily));
            ctx.emit(outcome, "kpi_daily_arpu_pr.jpg", || daily_ratios(&daily));
        }
        if let Some(channels) = ctx.load(CHANNEL_SHEET, None, outcome) {
            ctx.emit(outcome, "kpi_channel_source.jpg", || channel_sources(&channels));
        }
        if let Some(users) = ctx.load(USER_SHEET, None, outcome) {
            ctx.emit(outcome, "kpi_user_cohort.jpg", || registration_cohorts(&users));
        }
        Ok(())
    }
}

fn revenue_in_ten_thousands(sales: &[f64]) -> Vec<f64> {
    sales.iter().map(|s| (s / 10_000.0).floor()).collect()
}

fn date_labels(table: &Table, column: &str) -> Result<Vec<String>> {
    Ok(table.column(column)?.into_iter().map(short_date_label).collect())
}

/// Active users panel (old + new stacked, total line) and revenue panel.
fn users_and_revenue(
    labels: Vec<String>,
    old: Vec<f64>,
    new: Vec<f64>,
    active: Vec<f64>,
    sales: &[f64],
    names: [&str; 3],
    revenue_desc: &str,
) -> Vec<Panel> {
    let users = ChartPanel::new(labels.clone())
        .y_desc(names[2])
        .bar(Series::new(names[0], old))
        .bar(Series::new(names[1], new))
        .line(Series::new(names[2], active).color(WAU_COLOR).marker(Marker::Circle))
        .value_labels(ValueFormat::Plain)
        .legend(true);
    let revenue = ChartPanel::new(labels)
        .y_desc(revenue_desc)
        .line(Series::new("Revenue", revenue_in_ten_thousands(sales)).color(0).marker(Marker::Circle))
        .value_labels(ValueFormat::TenThousands);
    vec![users.into(), revenue.into()]
}

/// `kpi_weekly_overview.jpg`
pub fn weekly_overview(table: &Table) -> Result<Figure> {
    let weeks = table.sorted_by("weekid", true)?.head(WEEKLY_ROWS);
    let panels = users_and_revenue(
        weeks.texts("md")?,
        weeks.numbers("wou")?,
        weeks.numbers("wnu")?,
        weeks.numbers("wau")?,
        &weeks.numbers("sales")?,
        ["WOU", "WNU", "WAU"],
        "Weekly Revenue (10k units)",
    );
    Ok(Figure::stacked("Weekly KPI Summary", panels).size(1400, 1000))
}

/// `kpi_daily_dau_revenue.jpg`
pub fn daily_overview(table: &Table) -> Result<Figure> {
    let days = table.sorted_by("day", true)?.head(DAILY_ROWS);
    let panels = users_and_revenue(
        date_labels(&days, "day")?,
        days.numbers("dou")?,
        days.numbers("dnu")?,
        days.numbers("dau")?,
        &days.numbers("sales")?,
        ["DOU", "DNU", "DAU"],
        "Daily Revenue (10k units)",
    );
    Ok(Figure::stacked("Daily KPI Summary", panels).size(1400, 1000))
}

/// `kpi_daily_arpu_pr.jpg`
///
/// Ratios missing from the sheet are derived from sales, DAU and paying
/// users when those exist; panels whose ratio cannot be had are omitted.
pub fn daily_ratios(table: &Table) -> Result<Figure> {
    let mut days = table.sorted_by("day", true)?.head(DAILY_ROWS);
    for (name, numerator, denominator) in [
        (ratios::ARPU, "sales", "dau"),
        (ratios::ARPPU, "sales", "pu"),
        (ratios::PAY_RATE, "pu", "dau"),
    ] {
        if !days.has(name) {
            days = derive_ratio(days, name, numerator, denominator)?;
        }
    }

    let labels = date_labels(&days, "day")?;
    let mut panels = Vec::new();
    for (i, (column, title, format)) in [
        (ratios::ARPU, "ARPU", ValueFormat::Decimals(1)),
        (ratios::ARPPU, "ARPPU", ValueFormat::Decimals(1)),
        (ratios::PAY_RATE, "Pay Rate", ValueFormat::Decimals(3)),
    ]
    .into_iter()
    .enumerate()
    {
        if !days.has(column) {
            continue;
        }
        panels.push(
            ChartPanel::new(labels.clone())
                .title(title)
                .y_desc(title)
                .line(Series::new(title, days.numbers(column)?).color(i).marker(Marker::Circle))
                .value_labels(format)
                .into(),
        );
    }
    if panels.is_empty() {
        return Err(OpsGraphError::schema("no ARPU, ARPPU or pay rate inputs"));
    }
    Ok(Figure::stacked("Daily ARPU, ARPPU & Pay Rate", panels).size(1400, 1200))
}

fn stacked_panel(title: &str, y_desc: &str, pivot: &Pivot, labels: Vec<String>, legend: bool) -> ChartPanel {
    ChartPanel::new(labels)
        .title(title)
        .y_desc(y_desc)
        .bars_from(pivot.series())
        .legend(legend)
}

/// `kpi_channel_source.jpg`: the nine largest channels of the last six
/// weeks by WAU, the rest as `others`.
pub fn channel_sources(table: &Table) -> Result<Figure> {
    let recent = window_rows(table, &Window::last_periods("weekid", CHANNEL_WEEKS))?;
    let rule = BucketRule::new("affcode", "wau")
        .cutoff(RankCutoff::Above(9))
        .dims(&["weekid", "md", "affcode"])
        .metrics(&["wau", "wnu"]);
    let bucketed = bucket(&recent, &rule)?;

    let wau = pivot(&bucketed, "weekid", "affcode", "wau", &CategoryOrder::Natural)?;
    let wnu = pivot(&bucketed, "weekid", "affcode", "wnu", &CategoryOrder::Natural)?;
    let labels = wau.index_labels_from(&bucketed, "weekid", "md");

    Ok(Figure::grid(
        "Weekly User Acquisition by Source",
        1,
        2,
        vec![
            stacked_panel("WAU by Source", "WAU", &wau, labels.clone(), true).into(),
            stacked_panel("WNU by Source", "WNU", &wnu, labels, false).into(),
        ],
    )
    .size(1600, 700))
}

/// `kpi_user_cohort.jpg`: WAU and sales of the last 15 weeks by
/// registration month, newest cohort first.
pub fn registration_cohorts(table: &Table) -> Result<Figure> {
    let recent = window_rows(table, &Window::last_periods("weekid", USER_WEEKS))?;
    let grouped = aggregate(&recent, &["weekid", "md", "regmonth2"], &["wau", "wsales"])?;

    let order = CategoryOrder::NumericDescending;
    let wau = pivot(&grouped, "weekid", "regmonth2", "wau", &order)?;
    let sales = pivot(&grouped, "weekid", "regmonth2", "wsales", &order)?;
    let labels = wau.index_labels_from(&grouped, "weekid", "md");

    let (width, height) = inches(14, 10);
    Ok(Figure::stacked(
        "User KPIs by Registration Cohort",
        vec![
            stacked_panel("WAU by Registration Cohort", "WAU", &wau, labels.clone(), true).into(),
            stacked_panel("Weekly Sales by Registration Cohort", "Sales", &sales, labels, false).into(),
        ],
    )
    .size(width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{ColumnKind, Value};

    fn weekly(weeks: u32) -> Table {
        let rows = (1..=weeks)
            .map(|w| {
                let w = f64::from(w);
                vec![
                    Value::Number(w),
                    Value::Text(format!("01-{w:02}")),
                    Value::Number(100.0 + w),
                    Value::Number(10.0),
                    Value::Number(90.0 + w),
                    Value::Number(1_234_567.0),
                ]
            })
            .collect();
        Table::build(
            WEEKLY_SHEET,
            &[
                ("weekid", ColumnKind::Number),
                ("md", ColumnKind::Text),
                ("wau", ColumnKind::Number),
                ("wnu", ColumnKind::Number),
                ("wou", ColumnKind::Number),
                ("sales", ColumnKind::Number),
            ],
            rows,
        )
    }

    fn chart(panel: &Panel) -> &ChartPanel {
        match panel {
            Panel::Chart(c) => c,
            other => panic!("expected chart, got {other:?}"),
        }
    }

    #[test]
    fn test_weekly_overview_takes_first_fifteen_weeks() {
        let fig = weekly_overview(&weekly(20)).unwrap();
        let users = chart(&fig.panels[0]);
        assert_eq!(users.x_labels.len(), 15);
        assert_eq!(users.bars.len(), 2);
        assert_eq!(users.bars[0].label, "WOU");
        assert_eq!(users.lines[0].values[0], 101.0);
        let revenue = chart(&fig.panels[1]);
        assert_eq!(revenue.lines[0].values[0], 123.0);
        assert!(fig.validate().is_ok());
    }

    #[test]
    fn test_weekly_overview_missing_column_is_schema_gap() {
        let table = weekly(3).select(&["weekid", "md", "wau"]).unwrap();
        assert!(weekly_overview(&table).unwrap_err().is_schema_gap());
    }

    #[test]
    fn test_daily_ratios_derived_when_absent() {
        let table = Table::build(
            DAILY_SHEET,
            &[
                ("day", ColumnKind::Number),
                ("dau", ColumnKind::Number),
                ("sales", ColumnKind::Number),
                ("pu", ColumnKind::Number),
            ],
            vec![
                vec![20_240_102.0.into(), 100.0.into(), 500.0.into(), 0.0.into()],
                vec![20_240_101.0.into(), 50.0.into(), 100.0.into(), 5.0.into()],
            ],
        );
        let fig = daily_ratios(&table).unwrap();
        assert_eq!(fig.panels.len(), 3);
        let arpu = chart(&fig.panels[0]);
        assert_eq!(arpu.x_labels, vec!["01-01", "01-02"]);
        assert_eq!(arpu.lines[0].values, vec![2.0, 5.0]);
        let arppu = chart(&fig.panels[1]);
        assert_eq!(arppu.lines[0].values, vec![20.0, 0.0]);
    }

    #[test]
    fn test_daily_ratios_without_inputs_is_skipped() {
        let table = Table::build(DAILY_SHEET, &[("day", ColumnKind::Number)], vec![vec![20_240_101.0.into()]]);
        assert!(daily_ratios(&table).unwrap_err().is_schema_gap());
    }

    #[test]
    fn test_registration_cohorts_newest_first() {
        let mut rows = Vec::new();
        for week in 1..=3u32 {
            for cohort in [202_311.0, 202_401.0, 202_312.0] {
                rows.push(vec![
                    Value::Number(f64::from(week)),
                    Value::Text(format!("01-0{week}")),
                    Value::Number(cohort),
                    Value::Number(10.0),
                    Value::Number(100.0),
                ]);
            }
        }
        let table = Table::build(
            USER_SHEET,
            &[
                ("weekid", ColumnKind::Number),
                ("md", ColumnKind::Text),
                ("regmonth2", ColumnKind::Number),
                ("wau", ColumnKind::Number),
                ("wsales", ColumnKind::Number),
            ],
            rows,
        );
        let fig = registration_cohorts(&table).unwrap();
        let wau = chart(&fig.panels[0]);
        let order: Vec<_> = wau.bars.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(order, vec!["202401", "202312", "202311"]);
        assert_eq!(wau.x_labels, vec!["01-01", "01-02", "01-03"]);
        assert_eq!(fig.size, Some((1400, 1000)));
    }
}
