//! Activities section: overview, cohort and activity-specific charts for the
//! five time-limited activities.
//!
//! Every activity sheet goes through the same preparation: `day` is parsed
//! into `date`, dates are dense-ranked into `row_number` (latest is 1),
//! internal zone rows are dropped and the VIP and zone-age labels are
//! resolved into their chart labels (`vip`, `zone`). Rows whose labels do
//! not resolve keep a blank and are left out of VIP- or zone-keyed charts.

use crate::aggregate::{aggregate, derive_ratio, pivot, ratios, sum_columns, CategoryOrder};
use crate::clean::parse_dates;
use crate::figure::{BarMode, ChartPanel, Figure, HeatmapPanel, Marker, Panel, Series, ValueFormat};
use crate::manager::{ReportContext, SectionOutcome};
use crate::table::{ColumnKind, Row, Table, Value};
use crate::traits::ReportSection;
use crate::transform::dense_rank_dates;
use crate::utils::{inches, long_date_label, short_date_label};
use chrono::NaiveDate;
use opsgraph_common::{file_stem, truncate_label, OpsGraphError, Result, SectionId, VipTier, ZoneAge};
use opsgraph_config::CategoriesConfig;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

const OVERVIEW_DATES: u32 = 30;
const COHORT_DATES: u32 = 5;
const WISHPOOL_REVENUE_DATES: u32 = 15;
const WISHPOOL_HEATMAP_DATES: u32 = 6;
const CARD_LABEL_CHARS: usize = 12;

const DATE: &str = "date";
const RANK: &str = "row_number";
const VIP: &str = "vip";
const ZONE: &str = "zone";
const TOTAL_DIAMOND: &str = "totaldiamond";
const DIAMOND_PARTS: [&str; 3] = ["freediamond", "paiddiamond", "backdiamond"];

/// `card_id` of the SoulstoneBox rows that sum every card.
pub const TOTAL_CARD: &str = "total";

/// Charts an activity gets beyond overview and cohorts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    /// Overview and cohorts only.
    Standard,
    /// Per-card rows; overview and cohorts use the `total` card.
    SoulstoneBox,
    /// Sales by VIP tier and the ratio heatmap instead of diamond charts.
    Wishpool,
}

/// One activity and the sheet it is exported to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Activity {
    /// Display name used in titles.
    pub name: &'static str,
    /// Workbook sheet.
    pub sheet: &'static str,
    /// Extra charts.
    pub kind: ActivityKind,
}

impl Activity {
    /// Lowercase name used in file names.
    pub fn stem(&self) -> String {
        file_stem(self.name)
    }

    fn file(&self, suffix: &str) -> String {
        format!("activity_{}_{suffix}.jpg", self.stem())
    }
}

/// Activities in run order.
pub const ACTIVITIES: [Activity; 5] = [
    Activity {
        name: "Prizewheel",
        sheet: "ACT_PRIZEWHEEL",
        kind: ActivityKind::Standard,
    },
    Activity {
        name: "Forcecard",
        sheet: "ACT_INTERZONE_FORCECARD",
        kind: ActivityKind::Standard,
    },
    Activity {
        name: "SoulstoneBox",
        sheet: "ACT_SOULSTONEBOX",
        kind: ActivityKind::SoulstoneBox,
    },
    Activity {
        name: "ThemeGacha",
        sheet: "ACT_THEMEGACHA",
        kind: ActivityKind::Standard,
    },
    Activity {
        name: "Wishpool",
        sheet: "ACT_WISHPOOL",
        kind: ActivityKind::Wishpool,
    },
];

/// A metric drawn as one cohort figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CohortMetric {
    /// Summed sales.
    Sales,
    /// Participants over active users.
    Participation,
    /// All diamonds spent over participants.
    AvgDiamond,
}

impl CohortMetric {
    /// Every metric in emission order.
    pub const ALL: [Self; 3] = [Self::Sales, Self::Participation, Self::AvgDiamond];

    /// Column holding the metric, also used in the file name.
    pub const fn column(self) -> &'static str {
        match self {
            Self::Sales => "sales",
            Self::Participation => ratios::PARTICIPATION,
            Self::AvgDiamond => ratios::AVG_DIAMOND,
        }
    }

    /// Axis and title text.
    pub const fn title(self) -> &'static str {
        match self {
            Self::Sales => "Sales (CNY)",
            Self::Participation => "Participation Rate",
            Self::AvgDiamond => "Avg. Diamond Spend per User",
        }
    }

    const fn denominator(self) -> Option<&'static str> {
        match self {
            Self::Sales => None,
            Self::Participation => Some("au"),
            Self::AvgDiamond => Some("pu"),
        }
    }
}

/// Charts for the time-limited activities.
pub struct ActivitiesSection;

impl ReportSection for ActivitiesSection {
    fn id(&self) -> SectionId {
        SectionId::Activities
    }

    fn description(&self) -> &'static str {
        "overview, cohort and per-activity charts for recent activities"
    }

    fn generate(&self, ctx: &ReportContext<'_>, outcome: &mut SectionOutcome) -> Result<()> {
        for activity in ACTIVITIES {
            let Some(raw) = ctx.load(activity.sheet, None, outcome) else {
                continue;
            };
            let prepared = match prepare(raw, ctx.categories()) {
                Ok(table) => table,
                Err(e) => {
                    warn!(activity = activity.name, error = %e, "Activity sheet unusable");
                    ctx.emit(outcome, &activity.file("overview"), || Err(e));
                    continue;
                }
            };
            debug!(activity = activity.name, rows = prepared.len(), "Prepared activity");

            match activity.kind {
                ActivityKind::Standard => diamond_charts(ctx, outcome, &activity, &prepared),
                ActivityKind::SoulstoneBox => {
                    let (total, cards) = match split_cards(&prepared) {
                        Ok(split) => split,
                        Err(e) => {
                            ctx.emit(outcome, &activity.file("overview"), || Err(e));
                            continue;
                        }
                    };
                    diamond_charts(ctx, outcome, &activity, &total);
                    ctx.emit(outcome, &activity.file("card_analysis"), || {
                        card_analysis(&cards, ctx.categories(), activity.name)
                    });
                }
                ActivityKind::Wishpool => {
                    ctx.emit(outcome, &activity.file("revenue_overview"), || {
                        wishpool_revenue(&prepared, ctx.categories())
                    });
                    ctx.emit(outcome, &activity.file("heatmap"), || {
                        wishpool_heatmap(&prepared, ctx.categories())
                    });
                }
            }
        }
        Ok(())
    }
}

fn diamond_charts(
    ctx: &ReportContext<'_>,
    outcome: &mut SectionOutcome,
    activity: &Activity,
    table: &Table,
) {
    ctx.emit(outcome, &activity.file("overview"), || overview(table, activity.name));

    let cohorts = match cohort_table(table) {
        Ok(cohorts) => cohorts,
        Err(e) => {
            warn!(activity = activity.name, error = %e, "No cohort charts");
            return;
        }
    };
    for metric in available_metrics(&cohorts) {
        let file = activity.file(&format!("cohort_{}", metric.column()));
        ctx.emit(outcome, &file, || {
            cohort_figure(&cohorts, ctx.categories(), activity.name, metric)
        });
    }
}

/// Adds `date`, `row_number`, `vip` and `zone`, and drops internal zone rows.
pub fn prepare(table: Table, categories: &CategoriesConfig) -> Result<Table> {
    let dated = parse_dates(table, "day", DATE)?;
    let ranked = dense_rank_dates(dated, DATE, RANK)?;
    let external = if ranked.has("zonetype") {
        ranked.filter(|row| !categories.is_internal_zone(&row.text("zonetype")))
    } else {
        ranked
    };

    let with_vip = if external.has("viptype") {
        external.derive(VIP, ColumnKind::Text, |row| {
            categories
                .vip_tier(&row.text("viptype"))
                .map_or(Value::Null, |tier| Value::from(categories.vip_label(tier)))
        })?
    } else {
        external
    };
    if with_vip.has("zonetype") {
        with_vip.derive(ZONE, ColumnKind::Text, |row| {
            categories
                .zone_age(&row.text("zonetype"))
                .map_or(Value::Null, |zone| Value::from(categories.zone_label(zone)))
        })
    } else {
        Ok(with_vip)
    }
}

/// Rows of the `count` most recent dates.
pub fn latest_dates(table: &Table, count: u32) -> Table {
    let limit = f64::from(count);
    table.filter(|row| {
        row.get(RANK)
            .and_then(Value::as_f64)
            .is_some_and(|rank| rank <= limit)
    })
}

fn keyed_by(table: &Table, columns: &[&str]) -> Result<Table> {
    for column in columns {
        table.schema().require(column)?;
    }
    Ok(table.filter(|row| {
        columns
            .iter()
            .all(|c| row.get(c).is_some_and(|v| !v.is_null()))
    }))
}

fn with_total_diamond(table: Table) -> Result<Table> {
    sum_columns(table, TOTAL_DIAMOND, &DIAMOND_PARTS)
}

/// SoulstoneBox rows split into the `total` card and the individual cards.
///
/// Each subset is re-ranked on its own dates, so the latest card date is
/// rank 1 even when the card rows lag the total rows.
pub fn split_cards(table: &Table) -> Result<(Table, Table)> {
    if !table.has("card_id") {
        debug!("No card_id column, treating every row as the total card");
        return Ok((table.clone(), table.filter(|_| false)));
    }
    let is_total = |row: &Row<'_>| row.text("card_id").trim() == TOTAL_CARD;
    let total = dense_rank_dates(table.filter(is_total), DATE, RANK)?;
    let cards = dense_rank_dates(table.filter(|row| !is_total(row)), DATE, RANK)?;
    Ok((total, cards))
}

/// `activity_<name>_overview.jpg`: daily diamond spend stacked free over
/// paid, with the participation rate on the secondary axis.
///
/// Returned diamonds count as free diamonds.
pub fn overview(table: &Table, name: &str) -> Result<Figure> {
    let recent = latest_dates(table, OVERVIEW_DATES);
    let grouped = aggregate(
        &recent,
        &[DATE],
        &["freediamond", "paiddiamond", "backdiamond", "au", "pu"],
    )?;
    let grouped = if grouped.has("backdiamond") {
        sum_columns(grouped, "freediamond", &["freediamond", "backdiamond"])?
    } else {
        grouped
    };
    let grouped = derive_ratio(grouped, ratios::PARTICIPATION, "pu", "au")?;

    let labels = grouped.column(DATE)?.into_iter().map(short_date_label).collect();
    let mut panel = ChartPanel::new(labels).y_desc("Diamond Spend").legend(true);
    for (i, (column, label)) in [("freediamond", "Free Diamond"), ("paiddiamond", "Paid Diamond")]
        .into_iter()
        .enumerate()
    {
        if grouped.has(column) {
            panel = panel.bar(Series::new(label, grouped.numbers(column)?).color(i));
        }
    }
    if grouped.has(ratios::PARTICIPATION) {
        panel = panel
            .secondary_line(
                Series::new("Participation Rate", grouped.numbers(ratios::PARTICIPATION)?)
                    .color(2)
                    .marker(Marker::Circle),
            )
            .secondary_desc("Participation Rate");
    }
    Ok(Figure::single(format!("Overview of {name}"), panel))
}

/// The five most recent dates summed per date, zone age and VIP tier, with
/// `totaldiamond`, `pr` and `avgdiamond` derived where their inputs exist.
pub fn cohort_table(table: &Table) -> Result<Table> {
    let recent = keyed_by(&latest_dates(table, COHORT_DATES), &[VIP, ZONE])?;
    let grouped = aggregate(
        &recent,
        &[DATE, ZONE, VIP],
        &["freediamond", "paiddiamond", "backdiamond", "au", "pu", "sales"],
    )?;
    let grouped = with_total_diamond(grouped)?;
    let grouped = derive_ratio(grouped, ratios::PARTICIPATION, "pu", "au")?;
    derive_ratio(grouped, ratios::AVG_DIAMOND, TOTAL_DIAMOND, "pu")
}

/// Metrics the cohort table can chart; ratios need a non-zero denominator.
pub fn available_metrics(cohorts: &Table) -> Vec<CohortMetric> {
    CohortMetric::ALL
        .into_iter()
        .filter(|metric| {
            cohorts.has(metric.column())
                && metric
                    .denominator()
                    .map_or(true, |d| cohorts.sum(d).is_ok_and(|total| total > 0.0))
        })
        .collect()
}

/// `activity_<name>_cohort_<metric>.jpg`: one panel per zone age, VIP tiers
/// along x and one line per date.
pub fn cohort_figure(
    cohorts: &Table,
    categories: &CategoriesConfig,
    name: &str,
    metric: CohortMetric,
) -> Result<Figure> {
    let column = metric.column();
    cohorts.schema().require(column)?;

    let mut cells: BTreeMap<(NaiveDate, String, String), f64> = BTreeMap::new();
    for row in cohorts.rows() {
        let Some(date) = row.date(DATE) else { continue };
        *cells.entry((date, row.text(ZONE), row.text(VIP))).or_insert(0.0) += row.num(column);
    }
    let dates: BTreeSet<NaiveDate> = cells.keys().map(|(d, _, _)| *d).collect();
    let vip_labels: Vec<String> = VipTier::ALL
        .iter()
        .map(|&t| categories.vip_label(t).to_string())
        .collect();

    let zones = ZoneAge::ALL;
    let mut panels = Vec::with_capacity(zones.len());
    for (z, zone) in zones.into_iter().enumerate() {
        let zone_label = categories.zone_label(zone);
        if !cells.keys().any(|(_, zl, _)| zl == zone_label) {
            panels.push(Panel::Empty);
            continue;
        }
        let mut panel = ChartPanel::new(vip_labels.clone())
            .title(zone_label)
            .legend(z == zones.len() - 1);
        if z == 0 {
            panel = panel.y_desc(metric.title());
        }
        for (i, date) in dates.iter().enumerate() {
            let values = vip_labels
                .iter()
                .map(|vip| {
                    cells
                        .get(&(*date, zone_label.to_string(), vip.clone()))
                        .copied()
                        .unwrap_or(0.0)
                })
                .collect();
            let label = long_date_label(&Value::Date(*date));
            panel = panel.line(Series::new(label, values).color(i).marker(Marker::Circle));
        }
        panels.push(panel.into());
    }

    Ok(
        Figure::grid(format!("{} in Recent {name}", metric.title()), 1, zones.len(), panels)
            .share_y_by_row()
            .size(2000, 500),
    )
}

/// `activity_soulstonebox_card_analysis.jpg`: for the latest date, a zone
/// age × spending tier grid with average spend per card as bars and the
/// participant count as a line.
pub fn card_analysis(cards: &Table, categories: &CategoriesConfig, name: &str) -> Result<Figure> {
    cards.schema().require("card_name")?;
    let latest = keyed_by(&latest_dates(cards, 1), &[VIP, ZONE])?;
    if latest.is_empty() {
        return Err(OpsGraphError::schema("no per-card rows on the latest date"));
    }
    let grouped = aggregate(
        &latest,
        &[ZONE, VIP, "card_name"],
        &["freediamond", "paiddiamond", "pu"],
    )?;
    // Returned diamonds are not card spend
    let grouped = sum_columns(grouped, TOTAL_DIAMOND, &DIAMOND_PARTS[..2])?;
    let grouped = derive_ratio(grouped, ratios::AVG_DIAMOND, TOTAL_DIAMOND, "pu")?;
    grouped.schema().require(ratios::AVG_DIAMOND)?;

    let card_names: Vec<String> = grouped
        .distinct("card_name")?
        .iter()
        .map(ToString::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let lookup = |zone: &str, vip: &str, column: &str| -> Vec<f64> {
        card_names
            .iter()
            .map(|card| {
                grouped
                    .rows()
                    .find(|r| r.text(ZONE) == zone && r.text(VIP) == vip && r.text("card_name") == *card)
                    .map_or(0.0, |r| r.num(column))
            })
            .collect()
    };
    let x_labels: Vec<String> = card_names.iter().map(|c| truncate_label(c, CARD_LABEL_CHARS)).collect();
    let max_pu = grouped.max_number("pu")?.unwrap_or(0.0);
    let pu_top = if max_pu > 0.0 { max_pu * 1.1 } else { 1.0 };

    let tiers: Vec<VipTier> = VipTier::ALL.into_iter().filter(|t| t.is_spender()).collect();
    let mut panels = Vec::with_capacity(ZoneAge::ALL.len() * tiers.len());
    for (z, zone) in ZoneAge::ALL.into_iter().enumerate() {
        let zone_label = categories.zone_label(zone);
        for (t, &tier) in tiers.iter().enumerate() {
            let vip_label = categories.vip_label(tier);
            let mut panel = ChartPanel::new(x_labels.clone())
                .title(format!("{zone_label} / {vip_label}"))
                .bar(Series::new(
                    CohortMetric::AvgDiamond.title(),
                    lookup(zone_label, vip_label, ratios::AVG_DIAMOND),
                ))
                .secondary_line(
                    Series::new("Participants", lookup(zone_label, vip_label, "pu"))
                        .color(1)
                        .marker(Marker::Circle),
                )
                .secondary_range(0.0, pu_top)
                .legend(z == 0 && t == 0)
                .rotate_x_labels();
            if t == 0 {
                panel = panel.y_desc("Avg. Spend");
            }
            panels.push(panel.into());
        }
    }

    Ok(Figure::grid(
        format!("Latest {name}: Spend per User & Participant Count by Card"),
        ZoneAge::ALL.len(),
        tiers.len(),
        panels,
    )
    .size(1600, 1200))
}

fn vip_order(categories: &CategoriesConfig) -> CategoryOrder {
    CategoryOrder::Canonical(
        VipTier::ALL
            .iter()
            .map(|&t| categories.vip_label(t).to_string())
            .collect(),
    )
}

/// `activity_wishpool_revenue_overview.jpg`: sales of the 15 most recent
/// dates stacked by VIP tier.
pub fn wishpool_revenue(table: &Table, categories: &CategoriesConfig) -> Result<Figure> {
    let recent = keyed_by(&latest_dates(table, WISHPOOL_REVENUE_DATES), &[VIP])?;
    let sales = pivot(&recent, DATE, VIP, "sales", &vip_order(categories))?;
    let panel = ChartPanel::new(sales.index.iter().map(short_date_label).collect())
        .y_desc("Sales (CNY)")
        .bars_from(sales.series())
        .bar_mode(BarMode::Stacked)
        .legend(true);
    Ok(Figure::single("Revenue Overview of Wishpool", panel))
}

/// `activity_wishpool_heatmap.jpg`: paying users, ARPPU, ARPU and pay rate
/// per date and VIP tier over the six most recent dates.
///
/// Metrics whose inputs are absent get no panel; the figure is a schema gap
/// only when none can be drawn.
pub fn wishpool_heatmap(table: &Table, categories: &CategoriesConfig) -> Result<Figure> {
    let recent = keyed_by(&latest_dates(table, WISHPOOL_HEATMAP_DATES), &[VIP])?;
    let grouped = aggregate(&recent, &[DATE, VIP], &["au", "cu", "sales"])?;
    let grouped = derive_ratio(grouped, ratios::ARPU, "sales", "au")?;
    let grouped = derive_ratio(grouped, ratios::ARPPU, "sales", "cu")?;
    let grouped = derive_ratio(grouped, ratios::PAY_RATE, "cu", "au")?;

    let order = vip_order(categories);
    let mut panels: Vec<Panel> = Vec::with_capacity(4);
    for (column, title, format) in [
        ("cu", "Paying User Count", ValueFormat::Decimals(0)),
        (ratios::ARPPU, "ARPPU", ValueFormat::General),
        (ratios::ARPU, "ARPU", ValueFormat::Decimals(2)),
        (ratios::PAY_RATE, "Pay Rate", ValueFormat::Decimals(2)),
    ] {
        if !grouped.has(column) {
            debug!(metric = column, "Heatmap metric inputs absent");
            continue;
        }
        let matrix = pivot(&grouped, DATE, VIP, column, &order)?;
        panels.push(
            HeatmapPanel {
                title: title.to_string(),
                row_labels: matrix.index.iter().map(long_date_label).collect(),
                col_labels: matrix.categories,
                cells: matrix.cells,
                format,
            }
            .into(),
        );
    }
    if panels.is_empty() {
        return Err(OpsGraphError::schema("no wishpool heatmap metric has its inputs"));
    }

    let (rows, cols) = match panels.len() {
        1 => (1, 1),
        2 => (1, 2),
        _ => (2, 2),
    };
    panels.resize(rows * cols, Panel::Empty);
    #[allow(clippy::cast_possible_truncation)]
    let (width, height) = inches(14, 5 * rows as u32);
    Ok(Figure::grid("Heatmap Analysis of Recent Wishpool", rows, cols, panels).size(width, height))
}
