//! User base section: acquisition by server zone and paying users by tier.

use crate::aggregate::{aggregate, pivot, CategoryOrder};
use crate::figure::{ChartPanel, Figure, Panel, Series};
use crate::manager::{ReportContext, SectionOutcome};
use crate::table::{ColumnKind, Table, Value};
use crate::traits::ReportSection;
use crate::transform::{relabel_long_tail, window_rows, BucketRule, RankCutoff, Window};
use crate::utils::index_labels;
use opsgraph_common::{OpsGraphError, Result, SectionId};

/// Weekly new users and sales per zone and acquisition source.
pub const ZONE_SHEET: &str = "KPI_ZONE";
/// Daily paying users per payment index.
pub const SALES_INDEX_SHEET: &str = "SALES_INDEX";

const ZONE_COLUMNS: usize = 7;
const ZONE_DAYS: i64 = 50;
const SALES_INDEX_COLUMNS: usize = 4;
const SALES_INDEX_DAYS: i64 = 60;

/// Label for acquisition sources outside the top eight.
pub const OTHER_SOURCES: &str = "OU_others";

const ZONE_TYPES: [(&str, &str); 3] = [
    ("xiaoqi", "Xiaoqi Servers"),
    ("mix", "Android Mixed Servers"),
    ("ios", "iOS Servers"),
];

/// Payment tiers and the `index` values they cover.
pub const PAYMENT_TIERS: [(&str, &[&str]); 5] = [
    ("198 or less", &["198_below"]),
    ("198-647", &["198", "328"]),
    ("648-2591", &["648", "1296"]),
    ("2592-7775", &["2592", "5184"]),
    ("7776 or more", &["7776", "11110", "50000"]),
];

/// Server zone and payment tier charts.
pub struct UserBaseSection;

impl ReportSection for UserBaseSection {
    fn id(&self) -> SectionId {
        SectionId::UserBase
    }

    fn description(&self) -> &'static str {
        "new users and sales by server zone, paying users by payment tier"
    }

    fn generate(&self, ctx: &ReportContext<'_>, outcome: &mut SectionOutcome) -> Result<()> {
        if let Some(zones) = ctx.load(ZONE_SHEET, Some(ZONE_COLUMNS), outcome) {
            ctx.emit(outcome, "user_base_wnu_sales_by_zone.jpg", || zone_overview(&zones));
        }
        if let Some(index) = ctx.load(SALES_INDEX_SHEET, Some(SALES_INDEX_COLUMNS), outcome) {
            ctx.emit(outcome, "user_base_paying_users_by_tier.jpg", || {
                paying_users_by_tier(&index)
            });
        }
        Ok(())
    }
}

/// WNU and sales of the trailing 50 days per zone, sources from rank 9 on
/// summed as [`OTHER_SOURCES`].
pub fn zone_sources(table: &Table) -> Result<Table> {
    let recent = window_rows(table, &Window::trailing_days("day", ZONE_DAYS))?;
    let rule = BucketRule::new("user_type", "wnu")
        .cutoff(RankCutoff::AtOrAbove(9))
        .others_label(OTHER_SOURCES);
    let relabelled = relabel_long_tail(&recent, &rule)?;
    aggregate(
        &relabelled,
        &["day", "zone", "zone_type", "user_type"],
        &["wnu", "wsales"],
    )
}

/// `user_base_wnu_sales_by_zone.jpg`: one column per zone type, WNU on
/// top and weekly sales below, zones on x stacked by source.
pub fn zone_overview(table: &Table) -> Result<Figure> {
    let grouped = zone_sources(table)?;

    let mut top = Vec::with_capacity(ZONE_TYPES.len());
    let mut bottom = Vec::with_capacity(ZONE_TYPES.len());
    for (i, (zone_type, title)) in ZONE_TYPES.into_iter().enumerate() {
        let subset = grouped.filter(|r| r.text("zone_type") == zone_type);
        if subset.is_empty() {
            top.push(Panel::Empty);
            bottom.push(Panel::Empty);
            continue;
        }
        let first = i == 0;
        let wnu = pivot(&subset, "zone", "user_type", "wnu", &CategoryOrder::Natural)?;
        let sales = pivot(&subset, "zone", "user_type", "wsales", &CategoryOrder::Natural)?;
        let labels: Vec<String> = wnu.index.iter().map(ToString::to_string).collect();

        let mut wnu_panel = ChartPanel::new(labels.clone())
            .title(title)
            .bars_from(wnu.series())
            .legend(first);
        let mut sales_panel = ChartPanel::new(labels).bars_from(sales.series());
        if first {
            wnu_panel = wnu_panel.y_desc("WNU");
            sales_panel = sales_panel.y_desc("Weekly Sales");
        }
        top.push(wnu_panel.into());
        bottom.push(sales_panel.into());
    }

    top.extend(bottom);
    Ok(Figure::grid("WNU & Weekly Sales by Server Zone", 2, ZONE_TYPES.len(), top).size(1400, 800))
}

fn tier_of(index: &str) -> Option<&'static str> {
    PAYMENT_TIERS
        .iter()
        .find(|(_, members)| members.contains(&index))
        .map(|(tier, _)| *tier)
}

/// `user_base_paying_users_by_tier.jpg`: trailing 60 days, log scale.
pub fn paying_users_by_tier(table: &Table) -> Result<Figure> {
    table.schema().require("index")?;
    let recent = window_rows(table, &Window::trailing_days("day", SALES_INDEX_DAYS))?;
    let tiered = recent
        .derive("tier", ColumnKind::Text, |row| {
            tier_of(row.text("index").trim()).map_or(Value::Null, Value::from)
        })?
        .filter(|row| row.get("tier").is_some_and(|v| !v.is_null()));
    if tiered.is_empty() {
        return Err(OpsGraphError::schema("no rows in a known payment tier"));
    }

    let order = CategoryOrder::Canonical(PAYMENT_TIERS.iter().map(|(t, _)| (*t).to_string()).collect());
    let pu = pivot(&tiered, "day", "tier", "pu", &order)?;

    let panel = pu.series().into_iter().enumerate().fold(
        ChartPanel::new(index_labels(&pu.index))
            .y_desc("Number of Paying Users (log scale)")
            .log_scale(2)
            .legend(true),
        |panel, (i, (tier, values))| panel.line(Series::new(tier, values).color(i)),
    );
    Ok(Figure::single("Paying User Count by Payment Tier", panel))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::figure::Scale;

    fn zones() -> Table {
        let mut rows = Vec::new();
        for (zone, zone_type) in [("S1", "xiaoqi"), ("M1", "mix")] {
            for src in 0..10u32 {
                rows.push(vec![
                    Value::Number(20_240_110.0),
                    Value::from(zone),
                    Value::from(zone_type),
                    Value::Text(format!("src{src}")),
                    Value::Number(f64::from(100 - src)),
                    Value::Number(1.0),
                ]);
            }
        }
        Table::build(
            ZONE_SHEET,
            &[
                ("day", ColumnKind::Number),
                ("zone", ColumnKind::Text),
                ("zone_type", ColumnKind::Text),
                ("user_type", ColumnKind::Text),
                ("wnu", ColumnKind::Number),
                ("wsales", ColumnKind::Number),
            ],
            rows,
        )
    }

    #[test]
    fn test_zone_sources_bucket_from_rank_nine() {
        let grouped = zone_sources(&zones()).unwrap();
        let sources = grouped.distinct("user_type").unwrap();
        assert_eq!(sources.len(), 9);
        assert!(sources.contains(&Value::from(OTHER_SOURCES)));
        assert!(!sources.contains(&Value::from("src8")));
        assert_eq!(grouped.sum("wnu").unwrap(), zones().sum("wnu").unwrap());
    }

    #[test]
    fn test_zone_overview_leaves_missing_zone_type_blank() {
        let fig = zone_overview(&zones()).unwrap();
        assert_eq!((fig.rows, fig.cols), (2, 3));
        assert_eq!(fig.panels[2], Panel::Empty);
        assert_eq!(fig.panels[5], Panel::Empty);
        let first = fig.charts().next().unwrap();
        assert!(first.legend);
        assert_eq!(first.x_labels, vec!["S1"]);
        assert!(fig.validate().is_ok());
    }

    #[test]
    fn test_payment_tiers() {
        assert_eq!(tier_of("198_below"), Some("198 or less"));
        assert_eq!(tier_of("50000"), Some("7776 or more"));
        assert_eq!(tier_of("1"), None);

        let table = Table::build(
            SALES_INDEX_SHEET,
            &[("day", ColumnKind::Number), ("index", ColumnKind::Text), ("pu", ColumnKind::Number)],
            vec![
                vec![20_240_101.0.into(), "328".into(), 4.0.into()],
                vec![20_240_101.0.into(), "198".into(), 6.0.into()],
                vec![20_240_102.0.into(), "50000".into(), 1.0.into()],
                vec![20_240_102.0.into(), "999".into(), 9.0.into()],
            ],
        );
        let fig = paying_users_by_tier(&table).unwrap();
        let panel = fig.charts().next().unwrap();
        assert_eq!(panel.scale, Scale::Log(2));
        assert_eq!(panel.lines[0].label, "198-647");
        assert_eq!(panel.lines[0].values, vec![10.0, 0.0]);
        assert_eq!(panel.lines[1].label, "7776 or more");
    }
}
