//! Currency section: diamond spend per activity and holdings per VIP level.

use crate::aggregate::{aggregate, pivot, subtract_if_present, CategoryOrder};
use crate::figure::{ChartPanel, Figure, Panel, Series};
use crate::manager::{ReportContext, SectionOutcome};
use crate::table::Table;
use crate::traits::ReportSection;
use crate::transform::{relabel_long_tail, window_rows, BucketRule, RankCutoff, Window};
use crate::utils::{index_labels, inches, short_date_label};
use opsgraph_common::{OpsGraphError, Result, SectionId};
use tracing::debug;

/// Daily diamond spend per activity type.
pub const SPEND_SHEET: &str = "CUR_SPEND";
/// Daily diamond holdings per VIP level.
pub const STOCK_SHEET: &str = "CUR_STOCK";

const SPEND_DAYS: i64 = 90;
const STOCK_DAYS: usize = 60;
const STOCK_COLUMNS: usize = 21;

const VIP_GROUPS: [(&str, [&str; 4]); 3] = [
    ("High VIP", ["v18", "v17", "v16", "v15"]),
    ("Mid VIP", ["v12", "v11", "v10", "v09"]),
    ("Low VIP", ["v08", "v07", "v06", "v05"]),
];

/// Diamond economy charts.
pub struct CurrencySection;

impl ReportSection for CurrencySection {
    fn id(&self) -> SectionId {
        SectionId::Currency
    }

    fn description(&self) -> &'static str {
        "diamond spend by activity and diamond holdings by VIP level"
    }

    fn generate(&self, ctx: &ReportContext<'_>, outcome: &mut SectionOutcome) -> Result<()> {
        if let Some(spend) = ctx.load(SPEND_SHEET, None, outcome) {
            ctx.emit(outcome, "currency_spend.jpg", || spend_by_activity(&spend));
        }
        if let Some(stock) = ctx.load(STOCK_SHEET, Some(STOCK_COLUMNS), outcome) {
            ctx.emit(outcome, "currency_stock_by_vip.jpg", || stock_by_vip(&stock));
        }
        Ok(())
    }
}

/// Net spend per day and activity over the trailing 90 days.
///
/// Activities are ranked on gross `totaldiamond`; from rank 10 on they are
/// summed as `others`. `backdiamond`, when the export has it, is subtracted
/// after ranking.
pub fn net_spend_by_activity(table: &Table) -> Result<Table> {
    let recent = window_rows(table, &Window::trailing_days("day", SPEND_DAYS))?;
    let rule = BucketRule::new("a_typ", "totaldiamond").cutoff(RankCutoff::AtOrAbove(10));
    let relabelled = relabel_long_tail(&recent, &rule)?;
    let net = subtract_if_present(relabelled, "totaldiamond", "backdiamond")?;
    let grouped = aggregate(&net, &["day", "a_typ"], &["totaldiamond", "paiddiamond"])?;
    debug!(rows = grouped.len(), "Aggregated net spend");
    Ok(grouped)
}

/// `currency_spend.jpg`
pub fn spend_by_activity(table: &Table) -> Result<Figure> {
    let grouped = net_spend_by_activity(table)?;
    let total = pivot(&grouped, "day", "a_typ", "totaldiamond", &CategoryOrder::Natural)?;
    let labels = index_labels(&total.index);

    let mut panels: Vec<Panel> = vec![ChartPanel::new(labels.clone())
        .title("Total Diamond Spend by Activity")
        .y_desc("Net Diamond Spend")
        .bars_from(total.series())
        .legend(true)
        .into()];
    if grouped.has("paiddiamond") {
        let paid = pivot(&grouped, "day", "a_typ", "paiddiamond", &CategoryOrder::Natural)?;
        panels.push(
            ChartPanel::new(labels)
                .title("Paid Diamond Spend by Activity")
                .y_desc("Paid Diamond Spend")
                .bars_from(paid.series())
                .into(),
        );
    }

    let (width, height) = inches(14, 10);
    Ok(Figure::stacked("Diamond Spend Analysis", panels).size(width, height))
}

/// `currency_stock_by_vip.jpg`: last 60 days of holdings, one panel per VIP band.
pub fn stock_by_vip(table: &Table) -> Result<Figure> {
    let days = table.sorted_by("day", true)?.tail(STOCK_DAYS);
    let labels: Vec<String> = days.column("day")?.into_iter().map(short_date_label).collect();

    let mut panels = Vec::new();
    for (title, columns) in VIP_GROUPS {
        let mut panel = ChartPanel::new(labels.clone()).title(title).y_desc("Diamonds").legend(true);
        for column in columns.iter().filter(|c| days.has(c)) {
            panel = panel.line(Series::new(column.to_uppercase(), days.numbers(column)?));
        }
        if panel.lines.is_empty() {
            debug!(band = title, "No holdings columns for band");
            continue;
        }
        panels.push(panel.into());
    }
    if panels.is_empty() {
        return Err(OpsGraphError::schema("no VIP holdings columns (v05..v18)"));
    }

    let (width, height) = inches(14, 8);
    Ok(Figure::stacked("Diamond Holdings by VIP Level", panels).size(width, height))
}
