//! Hero section: this week's and last week's holders of core heroes.

use crate::figure::{ChartPanel, Figure, Marker, Series, ValueFormat};
use crate::manager::{ReportContext, SectionOutcome};
use crate::table::Table;
use crate::traits::ReportSection;
use opsgraph_common::{OpsGraphError, Result, SectionId};

/// Holders per hero card.
pub const HERO_SHEET: &str = "HERO_HOLD";

const HERO_COLUMNS: usize = 7;

/// Core hero holdings chart.
pub struct HeroSection;

impl ReportSection for HeroSection {
    fn id(&self) -> SectionId {
        SectionId::Hero
    }

    fn description(&self) -> &'static str {
        "holders of core heroes, this week against last week"
    }

    fn generate(&self, ctx: &ReportContext<'_>, outcome: &mut SectionOutcome) -> Result<()> {
        if let Some(heroes) = ctx.load(HERO_SHEET, Some(HERO_COLUMNS), outcome) {
            ctx.emit(outcome, "hero_hold_core.jpg", || core_holders(&heroes));
        }
        Ok(())
    }
}

/// `hero_hold_core.jpg`
pub fn core_holders(table: &Table) -> Result<Figure> {
    table.schema().require("core")?;
    let core = table.filter(|row| row.num("core") == 1.0);
    if core.is_empty() {
        return Err(OpsGraphError::schema("no core heroes"));
    }

    let panel = ChartPanel::new(core.texts("card_name")?)
        .y_desc("Number of Holders")
        .line(Series::new("This Week Holders", core.numbers("hu_tw")?).marker(Marker::Circle))
        .line(Series::new("Last Week Holders", core.numbers("hu_lw")?).marker(Marker::Cross))
        .value_labels(ValueFormat::Plain)
        .legend(true)
        .rotate_x_labels();
    Ok(Figure::single("Holders of Gold Soul Collaboration Characters (Core)", panel))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{ColumnKind, Value};

    fn heroes() -> Table {
        let rows = (1..=6u32)
            .map(|id| {
                vec![
                    Value::Text(format!("Hero {id}")),
                    Value::Number(if id % 2 == 0 { 1.0 } else { 0.0 }),
                    Value::Number(f64::from(id * 100)),
                    Value::Number(f64::from(id * 90)),
                ]
            })
            .collect();
        Table::build(
            HERO_SHEET,
            &[
                ("card_name", ColumnKind::Text),
                ("core", ColumnKind::Number),
                ("hu_tw", ColumnKind::Number),
                ("hu_lw", ColumnKind::Number),
            ],
            rows,
        )
    }

    #[test]
    fn test_only_core_heroes_are_charted() {
        let fig = core_holders(&heroes()).unwrap();
        let panel = fig.charts().next().unwrap();
        assert_eq!(panel.x_labels, vec!["Hero 2", "Hero 4", "Hero 6"]);
        assert_eq!(panel.lines[0].values, vec![200.0, 400.0, 600.0]);
        assert_eq!(panel.lines[1].marker, Marker::Cross);
        assert!(panel.rotate_x_labels);
    }

    #[test]
    fn test_no_core_heroes_is_skipped() {
        let none = heroes().filter(|r| r.num("core") == 0.0);
        assert!(core_holders(&none).unwrap_err().is_schema_gap());
        let no_flag = heroes().select(&["card_name", "hu_tw"]).unwrap();
        assert!(core_holders(&no_flag).unwrap_err().is_schema_gap());
    }
}
