//! Test utilities and shared test helpers for OpsGraph.
//!
//! Fixtures here build small but schema-faithful workbooks so that loader,
//! transform and report tests can run against real `.xlsx` files.

use chrono::{Datelike, Duration, NaiveDate};
use rust_xlsxwriter::{Workbook, XlsxError};
use std::path::Path;
use std::sync::Once;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize test logging once per test run.
static INIT: Once = Once::new();

/// Initialize logging for tests with a sensible default configuration.
/// This function is safe to call multiple times and will only initialize once.
pub fn init_test_logging() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
        let _ = fmt().with_test_writer().with_env_filter(filter).try_init();
    });
}

/// Test fixture for creating a calendar date.
pub fn mock_date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid fixture date")
}

/// Create a temporary directory for tests that automatically cleans up.
pub fn create_temp_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("Failed to create temporary directory")
}

/// Assert that two floating point numbers are approximately equal within a tolerance.
pub fn assert_approx_eq(left: f64, right: f64, tolerance: f64) {
    let diff = (left - right).abs();
    assert!(
        diff <= tolerance,
        "assertion failed: `{left}` is not approximately equal to `{right}` (tolerance: {tolerance}, diff: {diff})"
    );
}

/// Encodes a date the way the warehouse export does: `YYYYMMDD` as a number.
pub fn day_number(date: NaiveDate) -> f64 {
    f64::from(date.year() * 10_000) + f64::from(date.month() * 100 + date.day())
}

/// One cell of a fixture sheet.
#[derive(Debug, Clone, PartialEq)]
pub enum FixtureCell {
    /// Numeric cell.
    Number(f64),
    /// Text cell.
    Text(String),
    /// Blank cell.
    Empty,
}

impl From<f64> for FixtureCell {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for FixtureCell {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<&str> for FixtureCell {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FixtureCell {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// A named sheet with a header row and data rows.
#[derive(Debug, Clone)]
pub struct FixtureSheet {
    /// Sheet name.
    pub name: String,
    /// Header row.
    pub headers: Vec<String>,
    /// Data rows, each as long as `headers`.
    pub rows: Vec<Vec<FixtureCell>>,
}

impl FixtureSheet {
    /// Creates an empty sheet with the given header.
    pub fn new(name: &str, headers: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            headers: headers.iter().map(|h| (*h).to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Appends a data row.
    pub fn push_row(&mut self, row: Vec<FixtureCell>) {
        self.rows.push(row);
    }
}

/// Writes the sheets to an `.xlsx` file at `path`.
pub fn write_workbook(path: &Path, sheets: &[FixtureSheet]) -> Result<(), XlsxError> {
    let mut workbook = Workbook::new();
    for sheet in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&sheet.name)?;
        for (col, header) in sheet.headers.iter().enumerate() {
            worksheet.write_string(0, col_index(col), header.as_str())?;
        }
        for (row_idx, row) in sheet.rows.iter().enumerate() {
            let row_num = u32::try_from(row_idx + 1).expect("fixture row fits in u32");
            for (col, cell) in row.iter().enumerate() {
                match cell {
                    FixtureCell::Number(n) => {
                        worksheet.write_number(row_num, col_index(col), *n)?;
                    }
                    FixtureCell::Text(s) => {
                        worksheet.write_string(row_num, col_index(col), s.as_str())?;
                    }
                    FixtureCell::Empty => {}
                }
            }
        }
    }
    workbook.save(path)?;
    Ok(())
}

fn col_index(col: usize) -> u16 {
    u16::try_from(col).expect("fixture column fits in u16")
}

/// Builders for every sheet the weekly report reads.
pub mod report_fixtures {
    use super::*;

    /// Anchor date for generated series (a Monday).
    pub fn anchor_date() -> NaiveDate {
        mock_date(2024, 1, 1)
    }

    fn week_start(week: i32) -> NaiveDate {
        anchor_date() + Duration::weeks(i64::from(week))
    }

    fn md(date: NaiveDate) -> String {
        format!("{:02}-{:02}", date.month(), date.day())
    }

    /// `KPI_WKLY`: one row per week.
    pub fn kpi_weekly(weeks: i32) -> FixtureSheet {
        let mut sheet = FixtureSheet::new(
            "KPI_WKLY",
            &["weekid", "week", "md", "wau", "wnu", "wou", "sales"],
        );
        for week in 0..weeks {
            let date = week_start(week);
            let wnu = 2_000 + week * 10;
            let wou = 18_000 + week * 50;
            sheet.push_row(vec![
                (week + 1).into(),
                day_number(date).into(),
                md(date).into(),
                (wnu + wou).into(),
                wnu.into(),
                wou.into(),
                (1_500_000 + week * 20_000).into(),
            ]);
        }
        sheet
    }

    /// `KPI_DAILY`: one row per day; the first row carries a `\N` arppu.
    pub fn kpi_daily(days: i32) -> FixtureSheet {
        let mut sheet = FixtureSheet::new(
            "KPI_DAILY",
            &["day", "dau", "dnu", "dou", "sales", "pu", "arpu", "arppu", "payrate"],
        );
        for day in 0..days {
            let date = anchor_date() + Duration::days(i64::from(day));
            let dnu = 800 + day;
            let dou = 12_000 + day * 3;
            let dau = dnu + dou;
            let pu = 600 + day;
            let sales = 200_000 + day * 1_000;
            let arppu: FixtureCell = if day == 0 {
                crate::NULL_SENTINEL.into()
            } else {
                (f64::from(sales) / f64::from(pu)).into()
            };
            sheet.push_row(vec![
                day_number(date).into(),
                dau.into(),
                dnu.into(),
                dou.into(),
                sales.into(),
                pu.into(),
                (f64::from(sales) / f64::from(dau)).into(),
                arppu,
                (f64::from(pu) / f64::from(dau)).into(),
            ]);
        }
        sheet
    }

    /// `KPI_CHANNEL`: `codes` affiliate codes over `weeks` weeks.
    ///
    /// Code `ch00` has the largest WAU, `ch01` the next, and so on.
    pub fn kpi_channel(codes: i32, weeks: i32) -> FixtureSheet {
        let mut sheet = FixtureSheet::new(
            "KPI_CHANNEL",
            &["weekid", "week", "md", "affcode", "wau", "wnu"],
        );
        for week in 0..weeks {
            let date = week_start(week);
            for code in 0..codes {
                sheet.push_row(vec![
                    (week + 1).into(),
                    day_number(date).into(),
                    md(date).into(),
                    format!("ch{code:02}").into(),
                    ((codes - code) * 100).into(),
                    ((codes - code) * 10).into(),
                ]);
            }
        }
        sheet
    }

    /// `KPI_USER`: registration cohorts `regmonth2` per week.
    pub fn kpi_user(weeks: i32) -> FixtureSheet {
        let mut sheet = FixtureSheet::new(
            "KPI_USER",
            &["weekid", "week", "md", "regmonth2", "wau", "wsales"],
        );
        for week in 0..weeks {
            let date = week_start(week);
            for cohort in [202_311, 202_312, 202_401] {
                sheet.push_row(vec![
                    (week + 1).into(),
                    day_number(date).into(),
                    md(date).into(),
                    cohort.into(),
                    (1_000 + cohort % 100 * 10).into(),
                    (50_000 + week * 100).into(),
                ]);
            }
        }
        sheet
    }

    /// `CUR_SPEND`: diamond spend per activity type and day.
    pub fn cur_spend(days: i32, activities: i32, with_backdiamond: bool) -> FixtureSheet {
        let mut headers = vec!["day", "a_typ", "totaldiamond", "paiddiamond"];
        if with_backdiamond {
            headers.push("backdiamond");
        }
        let mut sheet = FixtureSheet::new("CUR_SPEND", &headers);
        for day in 0..days {
            let date = anchor_date() + Duration::days(i64::from(day));
            for act in 0..activities {
                let mut row: Vec<FixtureCell> = vec![
                    day_number(date).into(),
                    format!("act{act:02}").into(),
                    ((activities - act) * 1_000).into(),
                    ((activities - act) * 400).into(),
                ];
                if with_backdiamond {
                    row.push(((activities - act) * 50).into());
                }
                sheet.push_row(row);
            }
        }
        sheet
    }

    /// `CUR_STOCK`: `day` plus diamond holdings for VIP levels v01..v20.
    pub fn cur_stock(days: i32) -> FixtureSheet {
        let headers: Vec<String> = std::iter::once("day".to_string())
            .chain((1..=20).map(|v| format!("v{v:02}")))
            .collect();
        let header_refs: Vec<&str> = headers.iter().map(String::as_str).collect();
        let mut sheet = FixtureSheet::new("CUR_STOCK", &header_refs);
        for day in 0..days {
            let date = anchor_date() + Duration::days(i64::from(day));
            let mut row: Vec<FixtureCell> = vec![day_number(date).into()];
            row.extend((1..=20).map(|v| FixtureCell::from(v * 5_000 + day)));
            sheet.push_row(row);
        }
        sheet
    }

    /// `KPI_ZONE`: new users and sales per zone and acquisition source.
    pub fn kpi_zone(days: i32) -> FixtureSheet {
        let mut sheet = FixtureSheet::new(
            "KPI_ZONE",
            &["day", "zone", "zone_type", "user_type", "wnu", "wsales", "note"],
        );
        let zones = [("S1", "xiaoqi"), ("S2", "xiaoqi"), ("M1", "mix"), ("I1", "ios")];
        for day in (0..days).step_by(7) {
            let date = anchor_date() + Duration::days(i64::from(day));
            for (zone, zone_type) in zones {
                for source in 0..10 {
                    sheet.push_row(vec![
                        day_number(date).into(),
                        zone.into(),
                        zone_type.into(),
                        format!("src{source}").into(),
                        ((10 - source) * 20).into(),
                        ((10 - source) * 300).into(),
                        FixtureCell::Empty,
                    ]);
                }
            }
        }
        sheet
    }

    /// `SALES_INDEX`: paying users per payment tier index.
    pub fn sales_index(days: i32) -> FixtureSheet {
        let mut sheet = FixtureSheet::new("SALES_INDEX", &["day", "index", "pu", "sales"]);
        let tiers: [FixtureCell; 9] = [
            "198_below".into(),
            198.into(),
            328.into(),
            648.into(),
            1_296.into(),
            2_592.into(),
            5_184.into(),
            7_776.into(),
            50_000.into(),
        ];
        for day in 0..days {
            let date = anchor_date() + Duration::days(i64::from(day));
            for (i, tier) in tiers.iter().enumerate() {
                let weight = i32::try_from(9 - i).expect("small");
                sheet.push_row(vec![
                    day_number(date).into(),
                    tier.clone(),
                    (weight * 40 + day).into(),
                    (weight * 4_000).into(),
                ]);
            }
        }
        sheet
    }

    /// `HERO_HOLD`: holders this week and last week per card.
    pub fn hero_hold() -> FixtureSheet {
        let mut sheet = FixtureSheet::new(
            "HERO_HOLD",
            &["card_id", "card_name", "core", "hu_tw", "hu_lw", "rank", "note"],
        );
        for card in 0..8 {
            sheet.push_row(vec![
                (1_000 + card).into(),
                format!("Hero {card}").into(),
                i32::from(card % 2 == 0).into(),
                (5_000 + card * 300).into(),
                (4_800 + card * 290).into(),
                (card + 1).into(),
                FixtureCell::Empty,
            ]);
        }
        sheet
    }

    /// Generic activity sheet: one row per date, zone age and VIP tier.
    pub fn activity(
        name: &str,
        days: i32,
        with_backdiamond: bool,
        with_sales: bool,
    ) -> FixtureSheet {
        let mut headers = vec!["day", "zonetype", "viptype", "freediamond", "paiddiamond"];
        if with_backdiamond {
            headers.push("backdiamond");
        }
        headers.extend(["au", "pu"]);
        if with_sales {
            headers.push("sales");
        }
        let mut sheet = FixtureSheet::new(name, &headers);
        for day in 0..days {
            let date = anchor_date() + Duration::days(i64::from(day) * 7);
            for zone in crate::ZoneAge::ALL {
                for tier in crate::VipTier::ALL {
                    sheet.push_row(activity_row(
                        date,
                        zone.default_sheet_label(),
                        tier,
                        with_backdiamond,
                        with_sales,
                    ));
                }
            }
            sheet.push_row(activity_row(
                date,
                "Potential Internal User",
                crate::VipTier::Whale,
                with_backdiamond,
                with_sales,
            ));
        }
        sheet
    }

    fn activity_row(
        date: NaiveDate,
        zone: &str,
        tier: crate::VipTier,
        with_backdiamond: bool,
        with_sales: bool,
    ) -> Vec<FixtureCell> {
        let weight = i32::try_from(6 - tier.ordinal()).expect("small");
        let mut row: Vec<FixtureCell> = vec![
            day_number(date).into(),
            zone.into(),
            tier.default_sheet_label().into(),
            (weight * 900).into(),
            (weight * 1_100).into(),
        ];
        if with_backdiamond {
            row.push((weight * 30).into());
        }
        row.push((weight * 50).into());
        row.push((weight * 20).into());
        if with_sales {
            row.push((weight * 2_500).into());
        }
        row
    }

    /// `ACT_SOULSTONEBOX`: totals rows plus per-card rows.
    pub fn soulstonebox(days: i32) -> FixtureSheet {
        let base = activity("ACT_SOULSTONEBOX", days, false, false);
        let mut headers: Vec<&str> = vec!["card_id", "card_name"];
        headers.extend(base.headers.iter().map(String::as_str));
        let mut sheet = FixtureSheet::new("ACT_SOULSTONEBOX", &headers);
        for row in &base.rows {
            for (card_id, card_name) in [("total", "All Cards"), ("c1", "Pegasus"), ("c2", "Dragon")] {
                let mut full: Vec<FixtureCell> = vec![card_id.into(), card_name.into()];
                full.extend(row.iter().cloned());
                sheet.push_row(full);
            }
        }
        sheet
    }

    /// `ACT_WISHPOOL`: active, paying users and sales per VIP tier.
    pub fn wishpool(days: i32) -> FixtureSheet {
        let mut sheet = FixtureSheet::new(
            "ACT_WISHPOOL",
            &["day", "zonetype", "viptype", "au", "cu", "sales"],
        );
        for day in 0..days {
            let date = anchor_date() + Duration::days(i64::from(day));
            for tier in crate::VipTier::ALL {
                let weight = i32::try_from(6 - tier.ordinal()).expect("small");
                sheet.push_row(vec![
                    day_number(date).into(),
                    crate::ZoneAge::Months6Plus.default_sheet_label().into(),
                    tier.default_sheet_label().into(),
                    (weight * 100).into(),
                    (weight * 10).into(),
                    (weight * 3_000).into(),
                ]);
            }
        }
        sheet
    }

    /// Every sheet the report reads, with realistic sizes.
    pub fn full_report() -> Vec<FixtureSheet> {
        vec![
            kpi_weekly(20),
            kpi_daily(40),
            kpi_channel(20, 8),
            kpi_user(18),
            cur_spend(100, 14, true),
            cur_stock(70),
            kpi_zone(60),
            sales_index(70),
            hero_hold(),
            activity("ACT_PRIZEWHEEL", 8, true, true),
            activity("ACT_INTERZONE_FORCECARD", 8, false, false),
            soulstonebox(6),
            activity("ACT_THEMEGACHA", 6, true, false),
            wishpool(16),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_multiple_calls() {
        init_test_logging();
        init_test_logging();
    }

    #[test]
    fn test_day_number() {
        assert_eq!(day_number(mock_date(2024, 3, 7)), 20_240_307.0);
    }

    #[test]
    fn test_assert_approx_eq() {
        assert_approx_eq(1.0, 1.0001, 0.001);
    }

    #[test]
    #[should_panic]
    fn test_assert_approx_eq_fails() {
        assert_approx_eq(1.0, 1.1, 0.05);
    }

    #[test]
    fn test_fixture_rows_match_headers() {
        for sheet in report_fixtures::full_report() {
            for row in &sheet.rows {
                assert_eq!(row.len(), sheet.headers.len(), "sheet {}", sheet.name);
            }
        }
    }

    #[test]
    fn test_write_workbook() {
        let dir = create_temp_dir();
        let path = dir.path().join("fixture.xlsx");
        write_workbook(&path, &[report_fixtures::hero_hold()]).unwrap();
        assert!(path.exists());
    }
}
