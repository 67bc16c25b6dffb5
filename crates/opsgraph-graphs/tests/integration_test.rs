//! Integration tests for opsgraph-graphs crate.
//!
//! These tests write fixture workbooks to disk and run sections or the
//! whole report against them.

use opsgraph_common::test_utils::report_fixtures::{self, cur_spend, kpi_channel};
use opsgraph_common::test_utils::{create_temp_dir, init_test_logging, write_workbook, FixtureSheet};
use opsgraph_common::SectionId;
use opsgraph_config::Config;
use opsgraph_graphs::kpi::{channel_sources, CHANNEL_SHEET};
use opsgraph_graphs::{ChartStatus, Panel, ReportManager, SheetLoader};
use std::path::Path;

fn config_for(workbook: &Path, dir: &Path) -> Config {
    let mut config = Config::default();
    config.paths.input_file = workbook.to_path_buf();
    config.paths.output_dir = dir.join("reports");
    config
}

fn workbook_with(dir: &Path, sheets: &[FixtureSheet]) -> std::path::PathBuf {
    let path = dir.join("weekly.xlsx");
    write_workbook(&path, sheets).unwrap();
    path
}

#[test]
fn test_full_report_produces_summary() {
    init_test_logging();
    let dir = create_temp_dir();
    let workbook = workbook_with(dir.path(), &report_fixtures::full_report());
    let summary = ReportManager::new().run(&config_for(&workbook, dir.path()));

    assert_eq!(summary.sections.len(), 5);
    assert_eq!(summary.load_failures().count(), 0);
    assert_eq!(summary.failed_sections().count(), 0);

    let activities = summary.section(SectionId::Activities).unwrap();
    for file in [
        "activity_prizewheel_overview.jpg",
        "activity_prizewheel_cohort_sales.jpg",
        "activity_prizewheel_cohort_pr.jpg",
        "activity_prizewheel_cohort_avgdiamond.jpg",
        "activity_forcecard_overview.jpg",
        "activity_soulstonebox_card_analysis.jpg",
        "activity_themegacha_cohort_avgdiamond.jpg",
        "activity_wishpool_revenue_overview.jpg",
        "activity_wishpool_heatmap.jpg",
    ] {
        let chart = activities.chart(file).unwrap_or_else(|| panic!("{file} not emitted"));
        assert!(
            !matches!(chart.status, ChartStatus::Skipped { .. }),
            "{file} skipped: {:?}",
            chart.status
        );
    }
    assert!(activities.chart("activity_forcecard_cohort_sales.jpg").is_none());

    for id in SectionId::ALL {
        assert!(!summary.section(id).unwrap().charts.is_empty(), "{id:?} emitted nothing");
    }
}

#[test]
fn test_missing_sheet_skips_only_its_charts() {
    init_test_logging();
    let dir = create_temp_dir();
    let sheets: Vec<FixtureSheet> = report_fixtures::full_report()
        .into_iter()
        .filter(|s| s.name != "ACT_WISHPOOL" && s.name != "HERO_HOLD")
        .collect();
    let workbook = workbook_with(dir.path(), &sheets);
    let summary = ReportManager::new().run(&config_for(&workbook, dir.path()));

    let hero = summary.section(SectionId::Hero).unwrap();
    assert!(hero.charts.is_empty());
    assert_eq!(hero.load_failures[0].sheet, "HERO_HOLD");
    assert_eq!(hero.load_failures[0].kind, "sheet_missing");

    let activities = summary.section(SectionId::Activities).unwrap();
    assert_eq!(activities.load_failures.len(), 1);
    assert_eq!(activities.load_failures[0].sheet, "ACT_WISHPOOL");
    assert!(activities.chart("activity_prizewheel_overview.jpg").is_some());
    assert!(activities.chart("activity_wishpool_heatmap.jpg").is_none());
    assert!(summary.failed_sections().next().is_none());
}

#[test]
fn test_missing_workbook_is_reported_per_sheet() {
    init_test_logging();
    let dir = create_temp_dir();
    let summary = ReportManager::new().run(&config_for(&dir.path().join("absent.xlsx"), dir.path()));

    assert_eq!(summary.charts_written(), 0);
    assert!(summary.load_failures().count() >= 5);
    assert!(summary.load_failures().all(|f| f.kind == "file_missing"));
    assert!(summary.sections.iter().all(|s| s.charts.is_empty()));
}

#[test]
fn test_currency_without_backdiamond_still_charts() {
    init_test_logging();
    let dir = create_temp_dir();
    let workbook = workbook_with(dir.path(), &[cur_spend(100, 14, false)]);
    let summary = ReportManager::new().run(&config_for(&workbook, dir.path()));

    let currency = summary.section(SectionId::Currency).unwrap();
    let spend = currency.chart("currency_spend.jpg").unwrap();
    assert!(!matches!(spend.status, ChartStatus::Skipped { .. }));
    assert_eq!(currency.load_failures[0].sheet, "CUR_STOCK");
}

#[test]
fn test_channel_long_tail_is_summed_into_others() {
    let dir = create_temp_dir();
    let workbook = workbook_with(dir.path(), &[kpi_channel(20, 8)]);
    let table = SheetLoader::new(&workbook).load(CHANNEL_SHEET, None).unwrap();
    let figure = channel_sources(&table).unwrap();

    let Panel::Chart(wau) = &figure.panels[0] else {
        panic!("expected a chart panel");
    };
    assert_eq!(wau.x_labels.len(), 6);
    assert_eq!(wau.bars.len(), 10);
    let others = wau.bars.iter().find(|s| s.label == "others").unwrap();
    let expected: f64 = (1..=11u32).map(|w| f64::from(w * 100)).sum();
    assert!(others.values.iter().all(|&v| (v - expected).abs() < 1e-9));
    assert!(wau.bars.iter().all(|s| s.label != "ch09"));
}
