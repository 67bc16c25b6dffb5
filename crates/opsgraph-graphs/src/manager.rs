//! Report manager running the sections in order and collecting outcomes.

use crate::activities::ActivitiesSection;
use crate::currency::CurrencySection;
use crate::figure::Figure;
use crate::hero::HeroSection;
use crate::kpi::KpiSection;
use crate::loader::SheetLoader;
use crate::renderer::render_figure;
use crate::style::ChartStyle;
use crate::table::Table;
use crate::traits::ReportSection;
use crate::user_base::UserBaseSection;
use opsgraph_common::{Result, SectionId};
use opsgraph_config::{CategoriesConfig, Config};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{error, info, info_span, warn};

/// What happened to one chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartStatus {
    /// Written to disk.
    Written {
        /// Output path.
        path: PathBuf,
    },
    /// Omitted because its input columns or rows are missing.
    Skipped {
        /// Why.
        reason: String,
    },
    /// Drawing or writing failed.
    Failed {
        /// Why.
        reason: String,
    },
}

/// Outcome of one chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartOutcome {
    /// Output file name.
    pub file_name: String,
    /// Status.
    pub status: ChartStatus,
}

/// A sheet that could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadFailure {
    /// Sheet name.
    pub sheet: String,
    /// Failure kind, see `LoadError::kind`.
    pub kind: &'static str,
    /// Rendered error.
    pub message: String,
}

/// Outcome of one section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionOutcome {
    /// Section.
    pub section: SectionId,
    /// Chart outcomes in emission order.
    pub charts: Vec<ChartOutcome>,
    /// Sheets that failed to load.
    pub load_failures: Vec<LoadFailure>,
    /// Error that ended the section early.
    pub error: Option<String>,
    /// Wall-clock time spent.
    pub elapsed: Duration,
}

impl SectionOutcome {
    /// Empty outcome for a section.
    pub const fn new(section: SectionId) -> Self {
        Self {
            section,
            charts: Vec::new(),
            load_failures: Vec::new(),
            error: None,
            elapsed: Duration::ZERO,
        }
    }

    /// Charts written.
    pub fn written(&self) -> usize {
        self.count(|s| matches!(s, ChartStatus::Written { .. }))
    }

    /// Charts skipped.
    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, ChartStatus::Skipped { .. }))
    }

    /// Charts that failed.
    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, ChartStatus::Failed { .. }))
    }

    /// Outcome of a chart by file name.
    pub fn chart(&self, file_name: &str) -> Option<&ChartOutcome> {
        self.charts.iter().find(|c| c.file_name == file_name)
    }

    fn count(&self, pred: impl Fn(&ChartStatus) -> bool) -> usize {
        self.charts.iter().filter(|c| pred(&c.status)).count()
    }
}

/// Outcome of a whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Per-section outcomes in run order.
    pub sections: Vec<SectionOutcome>,
    /// Total wall-clock time.
    pub elapsed: Duration,
}

impl RunSummary {
    /// Outcome of one section.
    pub fn section(&self, id: SectionId) -> Option<&SectionOutcome> {
        self.sections.iter().find(|s| s.section == id)
    }

    /// Charts written across sections.
    pub fn charts_written(&self) -> usize {
        self.sections.iter().map(SectionOutcome::written).sum()
    }

    /// Charts skipped across sections.
    pub fn charts_skipped(&self) -> usize {
        self.sections.iter().map(SectionOutcome::skipped).sum()
    }

    /// Charts failed across sections.
    pub fn charts_failed(&self) -> usize {
        self.sections.iter().map(SectionOutcome::failed).sum()
    }

    /// Load failures across sections.
    pub fn load_failures(&self) -> impl Iterator<Item = &LoadFailure> {
        self.sections.iter().flat_map(|s| &s.load_failures)
    }

    /// Sections that ended early.
    pub fn failed_sections(&self) -> impl Iterator<Item = &SectionOutcome> {
        self.sections.iter().filter(|s| s.error.is_some())
    }
}

/// Read-only state shared by the sections of one run.
pub struct ReportContext<'a> {
    config: &'a Config,
    style: ChartStyle,
    loader: SheetLoader,
}

impl<'a> ReportContext<'a> {
    /// Builds the context from a validated configuration.
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            style: ChartStyle::from_config(&config.style),
            loader: SheetLoader::new(&config.paths.input_file),
        }
    }

    /// Configuration.
    pub const fn config(&self) -> &'a Config {
        self.config
    }

    /// Category labels.
    pub const fn categories(&self) -> &'a CategoriesConfig {
        &self.config.categories
    }

    /// Resolved style.
    pub const fn style(&self) -> &ChartStyle {
        &self.style
    }

    /// Loads a sheet, recording a failure in the outcome instead of returning it.
    pub fn load(
        &self,
        sheet: &str,
        first_columns: Option<usize>,
        outcome: &mut SectionOutcome,
    ) -> Option<Table> {
        match self.loader.load(sheet, first_columns) {
            Ok(table) => Some(table),
            Err(e) => {
                warn!(sheet, kind = e.kind(), error = %e, "Sheet unavailable, skipping its charts");
                outcome.load_failures.push(LoadFailure {
                    sheet: sheet.to_string(),
                    kind: e.kind(),
                    message: e.to_string(),
                });
                None
            }
        }
    }

    /// Builds and renders one chart into the section directory.
    ///
    /// Schema gaps are recorded as skipped, anything else as failed; neither
    /// stops the caller.
    pub fn emit<F>(&self, outcome: &mut SectionOutcome, file_name: &str, build: F)
    where
        F: FnOnce() -> Result<Figure>,
    {
        let path = self
            .config
            .paths
            .output_dir
            .join(outcome.section.dir_name())
            .join(file_name);

        let status = match build().and_then(|figure| render_figure(&figure, &self.style, &path)) {
            Ok(()) => ChartStatus::Written { path },
            Err(e) if e.is_schema_gap() => {
                warn!(chart = file_name, error = %e, "Chart skipped");
                ChartStatus::Skipped {
                    reason: e.to_string(),
                }
            }
            Err(e) => {
                error!(chart = file_name, error = %e, "Chart failed");
                ChartStatus::Failed {
                    reason: e.to_string(),
                }
            }
        };
        outcome.charts.push(ChartOutcome {
            file_name: file_name.to_string(),
            status,
        });
    }
}

/// Runs report sections in a fixed order.
pub struct ReportManager {
    sections: Vec<Box<dyn ReportSection>>,
}

impl ReportManager {
    /// Manager with the five standard sections.
    pub fn new() -> Self {
        Self::with_sections(vec![
            Box::new(KpiSection),
            Box::new(CurrencySection),
            Box::new(UserBaseSection),
            Box::new(HeroSection),
            Box::new(ActivitiesSection),
        ])
    }

    /// Manager with custom sections.
    pub fn with_sections(sections: Vec<Box<dyn ReportSection>>) -> Self {
        Self { sections }
    }

    /// Section ids in run order.
    pub fn section_ids(&self) -> Vec<SectionId> {
        self.sections.iter().map(|s| s.id()).collect()
    }

    /// Runs every section; failures stay inside their section.
    pub fn run(&self, config: &Config) -> RunSummary {
        let started = Instant::now();
        info!(
            input = %config.paths.input_file.display(),
            output = %config.paths.output_dir.display(),
            sections = self.sections.len(),
            "Starting weekly report"
        );

        let ctx = ReportContext::new(config);
        let mut outcomes = Vec::with_capacity(self.sections.len());
        for section in &self.sections {
            let span = info_span!("section", name = section.id().dir_name());
            let _enter = span.enter();
            info!(description = section.description(), "Generating {} report", section.name());

            let section_started = Instant::now();
            let mut outcome = SectionOutcome::new(section.id());
            if let Err(e) = section.generate(&ctx, &mut outcome) {
                error!(error = %e, "Section ended early");
                outcome.error = Some(e.to_string());
            }
            outcome.elapsed = section_started.elapsed();

            info!(
                written = outcome.written(),
                skipped = outcome.skipped(),
                failed = outcome.failed(),
                load_failures = outcome.load_failures.len(),
                elapsed_ms = outcome.elapsed.as_millis(),
                "Finished {} report",
                section.name()
            );
            outcomes.push(outcome);
        }

        let summary = RunSummary {
            sections: outcomes,
            elapsed: started.elapsed(),
        };
        info!(
            written = summary.charts_written(),
            skipped = summary.charts_skipped(),
            failed = summary.charts_failed(),
            "All reports generated in {:.2}s",
            summary.elapsed.as_secs_f64()
        );
        summary
    }
}

impl Default for ReportManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::figure::{ChartPanel, Series};
    use opsgraph_common::{OpsGraphError, VipTier};

    struct Failing;

    impl ReportSection for Failing {
        fn id(&self) -> SectionId {
            SectionId::Hero
        }

        fn description(&self) -> &'static str {
            "always fails"
        }

        fn generate(&self, ctx: &ReportContext<'_>, outcome: &mut SectionOutcome) -> Result<()> {
            ctx.emit(outcome, "gap.jpg", || Err(OpsGraphError::missing_column("backdiamond")));
            ctx.emit(outcome, "broken.jpg", || Err(OpsGraphError::render("disk full")));
            Err(OpsGraphError::new("boom"))
        }
    }

    struct Quiet;

    impl ReportSection for Quiet {
        fn id(&self) -> SectionId {
            SectionId::Currency
        }

        fn description(&self) -> &'static str {
            "loads a missing sheet"
        }

        fn generate(&self, ctx: &ReportContext<'_>, outcome: &mut SectionOutcome) -> Result<()> {
            assert!(ctx.load("CUR_SPEND", None, outcome).is_none());
            assert_eq!(ctx.categories().vip_label(VipTier::Whale), "Whale");
            Ok(())
        }
    }

    fn config_in(dir: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.paths.input_file = dir.join("missing.xlsx");
        config.paths.output_dir = dir.join("reports");
        config
    }

    #[test]
    fn test_section_failure_does_not_stop_run() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let manager = ReportManager::with_sections(vec![Box::new(Failing), Box::new(Quiet)]);
        let summary = manager.run(&config);

        assert_eq!(summary.sections.len(), 2);
        let failing = summary.section(SectionId::Hero).unwrap();
        assert_eq!(failing.error.as_deref(), Some("boom"));
        assert_eq!(failing.skipped(), 1);
        assert_eq!(failing.failed(), 1);

        let quiet = summary.section(SectionId::Currency).unwrap();
        assert!(quiet.error.is_none());
        assert_eq!(quiet.load_failures[0].kind, "file_missing");
        assert_eq!(summary.load_failures().count(), 1);
        assert_eq!(summary.failed_sections().count(), 1);
    }

    #[test]
    fn test_emit_records_schema_gap_from_empty_figure() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let ctx = ReportContext::new(&config);
        let mut outcome = SectionOutcome::new(SectionId::Kpi);
        ctx.emit(&mut outcome, "empty.jpg", || {
            Ok(Figure::single(
                "Empty",
                ChartPanel::new(Vec::new()).line(Series::new("x", Vec::new())),
            ))
        });
        assert_eq!(outcome.skipped(), 1);
        assert!(outcome.chart("empty.jpg").is_some());
    }

    #[test]
    fn test_default_manager_order() {
        assert_eq!(ReportManager::new().section_ids(), SectionId::ALL.to_vec());
    }
}
