//! Run orchestration: output preparation, the section run and the summary log.

use crate::error::{ReportError, ReportResult};
use opsgraph_config::{Config, ConfigLoader};
use opsgraph_graphs::{ChartStatus, ReportManager, RunSummary};
use tracing::{info, warn};

/// One configured weekly report.
pub struct WeeklyReport {
    config: Config,
    manager: ReportManager,
}

impl WeeklyReport {
    /// Creates a report with the standard sections.
    pub fn new(config: Config) -> Self {
        Self::with_manager(config, ReportManager::new())
    }

    /// Creates a report with a custom manager.
    pub const fn with_manager(config: Config, manager: ReportManager) -> Self {
        Self { config, manager }
    }

    /// Loads the configuration from the environment and well-known files.
    pub fn from_env() -> ReportResult<Self> {
        Ok(Self::new(ConfigLoader::load()?))
    }

    /// Configuration in use.
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Creates the output root and one directory per section.
    pub fn prepare_output(&self) -> ReportResult<()> {
        let root = &self.config.paths.output_dir;
        for id in self.manager.section_ids() {
            let path = root.join(id.dir_name());
            std::fs::create_dir_all(&path).map_err(|source| ReportError::OutputDir { path, source })?;
        }
        if !self.config.paths.input_file.exists() {
            warn!(
                input = %self.config.paths.input_file.display(),
                "Input workbook not found, every sheet will be reported missing"
            );
        }
        Ok(())
    }

    /// Prepares the output directories and runs every section.
    pub fn run(&self) -> ReportResult<RunSummary> {
        self.prepare_output()?;
        Ok(self.manager.run(&self.config))
    }
}

/// Logs what was skipped or failed and the final counts.
pub fn log_summary(summary: &RunSummary) {
    for section in &summary.sections {
        let name = section.section.dir_name();
        for failure in &section.load_failures {
            warn!(section = name, sheet = %failure.sheet, kind = failure.kind, "Sheet not loaded");
        }
        for chart in &section.charts {
            match &chart.status {
                ChartStatus::Written { .. } => {}
                ChartStatus::Skipped { reason } => {
                    warn!(section = name, chart = %chart.file_name, reason = %reason, "Chart skipped");
                }
                ChartStatus::Failed { reason } => {
                    warn!(section = name, chart = %chart.file_name, reason = %reason, "Chart failed");
                }
            }
        }
        if let Some(error) = &section.error {
            warn!(section = name, error = %error, "Section ended early");
        }
    }

    info!(
        written = summary.charts_written(),
        skipped = summary.charts_skipped(),
        failed = summary.charts_failed(),
        load_failures = summary.load_failures().count(),
        "Report finished in {:.2}s",
        summary.elapsed.as_secs_f64()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use opsgraph_common::SectionId;

    fn config_in(dir: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.paths.input_file = dir.join("missing.xlsx");
        config.paths.output_dir = dir.join("out");
        config
    }

    #[test]
    fn test_prepare_output_creates_section_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let report = WeeklyReport::new(config_in(dir.path()));
        report.prepare_output().unwrap();
        for id in SectionId::ALL {
            assert!(dir.path().join("out").join(id.dir_name()).is_dir());
        }
    }

    #[test]
    fn test_output_dir_blocked_by_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        std::fs::write(&config.paths.output_dir, b"not a directory").unwrap();
        let err = WeeklyReport::new(config).prepare_output().unwrap_err();
        assert!(matches!(err, ReportError::OutputDir { .. }));
    }

    #[test]
    fn test_run_without_workbook_still_summarizes() {
        let dir = tempfile::tempdir().unwrap();
        let summary = WeeklyReport::new(config_in(dir.path())).run().unwrap();
        assert_eq!(summary.sections.len(), 5);
        assert_eq!(summary.charts_written(), 0);
        log_summary(&summary);
    }

    #[test]
    fn test_from_env_reads_config_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weekly.yaml");
        std::fs::write(&path, "paths:\n  output_dir: weekly-charts\n").unwrap();

        std::env::set_var(opsgraph_config::CONFIG_PATH_ENV, &path);
        let report = WeeklyReport::from_env();
        std::env::remove_var(opsgraph_config::CONFIG_PATH_ENV);

        let report = report.unwrap();
        assert_eq!(report.config().paths.output_dir, std::path::PathBuf::from("weekly-charts"));
    }
}
