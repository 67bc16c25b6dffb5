//! Report section trait.

use crate::manager::{ReportContext, SectionOutcome};
use opsgraph_common::{Result, SectionId};

/// One independent part of the weekly report.
///
/// A section loads its own sheets through the context and emits each chart
/// through [`ReportContext::emit`], which records per-chart outcomes. An
/// `Err` return ends only this section.
pub trait ReportSection {
    /// Which section this is.
    fn id(&self) -> SectionId;

    /// Display name, defaults to the section title.
    fn name(&self) -> &'static str {
        self.id().title()
    }

    /// Short description of what the section charts.
    fn description(&self) -> &'static str;

    /// Loads, transforms and renders every chart of the section.
    fn generate(&self, ctx: &ReportContext<'_>, outcome: &mut SectionOutcome) -> Result<()>;
}
