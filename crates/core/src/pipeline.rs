use crate::domain::catalog::MetricCatalog;
use crate::domain::contract::ReportPayload;
use crate::domain::error::ReportDataError;
use crate::domain::report::FinancialReport;
use crate::insights;
use crate::metrics::derive::{derive, DerivedMetrics};
use crate::view::{assemble, ComparisonView};

#[derive(Debug, Clone, Copy, Default)]
pub struct AnalysisOptions {
    /// Screen observations and a verdict when the payload carries none.
    pub include_insights: bool,
}

/// Everything one analysis produced. `report` is the one the view was assembled from, so it
/// carries screened insights when they were requested.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub report: FinancialReport,
    pub derived: DerivedMetrics,
    pub view: ComparisonView,
}

pub fn analyze(catalog: &MetricCatalog, report: FinancialReport, opts: AnalysisOptions) -> Analysis {
    let derived = derive(catalog, &report.periods, Some(&report.growth));
    let report = if opts.include_insights {
        insights::with_screened_insights(&report, &derived)
    } else {
        report
    };
    let view = assemble(catalog, &report, &derived);
    Analysis {
        report,
        derived,
        view,
    }
}

pub fn analyze_report(
    catalog: &MetricCatalog,
    report: &FinancialReport,
    opts: AnalysisOptions,
) -> ComparisonView {
    analyze(catalog, report.clone(), opts).view
}

/// Validate, derive and assemble in one step.
pub fn analyze_payload(
    catalog: &MetricCatalog,
    payload: &ReportPayload,
    opts: AnalysisOptions,
) -> Result<ComparisonView, ReportDataError> {
    let report = payload.validate(catalog)?;
    tracing::debug!(
        periods = report.periods.len(),
        growth_figures = report.growth.len(),
        warnings = report.warnings.len(),
        "report payload validated"
    );
    Ok(analyze(catalog, report, opts).view)
}
