use crate::domain::catalog::{
    ClassificationPolicy, Horizon, MetricCatalog, MetricDefinition, MetricKind,
};
use crate::domain::report::{CorporateActionCategory, FinancialReport, VerdictTone};
use crate::metrics::derive::{index_periods, DerivedMetrics};
use crate::view::format;
use crate::view::{
    Badges, Cell, Classification, ComparisonRow, ComparisonView, CorporateActionEntry,
    Direction, GrowthHighlight, RecommendationView,
};

/// Percent-typed values above this are highlighted as favorable.
pub const PERCENT_FAVORABLE_THRESHOLD: f64 = 20.0;

pub const NOT_MENTIONED: &str = "Not mentioned";
pub const NO_OBSERVATIONS: &str = "No critical observations found.";
pub const UNKNOWN_VERDICT: &str = "Unknown / Incomplete";
pub const UNKNOWN_BADGE: &str = "Unknown";

const GROWTH_HIGHLIGHTS: [(&str, &str, Horizon); 4] = [
    ("Revenue QoQ", "revenue", Horizon::Qoq),
    ("Net Profit QoQ", "net_profit", Horizon::Qoq),
    ("Revenue YoY", "revenue", Horizon::Yoy),
    ("Net Profit YoY", "net_profit", Horizon::Yoy),
];

pub fn classify_change(policy: ClassificationPolicy, change: f64) -> Classification {
    let favorable = match policy {
        ClassificationPolicy::HigherIsBetter => change >= 0.0,
        ClassificationPolicy::LowerIsBetter => change <= 0.0,
    };
    if favorable {
        Classification::Favorable
    } else {
        Classification::Unfavorable
    }
}

fn growth_cell(def: &MetricDefinition, change: Option<f64>) -> Cell {
    match change {
        Some(v) => Cell::new(format::signed_percent(v), classify_change(def.policy, v)),
        None => Cell::placeholder(),
    }
}

/// Renders one period value. Missing values display as zero but stay neutral.
pub fn value_cell(def: &MetricDefinition, value: Option<f64>) -> Cell {
    let shown = value.unwrap_or(0.0);
    match def.kind {
        MetricKind::Percent => {
            let tag = match value {
                Some(v) if v < 0.0 => Classification::Unfavorable,
                Some(v) if v > PERCENT_FAVORABLE_THRESHOLD => Classification::Favorable,
                _ => Classification::Neutral,
            };
            Cell::new(format::percent(shown), tag)
        }
        MetricKind::Amount => match value {
            Some(v) if v < 0.0 && def.parenthesize_losses => {
                Cell::new(format::parenthesized_amount(v), Classification::Unfavorable)
            }
            _ => Cell::new(format::grouped_amount(shown), Classification::Neutral),
        },
    }
}

fn growth_highlights(catalog: &MetricCatalog, derived: &DerivedMetrics) -> Vec<GrowthHighlight> {
    GROWTH_HIGHLIGHTS
        .iter()
        .filter_map(|(label, key, horizon)| {
            let def = catalog.get(key)?;
            let change = derived.value(key, *horizon);
            let highlight = match change {
                Some(v) => GrowthHighlight {
                    label: label.to_string(),
                    direction: Some(if v >= 0.0 {
                        Direction::Up
                    } else {
                        Direction::Down
                    }),
                    cell: Cell::new(format::abs_percent(v), classify_change(def.policy, v)),
                },
                None => GrowthHighlight {
                    label: label.to_string(),
                    direction: None,
                    cell: Cell::placeholder(),
                },
            };
            Some(highlight)
        })
        .collect()
}

fn badges(report: &FinancialReport) -> Badges {
    let period = match (report.identity.quarter, report.identity.year) {
        (Some(q), Some(y)) => Some(format!("{q} {y}")),
        (Some(q), None) => Some(q.to_string()),
        (None, Some(y)) => Some(y.to_string()),
        (None, None) => None,
    };
    Badges {
        result_type: report
            .result_type
            .clone()
            .unwrap_or_else(|| UNKNOWN_BADGE.to_string()),
        processing_method: report
            .processing_method
            .clone()
            .unwrap_or_else(|| UNKNOWN_BADGE.to_string()),
        company: report.identity.company_key().map(str::to_string),
        period,
    }
}

fn corporate_actions(report: &FinancialReport) -> Vec<CorporateActionEntry> {
    CorporateActionCategory::ALL
        .into_iter()
        .map(|category| {
            let text = report
                .corporate_actions
                .as_ref()
                .and_then(|a| a.get(category))
                .map(str::trim)
                .filter(|s| !s.is_empty());
            CorporateActionEntry {
                category,
                label: category.label().to_string(),
                mentioned: text.is_some(),
                text: text.unwrap_or(NOT_MENTIONED).to_string(),
            }
        })
        .collect()
}

fn observations(report: &FinancialReport) -> Vec<String> {
    match &report.observations {
        Some(items) if !items.is_empty() => items.clone(),
        _ => vec![NO_OBSERVATIONS.to_string()],
    }
}

fn recommendation(report: &FinancialReport) -> RecommendationView {
    match &report.recommendation {
        Some(r) => RecommendationView {
            verdict: r.verdict.clone(),
            tone: r.tone,
            reasons: r.reasons.clone(),
        },
        None => RecommendationView {
            verdict: UNKNOWN_VERDICT.to_string(),
            tone: VerdictTone::Neutral,
            reasons: Vec::new(),
        },
    }
}

/// Builds the comparison view: one row per catalog metric, one value column per present period.
pub fn assemble(
    catalog: &MetricCatalog,
    report: &FinancialReport,
    derived: &DerivedMetrics,
) -> ComparisonView {
    // Duplicates were already reported by `derive`.
    let (index, _) = index_periods(&report.periods);
    let columns: Vec<_> = index.keys().copied().collect();

    let rows = catalog
        .iter()
        .map(|def| {
            let growth = derived.get(&def.key);
            let values = index
                .values()
                .map(|snapshot| value_cell(def, snapshot.value(&def.key)))
                .collect();
            ComparisonRow {
                key: def.key.clone(),
                label: def.label.clone(),
                qoq: growth_cell(def, growth.and_then(|g| g.qoq.value)),
                yoy: growth_cell(def, growth.and_then(|g| g.yoy.value)),
                values,
            }
        })
        .collect();

    let warnings = report
        .warnings
        .iter()
        .chain(derived.warnings.iter())
        .map(ToString::to_string)
        .collect();

    ComparisonView {
        badges: badges(report),
        columns,
        rows,
        growth_highlights: growth_highlights(catalog, derived),
        corporate_actions: corporate_actions(report),
        observations: observations(report),
        recommendation: recommendation(report),
        warnings,
    }
}
