use crate::domain::catalog::{Horizon, MetricCatalog, PeriodLabel};
use crate::domain::report::{DataQualityWarning, GrowthFigures, PeriodSnapshot};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthSource {
    Supplied,
    Computed,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DerivedGrowth {
    pub value: Option<f64>,
    pub source: GrowthSource,
}

impl DerivedGrowth {
    pub const UNKNOWN: DerivedGrowth = DerivedGrowth {
        value: None,
        source: GrowthSource::Unknown,
    };
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedMetric {
    pub key: String,
    pub qoq: DerivedGrowth,
    pub yoy: DerivedGrowth,
}

impl DerivedMetric {
    pub fn horizon(&self, horizon: Horizon) -> DerivedGrowth {
        match horizon {
            Horizon::Qoq => self.qoq,
            Horizon::Yoy => self.yoy,
        }
    }
}

/// One entry per catalog metric, in catalog order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedMetrics {
    pub metrics: Vec<DerivedMetric>,
    pub warnings: Vec<DataQualityWarning>,
}

impl DerivedMetrics {
    pub fn get(&self, key: &str) -> Option<&DerivedMetric> {
        self.metrics.iter().find(|m| m.key == key)
    }

    pub fn value(&self, key: &str, horizon: Horizon) -> Option<f64> {
        self.get(key).and_then(|m| m.horizon(horizon).value)
    }
}

/// Maps each period label to its first snapshot in input order. Later snapshots with the same
/// label are reported as duplicates.
pub fn index_periods(
    periods: &[PeriodSnapshot],
) -> (BTreeMap<PeriodLabel, &PeriodSnapshot>, Vec<DataQualityWarning>) {
    let mut index = BTreeMap::new();
    let mut warnings = Vec::new();
    for snapshot in periods {
        if index.contains_key(&snapshot.period) {
            warnings.push(DataQualityWarning::DuplicatePeriod {
                period: snapshot.period,
            });
            continue;
        }
        index.insert(snapshot.period, snapshot);
    }
    (index, warnings)
}

/// `(current - comparison) / |comparison| * 100`, or `None` when the comparison is zero.
pub fn percent_change(current: f64, comparison: f64) -> Option<f64> {
    if comparison == 0.0 {
        return None;
    }
    let change = (current - comparison) / comparison.abs() * 100.0;
    change.is_finite().then_some(change)
}

/// Computes QoQ and YoY growth for every catalog metric. Supplied figures are used verbatim;
/// the rest are computed from the Current / Prev Qtr / YoY Qtr snapshots when possible.
pub fn derive(
    catalog: &MetricCatalog,
    periods: &[PeriodSnapshot],
    growth: Option<&GrowthFigures>,
) -> DerivedMetrics {
    let (index, warnings) = index_periods(periods);
    for w in &warnings {
        tracing::warn!(warning = %w, "period data quality");
    }
    let current = index.get(&PeriodLabel::Current).copied();

    let resolve = |key: &str, horizon: Horizon| -> DerivedGrowth {
        if let Some(v) = growth.and_then(|g| g.get(key, horizon)) {
            return DerivedGrowth {
                value: Some(v),
                source: GrowthSource::Supplied,
            };
        }

        let comparison = index.get(&horizon.comparison_period()).copied();
        let computed = match (current, comparison) {
            (Some(c), Some(p)) => match (c.value(key), p.value(key)) {
                (Some(cv), Some(pv)) => percent_change(cv, pv),
                _ => None,
            },
            _ => None,
        };

        match computed {
            Some(v) => DerivedGrowth {
                value: Some(v),
                source: GrowthSource::Computed,
            },
            None => DerivedGrowth::UNKNOWN,
        }
    };

    let metrics = catalog
        .iter()
        .map(|def| DerivedMetric {
            key: def.key.clone(),
            qoq: resolve(&def.key, Horizon::Qoq),
            yoy: resolve(&def.key, Horizon::Yoy),
        })
        .collect();

    DerivedMetrics { metrics, warnings }
}
