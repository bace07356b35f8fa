use crate::domain::error::ReportDataError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Period columns in the order they are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PeriodLabel {
    #[serde(rename = "Current")]
    Current,
    #[serde(rename = "Prev Qtr")]
    PrevQtr,
    #[serde(rename = "YoY Qtr")]
    YoyQtr,
    #[serde(rename = "Year Ended")]
    YearEnded,
}

impl PeriodLabel {
    pub const ALL: [PeriodLabel; 4] = [
        PeriodLabel::Current,
        PeriodLabel::PrevQtr,
        PeriodLabel::YoyQtr,
        PeriodLabel::YearEnded,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PeriodLabel::Current => "Current",
            PeriodLabel::PrevQtr => "Prev Qtr",
            PeriodLabel::YoyQtr => "YoY Qtr",
            PeriodLabel::YearEnded => "Year Ended",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL.into_iter().find(|p| p.as_str() == s)
    }
}

impl fmt::Display for PeriodLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comparison horizon for a growth figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Horizon {
    Qoq,
    Yoy,
}

impl Horizon {
    pub fn suffix(self) -> &'static str {
        match self {
            Horizon::Qoq => "_qoq",
            Horizon::Yoy => "_yoy",
        }
    }

    /// The snapshot compared against "Current".
    pub fn comparison_period(self) -> PeriodLabel {
        match self {
            Horizon::Qoq => PeriodLabel::PrevQtr,
            Horizon::Yoy => PeriodLabel::YoyQtr,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Amount,
    Percent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationPolicy {
    HigherIsBetter,
    LowerIsBetter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDefinition {
    pub key: String,
    pub label: String,
    pub kind: MetricKind,
    pub policy: ClassificationPolicy,
    /// Negative values render as `(1,234)` and are always unfavorable.
    pub parenthesize_losses: bool,
}

impl MetricDefinition {
    fn amount(key: &str, label: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            kind: MetricKind::Amount,
            policy: ClassificationPolicy::HigherIsBetter,
            parenthesize_losses: false,
        }
    }

    fn lower_is_better(mut self) -> Self {
        self.policy = ClassificationPolicy::LowerIsBetter;
        self
    }

    fn profit(mut self) -> Self {
        self.parenthesize_losses = true;
        self
    }

    fn percent(mut self) -> Self {
        self.kind = MetricKind::Percent;
        self
    }
}

/// Ordered, immutable table of tracked metrics. Passed explicitly to derivation and assembly.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricCatalog {
    metrics: Vec<MetricDefinition>,
}

impl MetricCatalog {
    pub fn standard() -> Self {
        Self {
            metrics: vec![
                MetricDefinition::amount("revenue", "Revenue from Operations"),
                MetricDefinition::amount("other_income", "Other Income"),
                MetricDefinition::amount("total_expenses", "Total Expenses").lower_is_better(),
                MetricDefinition::amount("operating_profit", "Operating Profit (EBIT)").profit(),
                MetricDefinition::amount("opm", "OPM %").percent(),
                MetricDefinition::amount("pbt", "Profit Before Tax"),
                MetricDefinition::amount("net_profit", "Net Profit").profit(),
                MetricDefinition::amount("eps", "EPS (Rs)"),
            ],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetricDefinition> {
        self.metrics.iter()
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&MetricDefinition> {
        self.metrics.iter().find(|m| m.key == key)
    }

    pub fn require(&self, key: &str) -> Result<&MetricDefinition, ReportDataError> {
        self.get(key)
            .ok_or_else(|| ReportDataError::UnknownMetric(key.to_string()))
    }

    /// Returns a copy of the catalog with `key` classified under `policy`.
    pub fn with_policy(
        &self,
        key: &str,
        policy: ClassificationPolicy,
    ) -> Result<Self, ReportDataError> {
        self.require(key)?;
        let mut out = self.clone();
        for m in &mut out.metrics {
            if m.key == key {
                m.policy = policy;
            }
        }
        Ok(out)
    }

    /// Splits a growth key such as `net_profit_yoy` into its catalog metric and horizon.
    pub fn parse_growth_key(&self, growth_key: &str) -> Result<(&MetricDefinition, Horizon), ReportDataError> {
        for horizon in [Horizon::Qoq, Horizon::Yoy] {
            if let Some(metric_key) = growth_key.strip_suffix(horizon.suffix()) {
                if let Some(def) = self.get(metric_key) {
                    return Ok((def, horizon));
                }
            }
        }
        Err(ReportDataError::UnknownGrowthKey(growth_key.to_string()))
    }
}

impl Default for MetricCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
