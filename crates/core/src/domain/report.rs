use crate::domain::catalog::{Horizon, PeriodLabel};
use crate::time::fiscal_quarter::Quarter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSnapshot {
    pub period: PeriodLabel,
    /// Metric key -> value. A key that is not present is missing, not zero.
    pub values: BTreeMap<String, f64>,
}

impl PeriodSnapshot {
    pub fn new(period: PeriodLabel) -> Self {
        Self {
            period,
            values: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: f64) -> Self {
        self.values.insert(key.to_string(), value);
        self
    }

    pub fn value(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }
}

/// Externally supplied growth percentages, keyed by (metric, horizon).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GrowthFigures {
    figures: BTreeMap<(String, Horizon), f64>,
}

impl GrowthFigures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, metric_key: &str, horizon: Horizon, value: f64) {
        self.figures.insert((metric_key.to_string(), horizon), value);
    }

    pub fn with(mut self, metric_key: &str, horizon: Horizon, value: f64) -> Self {
        self.insert(metric_key, horizon, value);
        self
    }

    pub fn get(&self, metric_key: &str, horizon: Horizon) -> Option<f64> {
        self.figures.get(&(metric_key.to_string(), horizon)).copied()
    }

    pub fn len(&self) -> usize {
        self.figures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.figures.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorporateActionCategory {
    Dividend,
    Capex,
    ManagementChange,
    NewProjects,
    SpecialAnnouncement,
}

impl CorporateActionCategory {
    pub const ALL: [CorporateActionCategory; 5] = [
        CorporateActionCategory::Dividend,
        CorporateActionCategory::Capex,
        CorporateActionCategory::ManagementChange,
        CorporateActionCategory::NewProjects,
        CorporateActionCategory::SpecialAnnouncement,
    ];

    pub fn key(self) -> &'static str {
        match self {
            CorporateActionCategory::Dividend => "dividend",
            CorporateActionCategory::Capex => "capex",
            CorporateActionCategory::ManagementChange => "management_change",
            CorporateActionCategory::NewProjects => "new_projects",
            CorporateActionCategory::SpecialAnnouncement => "special_announcement",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CorporateActionCategory::Dividend => "Dividend",
            CorporateActionCategory::Capex => "Capex",
            CorporateActionCategory::ManagementChange => "Management Change",
            CorporateActionCategory::NewProjects => "New Projects",
            CorporateActionCategory::SpecialAnnouncement => "Special Announcement",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.key() == key)
    }
}

/// Free-text corporate actions, one optional entry per category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorporateActions {
    pub entries: BTreeMap<String, String>,
}

impl CorporateActions {
    pub fn get(&self, category: CorporateActionCategory) -> Option<&str> {
        self.entries.get(category.key()).map(String::as_str)
    }

    pub fn set(&mut self, category: CorporateActionCategory, text: String) {
        self.entries.insert(category.key().to_string(), text);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerdictTone {
    Positive,
    Neutral,
    Negative,
}

impl VerdictTone {
    /// Accepts both the tone names and the legacy color codes (green/orange/red).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" | "green" => Some(VerdictTone::Positive),
            "neutral" | "orange" | "amber" | "yellow" => Some(VerdictTone::Neutral),
            "negative" | "red" => Some(VerdictTone::Negative),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationVerdict {
    pub verdict: String,
    pub tone: VerdictTone,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportIdentity {
    pub company_id: Option<String>,
    pub company_code: Option<String>,
    pub quarter: Option<Quarter>,
    pub year: Option<i32>,
}

impl ReportIdentity {
    /// Stable company key for storage: exchange code preferred, else the scrip id.
    pub fn company_key(&self) -> Option<&str> {
        self.company_code
            .as_deref()
            .or(self.company_id.as_deref())
    }
}

/// Non-fatal data problems found while reading a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataQualityWarning {
    DuplicatePeriod { period: PeriodLabel },
    UnknownPeriod { label: String },
    IgnoredField { field: String, reason: String },
}

impl fmt::Display for DataQualityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataQualityWarning::DuplicatePeriod { period } => {
                write!(f, "duplicate period {period:?}; using the first snapshot")
            }
            DataQualityWarning::UnknownPeriod { label } => {
                write!(f, "unknown period label {label:?}; snapshot skipped")
            }
            DataQualityWarning::IgnoredField { field, reason } => {
                write!(f, "ignored field {field}: {reason}")
            }
        }
    }
}

/// A validated report. Produced only by `ReportPayload::validate`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinancialReport {
    pub result_type: Option<String>,
    pub processing_method: Option<String>,
    pub identity: ReportIdentity,
    pub periods: Vec<PeriodSnapshot>,
    pub growth: GrowthFigures,
    pub corporate_actions: Option<CorporateActions>,
    pub observations: Option<Vec<String>>,
    pub recommendation: Option<RecommendationVerdict>,
    pub warnings: Vec<DataQualityWarning>,
}

impl FinancialReport {
    /// First snapshot carrying `period`, in input order.
    pub fn snapshot(&self, period: PeriodLabel) -> Option<&PeriodSnapshot> {
        self.periods.iter().find(|s| s.period == period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_tone_accepts_legacy_colors() {
        assert_eq!(VerdictTone::parse("green"), Some(VerdictTone::Positive));
        assert_eq!(VerdictTone::parse(" Orange "), Some(VerdictTone::Neutral));
        assert_eq!(VerdictTone::parse("red"), Some(VerdictTone::Negative));
        assert_eq!(VerdictTone::parse("negative"), Some(VerdictTone::Negative));
        assert_eq!(VerdictTone::parse("#ef4444"), None);
    }

    #[test]
    fn company_key_prefers_exchange_code() {
        let mut id = ReportIdentity {
            company_id: Some("532540".to_string()),
            company_code: Some("TCS".to_string()),
            ..Default::default()
        };
        assert_eq!(id.company_key(), Some("TCS"));
        id.company_code = None;
        assert_eq!(id.company_key(), Some("532540"));
    }

    #[test]
    fn snapshot_returns_first_match() {
        let report = FinancialReport {
            periods: vec![
                PeriodSnapshot::new(PeriodLabel::Current).with("revenue", 1.0),
                PeriodSnapshot::new(PeriodLabel::Current).with("revenue", 2.0),
            ],
            ..Default::default()
        };
        assert_eq!(
            report
                .snapshot(PeriodLabel::Current)
                .and_then(|s| s.value("revenue")),
            Some(1.0)
        );
        assert!(report.snapshot(PeriodLabel::YearEnded).is_none());
    }
}
