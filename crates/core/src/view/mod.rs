pub mod assemble;
pub mod format;

use crate::domain::catalog::PeriodLabel;
use crate::domain::report::{CorporateActionCategory, VerdictTone};
use serde::{Deserialize, Serialize};

pub use assemble::assemble;

/// Rendered text for anything that could not be computed or was not supplied.
pub const PLACEHOLDER: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Favorable,
    Unfavorable,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub text: String,
    pub tag: Classification,
}

impl Cell {
    pub fn new(text: impl Into<String>, tag: Classification) -> Self {
        Self {
            text: text.into(),
            tag,
        }
    }

    pub fn placeholder() -> Self {
        Self::new(PLACEHOLDER, Classification::Neutral)
    }

    pub fn is_placeholder(&self) -> bool {
        self.text == PLACEHOLDER
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub key: String,
    pub label: String,
    pub qoq: Cell,
    pub yoy: Cell,
    /// One cell per entry of `ComparisonView::columns`.
    pub values: Vec<Cell>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrowthHighlight {
    pub label: String,
    pub direction: Option<Direction>,
    pub cell: Cell,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badges {
    pub result_type: String,
    pub processing_method: String,
    pub company: Option<String>,
    pub period: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorporateActionEntry {
    pub category: CorporateActionCategory,
    pub label: String,
    pub text: String,
    pub mentioned: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationView {
    pub verdict: String,
    pub tone: VerdictTone,
    pub reasons: Vec<String>,
}

/// Fully rendered comparison. Contains no numbers left to compute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonView {
    pub badges: Badges,
    pub columns: Vec<PeriodLabel>,
    pub rows: Vec<ComparisonRow>,
    pub growth_highlights: Vec<GrowthHighlight>,
    pub corporate_actions: Vec<CorporateActionEntry>,
    pub observations: Vec<String>,
    pub recommendation: RecommendationView,
    pub warnings: Vec<String>,
}

impl ComparisonView {
    pub fn row(&self, key: &str) -> Option<&ComparisonRow> {
        self.rows.iter().find(|r| r.key == key)
    }

    /// Value cell for `key` in `period`, if that column is present.
    pub fn value_cell(&self, key: &str, period: PeriodLabel) -> Option<&Cell> {
        let col = self.columns.iter().position(|p| *p == period)?;
        self.row(key).and_then(|r| r.values.get(col))
    }
}
