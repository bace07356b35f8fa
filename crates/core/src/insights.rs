//! Rule-based observations and verdict for reports that arrive without them.
//!
//! Only used when a caller opts in; supplied observations and recommendations always win.

use crate::domain::catalog::{Horizon, PeriodLabel};
use crate::domain::report::{FinancialReport, RecommendationVerdict, VerdictTone};
use crate::metrics::derive::DerivedMetrics;
use serde::Serialize;

const REVENUE_DECLINE_QOQ_PCT: f64 = -10.0;
const PROFIT_GROWTH_YOY_PCT: f64 = 20.0;

const BUY_MIN_SCORE: i32 = 2;
const AVOID_MAX_SCORE: i32 = -3;

pub const VERDICT_BUY: &str = "BUY / ACCUMULATE";
pub const VERDICT_HOLD: &str = "HOLD / NEUTRAL";
pub const VERDICT_AVOID: &str = "STRONG AVOID / SELL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationKind {
    Critical,
    Warning,
    Decline,
    Growth,
}

impl ObservationKind {
    fn score(self) -> i32 {
        match self {
            ObservationKind::Critical => -5,
            ObservationKind::Warning => -2,
            ObservationKind::Decline => -1,
            ObservationKind::Growth => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub kind: ObservationKind,
    pub text: String,
}

pub fn screen(report: &FinancialReport, derived: &DerivedMetrics) -> Vec<Observation> {
    let mut out = Vec::new();
    let current = report.snapshot(PeriodLabel::Current);
    let value = |key: &str| current.and_then(|s| s.value(key));

    if let Some(op) = value("operating_profit").filter(|v| *v < 0.0) {
        out.push(Observation {
            kind: ObservationKind::Critical,
            text: format!("Critical red flag: operating loss of {op:.2}."),
        });
    }
    if let Some(opm) = value("opm").filter(|v| *v < 0.0) {
        out.push(Observation {
            kind: ObservationKind::Warning,
            text: format!("Margin collapse: OPM is negative at {opm:.1}%."),
        });
    }
    if let Some(g) = derived
        .value("revenue", Horizon::Qoq)
        .filter(|v| *v < REVENUE_DECLINE_QOQ_PCT)
    {
        out.push(Observation {
            kind: ObservationKind::Decline,
            text: format!("Significant revenue decline QoQ ({g:.1}%)."),
        });
    }
    if let Some(g) = derived
        .value("net_profit", Horizon::Yoy)
        .filter(|v| *v > PROFIT_GROWTH_YOY_PCT)
    {
        out.push(Observation {
            kind: ObservationKind::Growth,
            text: format!("Strong profit growth YoY ({g:+.1}%)."),
        });
    }
    out
}

pub fn score(report: &FinancialReport, observations: &[Observation]) -> i32 {
    let mut score: i32 = observations.iter().map(|o| o.kind.score()).sum();
    let net_profit = report
        .snapshot(PeriodLabel::Current)
        .and_then(|s| s.value("net_profit"));
    if net_profit.is_some_and(|v| v > 0.0) {
        score += 2;
    }
    score
}

pub fn recommend(report: &FinancialReport, observations: &[Observation]) -> RecommendationVerdict {
    let score = score(report, observations);
    let (verdict, tone) = if score >= BUY_MIN_SCORE {
        (VERDICT_BUY, VerdictTone::Positive)
    } else if score > AVOID_MAX_SCORE {
        (VERDICT_HOLD, VerdictTone::Neutral)
    } else {
        (VERDICT_AVOID, VerdictTone::Negative)
    };
    tracing::debug!(score, verdict, "screened recommendation");

    RecommendationVerdict {
        verdict: verdict.to_string(),
        tone,
        reasons: observations.iter().map(|o| o.text.clone()).collect(),
    }
}

/// Copy of `report` with screened observations and verdict filled in where none were supplied.
pub fn with_screened_insights(report: &FinancialReport, derived: &DerivedMetrics) -> FinancialReport {
    let mut out = report.clone();
    let observations = screen(report, derived);

    if report.recommendation.is_none() {
        out.recommendation = Some(recommend(report, &observations));
    }
    if report.observations.as_ref().map_or(true, Vec::is_empty) {
        out.observations = Some(observations.into_iter().map(|o| o.text).collect());
    }
    out
}
