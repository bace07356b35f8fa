use crate::domain::catalog::{Horizon, PeriodLabel};
use crate::domain::report::{CorporateActionCategory, FinancialReport};
use crate::metrics::derive::DerivedMetrics;
use crate::time::fiscal_quarter::{Quarter, ReportingPeriod};
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

/// Flattened headline numbers stored next to the raw payload for listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub company_key: String,
    pub company_id: Option<String>,
    pub company_code: Option<String>,
    pub period: ReportingPeriod,
    pub result_type: Option<String>,
    pub processing_method: Option<String>,
    pub revenue: Option<f64>,
    pub other_income: Option<f64>,
    pub total_expenses: Option<f64>,
    pub operating_profit: Option<f64>,
    pub opm: Option<f64>,
    pub pbt: Option<f64>,
    pub net_profit: Option<f64>,
    pub eps: Option<f64>,
    pub revenue_growth_qoq: Option<f64>,
    pub revenue_growth_yoy: Option<f64>,
    pub net_profit_growth_qoq: Option<f64>,
    pub net_profit_growth_yoy: Option<f64>,
    pub dividend: Option<String>,
    pub capex: Option<String>,
    pub management_change: Option<String>,
    pub new_projects: Option<String>,
    pub special_announcement: Option<String>,
    pub observations: Vec<String>,
    pub recommendation_verdict: Option<String>,
}

/// Builds the storage summary. The report's own quarter/year win over `fallback_period`.
///
/// Pass the report the view was assembled from, so screened insights are stored too.
pub fn summarize(
    report: &FinancialReport,
    derived: &DerivedMetrics,
    fallback_period: ReportingPeriod,
) -> anyhow::Result<ReportSummary> {
    let company_key = report
        .identity
        .company_key()
        .context("report has no company_code or company_id; cannot store it")?
        .to_string();

    let period = ReportingPeriod {
        quarter: report.identity.quarter.unwrap_or(fallback_period.quarter),
        year: report.identity.year.unwrap_or(fallback_period.year),
    };

    let current = report.snapshot(PeriodLabel::Current);
    let value = |key: &str| current.and_then(|s| s.value(key));
    let action = |category: CorporateActionCategory| {
        report
            .corporate_actions
            .as_ref()
            .and_then(|a| a.get(category))
            .map(str::to_string)
    };

    Ok(ReportSummary {
        company_key,
        company_id: report.identity.company_id.clone(),
        company_code: report.identity.company_code.clone(),
        period,
        result_type: report.result_type.clone(),
        processing_method: report.processing_method.clone(),
        revenue: value("revenue"),
        other_income: value("other_income"),
        total_expenses: value("total_expenses"),
        operating_profit: value("operating_profit"),
        opm: value("opm"),
        pbt: value("pbt"),
        net_profit: value("net_profit"),
        eps: value("eps"),
        revenue_growth_qoq: derived.value("revenue", Horizon::Qoq),
        revenue_growth_yoy: derived.value("revenue", Horizon::Yoy),
        net_profit_growth_qoq: derived.value("net_profit", Horizon::Qoq),
        net_profit_growth_yoy: derived.value("net_profit", Horizon::Yoy),
        dividend: action(CorporateActionCategory::Dividend),
        capex: action(CorporateActionCategory::Capex),
        management_change: action(CorporateActionCategory::ManagementChange),
        new_projects: action(CorporateActionCategory::NewProjects),
        special_announcement: action(CorporateActionCategory::SpecialAnnouncement),
        observations: report.observations.clone().unwrap_or_default(),
        recommendation_verdict: report.recommendation.as_ref().map(|r| r.verdict.clone()),
    })
}

/// Raw payload to store: the backend JSON plus any observations and verdict that were screened
/// locally, so a stored report re-renders the same way it was first shown.
pub fn stored_payload(mut raw: Value, report: &FinancialReport) -> Value {
    let Some(obj) = raw.as_object_mut() else {
        return raw;
    };

    let has_observations = obj
        .get("observations")
        .and_then(Value::as_array)
        .is_some_and(|items| !items.is_empty());
    if !has_observations {
        if let Some(items) = report.observations.as_ref().filter(|o| !o.is_empty()) {
            obj.insert("observations".to_string(), Value::from(items.clone()));
        }
    }

    let has_verdict = obj
        .get("recommendation")
        .and_then(|r| r.get("verdict"))
        .and_then(Value::as_str)
        .is_some_and(|v| !v.trim().is_empty());
    if !has_verdict {
        if let Some(rec) = &report.recommendation {
            obj.insert(
                "recommendation".to_string(),
                serde_json::json!({
                    "verdict": rec.verdict,
                    "tone": rec.tone,
                    "reasons": rec.reasons,
                }),
            );
        }
    }
    raw
}

pub async fn upsert_report(
    pool: &sqlx::PgPool,
    summary: &ReportSummary,
    raw_payload: Value,
) -> anyhow::Result<Uuid> {
    let id: Uuid = sqlx::query_scalar(
        "INSERT INTO analysis_reports ( \
             id, company_key, company_id, company_code, quarter, year, result_type, processing_method, \
             revenue, other_income, total_expenses, operating_profit, opm, pbt, net_profit, eps, \
             revenue_growth_qoq, revenue_growth_yoy, net_profit_growth_qoq, net_profit_growth_yoy, \
             dividend, capex, management_change, new_projects, special_announcement, observations, \
             recommendation_verdict, raw_payload) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, \
                 $19, $20, $21, $22, $23, $24, $25, $26, $27, $28) \
         ON CONFLICT (company_key, quarter, year) DO UPDATE SET \
             company_id = EXCLUDED.company_id, \
             company_code = EXCLUDED.company_code, \
             result_type = EXCLUDED.result_type, \
             processing_method = EXCLUDED.processing_method, \
             revenue = EXCLUDED.revenue, \
             other_income = EXCLUDED.other_income, \
             total_expenses = EXCLUDED.total_expenses, \
             operating_profit = EXCLUDED.operating_profit, \
             opm = EXCLUDED.opm, \
             pbt = EXCLUDED.pbt, \
             net_profit = EXCLUDED.net_profit, \
             eps = EXCLUDED.eps, \
             revenue_growth_qoq = EXCLUDED.revenue_growth_qoq, \
             revenue_growth_yoy = EXCLUDED.revenue_growth_yoy, \
             net_profit_growth_qoq = EXCLUDED.net_profit_growth_qoq, \
             net_profit_growth_yoy = EXCLUDED.net_profit_growth_yoy, \
             dividend = EXCLUDED.dividend, \
             capex = EXCLUDED.capex, \
             management_change = EXCLUDED.management_change, \
             new_projects = EXCLUDED.new_projects, \
             special_announcement = EXCLUDED.special_announcement, \
             observations = EXCLUDED.observations, \
             recommendation_verdict = EXCLUDED.recommendation_verdict, \
             raw_payload = EXCLUDED.raw_payload, \
             updated_at = now() \
         RETURNING id",
    )
    .persistent(false)
    .bind(Uuid::new_v4())
    .bind(&summary.company_key)
    .bind(&summary.company_id)
    .bind(&summary.company_code)
    .bind(summary.period.quarter.as_str())
    .bind(summary.period.year)
    .bind(&summary.result_type)
    .bind(&summary.processing_method)
    .bind(summary.revenue)
    .bind(summary.other_income)
    .bind(summary.total_expenses)
    .bind(summary.operating_profit)
    .bind(summary.opm)
    .bind(summary.pbt)
    .bind(summary.net_profit)
    .bind(summary.eps)
    .bind(summary.revenue_growth_qoq)
    .bind(summary.revenue_growth_yoy)
    .bind(summary.net_profit_growth_qoq)
    .bind(summary.net_profit_growth_yoy)
    .bind(&summary.dividend)
    .bind(&summary.capex)
    .bind(&summary.management_change)
    .bind(&summary.new_projects)
    .bind(&summary.special_announcement)
    .bind(&summary.observations)
    .bind(&summary.recommendation_verdict)
    .bind(raw_payload)
    .fetch_one(pool)
    .await
    .context("upsert analysis_reports failed")?;

    tracing::debug!(%id, company_key = %summary.company_key, period = %summary.period, "stored analysis report");
    Ok(id)
}

pub async fn fetch_report_payload(
    pool: &sqlx::PgPool,
    company_key: &str,
    period: ReportingPeriod,
) -> anyhow::Result<Option<(Uuid, Value)>> {
    let row = sqlx::query_as::<_, (Uuid, Value)>(
        "SELECT id, raw_payload FROM analysis_reports \
         WHERE company_key = $1 AND quarter = $2 AND year = $3 \
         LIMIT 1",
    )
    .persistent(false)
    .bind(company_key)
    .bind(period.quarter.as_str())
    .bind(period.year)
    .fetch_optional(pool)
    .await
    .context("select analysis_reports payload failed")?;
    Ok(row)
}

#[derive(Debug, Clone, Serialize)]
pub struct StoredReport {
    pub id: Uuid,
    pub summary: ReportSummary,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct ReportRow {
    id: Uuid,
    company_key: String,
    company_id: Option<String>,
    company_code: Option<String>,
    quarter: String,
    year: i32,
    result_type: Option<String>,
    processing_method: Option<String>,
    revenue: Option<f64>,
    other_income: Option<f64>,
    total_expenses: Option<f64>,
    operating_profit: Option<f64>,
    opm: Option<f64>,
    pbt: Option<f64>,
    net_profit: Option<f64>,
    eps: Option<f64>,
    revenue_growth_qoq: Option<f64>,
    revenue_growth_yoy: Option<f64>,
    net_profit_growth_qoq: Option<f64>,
    net_profit_growth_yoy: Option<f64>,
    dividend: Option<String>,
    capex: Option<String>,
    management_change: Option<String>,
    new_projects: Option<String>,
    special_announcement: Option<String>,
    observations: Vec<String>,
    recommendation_verdict: Option<String>,
    updated_at: DateTime<Utc>,
}

impl ReportRow {
    fn into_stored(self) -> anyhow::Result<StoredReport> {
        let quarter = Quarter::parse(&self.quarter).with_context(|| {
            format!("invalid quarter {:?} in DB for id={}", self.quarter, self.id)
        })?;

        Ok(StoredReport {
            id: self.id,
            summary: ReportSummary {
                company_key: self.company_key,
                company_id: self.company_id,
                company_code: self.company_code,
                period: ReportingPeriod {
                    quarter,
                    year: self.year,
                },
                result_type: self.result_type,
                processing_method: self.processing_method,
                revenue: self.revenue,
                other_income: self.other_income,
                total_expenses: self.total_expenses,
                operating_profit: self.operating_profit,
                opm: self.opm,
                pbt: self.pbt,
                net_profit: self.net_profit,
                eps: self.eps,
                revenue_growth_qoq: self.revenue_growth_qoq,
                revenue_growth_yoy: self.revenue_growth_yoy,
                net_profit_growth_qoq: self.net_profit_growth_qoq,
                net_profit_growth_yoy: self.net_profit_growth_yoy,
                dividend: self.dividend,
                capex: self.capex,
                management_change: self.management_change,
                new_projects: self.new_projects,
                special_announcement: self.special_announcement,
                observations: self.observations,
                recommendation_verdict: self.recommendation_verdict,
            },
            updated_at: self.updated_at,
        })
    }
}

pub async fn list_reports(pool: &sqlx::PgPool, limit: i64) -> anyhow::Result<Vec<StoredReport>> {
    anyhow::ensure!((1..=1000).contains(&limit), "limit must be 1..=1000 (got {limit})");

    let rows = sqlx::query_as::<_, ReportRow>(
        "SELECT id, company_key, company_id, company_code, quarter, year, result_type, processing_method, \
                revenue, other_income, total_expenses, operating_profit, opm, pbt, net_profit, eps, \
                revenue_growth_qoq, revenue_growth_yoy, net_profit_growth_qoq, net_profit_growth_yoy, \
                dividend, capex, management_change, new_projects, special_announcement, observations, \
                recommendation_verdict, updated_at \
         FROM analysis_reports \
         ORDER BY year DESC, quarter DESC, company_key ASC \
         LIMIT $1",
    )
    .persistent(false)
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("select analysis_reports failed")?;

    rows.into_iter().map(ReportRow::into_stored).collect()
}
