use crate::domain::catalog::{MetricCatalog, PeriodLabel};
use crate::domain::error::{json_type_name, ReportDataError};
use crate::domain::report::{
    CorporateActionCategory, CorporateActions, DataQualityWarning, FinancialReport,
    GrowthFigures, PeriodSnapshot, RecommendationVerdict, ReportIdentity, VerdictTone,
};
use crate::time::fiscal_quarter::Quarter;
use crate::view::format::plain_number;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Report payload as returned by the analysis backend. Every field is optional and may be
/// wrong-typed in practice, so they are kept as raw JSON until `validate`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_type: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_method: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_code: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quarter: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub growth: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corporate_actions: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observations: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<Value>,
}

impl ReportPayload {
    /// Checks the payload against `catalog` and converts it into a typed report.
    ///
    /// Only non-numeric metric values and growth keys outside the catalog fail; every other
    /// irregularity is dropped and recorded in `FinancialReport::warnings`.
    pub fn validate(&self, catalog: &MetricCatalog) -> Result<FinancialReport, ReportDataError> {
        let mut warnings = Vec::new();

        let periods = match &self.table_data {
            Some(v) => validate_table_data(v, catalog, &mut warnings)?,
            None => Vec::new(),
        };

        let growth = match &self.growth {
            Some(v) => validate_growth(v, catalog, &mut warnings)?,
            None => GrowthFigures::new(),
        };

        let identity = ReportIdentity {
            company_id: self
                .company_id
                .as_ref()
                .and_then(|v| lenient_text("company_id", v, &mut warnings)),
            company_code: self
                .company_code
                .as_ref()
                .and_then(|v| lenient_text("company_code", v, &mut warnings)),
            quarter: self
                .quarter
                .as_ref()
                .and_then(|v| lenient_quarter(v, &mut warnings)),
            year: self.year.as_ref().and_then(|v| lenient_year(v, &mut warnings)),
        };

        Ok(FinancialReport {
            result_type: self
                .result_type
                .as_ref()
                .and_then(|v| lenient_text("result_type", v, &mut warnings)),
            processing_method: self
                .processing_method
                .as_ref()
                .and_then(|v| lenient_text("processing_method", v, &mut warnings)),
            identity,
            periods,
            growth,
            corporate_actions: self
                .corporate_actions
                .as_ref()
                .and_then(|v| lenient_corporate_actions(v, &mut warnings)),
            observations: self
                .observations
                .as_ref()
                .and_then(|v| lenient_observations(v, &mut warnings)),
            recommendation: self
                .recommendation
                .as_ref()
                .and_then(|v| lenient_recommendation(v, &mut warnings)),
            warnings,
        })
    }
}

fn ignored(warnings: &mut Vec<DataQualityWarning>, field: &str, reason: String) {
    tracing::debug!(field, %reason, "report field ignored");
    warnings.push(DataQualityWarning::IgnoredField {
        field: field.to_string(),
        reason,
    });
}

fn validate_table_data(
    v: &Value,
    catalog: &MetricCatalog,
    warnings: &mut Vec<DataQualityWarning>,
) -> Result<Vec<PeriodSnapshot>, ReportDataError> {
    let Some(rows) = v.as_array() else {
        ignored(
            warnings,
            "table_data",
            format!("expected an array, got {}", json_type_name(v)),
        );
        return Ok(Vec::new());
    };

    let mut out = Vec::with_capacity(rows.len());
    for (idx, row) in rows.iter().enumerate() {
        let Some(obj) = row.as_object() else {
            ignored(
                warnings,
                &format!("table_data[{idx}]"),
                format!("expected an object, got {}", json_type_name(row)),
            );
            continue;
        };

        let label = obj.get("period").and_then(Value::as_str).unwrap_or("");
        let Some(period) = PeriodLabel::parse(label) else {
            tracing::warn!(label, "unknown period label in table_data");
            warnings.push(DataQualityWarning::UnknownPeriod {
                label: label.to_string(),
            });
            continue;
        };

        out.push(validate_snapshot(period, obj, catalog)?);
    }
    Ok(out)
}

fn validate_snapshot(
    period: PeriodLabel,
    obj: &Map<String, Value>,
    catalog: &MetricCatalog,
) -> Result<PeriodSnapshot, ReportDataError> {
    let mut snapshot = PeriodSnapshot::new(period);
    for metric in catalog.iter() {
        match obj.get(&metric.key) {
            None | Some(Value::Null) => {}
            Some(Value::Number(n)) => {
                if let Some(f) = n.as_f64() {
                    snapshot.values.insert(metric.key.clone(), f);
                }
            }
            Some(other) => {
                return Err(ReportDataError::NonNumericValue {
                    period: period.as_str().to_string(),
                    field: metric.key.clone(),
                    found: json_type_name(other),
                })
            }
        }
    }
    Ok(snapshot)
}

fn validate_growth(
    v: &Value,
    catalog: &MetricCatalog,
    warnings: &mut Vec<DataQualityWarning>,
) -> Result<GrowthFigures, ReportDataError> {
    let Some(obj) = v.as_object() else {
        ignored(
            warnings,
            "growth",
            format!("expected an object, got {}", json_type_name(v)),
        );
        return Ok(GrowthFigures::new());
    };

    let mut out = GrowthFigures::new();
    for (key, value) in obj {
        let (metric, horizon) = catalog.parse_growth_key(key)?;
        match value {
            Value::Null => {}
            Value::Number(n) => {
                if let Some(f) = n.as_f64() {
                    out.insert(&metric.key, horizon, f);
                }
            }
            other => {
                return Err(ReportDataError::NonNumericGrowth {
                    key: key.clone(),
                    found: json_type_name(other),
                })
            }
        }
    }
    Ok(out)
}

fn lenient_text(field: &str, v: &Value, warnings: &mut Vec<DataQualityWarning>) -> Option<String> {
    let text = match v {
        Value::Null => return None,
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        other => {
            ignored(
                warnings,
                field,
                format!("expected text, got {}", json_type_name(other)),
            );
            return None;
        }
    };
    (!text.is_empty()).then_some(text)
}

fn lenient_quarter(v: &Value, warnings: &mut Vec<DataQualityWarning>) -> Option<Quarter> {
    let text = lenient_text("quarter", v, warnings)?;
    let quarter = Quarter::parse(&text);
    if quarter.is_none() {
        ignored(warnings, "quarter", format!("unrecognized quarter {text:?}"));
    }
    quarter
}

fn lenient_year(v: &Value, warnings: &mut Vec<DataQualityWarning>) -> Option<i32> {
    let year = match v {
        Value::Null => return None,
        Value::Number(n) => n.as_i64().and_then(|y| i32::try_from(y).ok()),
        Value::String(s) => s.trim().parse::<i32>().ok(),
        _ => None,
    };
    if year.is_none() {
        ignored(warnings, "year", format!("unrecognized year {v}"));
    }
    year
}

fn lenient_corporate_actions(
    v: &Value,
    warnings: &mut Vec<DataQualityWarning>,
) -> Option<CorporateActions> {
    let Some(obj) = v.as_object() else {
        ignored(
            warnings,
            "corporate_actions",
            format!("expected an object, got {}", json_type_name(v)),
        );
        return None;
    };

    let mut out = CorporateActions::default();
    for (key, value) in obj {
        let Some(category) = CorporateActionCategory::from_key(key) else {
            tracing::debug!(key, "skipping unknown corporate action category");
            continue;
        };
        let text = match value {
            Value::Null => continue,
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.as_f64().map(plain_number).unwrap_or_default(),
            Value::Bool(true) => "Yes".to_string(),
            Value::Bool(false) => "No".to_string(),
            other => {
                ignored(
                    warnings,
                    &format!("corporate_actions.{key}"),
                    format!("expected text, got {}", json_type_name(other)),
                );
                continue;
            }
        };
        if !text.is_empty() {
            out.set(category, text);
        }
    }
    Some(out)
}

fn lenient_observations(
    v: &Value,
    warnings: &mut Vec<DataQualityWarning>,
) -> Option<Vec<String>> {
    let Some(items) = v.as_array() else {
        ignored(
            warnings,
            "observations",
            format!("expected an array, got {}", json_type_name(v)),
        );
        return None;
    };

    let mut out = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        match item.as_str().map(str::trim) {
            Some(s) if !s.is_empty() => out.push(s.to_string()),
            Some(_) => {}
            None => ignored(
                warnings,
                &format!("observations[{idx}]"),
                format!("expected text, got {}", json_type_name(item)),
            ),
        }
    }
    Some(out)
}

fn lenient_recommendation(
    v: &Value,
    warnings: &mut Vec<DataQualityWarning>,
) -> Option<RecommendationVerdict> {
    let Some(obj) = v.as_object() else {
        ignored(
            warnings,
            "recommendation",
            format!("expected an object, got {}", json_type_name(v)),
        );
        return None;
    };

    // The backend sends `{}` when recommendations were not requested.
    let verdict = obj
        .get("verdict")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())?
        .to_string();

    let tone = ["classification", "tone", "color"]
        .iter()
        .filter_map(|k| obj.get(*k).and_then(Value::as_str))
        .find_map(VerdictTone::parse)
        .unwrap_or(VerdictTone::Neutral);

    let reasons = obj
        .get("reasons")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Some(RecommendationVerdict {
        verdict,
        tone,
        reasons,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::Horizon;
    use serde_json::json;

    fn payload(v: Value) -> ReportPayload {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn validate_accepts_backend_shape() {
        let p = payload(json!({
            "result_type": "Consolidated",
            "company_code": "ACME",
            "quarter": "Q2",
            "year": 2025,
            "table_data": [
                {"period": "Current", "revenue": 295.16, "net_profit": 39.02, "eps": 0.26},
                {"period": "Prev Qtr", "revenue": 478.61, "net_profit": null}
            ],
            "growth": {"revenue_qoq": -38.3, "net_profit_yoy": null},
            "corporate_actions": {"dividend": "2.5", "capex": 1200.0, "management_change": "No"},
            "observations": ["Operating loss"],
            "recommendation": {"verdict": "HOLD / NEUTRAL", "color": "orange", "reasons": ["x"]}
        }));

        let report = p.validate(&MetricCatalog::standard()).unwrap();
        assert_eq!(report.result_type.as_deref(), Some("Consolidated"));
        assert_eq!(report.identity.quarter, Some(Quarter::Q2));
        assert_eq!(report.identity.year, Some(2025));
        assert_eq!(report.periods.len(), 2);
        assert_eq!(report.periods[0].value("eps"), Some(0.26));
        assert_eq!(report.periods[1].value("net_profit"), None);
        assert_eq!(report.growth.get("revenue", Horizon::Qoq), Some(-38.3));
        assert_eq!(report.growth.get("net_profit", Horizon::Yoy), None);

        let actions = report.corporate_actions.unwrap();
        assert_eq!(actions.get(CorporateActionCategory::Capex), Some("1200"));
        assert_eq!(actions.get(CorporateActionCategory::NewProjects), None);

        let rec = report.recommendation.unwrap();
        assert_eq!(rec.tone, VerdictTone::Neutral);
        assert_eq!(rec.reasons, vec!["x".to_string()]);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn validate_rejects_non_numeric_metric() {
        let p = payload(json!({
            "table_data": [{"period": "Current", "revenue": "295.16"}]
        }));
        let err = p.validate(&MetricCatalog::standard()).unwrap_err();
        assert_eq!(
            err,
            ReportDataError::NonNumericValue {
                period: "Current".to_string(),
                field: "revenue".to_string(),
                found: "string",
            }
        );
    }

    #[test]
    fn validate_rejects_unknown_growth_key() {
        let p = payload(json!({"growth": {"ebitda_qoq": 4.0}}));
        assert!(matches!(
            p.validate(&MetricCatalog::standard()),
            Err(ReportDataError::UnknownGrowthKey(k)) if k == "ebitda_qoq"
        ));
    }

    #[test]
    fn validate_rejects_non_numeric_growth() {
        let p = payload(json!({"growth": {"revenue_qoq": "12%"}}));
        assert!(matches!(
            p.validate(&MetricCatalog::standard()),
            Err(ReportDataError::NonNumericGrowth { .. })
        ));
    }

    #[test]
    fn validate_degrades_wrong_typed_auxiliary_fields() {
        let p = payload(json!({
            "table_data": {"period": "Current"},
            "observations": "none",
            "recommendation": ["BUY"],
            "corporate_actions": null,
            "quarter": "H1"
        }));
        let report = p.validate(&MetricCatalog::standard()).unwrap();
        assert!(report.periods.is_empty());
        assert!(report.observations.is_none());
        assert!(report.recommendation.is_none());
        assert!(report.corporate_actions.is_none());
        assert!(report.identity.quarter.is_none());
        assert_eq!(report.warnings.len(), 4);
    }

    #[test]
    fn validate_skips_unknown_period_labels() {
        let p = payload(json!({
            "table_data": [
                {"period": "Nine Months", "revenue": 1.0},
                {"period": "Current", "revenue": 2.0}
            ]
        }));
        let report = p.validate(&MetricCatalog::standard()).unwrap();
        assert_eq!(report.periods.len(), 1);
        assert_eq!(
            report.warnings,
            vec![DataQualityWarning::UnknownPeriod {
                label: "Nine Months".to_string()
            }]
        );
    }

    #[test]
    fn empty_recommendation_object_is_absent() {
        let p = payload(json!({"recommendation": {}, "observations": []}));
        let report = p.validate(&MetricCatalog::standard()).unwrap();
        assert!(report.recommendation.is_none());
        assert_eq!(report.observations, Some(vec![]));
        assert!(report.warnings.is_empty());
    }
}
