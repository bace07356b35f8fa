use quarterlens_core::domain::catalog::PeriodLabel;
use quarterlens_core::domain::report::VerdictTone;
use quarterlens_core::view::{Classification, Direction};
use quarterlens_core::{analyze_payload, AnalysisOptions, MetricCatalog, ReportDataError, ReportPayload};
use serde_json::{json, Value};

fn render(v: Value) -> Result<quarterlens_core::ComparisonView, ReportDataError> {
    let payload: ReportPayload = serde_json::from_value(v).expect("payload shape");
    analyze_payload(&MetricCatalog::standard(), &payload, AnalysisOptions::default())
}

fn backend_sample() -> Value {
    json!({
        "result_type": "Consolidated",
        "processing_method": "OpenAI GPT-4o",
        "company_code": "ACME",
        "quarter": "Q2",
        "year": 2025,
        "table_data": [
            {"period": "Current", "revenue": 295.16, "other_income": 138.41, "total_expenses": 381.43, "operating_profit": -86.27, "opm": -29.2, "pbt": 52.14, "net_profit": 39.02, "eps": 0.26},
            {"period": "Prev Qtr", "revenue": 478.61, "other_income": 2.12, "total_expenses": 418.84, "operating_profit": 59.77, "opm": 12.5, "pbt": 61.89, "net_profit": 46.31, "eps": 0.31},
            {"period": "YoY Qtr", "revenue": 306.57, "other_income": 1.06, "total_expenses": 235.82, "operating_profit": 70.75, "opm": 23.1, "pbt": 71.81, "net_profit": 53.74, "eps": 0.44},
            {"period": "Year Ended", "revenue": 1445.26, "other_income": 61.33, "total_expenses": 1385.27, "operating_profit": 59.99, "opm": 4.2, "pbt": 121.32, "net_profit": 88.52, "eps": 0.72}
        ],
        "growth": {
            "revenue_qoq": -38.3,
            "net_profit_qoq": -15.7,
            "revenue_yoy": -3.7,
            "net_profit_yoy": -27.4
        },
        "observations": [
            "CRITICAL RED FLAG: Operating Loss of -86.27 Lakhs.",
            "Margin Collapse: OPM is negative at -29.2%."
        ],
        "recommendation": {
            "verdict": "STRONG AVOID / SELL",
            "color": "red",
            "reasons": ["Operating Loss", "Margin Collapse"]
        }
    })
}

#[test]
fn full_backend_payload_renders_every_section() {
    let view = render(backend_sample()).unwrap();

    assert_eq!(
        view.columns,
        vec![
            PeriodLabel::Current,
            PeriodLabel::PrevQtr,
            PeriodLabel::YoyQtr,
            PeriodLabel::YearEnded
        ]
    );
    assert_eq!(view.rows.len(), 8);
    assert_eq!(view.rows[0].label, "Revenue from Operations");

    // Supplied growth wins.
    let revenue = view.row("revenue").unwrap();
    assert_eq!(revenue.qoq.text, "-38.3%");
    assert_eq!(revenue.qoq.tag, Classification::Unfavorable);
    assert_eq!(revenue.yoy.text, "-3.7%");

    // Not supplied, so computed: (381.43 - 418.84) / 418.84 * 100 = -8.93...
    let expenses = view.row("total_expenses").unwrap();
    assert_eq!(expenses.qoq.text, "-8.9%");
    assert_eq!(expenses.qoq.tag, Classification::Favorable);
    // (381.43 - 235.82) / 235.82 * 100 = +61.7...
    assert_eq!(expenses.yoy.text, "+61.7%");
    assert_eq!(expenses.yoy.tag, Classification::Unfavorable);

    let op = view.value_cell("operating_profit", PeriodLabel::Current).unwrap();
    assert_eq!(op.text, "(86.27)");
    assert_eq!(op.tag, Classification::Unfavorable);

    let opm_yoy = view.value_cell("opm", PeriodLabel::YoyQtr).unwrap();
    assert_eq!(opm_yoy.text, "23.1%");
    assert_eq!(opm_yoy.tag, Classification::Favorable);

    assert_eq!(
        view.value_cell("revenue", PeriodLabel::YearEnded).unwrap().text,
        "1,445.26"
    );

    assert_eq!(view.badges.result_type, "Consolidated");
    assert_eq!(view.badges.company.as_deref(), Some("ACME"));
    assert_eq!(view.badges.period.as_deref(), Some("Q2 2025"));

    assert_eq!(view.growth_highlights.len(), 4);
    assert_eq!(view.growth_highlights[1].label, "Net Profit QoQ");
    assert_eq!(view.growth_highlights[1].direction, Some(Direction::Down));
    assert_eq!(view.growth_highlights[1].cell.text, "15.7%");

    assert_eq!(view.observations.len(), 2);
    assert_eq!(view.recommendation.tone, VerdictTone::Negative);
    assert_eq!(view.recommendation.reasons.len(), 2);
    assert!(view.corporate_actions.iter().all(|a| !a.mentioned));
    assert!(view.warnings.is_empty());
}

#[test]
fn empty_payload_yields_placeholder_table() {
    let view = render(json!({"table_data": [], "growth": {}})).unwrap();
    assert_eq!(view.rows.len(), 8);
    assert!(view
        .rows
        .iter()
        .all(|r| r.qoq.text == "-" && r.yoy.text == "-" && r.values.is_empty()));

    let view = render(json!({})).unwrap();
    assert_eq!(view.rows.len(), 8);
}

#[test]
fn zero_comparison_renders_placeholder() {
    let view = render(json!({
        "table_data": [
            {"period": "Current", "revenue": 100},
            {"period": "Prev Qtr", "revenue": 0}
        ]
    }))
    .unwrap();
    let revenue = view.row("revenue").unwrap();
    assert_eq!(revenue.qoq.text, "-");
    assert_eq!(revenue.qoq.tag, Classification::Neutral);
}

#[test]
fn null_growth_falls_back_to_snapshots() {
    let view = render(json!({
        "table_data": [
            {"period": "Current", "revenue": 110},
            {"period": "Prev Qtr", "revenue": 100}
        ],
        "growth": {"revenue_qoq": null, "revenue_yoy": null}
    }))
    .unwrap();
    let revenue = view.row("revenue").unwrap();
    assert_eq!(revenue.qoq.text, "+10.0%");
    assert_eq!(revenue.qoq.tag, Classification::Favorable);
    // No YoY snapshot to fall back to.
    assert_eq!(revenue.yoy.text, "-");
}

#[test]
fn extreme_growth_and_margin_render_finite() {
    let view = render(json!({
        "table_data": [{"period": "Current", "opm": 1e308}],
        "growth": {"revenue_qoq": 1e308, "net_profit_yoy": -1e308}
    }))
    .unwrap();
    let revenue = view.row("revenue").unwrap();
    assert!(revenue.qoq.text.starts_with("+1"));
    assert!(!revenue.qoq.text.contains("inf"));
    assert!(!view.row("net_profit").unwrap().yoy.text.contains("inf"));

    let opm = view.value_cell("opm", PeriodLabel::Current).unwrap();
    assert!(!opm.text.contains("inf"));
    assert_eq!(opm.tag, Classification::Favorable);
}

#[test]
fn negative_net_profit_renders_in_parentheses() {
    let view = render(json!({
        "table_data": [{"period": "Current", "net_profit": -45000}]
    }))
    .unwrap();
    let cell = view.value_cell("net_profit", PeriodLabel::Current).unwrap();
    assert_eq!(cell.text, "(45,000)");
    assert_eq!(cell.tag, Classification::Unfavorable);
}

#[test]
fn duplicate_period_is_flagged() {
    let view = render(json!({
        "table_data": [
            {"period": "Current", "revenue": 120},
            {"period": "Prev Qtr", "revenue": 100},
            {"period": "Current", "revenue": 5}
        ]
    }))
    .unwrap();
    assert_eq!(view.columns.len(), 2);
    assert_eq!(view.row("revenue").unwrap().qoq.text, "+20.0%");
    assert_eq!(view.warnings.len(), 1);
    assert!(view.warnings[0].contains("duplicate period"));
}

#[test]
fn contract_violations_are_structured_errors() {
    let err = render(json!({
        "table_data": [{"period": "Current", "eps": {"basic": 1.2}}]
    }))
    .unwrap_err();
    assert!(matches!(err, ReportDataError::NonNumericValue { ref field, .. } if field == "eps"));
    assert!(err.to_string().starts_with("malformed report data"));

    let err = render(json!({"growth": {"ebitda_yoy": 3.0}})).unwrap_err();
    assert_eq!(err, ReportDataError::UnknownGrowthKey("ebitda_yoy".to_string()));
}

#[test]
fn insights_fill_missing_recommendation_when_requested() {
    let mut sample = backend_sample();
    let obj = sample.as_object_mut().unwrap();
    obj.remove("observations");
    obj.remove("recommendation");

    let payload: ReportPayload = serde_json::from_value(sample).unwrap();
    let catalog = MetricCatalog::standard();

    let plain = analyze_payload(&catalog, &payload, AnalysisOptions::default()).unwrap();
    assert_eq!(plain.recommendation.verdict, "Unknown / Incomplete");

    let screened = analyze_payload(
        &catalog,
        &payload,
        AnalysisOptions {
            include_insights: true,
        },
    )
    .unwrap();
    assert_eq!(screened.recommendation.verdict, "STRONG AVOID / SELL");
    assert_eq!(screened.recommendation.tone, VerdictTone::Negative);
    assert_eq!(screened.observations.len(), 3);
}
