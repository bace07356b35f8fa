use thiserror::Error;

/// Contract violations in a report payload. Missing or ragged data never produces one of these;
/// it degrades to placeholder output instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReportDataError {
    #[error("malformed report data: {field} in period {period:?} must be a number (got {found})")]
    NonNumericValue {
        period: String,
        field: String,
        found: &'static str,
    },

    #[error("malformed report data: growth figure {key:?} must be a number (got {found})")]
    NonNumericGrowth { key: String, found: &'static str },

    #[error("malformed report data: growth key {0:?} does not name a tracked metric")]
    UnknownGrowthKey(String),

    #[error("malformed report data: unknown metric {0:?}")]
    UnknownMetric(String),
}

pub(crate) fn json_type_name(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
