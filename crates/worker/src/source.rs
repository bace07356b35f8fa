use anyhow::Context;
use quarterlens_core::backend::http::HttpAnalysisBackend;
use quarterlens_core::backend::{AnalysisBackend, AnalyzeRequest};
use quarterlens_core::config::Settings;
use quarterlens_core::ReportPayload;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Where the worker gets its report payload from.
#[derive(Debug, Clone)]
pub enum PayloadSource {
    /// A backend response saved to disk.
    File(PathBuf),
    /// A live extraction of a quarterly-results PDF.
    Backend(AnalyzeRequest),
}

impl PayloadSource {
    pub fn describe(&self) -> String {
        match self {
            PayloadSource::File(path) => format!("file:{}", path.display()),
            PayloadSource::Backend(req) => format!("{}:{}", req.mode.as_str(), req.url),
        }
    }

    /// Returns the typed payload plus the raw JSON it came from.
    pub async fn load(&self, settings: &Settings) -> anyhow::Result<(ReportPayload, Value)> {
        match self {
            PayloadSource::File(path) => load_payload_file(path),
            PayloadSource::Backend(req) => {
                let backend = HttpAnalysisBackend::from_settings(settings)?;
                tracing::info!(backend = backend.backend_name(), url = %req.url, "requesting analysis");
                backend.analyze(req).await
            }
        }
    }
}

pub fn load_payload_file(path: &Path) -> anyhow::Result<(ReportPayload, Value)> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read payload file {}", path.display()))?;
    parse_payload(&text).with_context(|| format!("invalid payload in {}", path.display()))
}

fn parse_payload(text: &str) -> anyhow::Result<(ReportPayload, Value)> {
    let raw: Value = serde_json::from_str(text).context("payload is not valid JSON")?;
    anyhow::ensure!(raw.is_object(), "payload must be a JSON object");

    // Saved responses may still carry the backend's in-band error.
    if let Some(msg) = raw.get("error").and_then(Value::as_str) {
        anyhow::bail!("payload is a backend error response: {msg}");
    }

    let payload: ReportPayload =
        serde_json::from_value(raw.clone()).context("payload does not match the report shape")?;
    Ok((payload, raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_saved_backend_response() {
        let (payload, raw) = parse_payload(
            r#"{"company_code": "ACME", "table_data": [{"period": "Current", "revenue": 10}]}"#,
        )
        .unwrap();
        assert_eq!(raw["company_code"], "ACME");
        assert!(payload.table_data.is_some());
    }

    #[test]
    fn rejects_error_responses_and_non_objects() {
        let err = parse_payload(r#"{"error": "Failed to download PDF from URL"}"#).unwrap_err();
        assert!(err.to_string().contains("Failed to download PDF"));
        assert!(parse_payload("[1, 2]").is_err());
        assert!(parse_payload("not json").is_err());
    }

    #[test]
    fn missing_file_mentions_path() {
        let err = load_payload_file(Path::new("/nonexistent/quarterlens/payload.json")).unwrap_err();
        assert!(format!("{err:#}").contains("payload.json"));
    }
}
