use crate::backend::error::BackendRejected;
use crate::backend::{AnalysisBackend, AnalyzeRequest};
use crate::config::Settings;
use crate::domain::contract::ReportPayload;
use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::multipart::Form;
use serde_json::Value;
use std::time::Duration;

// PDF extraction (and especially the model-backed mode) is slow.
const DEFAULT_TIMEOUT_SECS: u64 = 180;
const DEFAULT_PATH: &str = "/analyze";
const DEFAULT_RETRIES: u32 = 3;
// Keeps the `1 << attempt` backoff well inside u64.
const MAX_RETRIES: u32 = 10;

const BACKEND_NAME: &str = "http_multipart";

#[derive(Debug, Clone)]
pub struct HttpAnalysisBackend {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    path: String,
    retries: u32,
}

impl HttpAnalysisBackend {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings.require_analysis_backend_url()?.to_string();
        let api_key = settings.analysis_backend_api_key.clone();

        let timeout_secs = std::env::var("ANALYSIS_BACKEND_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let retries = parse_retries(std::env::var("ANALYSIS_BACKEND_RETRIES").ok().as_deref());

        let path = std::env::var("ANALYSIS_BACKEND_PATH")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PATH.to_string());

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build analysis backend http client")?;

        Ok(Self {
            http,
            base_url,
            api_key,
            path,
            retries,
        })
    }

    fn url(&self) -> String {
        join_url(&self.base_url, &self.path)
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(api_key) = &self.api_key {
            headers.insert("x-api-key", HeaderValue::from_str(api_key)?);
        }
        Ok(headers)
    }

    fn form(req: &AnalyzeRequest) -> Form {
        let form = Form::new()
            .text("url", req.url.clone())
            .text("mode", req.mode.as_str());
        match &req.api_key {
            Some(key) => form.text("api_key", key.clone()),
            None => form,
        }
    }

    async fn analyze_once(&self, req: &AnalyzeRequest) -> Result<(ReportPayload, Value)> {
        let res = self
            .http
            .post(self.url())
            .headers(self.headers()?)
            .multipart(Self::form(req))
            .send()
            .await
            .context("analysis backend request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read analysis backend response")?;
        parse_response(status.as_u16(), &text)
    }
}

fn parse_retries(raw: Option<&str>) -> u32 {
    raw.and_then(|s| s.trim().parse::<u32>().ok())
        .unwrap_or(DEFAULT_RETRIES)
        .clamp(1, MAX_RETRIES)
}

fn join_url(base_url: &str, path: &str) -> String {
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

/// `{"error": "..."}` from a failed (or in-band failed) analysis.
fn error_message(raw: &Value) -> Option<String> {
    raw.get("error")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_response(status: u16, text: &str) -> Result<(ReportPayload, Value)> {
    let raw_json = serde_json::from_str::<Value>(text).ok();

    let success = (200..300).contains(&status);
    // The model-backed extractor reports parse failures in a 2xx body.
    let in_band_error = raw_json
        .as_ref()
        .filter(|v| success && v.get("table_data").is_none())
        .and_then(error_message);

    if !success || in_band_error.is_some() {
        let message = in_band_error
            .or_else(|| raw_json.as_ref().and_then(error_message))
            .unwrap_or_else(|| format!("HTTP {status}"));
        return Err(BackendRejected {
            backend: BACKEND_NAME,
            status,
            message,
            raw_response_json: raw_json,
        }
        .into());
    }

    let raw_json =
        raw_json.with_context(|| format!("analysis backend response is not valid JSON: {text}"))?;
    if !raw_json.is_object() {
        return Err(BackendRejected {
            backend: BACKEND_NAME,
            status,
            message: "analysis backend returned a JSON body that is not an object".to_string(),
            raw_response_json: Some(raw_json),
        }
        .into());
    }
    let payload = serde_json::from_value::<ReportPayload>(raw_json.clone())
        .context("failed to parse analysis backend response into ReportPayload")?;
    Ok((payload, raw_json))
}

fn is_retryable(err: &anyhow::Error) -> bool {
    match err.downcast_ref::<BackendRejected>() {
        Some(rejected) => !rejected.is_permanent(),
        None => true,
    }
}

#[async_trait::async_trait]
impl AnalysisBackend for HttpAnalysisBackend {
    fn backend_name(&self) -> &'static str {
        BACKEND_NAME
    }

    async fn analyze(&self, req: &AnalyzeRequest) -> Result<(ReportPayload, Value)> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.analyze_once(req).await {
                Ok(out) => return Ok(out),
                Err(err) => {
                    if attempt >= self.retries || !is_retryable(&err) {
                        return Err(err);
                    }
                    let backoff = Duration::from_secs(1 << (attempt - 1));
                    tracing::warn!(attempt, ?backoff, error = %err, "analysis backend call failed; retrying");
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn join_url_normalizes_slashes() {
        assert_eq!(
            join_url("http://localhost:5001/", "analyze"),
            "http://localhost:5001/analyze"
        );
        assert_eq!(
            join_url("http://localhost:5001", "/analyze"),
            "http://localhost:5001/analyze"
        );
    }

    #[test]
    fn parses_success_body() {
        let body = json!({
            "result_type": "Standalone",
            "table_data": [{"period": "Current", "revenue": 10.0}],
            "growth": {"revenue_qoq": 1.5}
        })
        .to_string();
        let (payload, raw) = parse_response(200, &body).unwrap();
        assert_eq!(payload.result_type, Some(json!("Standalone")));
        assert!(raw.get("growth").is_some());
    }

    #[test]
    fn client_error_is_permanent_rejection() {
        let body = json!({"error": "No file or URL provided"}).to_string();
        let err = parse_response(400, &body).unwrap_err();
        let rejected = err.downcast_ref::<BackendRejected>().unwrap();
        assert_eq!(rejected.status, 400);
        assert_eq!(rejected.message, "No file or URL provided");
        assert!(!is_retryable(&err));
    }

    #[test]
    fn server_error_is_retryable() {
        let err = parse_response(502, "<html>bad gateway</html>").unwrap_err();
        let rejected = err.downcast_ref::<BackendRejected>().unwrap();
        assert_eq!(rejected.message, "HTTP 502");
        assert!(rejected.raw_response_json.is_none());
        assert!(is_retryable(&err));
    }

    #[test]
    fn in_band_error_on_success_status_is_rejected() {
        let body = json!({
            "error": "Failed to parse AI response.",
            "raw_response": "..."
        })
        .to_string();
        let err = parse_response(200, &body).unwrap_err();
        let rejected = err.downcast_ref::<BackendRejected>().unwrap();
        assert_eq!(rejected.message, "Failed to parse AI response.");
        assert!(!is_retryable(&err));
    }

    #[test]
    fn non_object_success_body_is_permanent_rejection() {
        let err = parse_response(200, "[]").unwrap_err();
        let rejected = err.downcast_ref::<BackendRejected>().unwrap();
        assert_eq!(rejected.status, 200);
        assert_eq!(rejected.raw_response_json, Some(json!([])));
        assert!(!is_retryable(&err));
    }

    #[test]
    fn retries_are_clamped() {
        assert_eq!(parse_retries(None), DEFAULT_RETRIES);
        assert_eq!(parse_retries(Some("0")), 1);
        assert_eq!(parse_retries(Some(" 5 ")), 5);
        assert_eq!(parse_retries(Some("4000000000")), MAX_RETRIES);
        assert_eq!(parse_retries(Some("lots")), DEFAULT_RETRIES);
    }

    #[test]
    fn invalid_json_on_success_is_retryable_error() {
        let err = parse_response(200, "not json").unwrap_err();
        assert!(err.downcast_ref::<BackendRejected>().is_none());
        assert!(is_retryable(&err));
    }
}
