pub mod error;
pub mod http;

use crate::domain::contract::ReportPayload;
use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Extraction engine the backend should run on the PDF.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingMode {
    #[default]
    Local,
    Openai,
}

impl ProcessingMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ProcessingMode::Local => "local",
            ProcessingMode::Openai => "openai",
        }
    }

    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(ProcessingMode::Local),
            "openai" => Ok(ProcessingMode::Openai),
            other => anyhow::bail!("unknown processing mode {other:?} (expected local|openai)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalyzeRequest {
    pub url: String,
    pub mode: ProcessingMode,
    /// Per-request model credential, forwarded but never stored.
    pub api_key: Option<String>,
}

impl AnalyzeRequest {
    pub fn try_new(
        url: &str,
        mode: ProcessingMode,
        api_key: Option<String>,
    ) -> anyhow::Result<Self> {
        let url = url.trim().to_string();
        ensure!(!url.is_empty(), "PDF url must be non-empty");
        let parsed = reqwest::Url::parse(&url).with_context(|| format!("invalid PDF url: {url}"))?;
        ensure!(
            matches!(parsed.scheme(), "http" | "https"),
            "PDF url must be http(s) (got {})",
            parsed.scheme()
        );

        let api_key = api_key
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        ensure!(
            mode != ProcessingMode::Openai || api_key.is_some(),
            "openai processing requires an api_key"
        );

        Ok(Self { url, mode, api_key })
    }
}

#[async_trait::async_trait]
pub trait AnalysisBackend: Send + Sync {
    fn backend_name(&self) -> &'static str;

    /// Runs the remote extraction and returns the parsed payload plus the raw JSON body.
    async fn analyze(&self, req: &AnalyzeRequest) -> anyhow::Result<(ReportPayload, Value)>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_new_validates_url_and_credentials() {
        let req = AnalyzeRequest::try_new(
            " https://example.com/results.pdf ",
            ProcessingMode::Local,
            Some("  ".to_string()),
        )
        .unwrap();
        assert_eq!(req.url, "https://example.com/results.pdf");
        assert_eq!(req.api_key, None);

        assert!(AnalyzeRequest::try_new("", ProcessingMode::Local, None).is_err());
        assert!(AnalyzeRequest::try_new("ftp://x/y.pdf", ProcessingMode::Local, None).is_err());
        assert!(
            AnalyzeRequest::try_new("https://x/y.pdf", ProcessingMode::Openai, None).is_err()
        );
        assert!(AnalyzeRequest::try_new(
            "https://x/y.pdf",
            ProcessingMode::Openai,
            Some("sk-test".to_string())
        )
        .is_ok());
    }

    #[test]
    fn processing_mode_parses_case_insensitively() {
        assert_eq!(ProcessingMode::parse("OpenAI").unwrap(), ProcessingMode::Openai);
        assert_eq!(ProcessingMode::parse("local").unwrap(), ProcessingMode::Local);
        assert!(ProcessingMode::parse("gpu").is_err());
    }
}
