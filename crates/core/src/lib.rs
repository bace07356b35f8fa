pub mod backend;
pub mod domain;
pub mod insights;
pub mod metrics;
pub mod pipeline;
pub mod storage;
pub mod time;
pub mod view;

pub use domain::catalog::MetricCatalog;
pub use domain::contract::ReportPayload;
pub use domain::error::ReportDataError;
pub use pipeline::{analyze, analyze_payload, analyze_report, Analysis, AnalysisOptions};
pub use view::ComparisonView;

pub mod config {
    use anyhow::Context;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub database_url: Option<String>,
        pub sentry_dsn: Option<String>,
        pub analysis_backend_url: Option<String>,
        pub analysis_backend_api_key: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                database_url: non_empty_var("DATABASE_URL"),
                sentry_dsn: non_empty_var("SENTRY_DSN"),
                analysis_backend_url: non_empty_var("ANALYSIS_BACKEND_URL"),
                analysis_backend_api_key: non_empty_var("ANALYSIS_BACKEND_API_KEY"),
            })
        }

        pub fn require_database_url(&self) -> anyhow::Result<&str> {
            self.database_url
                .as_deref()
                .context("DATABASE_URL is required")
        }

        pub fn require_analysis_backend_url(&self) -> anyhow::Result<&str> {
            self.analysis_backend_url
                .as_deref()
                .context("ANALYSIS_BACKEND_URL is required")
        }
    }

    fn non_empty_var(key: &str) -> Option<String> {
        std::env::var(key)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
}
