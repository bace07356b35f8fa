use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quarterlens_core::backend::{AnalyzeRequest, ProcessingMode};
use quarterlens_core::storage::reports::{self, ReportSummary};
use quarterlens_core::time::fiscal_quarter::resolve_reporting_period;
use quarterlens_core::{analyze, Analysis, AnalysisOptions, MetricCatalog};
use serde_json::Value;

mod source;

use source::PayloadSource;

#[derive(Debug, Parser)]
#[command(name = "quarterlens_worker")]
struct Args {
    /// Saved backend response (JSON) to render.
    #[arg(long, conflicts_with = "url", required_unless_present = "url")]
    payload: Option<PathBuf>,

    /// Quarterly-results PDF to send to the analysis backend.
    #[arg(long)]
    url: Option<String>,

    /// Backend extraction mode: local | openai.
    #[arg(long, default_value = "local")]
    mode: String,

    /// Model credential for `--mode openai`.
    #[arg(long)]
    api_key: Option<String>,

    /// Reporting period (e.g. Q2-2025) used when the payload names none.
    /// Defaults to the latest completed quarter in IST.
    #[arg(long)]
    period: Option<String>,

    /// Screen observations and a verdict when the payload carries none.
    #[arg(long)]
    include_insights: bool,

    /// Store the report in DATABASE_URL.
    #[arg(long)]
    persist: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = quarterlens_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    if let Err(err) = run(&settings, args).await {
        sentry_anyhow::capture_anyhow(&err);
        tracing::error!(error = %format!("{err:#}"), "worker run failed");
        return Err(err);
    }
    Ok(())
}

async fn run(settings: &quarterlens_core::config::Settings, args: Args) -> anyhow::Result<()> {
    let source = payload_source(&args)?;
    let catalog = MetricCatalog::standard();

    let (payload, raw) = source.load(settings).await?;
    let report = payload
        .validate(&catalog)
        .with_context(|| format!("rejected report from {}", source.describe()))?;

    let analysis = analyze(
        &catalog,
        report,
        AnalysisOptions {
            include_insights: args.include_insights,
        },
    );
    println!("{}", serde_json::to_string_pretty(&analysis.view)?);

    if !args.persist {
        tracing::info!(
            source = %source.describe(),
            warnings = analysis.view.warnings.len(),
            "rendered view"
        );
        return Ok(());
    }

    let Some((summary, stored)) = storage_record(&analysis, raw, args.period.as_deref())? else {
        tracing::warn!(source = %source.describe(), "report has no company_code or company_id; not persisted");
        return Ok(());
    };

    let db_url = settings.require_database_url()?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(2)
        .connect(db_url)
        .await
        .context("connect DATABASE_URL failed")?;

    quarterlens_core::storage::migrate(&pool).await?;

    let report_id = reports::upsert_report(&pool, &summary, stored).await?;
    tracing::info!(
        %report_id,
        company_key = %summary.company_key,
        period = %summary.period,
        "persisted analysis report"
    );
    Ok(())
}

/// Summary and payload to store, or `None` for a report without a company identity.
fn storage_record(
    analysis: &Analysis,
    raw: Value,
    period_arg: Option<&str>,
) -> anyhow::Result<Option<(ReportSummary, Value)>> {
    if analysis.report.identity.company_key().is_none() {
        return Ok(None);
    }
    let fallback_period = resolve_reporting_period(period_arg, chrono::Utc::now())?;
    let summary = reports::summarize(&analysis.report, &analysis.derived, fallback_period)?;
    Ok(Some((summary, reports::stored_payload(raw, &analysis.report))))
}

fn payload_source(args: &Args) -> anyhow::Result<PayloadSource> {
    match (&args.payload, &args.url) {
        (Some(path), None) => Ok(PayloadSource::File(path.clone())),
        (None, Some(url)) => {
            let mode = ProcessingMode::parse(&args.mode)?;
            let req = AnalyzeRequest::try_new(url, mode, args.api_key.clone())?;
            Ok(PayloadSource::Backend(req))
        }
        _ => anyhow::bail!("exactly one of --payload or --url is required"),
    }
}

fn init_sentry(
    settings: &quarterlens_core::config::Settings,
) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_requires_exactly_one_source() {
        assert!(Args::try_parse_from(["quarterlens_worker"]).is_err());
        assert!(Args::try_parse_from([
            "quarterlens_worker",
            "--payload",
            "a.json",
            "--url",
            "https://example.com/q2.pdf"
        ])
        .is_err());

        let args = Args::try_parse_from([
            "quarterlens_worker",
            "--url",
            "https://example.com/q2.pdf",
            "--period",
            "Q2-2025",
            "--persist",
        ])
        .unwrap();
        assert!(args.persist);
        assert!(matches!(
            payload_source(&args).unwrap(),
            PayloadSource::Backend(ref req) if req.mode == ProcessingMode::Local
        ));
    }

    fn analysis_of(raw: &Value) -> Analysis {
        let catalog = MetricCatalog::standard();
        let payload: quarterlens_core::ReportPayload = serde_json::from_value(raw.clone()).unwrap();
        analyze(&catalog, payload.validate(&catalog).unwrap(), AnalysisOptions::default())
    }

    #[test]
    fn reports_without_identity_are_not_stored() {
        let raw = serde_json::json!({"table_data": [{"period": "Current", "revenue": 10}]});
        let analysis = analysis_of(&raw);
        // The period is never resolved, so a bad one does not matter here.
        assert!(storage_record(&analysis, raw, Some("not-a-period"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn storage_record_uses_period_fallback() {
        let raw = serde_json::json!({
            "company_code": "ACME",
            "table_data": [{"period": "Current", "revenue": 10}]
        });
        let analysis = analysis_of(&raw);

        let (summary, stored) = storage_record(&analysis, raw.clone(), Some("Q2-2025"))
            .unwrap()
            .unwrap();
        assert_eq!(summary.company_key, "ACME");
        assert_eq!(summary.period.to_string(), "Q2-2025");
        assert_eq!(stored, raw);

        assert!(storage_record(&analysis, raw, Some("not-a-period")).is_err());
    }

    #[test]
    fn openai_mode_needs_a_key() {
        let mut args = Args::try_parse_from([
            "quarterlens_worker",
            "--url",
            "https://example.com/q2.pdf",
            "--mode",
            "openai",
        ])
        .unwrap();
        assert!(payload_source(&args).is_err());

        args.api_key = Some("sk-test".to_string());
        assert!(payload_source(&args).is_ok());
    }
}
