use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use quarterlens_core::backend::error::BackendRejected;
use quarterlens_core::backend::http::HttpAnalysisBackend;
use quarterlens_core::backend::{AnalysisBackend, AnalyzeRequest, ProcessingMode};
use quarterlens_core::storage::reports::{self, StoredReport};
use quarterlens_core::time::fiscal_quarter::{resolve_reporting_period, Quarter, ReportingPeriod};
use quarterlens_core::{
    analyze, Analysis, AnalysisOptions, ComparisonView, MetricCatalog, ReportDataError,
    ReportPayload,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = quarterlens_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let pool: Option<PgPool> = match settings.require_database_url() {
        Ok(db_url) => match sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await
        {
            Ok(pool) => match quarterlens_core::storage::migrate(&pool).await {
                Ok(()) => Some(pool),
                Err(e) => {
                    sentry_anyhow::capture_anyhow(&e);
                    tracing::error!(error = %e, "db migrations failed; report storage disabled");
                    None
                }
            },
            Err(e) => {
                let err = anyhow::Error::new(e);
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(error = %err, "db connect failed; report storage disabled");
                None
            }
        },
        Err(e) => {
            tracing::warn!(error = %e, "DATABASE_URL missing; report storage disabled");
            None
        }
    };

    let backend: Option<Arc<dyn AnalysisBackend>> =
        match HttpAnalysisBackend::from_settings(&settings) {
            Ok(b) => Some(Arc::new(b)),
            Err(e) => {
                tracing::warn!(error = %e, "analysis backend not configured; /analyze disabled");
                None
            }
        };

    let state = AppState {
        pool,
        backend,
        catalog: Arc::new(MetricCatalog::standard()),
    };

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/views", post(render_view))
        .route("/analyze", post(analyze_url))
        .route("/reports", get(list_reports))
        .route("/reports/:company/:quarter/:year", get(get_report_view))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    pool: Option<PgPool>,
    backend: Option<Arc<dyn AnalysisBackend>>,
    catalog: Arc<MetricCatalog>,
}

/// Error responses follow the backend's `{ "error": "..." }` shape.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn internal(err: anyhow::Error) -> Self {
        sentry_anyhow::capture_anyhow(&err);
        tracing::error!(error = %format!("{err:#}"), "request failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
    }

    fn malformed(err: ReportDataError) -> Self {
        tracing::warn!(error = %err, "rejected malformed report");
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
    }

    /// Maps a failed backend call: its own rejections keep their message.
    fn from_backend(err: anyhow::Error) -> Self {
        if let Some(rejected) = err.downcast_ref::<BackendRejected>() {
            let status = if rejected.is_permanent() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::BAD_GATEWAY
            };
            tracing::warn!(error = %rejected, "analysis backend rejected request");
            return Self::new(status, rejected.message.clone());
        }
        sentry_anyhow::capture_anyhow(&err);
        tracing::error!(error = %format!("{err:#}"), "analysis backend unavailable");
        Self::new(StatusCode::BAD_GATEWAY, "Failed to reach the analysis backend")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
struct ViewParams {
    #[serde(default)]
    include_insights: bool,
}

fn render(
    catalog: &MetricCatalog,
    payload: &ReportPayload,
    include_insights: bool,
) -> Result<Analysis, ApiError> {
    let report = payload.validate(catalog).map_err(ApiError::malformed)?;
    Ok(analyze(catalog, report, AnalysisOptions { include_insights }))
}

async fn render_view(
    State(state): State<AppState>,
    Query(params): Query<ViewParams>,
    Json(payload): Json<ReportPayload>,
) -> Result<Json<ComparisonView>, ApiError> {
    let analysis = render(&state.catalog, &payload, params.include_insights)?;
    Ok(Json(analysis.view))
}

#[derive(Debug, Deserialize)]
struct AnalyzeBody {
    url: String,
    #[serde(default)]
    mode: Option<String>,
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    include_insights: bool,
}

#[derive(Debug, Serialize)]
struct AnalyzeResponse {
    report_id: Option<Uuid>,
    view: ComparisonView,
}

async fn analyze_url(
    State(state): State<AppState>,
    Json(body): Json<AnalyzeBody>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let Some(backend) = &state.backend else {
        return Err(ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "analysis backend is not configured",
        ));
    };

    let mode = match body.mode.as_deref() {
        Some(m) => ProcessingMode::parse(m)
            .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e.to_string()))?,
        None => ProcessingMode::default(),
    };
    let req = AnalyzeRequest::try_new(&body.url, mode, body.api_key)
        .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e.to_string()))?;

    let (payload, raw) = backend
        .analyze(&req)
        .await
        .map_err(ApiError::from_backend)?;
    let analysis = render(&state.catalog, &payload, body.include_insights)?;

    let report_id = match &state.pool {
        Some(pool) if analysis.report.identity.company_key().is_some() => {
            let fallback = resolve_reporting_period(None, chrono::Utc::now())
                .map_err(ApiError::internal)?;
            let summary = reports::summarize(&analysis.report, &analysis.derived, fallback)
                .map_err(ApiError::internal)?;
            let stored = reports::stored_payload(raw, &analysis.report);
            Some(
                reports::upsert_report(pool, &summary, stored)
                    .await
                    .map_err(ApiError::internal)?,
            )
        }
        _ => None,
    };

    tracing::info!(url = %req.url, mode = req.mode.as_str(), ?report_id, "analysis rendered");
    Ok(Json(AnalyzeResponse {
        report_id,
        view: analysis.view,
    }))
}

#[derive(Debug, Deserialize)]
struct ListParams {
    limit: Option<i64>,
}

async fn list_reports(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<StoredReport>>, ApiError> {
    let Some(pool) = &state.pool else {
        return Err(ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "report storage is not configured",
        ));
    };

    let limit = params.limit.unwrap_or(100);
    if !(1..=1000).contains(&limit) {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "limit must be between 1 and 1000",
        ));
    }

    let items = reports::list_reports(pool, limit)
        .await
        .map_err(ApiError::internal)?;
    Ok(Json(items))
}

async fn get_report_view(
    State(state): State<AppState>,
    Path((company, quarter, year)): Path<(String, String, i32)>,
) -> Result<Json<ComparisonView>, ApiError> {
    let Some(pool) = &state.pool else {
        return Err(ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "report storage is not configured",
        ));
    };

    let quarter = Quarter::parse(&quarter)
        .ok_or_else(|| ApiError::new(StatusCode::BAD_REQUEST, "quarter must be Q1..Q4"))?;
    let period = ReportingPeriod { quarter, year };

    let (_, raw) = reports::fetch_report_payload(pool, &company, period)
        .await
        .map_err(ApiError::internal)?
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "report not found"))?;

    let payload: ReportPayload = serde_json::from_value(raw).map_err(|e| {
        ApiError::internal(anyhow::Error::new(e).context("stored payload unreadable"))
    })?;
    let analysis = render(&state.catalog, &payload, false)?;
    Ok(Json(analysis.view))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
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
