use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use analyzer_core::analysis::{analyze_with, build_response, AnalysisError, AnalysisResponse};
use analyzer_core::forecast::AdditiveForecaster;
use analyzer_core::ingest::{AlphaVantageClient, FetchError, MarketDataProvider};

const ROOT_MESSAGE: &str = "Market Analyzer API is running. Go to /analyze/{ticker} to get data.";
const DEFAULT_PORT: u16 = 8000;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = analyzer_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let provider = AlphaVantageClient::from_settings(&settings)?;
    let state = AppState {
        provider: Arc::new(provider),
        forecaster: Arc::new(AdditiveForecaster::default()),
    };

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_PORT);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

#[derive(Clone)]
struct AppState {
    provider: Arc<dyn MarketDataProvider>,
    forecaster: Arc<AdditiveForecaster>,
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(read_root))
        .route("/healthz", get(healthz))
        .route("/analyze/:ticker", get(analyze_ticker))
        .with_state(state)
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
}

// Wide open; narrow the origin list when deploying behind a known front end.
// Credentials rule out `*`, so everything is mirrored from the request.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

#[derive(Debug, Serialize)]
struct RootMessage {
    message: &'static str,
}

async fn read_root() -> Json<RootMessage> {
    Json(RootMessage {
        message: ROOT_MESSAGE,
    })
}

async fn healthz() -> &'static str {
    "ok"
}

async fn analyze_ticker(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let forecaster = Arc::clone(&state.forecaster);
    let response = analyze_with(state.provider.as_ref(), &ticker, |raw| async move {
        tokio::task::spawn_blocking(move || build_response(forecaster.as_ref(), &raw))
            .await
            .map_err(|e| {
                let err = anyhow::Error::new(e).context("analysis task failed");
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(error = %err, "analysis task failed");
                ApiError::internal("Internal error while analyzing ticker")
            })
            .and_then(|built| built.map_err(|e| ApiError::from(AnalysisError::Forecast(e))))
    })
    .await?;

    Ok(Json(response))
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn internal(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: detail.into(),
        }
    }
}

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        let status = match &err {
            AnalysisError::Fetch(FetchError::Unavailable(detail)) => {
                tracing::warn!(error = %detail, "provider unavailable");
                StatusCode::SERVICE_UNAVAILABLE
            }
            AnalysisError::Fetch(FetchError::NotFound { ticker, detail }) => {
                tracing::warn!(%ticker, provider_detail = %detail, "no daily series for ticker");
                StatusCode::NOT_FOUND
            }
            AnalysisError::Forecast(e) => {
                let err = anyhow::Error::new(e.clone());
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(error = %e, "forecast failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        Self {
            status,
            detail: err.to_string(),
        }
    }
}

impl From<FetchError> for ApiError {
    fn from(err: FetchError) -> Self {
        AnalysisError::Fetch(err).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "detail": self.detail })),
        )
            .into_response()
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &analyzer_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
