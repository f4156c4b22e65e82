/*!
duckdash REST API Server

Serves one dashboard: the page with its run button, the run trigger and the
shaped results of the last run.

## Usage

```bash
duckdash-rest dashboards/taxi.toml --host 127.0.0.1 --port 3334
```

## Endpoints

- `GET /` - The dashboard page
- `POST /api/v1/run` - Run the pipeline (409 while a run is active)
- `GET /api/v1/results` - Shaped results of the last run, by step
- `GET /api/v1/health` - Health check
- `GET /api/v1/version` - Version information
*/

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use clap::Parser;
use serde::Serialize;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use duckdash::dashboard::RunControl;
use duckdash::pipeline::ProgressEvent;
use duckdash::writer::{HtmlWriter, JsonWriter, Writer};
use duckdash::{DashboardConfig, DuckdashError, Session, ShapedResult, VERSION};

const RUN_ENDPOINT: &str = "/api/v1/run";

/// CLI arguments for the REST API server
#[derive(Parser)]
#[command(name = "duckdash-rest")]
#[command(about = "duckdash REST API Server")]
#[command(version = VERSION)]
struct Cli {
    /// Path to the dashboard TOML file
    dashboard: PathBuf,

    /// Directory or URL prefix overriding the dashboard's `base`
    #[arg(long)]
    base: Option<String>,

    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind to
    #[arg(long, default_value = "3334")]
    port: u16,

    /// CORS allowed origins (comma-separated)
    #[arg(long, default_value = "*")]
    cors_origin: String,

    /// Run the pipeline once before serving
    #[arg(long, default_value = "false")]
    run_on_start: bool,
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    session: Arc<Mutex<Session>>,
    /// Observed without taking the session lock
    control: RunControl,
}

// ============================================================================
// Response Types
// ============================================================================

/// Successful API response
#[derive(Debug, Serialize)]
struct ApiSuccess<T> {
    status: String,
    data: T,
}

/// Error API response
#[derive(Debug, Serialize)]
struct ApiError {
    status: String,
    error: ErrorDetails,
}

#[derive(Debug, Serialize)]
struct ErrorDetails {
    message: String,
    #[serde(rename = "type")]
    error_type: String,
}

#[derive(Debug, Serialize)]
struct RunResult {
    page: serde_json::Value,
    progress: Vec<String>,
}

/// Health check response
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    running: bool,
}

/// Version response
#[derive(Debug, Serialize)]
struct VersionResponse {
    version: String,
    features: Vec<String>,
}

// ============================================================================
// Error Handling
// ============================================================================

/// Custom error type for API responses
struct ApiErrorResponse {
    status: StatusCode,
    error: ApiError,
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        let json = Json(self.error);
        (self.status, json).into_response()
    }
}

impl From<DuckdashError> for ApiErrorResponse {
    fn from(err: DuckdashError) -> Self {
        let (status, error_type) = match &err {
            DuckdashError::EngineInit(_) => (StatusCode::SERVICE_UNAVAILABLE, "EngineInit"),
            DuckdashError::FileRegistration { .. } => (StatusCode::BAD_GATEWAY, "FileRegistration"),
            DuckdashError::Query { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "Query"),
            DuckdashError::Shaping { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "Shaping"),
            DuckdashError::Render { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "Render"),
            DuckdashError::ReaderError(_) => (StatusCode::BAD_REQUEST, "ReaderError"),
            DuckdashError::ConfigError(_) => (StatusCode::BAD_REQUEST, "ConfigError"),
            DuckdashError::ValidationError(_) => (StatusCode::BAD_REQUEST, "ValidationError"),
            DuckdashError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Io"),
            DuckdashError::WriterError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "WriterError"),
            DuckdashError::RunInProgress => (StatusCode::CONFLICT, "RunInProgress"),
            DuckdashError::InternalError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "InternalError"),
        };

        ApiErrorResponse {
            status,
            error: ApiError {
                status: "error".to_string(),
                error: ErrorDetails {
                    message: err.to_string(),
                    error_type: error_type.to_string(),
                },
            },
        }
    }
}

// ============================================================================
// Handler Functions
// ============================================================================

/// GET / - The dashboard page with its run button
async fn page_handler(State(state): State<AppState>) -> Result<Html<String>, ApiErrorResponse> {
    let session = state.session.lock().await;
    let page = session.page().with_run_endpoint(RUN_ENDPOINT);
    Ok(Html(HtmlWriter::new().write(&page)?))
}

/// POST /api/v1/run - Run the pipeline and render every chart
async fn run_handler(
    State(state): State<AppState>,
) -> Result<Json<ApiSuccess<RunResult>>, ApiErrorResponse> {
    if state.control.is_running() {
        return Err(DuckdashError::RunInProgress.into());
    }
    let mut session = state
        .session
        .try_lock()
        .map_err(|_| DuckdashError::RunInProgress)?;

    info!("Starting run");
    let mut events: Vec<ProgressEvent> = Vec::new();
    session.run(&mut events).await?;

    let page = JsonWriter::to_value(&session.page());
    Ok(Json(ApiSuccess {
        status: "success".to_string(),
        data: RunResult {
            page,
            progress: events.iter().map(ToString::to_string).collect(),
        },
    }))
}

/// GET /api/v1/results - Shaped results of the last run
async fn results_handler(
    State(state): State<AppState>,
) -> Json<ApiSuccess<BTreeMap<String, ShapedResult>>> {
    let session = state.session.lock().await;
    Json(ApiSuccess {
        status: "success".to_string(),
        data: session.outputs().clone(),
    })
}

/// GET /api/v1/health - Health check
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: VERSION.to_string(),
        running: state.control.is_running(),
    })
}

/// GET /api/v1/version - Version information
async fn version_handler() -> Json<VersionResponse> {
    Json(VersionResponse {
        version: VERSION.to_string(),
        features: vec!["duckdb".to_string(), "html".to_string(), "json".to_string()],
    })
}

// ============================================================================
// Main Server
// ============================================================================

/// `*` allows any origin; otherwise a comma-separated list
fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);
    if origin == "*" {
        return layer.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = origin
        .split(',')
        .filter_map(|o| HeaderValue::from_str(o.trim()).ok())
        .collect();
    layer.allow_origin(origins)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "duckdash=info,duckdash_rest=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = DashboardConfig::from_file(&cli.dashboard)?;
    if let Some(base) = cli.base {
        config = config.with_base(base);
    }
    info!("Loaded dashboard '{}' ({} charts)", config.title, config.charts.len());

    let mut session = Session::new(config);
    if cli.run_on_start {
        let mut events: Vec<ProgressEvent> = Vec::new();
        if let Err(e) = session.run(&mut events).await {
            tracing::warn!("Initial run failed: {}", e);
        }
    }

    let state = AppState {
        control: session.control(),
        session: Arc::new(Mutex::new(session)),
    };

    let app = Router::new()
        .route("/", get(page_handler))
        .route(RUN_ENDPOINT, post(run_handler))
        .route("/api/v1/results", get(results_handler))
        .route("/api/v1/health", get(health_handler))
        .route("/api/v1/version", get(version_handler))
        .layer(cors_layer(&cli.cors_origin))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state.clone());

    let addr: SocketAddr = format!("{}:{}", cli.host, cli.port).parse()?;

    info!("Starting duckdash REST API server on {}", addr);
    info!("  GET  /               - Dashboard page");
    info!("  POST {} - Run the pipeline", RUN_ENDPOINT);
    info!("  GET  /api/v1/results - Shaped results");
    info!("  GET  /api/v1/health  - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    // Release the last run's engine and scratch files
    state.session.lock().await.close().await?;
    Ok(())
}
